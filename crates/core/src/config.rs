use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::crm::{BoardId, BoardTargets};
use crate::sync::columns::ColumnLayout;
use crate::sync::filter::QuoteFilter;
use crate::sync::{SyncSettings, DEFAULT_ACCOUNT_INDUSTRY};

pub const DEFAULT_MONDAY_ENDPOINT: &str = "https://api.monday.com/v2";
pub const DEFAULT_MONDAY_API_VERSION: &str = "2024-04";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub simpro: SimproConfig,
    pub monday: MondayConfig,
    pub boards: BoardsConfig,
    pub sync: SyncConfig,
    pub columns: ColumnLayout,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SimproConfig {
    pub base_url: Option<String>,
    pub access_token: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MondayConfig {
    pub api_token: SecretString,
    pub endpoint: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

/// Default target boards for runs that do not name their own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoardsConfig {
    pub accounts: Option<BoardId>,
    pub contacts: Option<BoardId>,
    pub deals: Option<BoardId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub valid_stages: Vec<String>,
    pub active_statuses: Vec<String>,
    pub account_industry: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub simpro_base_url: Option<String>,
    pub simpro_access_token: Option<String>,
    pub monday_api_token: Option<String>,
    pub monday_endpoint: Option<String>,
    pub accounts_board: Option<String>,
    pub contacts_board: Option<String>,
    pub deals_board: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for SyncConfig {
    fn default() -> Self {
        let filter = QuoteFilter::default();
        Self {
            valid_stages: filter.valid_stages,
            active_statuses: filter.active_statuses,
            account_industry: DEFAULT_ACCOUNT_INDUSTRY.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simpro: SimproConfig {
                base_url: None,
                access_token: String::new().into(),
                timeout_secs: 30,
            },
            monday: MondayConfig {
                api_token: String::new().into(),
                endpoint: DEFAULT_MONDAY_ENDPOINT.to_string(),
                api_version: DEFAULT_MONDAY_API_VERSION.to_string(),
                timeout_secs: 30,
            },
            boards: BoardsConfig::default(),
            sync: SyncConfig::default(),
            columns: ColumnLayout::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

fn board_value(value: String) -> Option<BoardId> {
    let board = BoardId::new(value.trim());
    (!board.is_blank()).then_some(board)
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl BoardsConfig {
    /// All three boards, or `None` when any is unset.
    pub fn targets(&self) -> Option<BoardTargets> {
        Some(BoardTargets {
            accounts: self.accounts.clone()?,
            contacts: self.contacts.clone()?,
            deals: self.deals.clone()?,
        })
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("quotebridge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Pipeline settings assembled from `[sync]` and `[columns.*]`.
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            filter: QuoteFilter::new(
                self.sync.valid_stages.clone(),
                self.sync.active_statuses.clone(),
            ),
            columns: self.columns.clone(),
            account_industry: self.sync.account_industry.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(simpro) = patch.simpro {
            if let Some(base_url) = simpro.base_url {
                self.simpro.base_url = Some(base_url);
            }
            if let Some(access_token) = simpro.access_token {
                self.simpro.access_token = secret_value(access_token);
            }
            if let Some(timeout_secs) = simpro.timeout_secs {
                self.simpro.timeout_secs = timeout_secs;
            }
        }

        if let Some(monday) = patch.monday {
            if let Some(api_token) = monday.api_token {
                self.monday.api_token = secret_value(api_token);
            }
            if let Some(endpoint) = monday.endpoint {
                self.monday.endpoint = endpoint;
            }
            if let Some(api_version) = monday.api_version {
                self.monday.api_version = api_version;
            }
            if let Some(timeout_secs) = monday.timeout_secs {
                self.monday.timeout_secs = timeout_secs;
            }
        }

        if let Some(boards) = patch.boards {
            if let Some(accounts) = boards.accounts {
                self.boards.accounts = Some(accounts);
            }
            if let Some(contacts) = boards.contacts {
                self.boards.contacts = Some(contacts);
            }
            if let Some(deals) = boards.deals {
                self.boards.deals = Some(deals);
            }
        }

        if let Some(sync) = patch.sync {
            if let Some(valid_stages) = sync.valid_stages {
                self.sync.valid_stages = valid_stages;
            }
            if let Some(active_statuses) = sync.active_statuses {
                self.sync.active_statuses = active_statuses;
            }
            if let Some(account_industry) = sync.account_industry {
                self.sync.account_industry = account_industry;
            }
        }

        if let Some(columns) = patch.columns {
            self.columns = columns;
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUOTEBRIDGE_SIMPRO_BASE_URL") {
            self.simpro.base_url = Some(value);
        }
        let simpro_token =
            read_env("QUOTEBRIDGE_SIMPRO_ACCESS_TOKEN").or_else(|| read_env("SIMPRO_ACCESS_TOKEN"));
        if let Some(value) = simpro_token {
            self.simpro.access_token = secret_value(value);
        }
        if let Some(value) = read_env("QUOTEBRIDGE_SIMPRO_TIMEOUT_SECS") {
            self.simpro.timeout_secs = parse_u64("QUOTEBRIDGE_SIMPRO_TIMEOUT_SECS", &value)?;
        }

        let monday_token =
            read_env("QUOTEBRIDGE_MONDAY_API_TOKEN").or_else(|| read_env("MONDAY_API_TOKEN"));
        if let Some(value) = monday_token {
            self.monday.api_token = secret_value(value);
        }
        if let Some(value) = read_env("QUOTEBRIDGE_MONDAY_ENDPOINT") {
            self.monday.endpoint = value;
        }
        if let Some(value) = read_env("QUOTEBRIDGE_MONDAY_API_VERSION") {
            self.monday.api_version = value;
        }
        if let Some(value) = read_env("QUOTEBRIDGE_MONDAY_TIMEOUT_SECS") {
            self.monday.timeout_secs = parse_u64("QUOTEBRIDGE_MONDAY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("QUOTEBRIDGE_BOARDS_ACCOUNTS") {
            self.boards.accounts = board_value(value);
        }
        if let Some(value) = read_env("QUOTEBRIDGE_BOARDS_CONTACTS") {
            self.boards.contacts = board_value(value);
        }
        if let Some(value) = read_env("QUOTEBRIDGE_BOARDS_DEALS") {
            self.boards.deals = board_value(value);
        }

        if let Some(value) = read_env("QUOTEBRIDGE_SYNC_ACCOUNT_INDUSTRY") {
            self.sync.account_industry = value;
        }

        if let Some(value) = read_env("QUOTEBRIDGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("QUOTEBRIDGE_SERVER_PORT") {
            self.server.port = parse_u16("QUOTEBRIDGE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("QUOTEBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("QUOTEBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("QUOTEBRIDGE_LOGGING_LEVEL").or_else(|| read_env("QUOTEBRIDGE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUOTEBRIDGE_LOGGING_FORMAT").or_else(|| read_env("QUOTEBRIDGE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.simpro_base_url {
            self.simpro.base_url = Some(base_url);
        }
        if let Some(access_token) = overrides.simpro_access_token {
            self.simpro.access_token = secret_value(access_token);
        }
        if let Some(api_token) = overrides.monday_api_token {
            self.monday.api_token = secret_value(api_token);
        }
        if let Some(endpoint) = overrides.monday_endpoint {
            self.monday.endpoint = endpoint;
        }
        if let Some(accounts) = overrides.accounts_board {
            self.boards.accounts = board_value(accounts);
        }
        if let Some(contacts) = overrides.contacts_board {
            self.boards.contacts = board_value(contacts);
        }
        if let Some(deals) = overrides.deals_board {
            self.boards.deals = board_value(deals);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_simpro(&self.simpro)?;
        validate_monday(&self.monday)?;
        validate_sync(&self.sync)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quotebridge.toml"), PathBuf::from("config/quotebridge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_simpro(simpro: &SimproConfig) -> Result<(), ConfigError> {
    validate_timeout("simpro.timeout_secs", simpro.timeout_secs)?;

    if let Some(base_url) = &simpro.base_url {
        if !is_http_url(base_url.trim()) {
            return Err(ConfigError::Validation(
                "simpro.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_monday(monday: &MondayConfig) -> Result<(), ConfigError> {
    validate_timeout("monday.timeout_secs", monday.timeout_secs)?;

    if !is_http_url(monday.endpoint.trim()) {
        return Err(ConfigError::Validation(
            "monday.endpoint must start with http:// or https://".to_string(),
        ));
    }

    if monday.api_version.trim().is_empty() {
        return Err(ConfigError::Validation("monday.api_version must not be empty".to_string()));
    }

    Ok(())
}

fn validate_sync(sync: &SyncConfig) -> Result<(), ConfigError> {
    if sync.valid_stages.iter().all(|stage| stage.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "sync.valid_stages must list at least one stage".to_string(),
        ));
    }

    if sync.active_statuses.iter().all(|status| status.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "sync.active_statuses must list at least one status".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Checks that a credential is present before a command needs it.
pub fn require_secret(key: &str, secret: &SecretString) -> Result<(), ConfigError> {
    if secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} is required")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    simpro: Option<SimproPatch>,
    monday: Option<MondayPatch>,
    boards: Option<BoardsPatch>,
    sync: Option<SyncPatch>,
    columns: Option<ColumnLayout>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SimproPatch {
    base_url: Option<String>,
    access_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MondayPatch {
    api_token: Option<String>,
    endpoint: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BoardsPatch {
    accounts: Option<BoardId>,
    contacts: Option<BoardId>,
    deals: Option<BoardId>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncPatch {
    valid_stages: Option<Vec<String>>,
    active_statuses: Option<Vec<String>>,
    account_industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
