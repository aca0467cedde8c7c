use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quotebridge_core::config::{AppConfig, LoadOptions};
use quotebridge_core::BoardId;
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "simpro.base_url",
        config.simpro.base_url.as_deref().unwrap_or("<unset>"),
        source("simpro.base_url", &["QUOTEBRIDGE_SIMPRO_BASE_URL"]),
    ));
    lines.push(render_line(
        "simpro.access_token",
        &redact_secret(&config.simpro.access_token),
        source("simpro.access_token", &["QUOTEBRIDGE_SIMPRO_ACCESS_TOKEN", "SIMPRO_ACCESS_TOKEN"]),
    ));
    lines.push(render_line(
        "simpro.timeout_secs",
        &config.simpro.timeout_secs.to_string(),
        source("simpro.timeout_secs", &["QUOTEBRIDGE_SIMPRO_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "monday.api_token",
        &redact_secret(&config.monday.api_token),
        source("monday.api_token", &["QUOTEBRIDGE_MONDAY_API_TOKEN", "MONDAY_API_TOKEN"]),
    ));
    lines.push(render_line(
        "monday.endpoint",
        &config.monday.endpoint,
        source("monday.endpoint", &["QUOTEBRIDGE_MONDAY_ENDPOINT"]),
    ));
    lines.push(render_line(
        "monday.api_version",
        &config.monday.api_version,
        source("monday.api_version", &["QUOTEBRIDGE_MONDAY_API_VERSION"]),
    ));
    lines.push(render_line(
        "monday.timeout_secs",
        &config.monday.timeout_secs.to_string(),
        source("monday.timeout_secs", &["QUOTEBRIDGE_MONDAY_TIMEOUT_SECS"]),
    ));

    for (key_path, board, env_key) in [
        ("boards.accounts", &config.boards.accounts, "QUOTEBRIDGE_BOARDS_ACCOUNTS"),
        ("boards.contacts", &config.boards.contacts, "QUOTEBRIDGE_BOARDS_CONTACTS"),
        ("boards.deals", &config.boards.deals, "QUOTEBRIDGE_BOARDS_DEALS"),
    ] {
        lines.push(render_line(
            key_path,
            board.as_ref().map(BoardId::as_str).unwrap_or("<unset>"),
            source(key_path, &[env_key]),
        ));
    }

    lines.push(render_line(
        "sync.valid_stages",
        &config.sync.valid_stages.join(", "),
        source("sync.valid_stages", &[]),
    ));
    lines.push(render_line(
        "sync.active_statuses",
        &config.sync.active_statuses.join(", "),
        source("sync.active_statuses", &[]),
    ));
    lines.push(render_line(
        "sync.account_industry",
        &config.sync.account_industry,
        source("sync.account_industry", &["QUOTEBRIDGE_SYNC_ACCOUNT_INDUSTRY"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["QUOTEBRIDGE_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", &["QUOTEBRIDGE_SERVER_PORT"]),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", &["QUOTEBRIDGE_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["QUOTEBRIDGE_LOGGING_LEVEL", "QUOTEBRIDGE_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["QUOTEBRIDGE_LOGGING_FORMAT", "QUOTEBRIDGE_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("quotebridge.toml"), PathBuf::from("config/quotebridge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows at most a four-character prefix so operators can tell tokens apart.
fn redact_secret(secret: &SecretString) -> String {
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let prefix: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() > 8 {
        format!("{prefix}***")
    } else {
        "<redacted>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn short_tokens_are_fully_redacted() {
        assert_eq!(redact_secret(&SecretString::from("abc123".to_string())), "<redacted>");
        assert_eq!(redact_secret(&SecretString::from("  ".to_string())), "<empty>");
    }

    #[test]
    fn long_tokens_keep_only_a_prefix() {
        let redacted = redact_secret(&SecretString::from("eyJhbGciOiJIUzI1NiJ9.payload".to_string()));
        assert_eq!(redacted, "eyJh***");
    }

    #[test]
    fn nested_key_paths_are_resolved() {
        let doc: Value = "[boards]\ndeals = \"3\"\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "boards.deals"));
        assert!(!contains_path(&doc, "boards.accounts"));
    }
}
