use quotebridge_clients::{MondayClient, SimproSourceFactory};
use quotebridge_core::config::{
    require_secret, AppConfig, ConfigError, ConfigOverrides, LoadOptions,
};
use quotebridge_core::{
    BoardTargets, CrmClient, QuoteSourceFactory, SyncError, SyncPipeline, SyncReport,
    SyncSettings,
};
use tracing::error;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_INTERNAL, EXIT_OK, EXIT_UPSTREAM};

const COMMAND: &str = "sync";

#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub base_url: Option<String>,
    pub accounts_board: Option<String>,
    pub contacts_board: Option<String>,
    pub deals_board: Option<String>,
    pub json: bool,
}

pub fn run(args: SyncArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            simpro_base_url: args.base_url.clone(),
            accounts_board: args.accounts_board.clone(),
            contacts_board: args.contacts_board.clone(),
            deals_board: args.deals_board.clone(),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return config_failure(error.to_string()),
    };
    crate::init_logging(&config);

    let (base_url, targets) = match sync_inputs(&config) {
        Ok(inputs) => inputs,
        Err(message) => return config_failure(message),
    };

    let sources = match SimproSourceFactory::from_config(&config.simpro) {
        Ok(sources) => sources,
        Err(error) => {
            return CommandResult::failure(COMMAND, "client_init", error.to_string(), EXIT_INTERNAL)
        }
    };
    let crm = match MondayClient::new(&config.monday) {
        Ok(crm) => crm,
        Err(error) => {
            return CommandResult::failure(COMMAND, "client_init", error.to_string(), EXIT_INTERNAL)
        }
    };

    let runtime = match super::runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    runtime.block_on(execute(
        &sources,
        &crm,
        &config.sync_settings(),
        &base_url,
        &targets,
        args.json,
    ))
}

/// Runs one pass against already-built clients.
pub async fn execute(
    sources: &dyn QuoteSourceFactory,
    crm: &dyn CrmClient,
    settings: &SyncSettings,
    base_url: &str,
    targets: &BoardTargets,
    json: bool,
) -> CommandResult {
    let source = sources.connect(base_url);
    let pipeline = SyncPipeline::new(source.as_ref(), crm, settings);
    let run_id = pipeline.run_id().to_string();

    match pipeline.run(targets).await {
        Ok(report) if json => CommandResult::json(EXIT_OK, &report.into_response(run_id)),
        Ok(report) => CommandResult::text(EXIT_OK, render_summary(&report, &run_id)),
        Err(sync_error) => {
            error!(
                event_name = "cli.sync.failed",
                correlation_id = %run_id,
                error = %sync_error,
                "sync run aborted"
            );
            upstream_failure(&sync_error)
        }
    }
}

fn sync_inputs(config: &AppConfig) -> Result<(String, BoardTargets), String> {
    require_secret("simpro.access_token", &config.simpro.access_token)
        .and_then(|()| require_secret("monday.api_token", &config.monday.api_token))
        .map_err(|error: ConfigError| error.to_string())?;

    let mut missing = Vec::new();
    let base_url = config.simpro.base_url.clone().filter(|url| !url.trim().is_empty());
    if base_url.is_none() {
        missing.push("simpro.base_url");
    }
    let targets = config.boards.targets();
    if targets.is_none() {
        missing.push("boards.accounts/contacts/deals");
    }

    match (base_url, targets) {
        (Some(base_url), Some(targets)) => Ok((base_url, targets)),
        _ => Err(format!("Missing required fields: {}", missing.join(", "))),
    }
}

fn render_summary(report: &SyncReport, run_id: &str) -> String {
    let mut lines = vec![report.message(), format!("run id: {run_id}")];

    if let SyncReport::Completed(sync) = report {
        lines.push(format!("company: {}", sync.company_used));
        lines.push(format!(
            "accounts: {} created, {} failed",
            sync.accounts.created,
            sync.accounts.failed()
        ));
        lines.push(format!(
            "contacts: {} created, {} failed, {} skipped",
            sync.contacts.created,
            sync.contacts.failed(),
            sync.skipped.contacts
        ));
        lines.push(format!(
            "deals: {} created, {} failed, {} skipped",
            sync.deals.created,
            sync.deals.failed(),
            sync.skipped.deals
        ));
    }

    lines.join("\n")
}

fn config_failure(message: String) -> CommandResult {
    CommandResult::failure(COMMAND, "config_validation", message, EXIT_CONFIG)
}

fn upstream_failure(error: &SyncError) -> CommandResult {
    let error_class = match error {
        SyncError::NoCompanies => "no_companies",
        SyncError::ListCompanies(_) | SyncError::ListQuotes { .. } => "upstream",
    };
    CommandResult::failure(COMMAND, error_class, error.to_string(), EXIT_UPSTREAM)
}
