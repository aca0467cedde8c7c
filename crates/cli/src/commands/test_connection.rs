use quotebridge_clients::SimproSourceFactory;
use quotebridge_core::config::{require_secret, AppConfig, ConfigOverrides, LoadOptions};
use quotebridge_core::sync::connection::check_connection;
use quotebridge_core::QuoteSourceFactory;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_INTERNAL, EXIT_OK, EXIT_UPSTREAM};

const COMMAND: &str = "test-connection";

pub fn run(base_url: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        overrides: ConfigOverrides { simpro_base_url: base_url, ..ConfigOverrides::default() },
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return config_failure(error.to_string()),
    };
    crate::init_logging(&config);

    if let Err(error) = require_secret("simpro.access_token", &config.simpro.access_token) {
        return config_failure(error.to_string());
    }
    let Some(base_url) = config.simpro.base_url.clone().filter(|url| !url.trim().is_empty())
    else {
        return config_failure("SimPro base URL is required".to_string());
    };

    let sources = match SimproSourceFactory::from_config(&config.simpro) {
        Ok(sources) => sources,
        Err(error) => {
            return CommandResult::failure(COMMAND, "client_init", error.to_string(), EXIT_INTERNAL)
        }
    };

    match super::runtime(COMMAND) {
        Ok(runtime) => runtime.block_on(execute(&sources, &base_url)),
        Err(failure) => failure,
    }
}

/// Prints the connection report; a failed probe still prints the report body.
pub async fn execute(sources: &dyn QuoteSourceFactory, base_url: &str) -> CommandResult {
    let source = sources.connect(base_url);
    let report = check_connection(source.as_ref()).await;
    let exit_code = if report.success { EXIT_OK } else { EXIT_UPSTREAM };
    CommandResult::json(exit_code, &report)
}

fn config_failure(message: String) -> CommandResult {
    CommandResult::failure(COMMAND, "config_validation", message, EXIT_CONFIG)
}
