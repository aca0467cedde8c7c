use quotebridge_clients::MondayClient;
use quotebridge_core::config::{require_secret, AppConfig, LoadOptions};
use quotebridge_core::{Board, CrmClient};
use serde::Serialize;
use tracing::error;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_INTERNAL, EXIT_OK, EXIT_UPSTREAM};

const COMMAND: &str = "boards";

#[derive(Debug, Serialize)]
struct BoardsPayload<'a> {
    success: bool,
    boards: &'a [Board],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };
    crate::init_logging(&config);

    if let Err(error) = require_secret("monday.api_token", &config.monday.api_token) {
        return CommandResult::failure(COMMAND, "config_validation", error.to_string(), EXIT_CONFIG);
    }

    let crm = match MondayClient::new(&config.monday) {
        Ok(crm) => crm,
        Err(error) => {
            return CommandResult::failure(COMMAND, "client_init", error.to_string(), EXIT_INTERNAL)
        }
    };

    match super::runtime(COMMAND) {
        Ok(runtime) => runtime.block_on(execute(&crm)),
        Err(failure) => failure,
    }
}

pub async fn execute(crm: &dyn CrmClient) -> CommandResult {
    match crm.list_boards().await {
        Ok(boards) => CommandResult::json(EXIT_OK, &BoardsPayload { success: true, boards: &boards }),
        Err(crm_error) => {
            error!(
                event_name = "cli.boards.failed",
                correlation_id = "cli",
                error = %crm_error,
                "could not list CRM boards"
            );
            CommandResult::failure(COMMAND, "upstream", crm_error.to_string(), EXIT_UPSTREAM)
        }
    }
}
