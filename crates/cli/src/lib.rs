pub mod commands;

use clap::{Parser, Subcommand};
use quotebridge_core::config::{AppConfig, LogFormat};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "quotebridge",
    about = "QuoteBridge operator CLI",
    long_about = "Sync accepted quotes into CRM boards, list boards, probe the quote source, and inspect config.",
    after_help = "Examples:\n  quotebridge sync --base-url https://acme.simprosuite.com --json\n  quotebridge boards\n  quotebridge config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one sync pass from the quote source into the CRM boards")]
    Sync {
        #[arg(long, help = "Quote source base URL (overrides simpro.base_url)")]
        base_url: Option<String>,
        #[arg(long, help = "Accounts board id (overrides boards.accounts)")]
        accounts_board: Option<String>,
        #[arg(long, help = "Contacts board id (overrides boards.contacts)")]
        contacts_board: Option<String>,
        #[arg(long, help = "Deals board id (overrides boards.deals)")]
        deals_board: Option<String>,
        #[arg(long, help = "Emit the full sync response as JSON")]
        json: bool,
    },
    #[command(about = "List CRM boards with their columns")]
    Boards,
    #[command(about = "Check quote source credentials by listing companies")]
    TestConnection {
        #[arg(long, help = "Quote source base URL (overrides simpro.base_url)")]
        base_url: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Sync { base_url, accounts_board, contacts_board, deals_board, json } => {
            commands::sync::run(commands::sync::SyncArgs {
                base_url,
                accounts_board,
                contacts_board,
                deals_board,
                json,
            })
        }
        Command::Boards => commands::boards::run(),
        Command::TestConnection { base_url } => commands::test_connection::run(base_url),
        Command::Config => commands::CommandResult::text(0, commands::config::run()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single parseable payload.
pub(crate) fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // try_init: tests drive several commands in one process
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
