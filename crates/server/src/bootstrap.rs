use std::sync::Arc;

use quotebridge_clients::{MondayClient, SimproSourceFactory};
use quotebridge_core::config::AppConfig;
use quotebridge_core::sync::ports::{CrmError, SourceError};
use thiserror::Error;
use tracing::info;

use crate::health::HealthState;
use crate::sync::SyncState;

pub struct Application {
    pub config: AppConfig,
    pub sync_state: SyncState,
    pub health_state: HealthState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("quote source client setup failed: {0}")]
    QuoteSource(#[source] SourceError),
    #[error("CRM client setup failed: {0}")]
    Crm(#[source] CrmError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let sources =
        SimproSourceFactory::from_config(&config.simpro).map_err(BootstrapError::QuoteSource)?;
    let crm = MondayClient::new(&config.monday).map_err(BootstrapError::Crm)?;
    info!(
        event_name = "system.bootstrap.clients_ready",
        correlation_id = "bootstrap",
        crm_endpoint = %config.monday.endpoint,
        api_version = %config.monday.api_version,
        "upstream clients constructed"
    );

    let sync_state = SyncState {
        sources: Arc::new(sources),
        crm: Arc::new(crm),
        settings: Arc::new(config.sync_settings()),
    };
    let health_state = HealthState::from_config(&config);

    Ok(Application { config, sync_state, health_state })
}

#[cfg(test)]
mod tests {
    use quotebridge_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap_with_config;

    fn config_with(overrides: ConfigOverrides) -> AppConfig {
        AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
            .expect("config should load from overrides")
    }

    #[test]
    fn bootstrap_builds_state_from_config() {
        let app = bootstrap_with_config(config_with(ConfigOverrides {
            simpro_access_token: Some("simpro-test".to_string()),
            monday_api_token: Some("monday-test".to_string()),
            ..ConfigOverrides::default()
        }))
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.sync_state.settings.account_industry, "Building Services");
        assert_eq!(app.sync_state.settings.filter.valid_stages, vec!["Complete", "Approved"]);
        assert_eq!(app.health_state, crate::health::HealthState::from_config(&app.config));
    }

    #[test]
    fn bootstrap_succeeds_without_tokens_so_health_can_report_degraded() {
        let app = bootstrap_with_config(config_with(ConfigOverrides::default()))
            .expect("missing tokens should not block startup");

        assert_eq!(app.config.server.port, 8080);
    }
}
