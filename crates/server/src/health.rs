use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use quotebridge_core::config::AppConfig;
use secrecy::ExposeSecret;
use serde::Serialize;

/// Whether each upstream credential was present at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthState {
    quote_source_token: bool,
    crm_token: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub quote_source: HealthCheck,
    pub crm: HealthCheck,
    pub checked_at: String,
}

impl HealthState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            quote_source_token: !config.simpro.access_token.expose_secret().trim().is_empty(),
            crm_token: !config.monday.api_token.expose_secret().trim().is_empty(),
        }
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let quote_source = credential_check(state.quote_source_token, "simpro.access_token");
    let crm = credential_check(state.crm_token, "monday.api_token");
    let ready = quote_source.status == "ready" && crm.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "quotebridge-server runtime initialized".to_string(),
        },
        quote_source,
        crm,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn credential_check(present: bool, key: &str) -> HealthCheck {
    if present {
        HealthCheck { status: "ready", detail: format!("{key} is configured") }
    } else {
        HealthCheck { status: "degraded", detail: format!("{key} is not configured") }
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_both_credentials_are_present() {
        let (status, Json(payload)) =
            health(State(HealthState { quote_source_token: true, crm_token: true })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.quote_source.status, "ready");
        assert_eq!(payload.crm.status, "ready");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_without_crm_token() {
        let (status, Json(payload)) =
            health(State(HealthState { quote_source_token: true, crm_token: false })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.crm.detail, "monday.api_token is not configured");
        assert_eq!(payload.service.status, "ready");
    }
}
