use serde::Serialize;
use tracing::{info, warn};

use crate::domain::company::Company;
use crate::sync::ports::QuoteSource;

/// Outcome of probing the quote source with a company listing.
///
/// Failures are reported in the body rather than as errors so operators see
/// the upstream message verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<Company>>,
}

pub async fn check_connection(source: &dyn QuoteSource) -> ConnectionReport {
    match source.list_companies().await {
        Ok(companies) if companies.is_empty() => {
            warn!(event_name = "source.connection.empty", "quote source returned no companies");
            ConnectionReport {
                success: false,
                message: "No companies found".to_string(),
                companies: None,
            }
        }
        Ok(companies) => {
            info!(
                event_name = "source.connection.ok",
                companies = companies.len(),
                "quote source connection verified"
            );
            ConnectionReport {
                success: true,
                message: format!(
                    "Connection successful. Found {} companies.",
                    companies.len()
                ),
                companies: Some(companies),
            }
        }
        Err(error) => {
            warn!(
                event_name = "source.connection.failed",
                error = %error,
                "quote source connection failed"
            );
            ConnectionReport { success: false, message: error.to_string(), companies: None }
        }
    }
}
