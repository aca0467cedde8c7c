use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quotebridge_core::config::SimproConfig;
use quotebridge_core::domain::company::{Company, CompanyId};
use quotebridge_core::domain::quote::{Quote, QuoteId};
use quotebridge_core::sync::ports::{QuoteQuery, QuoteSource, QuoteSourceFactory, SourceError};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

const API_PREFIX: &str = "/api/v1.0";

/// Strips trailing slashes so paths can be appended directly.
pub fn normalize_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Query parameters for the quote listing endpoint.
pub fn quote_list_params(query: &QuoteQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if query.active_only {
        params.push(("IsClosed", "false".to_string()));
    }
    if let Some(stage) = &query.stage {
        params.push(("Stage", stage.clone()));
    }
    if let Some(status) = query.status.as_ref().filter(|status| !status.is_empty()) {
        params.push(("Status", status.clone()));
    }
    params
}

/// Accepts either a bare JSON array or an object wrapping it under `data`.
pub fn unwrap_list(payload: Value) -> Result<Vec<Value>, SourceError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => {
                Err(SourceError::Decode(format!("expected `data` to be a list, got {other}")))
            }
        },
        Value::Null => Ok(Vec::new()),
        other => Err(SourceError::Decode(format!("expected a list payload, got {other}"))),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SourceError> {
    serde_json::from_value(value).map_err(|error| SourceError::Decode(error.to_string()))
}

fn transport(error: reqwest::Error) -> SourceError {
    SourceError::Transport(error.to_string())
}

/// Quote-source REST client bound to one tenant's base URL.
#[derive(Clone)]
pub struct SimproClient {
    http: Client,
    base_url: String,
    access_token: SecretString,
}

impl SimproClient {
    pub fn new(http: Client, base_url: &str, access_token: SecretString) -> Self {
        Self { http, base_url: normalize_url(base_url), access_token }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, SourceError> {
        let url = self.endpoint(path);
        debug!(event_name = "simpro.request", url = %url, "requesting quote source");

        let response = self
            .http
            .get(&url)
            .query(params)
            .bearer_auth(self.access_token.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "simpro.request.failed",
                url = %url,
                status = status.as_u16(),
                "quote source returned an error status"
            );
            return Err(SourceError::Http { status: status.as_u16(), body });
        }

        response.json::<Value>().await.map_err(|error| SourceError::Decode(error.to_string()))
    }

    async fn quote_detail(
        &self,
        company_id: CompanyId,
        quote_id: QuoteId,
    ) -> Result<Quote, SourceError> {
        let path = format!("/companies/{company_id}/quotes/{quote_id}");
        let payload = self.get_json(&path, &[]).await?;
        decode(payload)
    }
}

#[async_trait]
impl QuoteSource for SimproClient {
    async fn list_companies(&self) -> Result<Vec<Company>, SourceError> {
        let payload = self.get_json("/companies/", &[]).await?;
        unwrap_list(payload)?.into_iter().map(decode::<Company>).collect()
    }

    async fn list_quotes_with_details(
        &self,
        company_id: CompanyId,
        query: &QuoteQuery,
    ) -> Result<Vec<Quote>, SourceError> {
        let payload = self
            .get_json(&format!("/companies/{company_id}/quotes/"), &quote_list_params(query))
            .await?;
        let listed: Vec<Quote> =
            unwrap_list(payload)?.into_iter().map(decode::<Quote>).collect::<Result<_, _>>()?;
        info!(
            event_name = "simpro.quotes.listed",
            company_id = %company_id,
            count = listed.len(),
            "listed quotes, fetching details"
        );

        let mut detailed = Vec::with_capacity(listed.len());
        for entry in listed {
            match self.quote_detail(company_id, entry.id).await {
                Ok(quote) => detailed.push(quote),
                Err(error) => {
                    warn!(
                        event_name = "simpro.quote.detail_fallback",
                        quote_id = %entry.id,
                        error = %error,
                        "detail fetch failed; using list entry"
                    );
                    detailed.push(entry);
                }
            }
        }

        Ok(detailed)
    }
}

/// Builds [`SimproClient`]s sharing one connection pool and access token.
#[derive(Clone)]
pub struct SimproSourceFactory {
    http: Client,
    access_token: SecretString,
}

impl SimproSourceFactory {
    pub fn new(access_token: SecretString, timeout: Duration) -> Result<Self, SourceError> {
        let http = Client::builder().timeout(timeout).build().map_err(transport)?;
        Ok(Self { http, access_token })
    }

    pub fn from_config(config: &SimproConfig) -> Result<Self, SourceError> {
        Self::new(config.access_token.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn client(&self, base_url: &str) -> SimproClient {
        SimproClient::new(self.http.clone(), base_url, self.access_token.clone())
    }
}

impl QuoteSourceFactory for SimproSourceFactory {
    fn connect(&self, base_url: &str) -> Arc<dyn QuoteSource> {
        Arc::new(self.client(base_url))
    }
}

#[cfg(test)]
mod tests {
    use quotebridge_core::domain::company::CompanyId;
    use quotebridge_core::sync::ports::{QuoteQuery, SourceError};
    use reqwest::Client;
    use serde_json::json;

    use super::{normalize_url, quote_list_params, unwrap_list, SimproClient};

    #[test]
    fn trailing_slashes_are_stripped_and_api_prefix_appended() {
        assert_eq!(normalize_url("https://acme.simprosuite.com///"), "https://acme.simprosuite.com");
        assert_eq!(normalize_url(" https://acme.simprosuite.com "), "https://acme.simprosuite.com");

        let client =
            SimproClient::new(Client::new(), "https://acme.simprosuite.com/", "token".to_string().into());
        assert_eq!(
            client.endpoint(&format!("/companies/{}/quotes/", CompanyId(0))),
            "https://acme.simprosuite.com/api/v1.0/companies/0/quotes/"
        );
    }

    #[test]
    fn default_query_requests_open_quotes_only() {
        assert_eq!(quote_list_params(&QuoteQuery::default()), vec![("IsClosed", "false".to_string())]);

        let query = QuoteQuery {
            active_only: false,
            stage: Some("InProgress".to_string()),
            status: Some(String::new()),
        };
        assert_eq!(quote_list_params(&query), vec![("Stage", "InProgress".to_string())]);
    }

    #[test]
    fn list_payload_may_be_bare_or_wrapped() {
        let bare = unwrap_list(json!([{ "ID": 1 }, { "ID": 2 }])).expect("bare list");
        let wrapped = unwrap_list(json!({ "data": [{ "ID": 3 }] })).expect("wrapped list");
        let empty = unwrap_list(json!({})).expect("object without data");

        assert_eq!(bare.len(), 2);
        assert_eq!(wrapped[0]["ID"], 3);
        assert!(empty.is_empty());
        assert!(matches!(unwrap_list(json!("nope")), Err(SourceError::Decode(_))));
    }

    #[test]
    fn unauthorized_error_names_the_token() {
        assert!(SourceError::Unauthorized.to_string().contains("access token"));
    }
}
