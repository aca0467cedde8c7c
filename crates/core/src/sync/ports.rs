//! Seams to the two external systems the reconciliation talks to.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::company::{Company, CompanyId};
use crate::domain::crm::{Board, BoardId, FieldValues, ItemId};
use crate::domain::quote::Quote;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("authentication failed (401); the access token may be expired or invalid")]
    Unauthorized,
    #[error("quote source returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("quote source request failed: {0}")]
    Transport(String),
    #[error("quote source response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error("CRM API error: {0}")]
    Api(String),
    #[error("CRM returned {status}: {body}")]
    Http { status: u16, body: String },
    #[error("CRM request failed: {0}")]
    Transport(String),
    #[error("CRM response could not be decoded: {0}")]
    Decode(String),
}

/// Filters forwarded to the quote listing endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteQuery {
    pub active_only: bool,
    pub stage: Option<String>,
    pub status: Option<String>,
}

impl Default for QuoteQuery {
    fn default() -> Self {
        Self { active_only: true, stage: None, status: None }
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn list_companies(&self) -> Result<Vec<Company>, SourceError>;

    async fn list_quotes_with_details(
        &self,
        company_id: CompanyId,
        query: &QuoteQuery,
    ) -> Result<Vec<Quote>, SourceError>;
}

/// Builds a quote source bound to a caller-supplied base URL.
pub trait QuoteSourceFactory: Send + Sync {
    fn connect(&self, base_url: &str) -> Arc<dyn QuoteSource>;
}

#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn create_item(
        &self,
        board_id: &BoardId,
        item_name: &str,
        fields: &FieldValues,
    ) -> Result<ItemId, CrmError>;

    async fn list_boards(&self) -> Result<Vec<Board>, CrmError>;
}
