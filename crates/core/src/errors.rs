use thiserror::Error;

use crate::domain::company::CompanyId;
use crate::sync::ports::{CrmError, SourceError};

/// Faults that end a sync run before any CRM write.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("failed to list companies: {0}")]
    ListCompanies(#[source] SourceError),
    #[error("No companies found")]
    NoCompanies,
    #[error("failed to list quotes for company {company_id}: {source}")]
    ListQuotes { company_id: CompanyId, source: SourceError },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("bad gateway: {message}")]
    BadGateway { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn bad_request(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into(), correlation_id: correlation_id.into() }
    }

    /// Detail text for the response body.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::BadGateway { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::BadGateway { correlation_id, .. } => correlation_id,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        match &mut self {
            Self::BadRequest { correlation_id: id, .. }
            | Self::BadGateway { correlation_id: id, .. } => *id = correlation_id,
        }
        self
    }
}

impl SyncError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        InterfaceError::from(self).with_correlation_id(correlation_id.into())
    }
}

impl From<SyncError> for InterfaceError {
    fn from(value: SyncError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            SyncError::NoCompanies => Self::BadRequest { message, correlation_id },
            SyncError::ListCompanies(_) | SyncError::ListQuotes { .. } => {
                Self::BadGateway { message, correlation_id }
            }
        }
    }
}

impl From<SourceError> for InterfaceError {
    fn from(value: SourceError) -> Self {
        Self::BadGateway { message: value.to_string(), correlation_id: "unassigned".to_owned() }
    }
}

impl From<CrmError> for InterfaceError {
    fn from(value: CrmError) -> Self {
        Self::BadGateway { message: value.to_string(), correlation_id: "unassigned".to_owned() }
    }
}
