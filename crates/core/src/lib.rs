pub mod config;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod sync;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::company::{Company, CompanyId};
pub use domain::crm::{Board, BoardColumn, BoardId, BoardTargets, FieldValues, ItemId};
pub use domain::outcome::{AccountOutcome, ContactOutcome, DealOutcome};
pub use domain::quote::{Quote, QuoteId};
pub use errors::{InterfaceError, SyncError};
pub use sync::ports::{CrmClient, CrmError, QuoteQuery, QuoteSource, QuoteSourceFactory, SourceError};
pub use sync::report::{SyncReport, SyncResponse};
pub use sync::{SyncPipeline, SyncSettings};
