//! Quote → CRM reconciliation pipeline.
//!
//! One run walks a single pass:
//! fetch → filter → extract → accounts → contacts/deals → aggregate.
//!
//! Every CRM write is awaited before the next starts. A failed write is
//! recorded against its item and the loop moves on; only a failure to list
//! companies or quotes ends the run early, before any CRM write happens.
//!
//! Runs are not idempotent: nothing checks the CRM for records created by an
//! earlier run, so syncing the same quotes twice creates two sets of items.

pub mod accounts;
pub mod columns;
pub mod connection;
pub mod contacts;
pub mod deals;
pub mod extract;
pub mod filter;
pub mod ports;
pub mod report;

use chrono::{NaiveDate, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::crm::BoardTargets;
use crate::errors::SyncError;
use accounts::AccountSync;
use columns::ColumnLayout;
use contacts::ContactSync;
use deals::DealSync;
use extract::extract_entities;
use filter::QuoteFilter;
use ports::{CrmClient, QuoteQuery, QuoteSource};
use report::{CategoryReport, CompletedSync, FilterSummary, SkipSummary, SyncReport};

pub const DEFAULT_ACCOUNT_INDUSTRY: &str = "Building Services";

/// Outcomes of one create loop plus how many items it left out.
#[derive(Clone, Debug, PartialEq)]
pub struct StageResult<T> {
    pub outcomes: Vec<T>,
    pub skipped: usize,
}

impl<T> StageResult<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { outcomes: Vec::with_capacity(capacity), skipped: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    pub filter: QuoteFilter,
    pub columns: ColumnLayout,
    pub account_industry: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            filter: QuoteFilter::default(),
            columns: ColumnLayout::default(),
            account_industry: DEFAULT_ACCOUNT_INDUSTRY.to_string(),
        }
    }
}

pub struct SyncPipeline<'a> {
    source: &'a dyn QuoteSource,
    crm: &'a dyn CrmClient,
    settings: &'a SyncSettings,
    run_id: String,
}

impl<'a> SyncPipeline<'a> {
    pub fn new(
        source: &'a dyn QuoteSource,
        crm: &'a dyn CrmClient,
        settings: &'a SyncSettings,
    ) -> Self {
        Self { source, crm, settings, run_id: Uuid::new_v4().to_string() }
    }

    /// Correlation id stamped on every log event of this run.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run(&self, targets: &BoardTargets) -> Result<SyncReport, SyncError> {
        self.run_on(targets, Utc::now().date_naive()).await
    }

    /// Runs the pipeline with `today` as the fallback issue date for deals.
    pub async fn run_on(
        &self,
        targets: &BoardTargets,
        today: NaiveDate,
    ) -> Result<SyncReport, SyncError> {
        let correlation_id = self.run_id.as_str();
        info!(
            event_name = "sync.run.start",
            correlation_id,
            accounts_board = %targets.accounts,
            contacts_board = %targets.contacts,
            deals_board = %targets.deals,
            "starting quote sync"
        );

        let companies = self.source.list_companies().await.map_err(|source| {
            error!(
                event_name = "sync.run.companies_failed",
                correlation_id,
                error = %source,
                "could not list companies"
            );
            SyncError::ListCompanies(source)
        })?;
        let Some(company) = companies.into_iter().next() else {
            error!(event_name = "sync.run.no_companies", correlation_id, "no companies available");
            return Err(SyncError::NoCompanies);
        };
        let company_used = company.display_name();
        info!(
            event_name = "sync.run.company_selected",
            correlation_id,
            company_id = %company.id,
            company = %company_used,
            "using first company"
        );

        let quotes = self
            .source
            .list_quotes_with_details(company.id, &QuoteQuery::default())
            .await
            .map_err(|source| {
                error!(
                    event_name = "sync.run.quotes_failed",
                    correlation_id,
                    company_id = %company.id,
                    error = %source,
                    "could not list quotes"
                );
                SyncError::ListQuotes { company_id: company.id, source }
            })?;
        if quotes.is_empty() {
            info!(event_name = "sync.run.no_quotes", correlation_id, "no quotes found");
            return Ok(SyncReport::NoQuotes { company_used });
        }

        let active = self.settings.filter.apply(&quotes);
        let filtering = FilterSummary::new(&self.settings.filter, quotes.len(), active.len());
        info!(
            event_name = "sync.run.filtered",
            correlation_id,
            total_quotes = filtering.total_quotes,
            filtered_quotes = filtering.filtered_quotes,
            "filtered quotes by stage and status"
        );
        if active.is_empty() {
            return Ok(SyncReport::NothingMatched { filtering, company_used });
        }

        let entities = extract_entities(&active);
        let columns = &self.settings.columns;

        let (account_outcomes, links) = AccountSync {
            crm: self.crm,
            board: &targets.accounts,
            columns: &columns.accounts,
            industry: &self.settings.account_industry,
            correlation_id,
        }
        .run(&entities.customers)
        .await;

        let contacts = ContactSync {
            crm: self.crm,
            board: &targets.contacts,
            columns: &columns.contacts,
            correlation_id,
        }
        .run(&entities.contacts, &links)
        .await;

        let deals = DealSync {
            crm: self.crm,
            board: &targets.deals,
            columns: &columns.deals,
            today,
            correlation_id,
        }
        .run(&active, &entities.customers, &links)
        .await;

        let completed = CompletedSync {
            filtering,
            accounts: CategoryReport::from_outcomes(account_outcomes),
            contacts: CategoryReport::from_outcomes(contacts.outcomes),
            deals: CategoryReport::from_outcomes(deals.outcomes),
            skipped: SkipSummary { contacts: contacts.skipped, deals: deals.skipped },
            company_used,
        };
        info!(
            event_name = "sync.run.completed",
            correlation_id,
            accounts_created = completed.accounts.created,
            accounts_failed = completed.accounts.failed(),
            contacts_created = completed.contacts.created,
            contacts_failed = completed.contacts.failed(),
            contacts_skipped = completed.skipped.contacts,
            deals_created = completed.deals.created,
            deals_failed = completed.deals.failed(),
            deals_skipped = completed.skipped.deals,
            "quote sync completed"
        );

        Ok(SyncReport::Completed(Box::new(completed)))
    }
}
