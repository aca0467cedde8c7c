use serde::Serialize;

use crate::domain::outcome::{AccountOutcome, ContactOutcome, DealOutcome, SyncOutcome};
use crate::sync::filter::QuoteFilter;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryReport<T> {
    pub created: usize,
    pub total: usize,
    pub results: Vec<T>,
}

impl<T: SyncOutcome> CategoryReport<T> {
    pub fn from_outcomes(results: Vec<T>) -> Self {
        let created = results.iter().filter(|outcome| outcome.succeeded()).count();
        Self { created, total: results.len(), results }
    }

    pub fn failed(&self) -> usize {
        self.total - self.created
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSummary {
    pub total_quotes: usize,
    pub filtered_quotes: usize,
    pub valid_stages: Vec<String>,
    pub active_statuses: Vec<String>,
}

impl FilterSummary {
    pub fn new(filter: &QuoteFilter, total_quotes: usize, filtered_quotes: usize) -> Self {
        Self {
            total_quotes,
            filtered_quotes,
            valid_stages: filter.valid_stages.clone(),
            active_statuses: filter.active_statuses.clone(),
        }
    }
}

/// Contacts and deals left out because their customer has no CRM account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SkipSummary {
    pub contacts: usize,
    pub deals: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletedSync {
    pub filtering: FilterSummary,
    pub accounts: CategoryReport<AccountOutcome>,
    pub contacts: CategoryReport<ContactOutcome>,
    pub deals: CategoryReport<DealOutcome>,
    pub skipped: SkipSummary,
    pub company_used: String,
}

/// Result of a run that reached the quote listing.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncReport {
    NoQuotes { company_used: String },
    NothingMatched { filtering: FilterSummary, company_used: String },
    Completed(Box<CompletedSync>),
}

impl SyncReport {
    pub fn message(&self) -> String {
        match self {
            Self::NoQuotes { .. } => "No quotes found".to_string(),
            Self::NothingMatched { filtering, .. } => format!(
                "No quotes found with {} stages and active statuses",
                filtering.valid_stages.join("/")
            ),
            Self::Completed(sync) => format!(
                "Created {} accounts, {} contacts, and {} deals from {} active quotes",
                sync.accounts.created,
                sync.contacts.created,
                sync.deals.created,
                sync.filtering.filtered_quotes
            ),
        }
    }

    pub fn into_response(self, run_id: impl Into<String>) -> SyncResponse {
        let message = self.message();
        let mut response = SyncResponse {
            success: true,
            message,
            synced: None,
            filtering: None,
            accounts: None,
            contacts: None,
            deals: None,
            skipped: None,
            company_used: None,
            run_id: run_id.into(),
        };

        match self {
            Self::NoQuotes { company_used } => {
                response.synced = Some(0);
                response.company_used = Some(company_used);
            }
            Self::NothingMatched { filtering, company_used } => {
                response.synced = Some(0);
                response.filtering = Some(filtering);
                response.company_used = Some(company_used);
            }
            Self::Completed(sync) => {
                let sync = *sync;
                response.filtering = Some(sync.filtering);
                response.accounts = Some(sync.accounts);
                response.contacts = Some(sync.contacts);
                response.deals = Some(sync.deals);
                response.skipped = Some(sync.skipped);
                response.company_used = Some(sync.company_used);
            }
        }

        response
    }
}

/// Wire shape returned to callers of the sync entry point.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtering: Option<FilterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<CategoryReport<AccountOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<CategoryReport<ContactOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deals: Option<CategoryReport<DealOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_used: Option<String>,
    pub run_id: String,
}

#[cfg(test)]
mod tests {
    use super::{CategoryReport, FilterSummary, SkipSummary, SyncReport};
    use crate::domain::crm::ItemId;
    use crate::domain::customer::CustomerId;
    use crate::domain::outcome::AccountOutcome;
    use crate::sync::filter::QuoteFilter;
    use crate::sync::report::CompletedSync;

    fn account(id: i64, success: bool) -> AccountOutcome {
        AccountOutcome {
            source_customer_id: CustomerId(id),
            crm_account_id: success.then(|| ItemId(format!("acct-{id}"))),
            customer_name: format!("Customer {id}"),
            success,
            error: (!success).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn created_counts_only_successes_and_never_exceeds_total() {
        let report =
            CategoryReport::from_outcomes(vec![account(1, true), account(2, false), account(3, true)]);

        assert_eq!(report.created, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn nothing_matched_response_reports_zero_synced_with_filtering() {
        let filtering = FilterSummary::new(&QuoteFilter::default(), 4, 0);
        let response = SyncReport::NothingMatched { filtering, company_used: "Acme".to_string() }
            .into_response("run-1");

        let json = serde_json::to_value(&response).expect("serialize response");
        assert_eq!(json["success"], true);
        assert_eq!(json["synced"], 0);
        assert_eq!(
            json["message"],
            "No quotes found with Complete/Approved stages and active statuses"
        );
        assert_eq!(json["filtering"]["totalQuotes"], 4);
        assert_eq!(json["filtering"]["filteredQuotes"], 0);
        assert!(json.get("accounts").is_none());
    }

    #[test]
    fn completed_response_carries_category_blocks_and_summary() {
        let completed = CompletedSync {
            filtering: FilterSummary::new(&QuoteFilter::default(), 3, 2),
            accounts: CategoryReport::from_outcomes(vec![account(1, true), account(2, false)]),
            contacts: CategoryReport::from_outcomes(Vec::new()),
            deals: CategoryReport::from_outcomes(Vec::new()),
            skipped: SkipSummary { contacts: 1, deals: 1 },
            company_used: "Company ID 0".to_string(),
        };

        let response = SyncReport::Completed(Box::new(completed)).into_response("run-2");
        let json = serde_json::to_value(&response).expect("serialize response");

        assert_eq!(json["message"], "Created 1 accounts, 0 contacts, and 0 deals from 2 active quotes");
        assert_eq!(json["accounts"]["created"], 1);
        assert_eq!(json["accounts"]["total"], 2);
        assert_eq!(json["accounts"]["results"][1]["success"], false);
        assert_eq!(json["accounts"]["results"][1]["error"], "boom");
        assert_eq!(json["accounts"]["results"][0]["crmAccountId"], "acct-1");
        assert_eq!(json["skipped"]["deals"], 1);
        assert_eq!(json["companyUsed"], "Company ID 0");
        assert_eq!(json["runId"], "run-2");
        assert!(json.get("synced").is_none());
    }
}
