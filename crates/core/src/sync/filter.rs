use serde::Serialize;

use crate::domain::quote::Quote;

pub const DEFAULT_VALID_STAGES: &[&str] = &["Complete", "Approved"];

pub const DEFAULT_ACTIVE_STATUSES: &[&str] = &[
    "Quote: To Be Assigned",
    "Quote: To Be Scheduled",
    "Quote: To Write",
    "Quote: Visit Scheduled",
    "Quote: In Progress",
    "Quote: Won",
    "Quote: On Hold",
    "Quote: Quote Due Date Reached",
];

/// Stage/status whitelist deciding which quotes represent active work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFilter {
    pub valid_stages: Vec<String>,
    pub active_statuses: Vec<String>,
}

impl Default for QuoteFilter {
    fn default() -> Self {
        Self {
            valid_stages: DEFAULT_VALID_STAGES.iter().map(|stage| stage.to_string()).collect(),
            active_statuses: DEFAULT_ACTIVE_STATUSES
                .iter()
                .map(|status| status.to_string())
                .collect(),
        }
    }
}

impl QuoteFilter {
    pub fn new(valid_stages: Vec<String>, active_statuses: Vec<String>) -> Self {
        Self { valid_stages, active_statuses }
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        let stage_ok = quote
            .stage()
            .is_some_and(|stage| self.valid_stages.iter().any(|valid| valid == stage));
        let status_ok = quote
            .status_name()
            .is_some_and(|status| self.active_statuses.iter().any(|active| active == status));
        stage_ok && status_ok
    }

    /// Matching quotes in input order.
    pub fn apply<'a>(&self, quotes: &'a [Quote]) -> Vec<&'a Quote> {
        quotes
            .iter()
            .filter(|quote| {
                let keep = self.matches(quote);
                tracing::debug!(
                    event_name = "sync.filter.evaluated",
                    quote_id = %quote.id,
                    stage = quote.stage().unwrap_or("<none>"),
                    status = quote.status_name().unwrap_or("<none>"),
                    keep,
                    "quote evaluated against stage/status whitelist"
                );
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::QuoteFilter;
    use crate::domain::quote::{Quote, QuoteId, QuoteStatus};

    fn quote(id: i64, stage: Option<&str>, status: Option<&str>) -> Quote {
        Quote {
            id: QuoteId(id),
            stage: stage.map(str::to_string),
            status: status.map(|name| QuoteStatus { name: Some(name.to_string()) }),
            ..Quote::default()
        }
    }

    #[test]
    fn keeps_quotes_whose_stage_and_status_are_both_whitelisted() {
        let filter = QuoteFilter::default();
        let quotes = vec![
            quote(1, Some("Complete"), Some("Quote: Won")),
            quote(2, Some("Draft"), Some("Quote: Won")),
            quote(3, Some("Approved"), Some("Quote: Archived")),
            quote(4, Some("Approved"), Some("Quote: On Hold")),
        ];

        let kept: Vec<i64> = filter.apply(&quotes).iter().map(|quote| quote.id.0).collect();
        assert_eq!(kept, vec![1, 4]);
    }

    #[test]
    fn missing_status_object_is_never_active() {
        let filter = QuoteFilter::default();
        let mut without_name = quote(2, Some("Complete"), None);
        without_name.status = Some(QuoteStatus { name: None });

        assert!(!filter.matches(&quote(1, Some("Complete"), None)));
        assert!(!filter.matches(&without_name));
        assert!(!filter.matches(&quote(3, None, Some("Quote: Won"))));
    }

    #[test]
    fn whitelists_are_configurable_and_case_sensitive() {
        let filter = QuoteFilter::new(vec!["Draft".to_string()], vec!["Pending".to_string()]);

        assert!(filter.matches(&quote(1, Some("Draft"), Some("Pending"))));
        assert!(!filter.matches(&quote(2, Some("draft"), Some("Pending"))));
        assert!(!filter.matches(&quote(3, Some("Complete"), Some("Quote: Won"))));
    }

    #[test]
    fn defaults_cover_both_stages_and_all_active_statuses() {
        let filter = QuoteFilter::default();
        assert_eq!(filter.valid_stages, vec!["Complete", "Approved"]);
        assert_eq!(filter.active_statuses.len(), 8);
        assert!(filter.active_statuses.iter().all(|status| status.starts_with("Quote: ")));
    }
}
