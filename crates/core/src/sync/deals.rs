use std::sync::OnceLock;

use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::crm::{BoardId, FieldValues};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::non_empty;
use crate::domain::outcome::DealOutcome;
use crate::domain::quote::Quote;
use crate::sync::accounts::AccountLinks;
use crate::sync::columns::DealColumns;
use crate::sync::ports::CrmClient;
use crate::sync::StageResult;

pub const FALLBACK_DESCRIPTION: &str = "Service";
pub const FALLBACK_STAGE: &str = "Quote: To Be Assigned";
const DESCRIPTION_LIMIT: usize = 50;

static MARKUP_TAG: OnceLock<Regex> = OnceLock::new();

fn markup_tag() -> &'static Regex {
    MARKUP_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("markup tag pattern is valid"))
}

/// Presentation fields derived from one quote before it is written as a deal.
#[derive(Clone, Debug, PartialEq)]
pub struct DealDraft {
    pub name: String,
    pub value: Decimal,
    pub stage: String,
    pub salesperson: String,
    pub date_issued: String,
    pub due_date: String,
    pub site_name: String,
}

impl DealDraft {
    pub fn from_quote(quote: &Quote, today: NaiveDate) -> Self {
        let description = non_empty(quote.name.as_ref())
            .map(str::to_string)
            .or_else(|| quote.description.as_deref().and_then(clean_description))
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string());

        let date_issued = non_empty(quote.date_issued.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());
        let due_date = non_empty(quote.due_date.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| date_issued.clone());

        Self {
            name: format!("Quote #{} - {description}", quote.id),
            value: quote.ex_tax_total().unwrap_or(Decimal::ZERO),
            stage: quote
                .status_name()
                .filter(|status| !status.is_empty())
                .unwrap_or(FALLBACK_STAGE)
                .to_string(),
            salesperson: quote.salesperson_name().unwrap_or_default().to_string(),
            date_issued,
            due_date,
            site_name: quote.site_name().unwrap_or_default().to_string(),
        }
    }
}

/// Strips markup tags, collapses whitespace, and truncates to 50 characters.
///
/// Returns `None` when nothing readable is left.
pub fn clean_description(raw: &str) -> Option<String> {
    let without_tags = markup_tag().replace_all(raw, "");
    let collapsed = without_tags.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    if collapsed.chars().count() > DESCRIPTION_LIMIT {
        let truncated: String = collapsed.chars().take(DESCRIPTION_LIMIT).collect();
        return Some(format!("{truncated}..."));
    }
    Some(collapsed)
}

pub struct DealSync<'a> {
    pub crm: &'a dyn CrmClient,
    pub board: &'a BoardId,
    pub columns: &'a DealColumns,
    pub today: NaiveDate,
    pub correlation_id: &'a str,
}

impl DealSync<'_> {
    /// Creates one deal per filtered quote whose customer has a CRM account.
    pub async fn run(
        &self,
        quotes: &[&Quote],
        customers: &IndexMap<CustomerId, Customer>,
        links: &AccountLinks,
    ) -> StageResult<DealOutcome> {
        let mut result = StageResult::with_capacity(quotes.len());

        for quote in quotes {
            let customer = quote
                .customer_id()
                .filter(|customer_id| links.account_for(*customer_id).is_some())
                .and_then(|customer_id| customers.get(&customer_id));
            let Some(customer) = customer else {
                debug!(
                    event_name = "sync.deal.skipped",
                    correlation_id = self.correlation_id,
                    quote_id = %quote.id,
                    "skipping quote without a linked account"
                );
                result.skipped += 1;
                continue;
            };

            let draft = DealDraft::from_quote(quote, self.today);
            let fields = self.fields_for(&draft, customer);
            let created = self.crm.create_item(self.board, &draft.name, &fields).await;

            let (crm_deal_id, error) = match created {
                Ok(deal_id) => {
                    info!(
                        event_name = "sync.deal.created",
                        correlation_id = self.correlation_id,
                        quote_id = %quote.id,
                        crm_deal_id = %deal_id,
                        deal_value = %draft.value,
                        stage = %draft.stage,
                        "created CRM deal"
                    );
                    (Some(deal_id), None)
                }
                Err(error) => {
                    warn!(
                        event_name = "sync.deal.failed",
                        correlation_id = self.correlation_id,
                        quote_id = %quote.id,
                        error = %error,
                        "failed to create CRM deal"
                    );
                    (None, Some(error.to_string()))
                }
            };

            result.outcomes.push(DealOutcome {
                source_quote_id: quote.id,
                success: crm_deal_id.is_some(),
                crm_deal_id,
                customer_name: customer.company_name.clone(),
                deal_name: draft.name,
                deal_value: draft.value,
                stage: draft.stage,
                salesperson: draft.salesperson,
                source_stage: quote.stage.clone(),
                source_status: quote.status_name().map(str::to_string),
                error,
            });
        }

        result
    }

    fn fields_for(&self, draft: &DealDraft, customer: &Customer) -> FieldValues {
        let mut fields = FieldValues::new();
        fields.insert(self.columns.name.clone(), json!(draft.name));
        fields.insert(self.columns.value.clone(), json!(draft.value.to_f64().unwrap_or_default()));
        fields.insert(self.columns.stage.clone(), json!({ "label": draft.stage }));
        fields.insert(self.columns.owner.clone(), json!(draft.salesperson));
        fields.insert(self.columns.issued.clone(), json!(draft.date_issued));
        fields.insert(self.columns.due.clone(), json!(draft.due_date));
        fields.insert(self.columns.site.clone(), json!(draft.site_name));
        fields.insert(self.columns.account.clone(), json!(customer.company_name));
        fields
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use rust_decimal::Decimal;

    use super::{clean_description, DealDraft, DealSync};
    use crate::domain::crm::{BoardId, ItemId};
    use crate::domain::customer::{Customer, CustomerId};
    use crate::domain::quote::{
        CustomerRef, Quote, QuoteId, QuoteStatus, QuoteTotal, Salesperson, SiteRef,
    };
    use crate::fixtures::RecordingCrm;
    use crate::sync::accounts::AccountLinks;
    use crate::sync::columns::DealColumns;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).expect("valid date")
    }

    fn quote_for(id: i64, customer: i64) -> Quote {
        Quote {
            id: QuoteId(id),
            stage: Some("Complete".to_string()),
            status: Some(QuoteStatus { name: Some("Quote: Won".to_string()) }),
            customer: Some(CustomerRef {
                id: Some(CustomerId(customer)),
                company_name: Some(format!("Customer {customer}")),
                ..CustomerRef::default()
            }),
            ..Quote::default()
        }
    }

    #[test]
    fn draft_uses_fallbacks_for_sparse_quote() {
        let quote = Quote { id: QuoteId(1), ..Quote::default() };

        let draft = DealDraft::from_quote(&quote, today());

        assert_eq!(draft.name, "Quote #1 - Service");
        assert_eq!(draft.stage, "Quote: To Be Assigned");
        assert_eq!(draft.value, Decimal::ZERO);
        assert_eq!(draft.date_issued, "2024-05-17");
        assert_eq!(draft.due_date, "2024-05-17");
        assert_eq!(draft.salesperson, "");
        assert_eq!(draft.site_name, "");
    }

    #[test]
    fn draft_prefers_quote_name_over_description() {
        let quote = Quote {
            id: QuoteId(7),
            name: Some("Boiler replacement".to_string()),
            description: Some("<p>ignored</p>".to_string()),
            total: Some(QuoteTotal { ex_tax: Some(Decimal::new(199_950, 2)) }),
            salesperson: Some(Salesperson { name: Some("Sam".to_string()) }),
            site: Some(SiteRef { id: None, name: Some("Depot".to_string()) }),
            date_issued: Some("2024-01-02".to_string()),
            ..Quote::default()
        };

        let draft = DealDraft::from_quote(&quote, today());

        assert_eq!(draft.name, "Quote #7 - Boiler replacement");
        assert_eq!(draft.value, Decimal::new(199_950, 2));
        assert_eq!(draft.salesperson, "Sam");
        assert_eq!(draft.site_name, "Depot");
        assert_eq!(draft.date_issued, "2024-01-02");
        assert_eq!(draft.due_date, "2024-01-02");
    }

    #[test]
    fn description_is_stripped_collapsed_and_truncated() {
        assert_eq!(
            clean_description("<p>Replace   <b>two</b>\n valves</p>").as_deref(),
            Some("Replace two valves")
        );
        assert_eq!(clean_description("<br/>  <p></p>"), None);

        let long = format!("<div>{}</div>", "x".repeat(60));
        let cleaned = clean_description(&long).expect("non-empty description");
        assert_eq!(cleaned.chars().count(), 53);
        assert!(cleaned.ends_with("..."));

        let exact = "y".repeat(50);
        assert_eq!(clean_description(&exact).as_deref(), Some(exact.as_str()));
    }

    #[test]
    fn tags_with_attributes_never_reach_the_deal_name() {
        let cleaned = clean_description(r#"<span class="note">Fix</span> <a href="/x">leak</a>"#);
        assert_eq!(cleaned.as_deref(), Some("Fix leak"));
    }

    #[tokio::test]
    async fn one_deal_per_quote_and_unlinked_customers_are_skipped() {
        let crm = RecordingCrm::default();
        let board = BoardId::new("300");
        let columns = DealColumns::default();
        let quotes = [quote_for(1, 9), quote_for(2, 9), quote_for(3, 11), Quote::default()];
        let refs: Vec<&Quote> = quotes.iter().collect();

        let customers: IndexMap<CustomerId, Customer> = [9, 11]
            .into_iter()
            .map(|id| {
                (
                    CustomerId(id),
                    Customer {
                        id: CustomerId(id),
                        company_name: format!("Customer {id}"),
                        given_name: None,
                        family_name: None,
                    },
                )
            })
            .collect();
        let mut links = AccountLinks::default();
        links.link(CustomerId(9), ItemId("acct-9".to_string()));

        let sync = DealSync {
            crm: &crm,
            board: &board,
            columns: &columns,
            today: today(),
            correlation_id: "test",
        };
        let result = sync.run(&refs, &customers, &links).await;

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.skipped, 2);
        assert!(result.outcomes.iter().all(|outcome| outcome.success));
        assert_eq!(result.outcomes[0].source_stage.as_deref(), Some("Complete"));
        assert_eq!(result.outcomes[0].source_status.as_deref(), Some("Quote: Won"));

        let calls = crm.calls();
        assert_eq!(calls[0].item_name, "Quote #1 - Service");
        assert_eq!(calls[0].fields["status"]["label"], "Quote: Won");
        assert_eq!(calls[0].fields["text4"], "Customer 9");
        assert_eq!(calls[0].fields["numbers"], 0.0);
        assert_eq!(calls[1].item_name, "Quote #2 - Service");
    }

    #[tokio::test]
    async fn failed_deal_is_recorded_and_loop_continues() {
        let crm = RecordingCrm::default().failing_on("Quote #1 - Service");
        let board = BoardId::new("300");
        let columns = DealColumns::default();
        let quotes = [quote_for(1, 9), quote_for(2, 9)];
        let refs: Vec<&Quote> = quotes.iter().collect();

        let customers: IndexMap<CustomerId, Customer> = [(
            CustomerId(9),
            Customer {
                id: CustomerId(9),
                company_name: "Acme".to_string(),
                given_name: None,
                family_name: None,
            },
        )]
        .into_iter()
        .collect();
        let mut links = AccountLinks::default();
        links.link(CustomerId(9), ItemId("acct-9".to_string()));

        let sync = DealSync {
            crm: &crm,
            board: &board,
            columns: &columns,
            today: today(),
            correlation_id: "test",
        };
        let result = sync.run(&refs, &customers, &links).await;

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.skipped, 0);
        assert!(!result.outcomes[0].success);
        assert!(result.outcomes[0].crm_deal_id.is_none());
        assert_eq!(
            result.outcomes[0].error.as_deref(),
            Some("CRM API error: could not create item `Quote #1 - Service`")
        );
        assert!(result.outcomes[1].success);
        assert_eq!(crm.calls().len(), 2);
    }
}
