use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::crm::{BoardId, FieldValues, ItemId};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::outcome::AccountOutcome;
use crate::sync::columns::AccountColumns;
use crate::sync::ports::CrmClient;

/// Source customer id → CRM account id for every account created this run.
///
/// Written only by [`AccountSync`]; contacts and deals consult it to decide
/// whether their owning account exists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountLinks {
    links: HashMap<CustomerId, ItemId>,
}

impl AccountLinks {
    pub fn link(&mut self, customer_id: CustomerId, account_id: ItemId) {
        self.links.insert(customer_id, account_id);
    }

    pub fn account_for(&self, customer_id: CustomerId) -> Option<&ItemId> {
        self.links.get(&customer_id)
    }
}

pub struct AccountSync<'a> {
    pub crm: &'a dyn CrmClient,
    pub board: &'a BoardId,
    pub columns: &'a AccountColumns,
    pub industry: &'a str,
    pub correlation_id: &'a str,
}

impl AccountSync<'_> {
    pub async fn run(
        &self,
        customers: &IndexMap<CustomerId, Customer>,
    ) -> (Vec<AccountOutcome>, AccountLinks) {
        let mut outcomes = Vec::with_capacity(customers.len());
        let mut links = AccountLinks::default();

        for (customer_id, customer) in customers {
            let account_name = customer.company_name.clone();
            let fields = self.fields_for(customer);

            match self.crm.create_item(self.board, &account_name, &fields).await {
                Ok(account_id) => {
                    info!(
                        event_name = "sync.account.created",
                        correlation_id = self.correlation_id,
                        customer_id = %customer_id,
                        account_id = %account_id,
                        account_name = %account_name,
                        "created CRM account"
                    );
                    links.link(*customer_id, account_id.clone());
                    outcomes.push(AccountOutcome {
                        source_customer_id: *customer_id,
                        crm_account_id: Some(account_id),
                        customer_name: account_name,
                        success: true,
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(
                        event_name = "sync.account.failed",
                        correlation_id = self.correlation_id,
                        customer_id = %customer_id,
                        account_name = %account_name,
                        error = %error,
                        "failed to create CRM account"
                    );
                    outcomes.push(AccountOutcome {
                        source_customer_id: *customer_id,
                        crm_account_id: None,
                        customer_name: account_name,
                        success: false,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        (outcomes, links)
    }

    fn fields_for(&self, customer: &Customer) -> FieldValues {
        let mut fields = FieldValues::new();
        fields.insert(self.columns.name.clone(), json!(customer.company_name));
        fields.insert(self.columns.industry.clone(), json!(self.industry));
        fields.insert(self.columns.description.clone(), json!(format!("Customer ID: {}", customer.id)));
        fields
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::AccountSync;
    use crate::domain::crm::BoardId;
    use crate::domain::customer::{Customer, CustomerId};
    use crate::fixtures::RecordingCrm;
    use crate::sync::columns::AccountColumns;

    fn customers(entries: &[(i64, &str)]) -> IndexMap<CustomerId, Customer> {
        entries
            .iter()
            .map(|(id, name)| {
                (
                    CustomerId(*id),
                    Customer {
                        id: CustomerId(*id),
                        company_name: name.to_string(),
                        given_name: None,
                        family_name: None,
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn creates_one_account_per_customer_and_links_ids() {
        let crm = RecordingCrm::default();
        let board = BoardId::new("100");
        let columns = AccountColumns::default();
        let sync = AccountSync {
            crm: &crm,
            board: &board,
            columns: &columns,
            industry: "Building Services",
            correlation_id: "test",
        };

        let (outcomes, links) = sync.run(&customers(&[(9, "Acme"), (10, "Globex")])).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.success));
        assert!(links.account_for(CustomerId(10)).is_some());

        let calls = crm.calls();
        assert_eq!(calls[0].board_id, board);
        assert_eq!(calls[0].item_name, "Acme");
        assert_eq!(calls[0].fields["text"], "Acme");
        assert_eq!(calls[0].fields["text8"], "Building Services");
        assert_eq!(calls[0].fields["long_text"], "Customer ID: 9");
        assert_eq!(links.account_for(CustomerId(9)), outcomes[0].crm_account_id.as_ref());
    }

    #[tokio::test]
    async fn failed_account_is_recorded_and_loop_continues() {
        let crm = RecordingCrm::default().failing_on("Acme");
        let board = BoardId::new("100");
        let columns = AccountColumns::default();
        let sync = AccountSync {
            crm: &crm,
            board: &board,
            columns: &columns,
            industry: "Building Services",
            correlation_id: "test",
        };

        let (outcomes, links) = sync.run(&customers(&[(9, "Acme"), (10, "Globex")])).await;

        assert!(!outcomes[0].success);
        assert!(outcomes[0].crm_account_id.is_none());
        assert!(outcomes[0].error.as_deref().is_some_and(|error| error.contains("Acme")));
        assert!(outcomes[1].success);
        assert!(links.account_for(CustomerId(9)).is_none());
        assert!(links.account_for(CustomerId(10)).is_some());
        assert_eq!(crm.calls().len(), 2);
    }
}
