use indexmap::IndexMap;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::contact::{Contact, ContactKey, ContactKind};
use crate::domain::crm::{BoardId, FieldValues};
use crate::domain::outcome::ContactOutcome;
use crate::sync::accounts::AccountLinks;
use crate::sync::columns::ContactColumns;
use crate::sync::ports::CrmClient;
use crate::sync::StageResult;

pub struct ContactSync<'a> {
    pub crm: &'a dyn CrmClient,
    pub board: &'a BoardId,
    pub columns: &'a ContactColumns,
    pub correlation_id: &'a str,
}

impl ContactSync<'_> {
    /// Creates contacts whose owning customer already has a CRM account.
    ///
    /// Contacts without a linked account are skipped: they appear in neither
    /// the success nor the failure list, only in the skip count.
    pub async fn run(
        &self,
        contacts: &IndexMap<ContactKey, Contact>,
        links: &AccountLinks,
    ) -> StageResult<ContactOutcome> {
        let mut result = StageResult::with_capacity(contacts.len());

        for (key, contact) in contacts {
            let contact_name = contact.display_name();
            let linked = contact.customer_id.and_then(|customer_id| links.account_for(customer_id));
            if linked.is_none() {
                debug!(
                    event_name = "sync.contact.skipped",
                    correlation_id = self.correlation_id,
                    contact_key = %key,
                    contact_name = %contact_name,
                    "skipping contact without a linked account"
                );
                result.skipped += 1;
                continue;
            }

            let fields = self.fields_for(contact, &contact_name);
            match self.crm.create_item(self.board, &contact_name, &fields).await {
                Ok(contact_id) => {
                    info!(
                        event_name = "sync.contact.created",
                        correlation_id = self.correlation_id,
                        contact_key = %key,
                        crm_contact_id = %contact_id,
                        contact_kind = contact.kind.as_str(),
                        "created CRM contact"
                    );
                    result.outcomes.push(ContactOutcome {
                        source_contact_id: contact.id,
                        crm_contact_id: Some(contact_id),
                        contact_name,
                        company_name: contact.company_name.clone(),
                        kind: contact.kind,
                        success: true,
                        error: None,
                    });
                }
                Err(error) => {
                    warn!(
                        event_name = "sync.contact.failed",
                        correlation_id = self.correlation_id,
                        contact_key = %key,
                        error = %error,
                        "failed to create CRM contact"
                    );
                    result.outcomes.push(ContactOutcome {
                        source_contact_id: contact.id,
                        crm_contact_id: None,
                        contact_name,
                        company_name: contact.company_name.clone(),
                        kind: contact.kind,
                        success: false,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        result
    }

    fn fields_for(&self, contact: &Contact, contact_name: &str) -> FieldValues {
        let site_name = match contact.kind {
            ContactKind::Site => contact.site_name.clone().unwrap_or_default(),
            ContactKind::Customer => String::new(),
        };

        let mut fields = FieldValues::new();
        fields.insert(self.columns.name.clone(), json!(contact_name));
        fields.insert(self.columns.company.clone(), json!(contact.company_name));
        fields.insert(self.columns.kind.clone(), json!(contact.kind.as_str()));
        fields.insert(self.columns.site.clone(), json!(site_name));
        fields
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::ContactSync;
    use crate::domain::contact::{Contact, ContactKey, ContactKind};
    use crate::domain::crm::{BoardId, ItemId};
    use crate::domain::customer::CustomerId;
    use crate::domain::quote::ContactId;
    use crate::fixtures::RecordingCrm;
    use crate::sync::accounts::AccountLinks;
    use crate::sync::columns::ContactColumns;

    fn contact(kind: ContactKind, owner: i64, id: i64, customer: i64) -> (ContactKey, Contact) {
        (
            ContactKey { kind, owner: Some(owner), contact: Some(ContactId(id)) },
            Contact {
                id: Some(ContactId(id)),
                customer_id: Some(CustomerId(customer)),
                given_name: " Grace".to_string(),
                family_name: "Hopper ".to_string(),
                kind,
                company_name: Some(format!("Company {customer}")),
                site_name: (kind == ContactKind::Site).then(|| "Depot".to_string()),
            },
        )
    }

    #[tokio::test]
    async fn creates_linked_contacts_and_skips_orphans() {
        let crm = RecordingCrm::default();
        let board = BoardId::new("200");
        let columns = ContactColumns::default();
        let mut links = AccountLinks::default();
        links.link(CustomerId(9), ItemId("acct-9".to_string()));

        let contacts: IndexMap<_, _> = [
            contact(ContactKind::Customer, 9, 5, 9),
            contact(ContactKind::Site, 3, 6, 9),
            contact(ContactKind::Customer, 11, 7, 11),
        ]
        .into_iter()
        .collect();

        let sync =
            ContactSync { crm: &crm, board: &board, columns: &columns, correlation_id: "test" };
        let result = sync.run(&contacts, &links).await;

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.skipped, 1);
        assert!(result.outcomes.iter().all(|outcome| outcome.success));

        let calls = crm.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].item_name, "Grace Hopper");
        assert_eq!(calls[0].fields["text4"], "customer");
        assert_eq!(calls[0].fields["long_text"], "");
        assert_eq!(calls[1].fields["text4"], "site");
        assert_eq!(calls[1].fields["long_text"], "Depot");
        assert_eq!(calls[1].fields["text8"], "Company 9");
    }

    #[tokio::test]
    async fn failed_contact_is_reported_not_skipped() {
        let crm = RecordingCrm::default().failing_on("Grace Hopper");
        let board = BoardId::new("200");
        let columns = ContactColumns::default();
        let mut links = AccountLinks::default();
        links.link(CustomerId(9), ItemId("acct-9".to_string()));

        let contacts: IndexMap<_, _> = [contact(ContactKind::Customer, 9, 5, 9)].into_iter().collect();

        let sync =
            ContactSync { crm: &crm, board: &board, columns: &columns, correlation_id: "test" };
        let result = sync.run(&contacts, &links).await;

        assert_eq!(result.skipped, 0);
        assert_eq!(result.outcomes.len(), 1);
        assert!(!result.outcomes[0].success);
        assert!(result.outcomes[0].error.is_some());
    }
}
