use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::domain::contact::{Contact, ContactKey, ContactKind};
use crate::domain::customer::{Customer, CustomerId};
use crate::domain::quote::{PersonRef, Quote};

/// Unique customers and contacts derived from one run's filtered quotes.
///
/// Both maps keep first-seen order; later quotes never overwrite a record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedEntities {
    pub customers: IndexMap<CustomerId, Customer>,
    pub contacts: IndexMap<ContactKey, Contact>,
}

pub fn extract_entities(quotes: &[&Quote]) -> ExtractedEntities {
    let mut entities = ExtractedEntities::default();

    for quote in quotes {
        let customer = quote.customer.as_ref();
        let customer_id = quote.customer_id();
        let company_name = quote.customer_company().map(str::to_string);

        if let (Some(id), Some(company)) = (customer_id, company_name.as_ref()) {
            entities.customers.entry(id).or_insert_with(|| Customer {
                id,
                company_name: company.clone(),
                given_name: customer.and_then(|customer| customer.given_name.clone()),
                family_name: customer.and_then(|customer| customer.family_name.clone()),
            });
        }

        if let Some(person) = quote.customer_contact.as_ref().filter(|person| person.has_name()) {
            let key = ContactKey {
                kind: ContactKind::Customer,
                owner: customer_id.map(|id| id.0),
                contact: person.id,
            };
            insert_contact(&mut entities.contacts, key, || {
                contact_from(person, quote, ContactKind::Customer, None)
            });
        }

        if let Some(person) = quote.site_contact.as_ref().filter(|person| person.has_name()) {
            let key = ContactKey {
                kind: ContactKind::Site,
                owner: quote.site_id().map(|id| id.0),
                contact: person.id,
            };
            insert_contact(&mut entities.contacts, key, || {
                let site_name = quote.site_name().unwrap_or_default().to_string();
                contact_from(person, quote, ContactKind::Site, Some(site_name))
            });
        }
    }

    tracing::info!(
        event_name = "sync.extract.completed",
        quotes = quotes.len(),
        customers = entities.customers.len(),
        contacts = entities.contacts.len(),
        "extracted unique customers and contacts"
    );

    entities
}

fn insert_contact(
    contacts: &mut IndexMap<ContactKey, Contact>,
    key: ContactKey,
    build: impl FnOnce() -> Contact,
) {
    if let Entry::Vacant(slot) = contacts.entry(key) {
        slot.insert(build());
    }
}

fn contact_from(
    person: &PersonRef,
    quote: &Quote,
    kind: ContactKind,
    site_name: Option<String>,
) -> Contact {
    Contact {
        id: person.id,
        customer_id: quote.customer_id(),
        given_name: person.given_name.clone().unwrap_or_default(),
        family_name: person.family_name.clone().unwrap_or_default(),
        kind,
        company_name: quote.customer_company().map(str::to_string),
        site_name,
    }
}
