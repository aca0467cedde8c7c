use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::non_empty;

source_id!(QuoteId);
source_id!(SiteId);
source_id!(ContactId);

/// A quote as returned by the quote source's detail endpoint.
///
/// Only the fields the reconciliation reads are modelled; everything else in
/// the payload is ignored. Every nested object may be missing or `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Quote {
    #[serde(rename = "ID")]
    pub id: QuoteId,
    pub stage: Option<String>,
    pub status: Option<QuoteStatus>,
    pub customer: Option<CustomerRef>,
    pub customer_contact: Option<PersonRef>,
    pub site: Option<SiteRef>,
    pub site_contact: Option<PersonRef>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub total: Option<QuoteTotal>,
    pub salesperson: Option<Salesperson>,
    pub date_issued: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuoteStatus {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CustomerRef {
    #[serde(rename = "ID")]
    pub id: Option<CustomerId>,
    pub company_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PersonRef {
    #[serde(rename = "ID")]
    pub id: Option<ContactId>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

impl PersonRef {
    pub fn has_name(&self) -> bool {
        non_empty(self.given_name.as_ref()).is_some()
            || non_empty(self.family_name.as_ref()).is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SiteRef {
    #[serde(rename = "ID")]
    pub id: Option<SiteId>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuoteTotal {
    pub ex_tax: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Salesperson {
    pub name: Option<String>,
}

impl Quote {
    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    /// Status name, absent when the status object itself is missing.
    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().and_then(|status| status.name.as_deref())
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer.as_ref().and_then(|customer| customer.id)
    }

    pub fn customer_company(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|customer| non_empty(customer.company_name.as_ref()))
    }

    pub fn site_id(&self) -> Option<SiteId> {
        self.site.as_ref().and_then(|site| site.id)
    }

    pub fn site_name(&self) -> Option<&str> {
        self.site.as_ref().and_then(|site| non_empty(site.name.as_ref()))
    }

    pub fn ex_tax_total(&self) -> Option<Decimal> {
        self.total.as_ref().and_then(|total| total.ex_tax)
    }

    pub fn salesperson_name(&self) -> Option<&str> {
        self.salesperson.as_ref().and_then(|person| non_empty(person.name.as_ref()))
    }
}
