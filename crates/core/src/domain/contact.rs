use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::quote::ContactId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Customer,
    Site,
}

impl ContactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Site => "site",
        }
    }
}

impl fmt::Display for ContactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a derived contact: discriminator, owning entity, person.
///
/// Customer contacts are owned by the customer id, site contacts by the site
/// id, so the same person id under both yields two distinct keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContactKey {
    pub kind: ContactKind,
    pub owner: Option<i64>,
    pub contact: Option<ContactId>,
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_", self.kind)?;
        match self.owner {
            Some(owner) => write!(f, "{owner}_")?,
            None => f.write_str("none_")?,
        }
        match self.contact {
            Some(contact) => write!(f, "{contact}"),
            None => f.write_str("none"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Option<ContactId>,
    pub customer_id: Option<CustomerId>,
    pub given_name: String,
    pub family_name: String,
    pub kind: ContactKind,
    pub company_name: Option<String>,
    pub site_name: Option<String>,
}

impl Contact {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name).trim().to_string()
    }
}
