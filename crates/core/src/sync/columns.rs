//! CRM column ids each derived field is written into.
//!
//! Defaults match the column ids of a stock CRM template board; every id can
//! be overridden from the `[columns.*]` config tables.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountColumns {
    pub name: String,
    pub industry: String,
    pub description: String,
}

impl Default for AccountColumns {
    fn default() -> Self {
        Self {
            name: "text".to_string(),
            industry: "text8".to_string(),
            description: "long_text".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactColumns {
    pub name: String,
    pub company: String,
    pub kind: String,
    pub site: String,
}

impl Default for ContactColumns {
    fn default() -> Self {
        Self {
            name: "text".to_string(),
            company: "text8".to_string(),
            kind: "text4".to_string(),
            site: "long_text".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealColumns {
    pub name: String,
    pub value: String,
    pub stage: String,
    pub owner: String,
    pub issued: String,
    pub due: String,
    pub site: String,
    pub account: String,
}

impl Default for DealColumns {
    fn default() -> Self {
        Self {
            name: "text".to_string(),
            value: "numbers".to_string(),
            stage: "status".to_string(),
            owner: "person".to_string(),
            issued: "date".to_string(),
            due: "date4".to_string(),
            site: "text8".to_string(),
            account: "text4".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub accounts: AccountColumns,
    pub contacts: ContactColumns,
    pub deals: DealColumns,
}
