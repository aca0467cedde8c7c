//! Per-item results of a sync run, one record per attempted CRM write.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::contact::ContactKind;
use crate::domain::crm::ItemId;
use crate::domain::customer::CustomerId;
use crate::domain::quote::{ContactId, QuoteId};

pub trait SyncOutcome {
    fn succeeded(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOutcome {
    pub source_customer_id: CustomerId,
    pub crm_account_id: Option<ItemId>,
    pub customer_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactOutcome {
    pub source_contact_id: Option<ContactId>,
    pub crm_contact_id: Option<ItemId>,
    pub contact_name: String,
    pub company_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: ContactKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealOutcome {
    pub source_quote_id: QuoteId,
    pub crm_deal_id: Option<ItemId>,
    pub customer_name: String,
    pub deal_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub deal_value: Decimal,
    pub stage: String,
    pub salesperson: String,
    pub source_stage: Option<String>,
    pub source_status: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome for AccountOutcome {
    fn succeeded(&self) -> bool {
        self.success
    }
}

impl SyncOutcome for ContactOutcome {
    fn succeeded(&self) -> bool {
        self.success
    }
}

impl SyncOutcome for DealOutcome {
    fn succeeded(&self) -> bool {
        self.success
    }
}
