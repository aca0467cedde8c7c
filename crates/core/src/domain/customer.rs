use serde::{Deserialize, Serialize};

source_id!(CustomerId);

/// A customer derived from the first filtered quote that referenced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub company_name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}
