use serde::{Deserialize, Serialize};

use crate::domain::non_empty;

source_id!(CompanyId);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Company {
    #[serde(rename = "ID")]
    pub id: CompanyId,
    pub name: Option<String>,
}

impl Company {
    /// Name shown to operators, falling back to the numeric id.
    pub fn display_name(&self) -> String {
        non_empty(self.name.as_ref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Company ID {}", self.id))
    }
}
