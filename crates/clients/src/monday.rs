use std::time::Duration;

use async_trait::async_trait;
use quotebridge_core::config::MondayConfig;
use quotebridge_core::domain::crm::{Board, BoardId, FieldValues, ItemId};
use quotebridge_core::sync::ports::{CrmClient, CrmError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const CREATE_ITEM: &str = r#"
mutation createItem($boardId: ID!, $itemName: String!, $columnValues: JSON!) {
  create_item(board_id: $boardId, item_name: $itemName, column_values: $columnValues) {
    id
    name
  }
}
"#;

const LIST_BOARDS: &str = r#"
query {
  boards {
    id
    name
    columns {
      id
      title
      type
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateItemData {
    create_item: CreatedItem,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    id: ItemId,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    #[serde(default)]
    boards: Vec<Board>,
}

/// Variables for the create mutation; column values travel as a JSON string.
pub fn create_item_variables(
    board_id: &BoardId,
    item_name: &str,
    fields: &FieldValues,
) -> Result<Value, CrmError> {
    let column_values =
        serde_json::to_string(fields).map_err(|error| CrmError::Decode(error.to_string()))?;
    Ok(json!({
        "boardId": board_id.as_str(),
        "itemName": item_name,
        "columnValues": column_values,
    }))
}

/// Unpacks a GraphQL reply. Reported errors win over the HTTP status.
fn decode_reply<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, CrmError> {
    let parsed = serde_json::from_str::<GraphQlResponse<T>>(body);
    match parsed {
        Ok(reply) => {
            if let Some(first) = reply.errors.into_iter().next() {
                return Err(CrmError::Api(first.message));
            }
            if !(200..300).contains(&status) {
                return Err(CrmError::Http { status, body: body.to_string() });
            }
            reply.data.ok_or_else(|| CrmError::Decode("response carried no data".to_string()))
        }
        Err(_) if !(200..300).contains(&status) => {
            Err(CrmError::Http { status, body: body.to_string() })
        }
        Err(error) => Err(CrmError::Decode(error.to_string())),
    }
}

/// GraphQL client for the CRM's item API.
#[derive(Clone)]
pub struct MondayClient {
    http: Client,
    endpoint: String,
    api_token: SecretString,
    api_version: String,
}

impl MondayClient {
    pub fn new(config: &MondayConfig) -> Result<Self, CrmError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CrmError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            api_version: config.api_version.clone(),
        })
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, CrmError> {
        debug!(event_name = "monday.request", endpoint = %self.endpoint, "sending CRM query");

        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", self.api_token.expose_secret())
            .header("API-Version", &self.api_version)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|error| CrmError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body =
            response.text().await.map_err(|error| CrmError::Transport(error.to_string()))?;
        decode_reply(status, &body)
    }
}

#[async_trait]
impl CrmClient for MondayClient {
    async fn create_item(
        &self,
        board_id: &BoardId,
        item_name: &str,
        fields: &FieldValues,
    ) -> Result<ItemId, CrmError> {
        let variables = create_item_variables(board_id, item_name, fields)?;
        let data: CreateItemData = self.query(CREATE_ITEM, variables).await?;
        Ok(data.create_item.id)
    }

    async fn list_boards(&self) -> Result<Vec<Board>, CrmError> {
        let data: BoardsData = self.query(LIST_BOARDS, json!({})).await?;
        Ok(data.boards)
    }
}
