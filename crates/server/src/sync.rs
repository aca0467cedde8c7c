//! HTTP entry points for running a sync and its two supporting lookups.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use quotebridge_core::domain::crm::{Board, BoardId, BoardTargets};
use quotebridge_core::errors::InterfaceError;
use quotebridge_core::sync::connection::{check_connection, ConnectionReport};
use quotebridge_core::sync::ports::{CrmClient, QuoteSourceFactory};
use quotebridge_core::sync::report::SyncResponse;
use quotebridge_core::sync::{SyncPipeline, SyncSettings};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SyncState {
    pub sources: Arc<dyn QuoteSourceFactory>,
    pub crm: Arc<dyn CrmClient>,
    pub settings: Arc<SyncSettings>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncRequest {
    pub simpro_base_url: Option<String>,
    pub accounts_board_id: Option<BoardId>,
    pub contacts_board_id: Option<BoardId>,
    pub deals_board_id: Option<BoardId>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestConnectionRequest {
    pub simpro_base_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BoardsResponse {
    pub success: bool,
    pub boards: Vec<Board>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn present_board(board: Option<BoardId>) -> Option<BoardId> {
    board.filter(|board| !board.is_blank())
}

fn present_url(url: Option<String>) -> Option<String> {
    url.map(|url| url.trim().to_string()).filter(|url| !url.is_empty())
}

impl SyncRequest {
    /// Base URL and boards, or the names of every missing field.
    pub fn into_parts(self) -> Result<(String, BoardTargets), Vec<&'static str>> {
        let base_url = present_url(self.simpro_base_url);
        let accounts = present_board(self.accounts_board_id);
        let contacts = present_board(self.contacts_board_id);
        let deals = present_board(self.deals_board_id);

        match (base_url, accounts, contacts, deals) {
            (Some(base_url), Some(accounts), Some(contacts), Some(deals)) => {
                Ok((base_url, BoardTargets { accounts, contacts, deals }))
            }
            (base_url, accounts, contacts, deals) => {
                let missing = [
                    ("simproBaseUrl", base_url.is_none()),
                    ("accountsBoardId", accounts.is_none()),
                    ("contactsBoardId", contacts.is_none()),
                    ("dealsBoardId", deals.is_none()),
                ];
                Err(missing.into_iter().filter(|(_, absent)| *absent).map(|(name, _)| name).collect())
            }
        }
    }
}

fn reject(interface: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ApiError {
            success: false,
            error: interface.message().to_string(),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

pub fn router(state: SyncState) -> Router {
    Router::new()
        .route("/api/sync-quotes", post(sync_quotes))
        .route("/api/get-boards", get(get_boards))
        .route("/api/test-simpro", post(test_simpro))
        .with_state(state)
}

/// Unwraps a JSON body, answering malformed ones with the usual error shape.
fn parse_body<T>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, (StatusCode, Json<ApiError>)> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "api.request.malformed",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "request body could not be parsed"
        );
        reject(InterfaceError::bad_request(
            format!("Invalid request body: {}", rejection.body_text()),
            correlation_id,
        ))
    })
}

pub async fn sync_quotes(
    State(state): State<SyncState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> ApiResult<SyncResponse> {
    let request = parse_body(payload)?;
    let (base_url, targets) = request.into_parts().map_err(|missing| {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "api.sync.rejected",
            correlation_id = %correlation_id,
            missing = %missing.join(","),
            "sync request is missing required fields"
        );
        reject(InterfaceError::bad_request(
            format!("Missing required fields: {}", missing.join(", ")),
            correlation_id,
        ))
    })?;

    let source = state.sources.connect(&base_url);
    let pipeline = SyncPipeline::new(source.as_ref(), state.crm.as_ref(), &state.settings);
    let run_id = pipeline.run_id().to_string();

    match pipeline.run(&targets).await {
        Ok(report) => Ok(Json(report.into_response(run_id))),
        Err(sync_error) => {
            error!(
                event_name = "api.sync.failed",
                correlation_id = %run_id,
                error = %sync_error,
                "sync run aborted"
            );
            Err(reject(sync_error.into_interface(run_id)))
        }
    }
}

pub async fn get_boards(State(state): State<SyncState>) -> ApiResult<BoardsResponse> {
    match state.crm.list_boards().await {
        Ok(boards) => Ok(Json(BoardsResponse { success: true, boards })),
        Err(crm_error) => {
            let correlation_id = Uuid::new_v4().to_string();
            error!(
                event_name = "api.boards.failed",
                correlation_id = %correlation_id,
                error = %crm_error,
                "could not list CRM boards"
            );
            Err(reject(InterfaceError::from(crm_error).with_correlation_id(correlation_id)))
        }
    }
}

pub async fn test_simpro(
    State(state): State<SyncState>,
    payload: Result<Json<TestConnectionRequest>, JsonRejection>,
) -> ApiResult<ConnectionReport> {
    let request = parse_body(payload)?;
    let Some(base_url) = present_url(request.simpro_base_url) else {
        return Err(reject(InterfaceError::bad_request(
            "SimPro base URL is required",
            Uuid::new_v4().to_string(),
        )));
    };

    let source = state.sources.connect(&base_url);
    Ok(Json(check_connection(source.as_ref()).await))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use quotebridge_core::domain::crm::{Board, BoardId};
    use quotebridge_core::fixtures::{
        active_quote, InMemoryQuoteSource, InMemorySourceFactory, RecordingCrm,
    };
    use quotebridge_core::sync::ports::{CrmError, SourceError};
    use quotebridge_core::sync::SyncSettings;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{
        get_boards, router, sync_quotes, test_simpro, SyncRequest, SyncState,
        TestConnectionRequest,
    };

    fn state_with(
        source: InMemoryQuoteSource,
        crm: RecordingCrm,
    ) -> (SyncState, Arc<InMemorySourceFactory>, Arc<RecordingCrm>) {
        let factory = Arc::new(InMemorySourceFactory::new(source));
        let crm = Arc::new(crm);
        let state = SyncState {
            sources: factory.clone(),
            crm: crm.clone(),
            settings: Arc::new(SyncSettings::default()),
        };
        (state, factory, crm)
    }

    fn full_request() -> SyncRequest {
        SyncRequest {
            simpro_base_url: Some("https://acme.simprosuite.com/".to_string()),
            accounts_board_id: Some(BoardId::new("1")),
            contacts_board_id: Some(BoardId::new("2")),
            deals_board_id: Some(BoardId::new("3")),
        }
    }

    #[tokio::test]
    async fn missing_fields_are_rejected_before_any_external_call() {
        let (state, factory, crm) =
            state_with(InMemoryQuoteSource::with_quotes(Vec::new()), RecordingCrm::default());

        let request = SyncRequest {
            contacts_board_id: Some(BoardId::new("  ")),
            ..full_request()
        };
        let (status, Json(body)) =
            sync_quotes(State(state), Ok(Json(request))).await.expect_err("should reject");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.error, "Missing required fields: contactsBoardId");
        assert!(factory.requested_urls().is_empty());
        assert!(crm.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_sync_returns_report_with_run_id() {
        let (state, factory, crm) = state_with(
            InMemoryQuoteSource::with_quotes(vec![active_quote(1, 9, "Acme")]),
            RecordingCrm::default(),
        );

        let Json(response) =
            sync_quotes(State(state), Ok(Json(full_request()))).await.expect("sync should succeed");

        assert!(response.success);
        assert_eq!(
            response.message,
            "Created 1 accounts, 0 contacts, and 1 deals from 1 active quotes"
        );
        assert_eq!(response.company_used.as_deref(), Some("Northwind Services"));
        assert!(!response.run_id.is_empty());
        assert_eq!(factory.requested_urls(), vec!["https://acme.simprosuite.com/".to_string()]);
        assert_eq!(crm.calls().len(), 2);
    }

    #[tokio::test]
    async fn empty_company_list_is_a_bad_request() {
        let (state, factory, _crm) = state_with(
            InMemoryQuoteSource::with_quotes(Vec::new()).with_companies(Vec::new()),
            RecordingCrm::default(),
        );

        let (status, Json(body)) =
            sync_quotes(State(state), Ok(Json(full_request()))).await.expect_err("should fail");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "No companies found");
        assert_eq!(factory.source().quote_requests(), 0);
    }

    #[tokio::test]
    async fn quote_source_failure_is_a_bad_gateway() {
        let (state, _factory, _crm) = state_with(
            InMemoryQuoteSource::with_quotes(Vec::new()).failing_quotes(SourceError::Unauthorized),
            RecordingCrm::default(),
        );

        let (status, Json(body)) =
            sync_quotes(State(state), Ok(Json(full_request()))).await.expect_err("should fail");

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.error.contains("authentication failed"));
    }

    #[tokio::test]
    async fn boards_are_listed_or_reported_as_upstream_failure() {
        let board = Board { id: BoardId::new("42"), name: "Deals".to_string(), columns: Vec::new() };
        let (state, _, _) = state_with(
            InMemoryQuoteSource::with_quotes(Vec::new()),
            RecordingCrm::default().with_boards(vec![board.clone()]),
        );
        let Json(listed) = get_boards(State(state)).await.expect("boards");
        assert!(listed.success);
        assert_eq!(listed.boards, vec![board]);

        let (state, _, _) = state_with(
            InMemoryQuoteSource::with_quotes(Vec::new()),
            RecordingCrm::default().failing_boards(CrmError::Api("Not Authenticated".to_string())),
        );
        let (status, Json(body)) = get_boards(State(state)).await.expect_err("should fail");
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "CRM API error: Not Authenticated");
        assert!(!body.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn connection_test_requires_base_url() {
        let (state, factory, _) =
            state_with(InMemoryQuoteSource::with_quotes(Vec::new()), RecordingCrm::default());

        let (status, Json(body)) = test_simpro(
            State(state.clone()),
            Ok(Json(TestConnectionRequest { simpro_base_url: None })),
        )
        .await
        .expect_err("should reject");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "SimPro base URL is required");

        let Json(report) = test_simpro(
            State(state),
            Ok(Json(TestConnectionRequest {
                simpro_base_url: Some("https://acme.simprosuite.com".to_string()),
            })),
        )
        .await
        .expect("report");
        assert!(report.success);
        assert_eq!(report.message, "Connection successful. Found 1 companies.");
        assert_eq!(factory.requested_urls().len(), 1);
    }

    #[tokio::test]
    async fn wrong_method_is_rejected_by_router() {
        let (state, _, _) =
            state_with(InMemoryQuoteSource::with_quotes(Vec::new()), RecordingCrm::default());

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/sync-quotes")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn numeric_board_ids_are_accepted_over_http() {
        let (state, _, crm) = state_with(
            InMemoryQuoteSource::with_quotes(vec![active_quote(1, 9, "Acme")]),
            RecordingCrm::default(),
        );
        let body = r#"{"simproBaseUrl":"https://acme.simprosuite.com","accountsBoardId":11,"contactsBoardId":"22","dealsBoardId":33}"#;

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync-quotes")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["success"], true);
        assert_eq!(json["deals"]["created"], 1);
        assert_eq!(crm.calls()[0].board_id, BoardId::new("11"));
        assert_eq!(crm.calls()[1].board_id, BoardId::new("33"));
    }

    #[tokio::test]
    async fn malformed_board_id_gets_json_error_body() {
        let (state, factory, _) =
            state_with(InMemoryQuoteSource::with_quotes(Vec::new()), RecordingCrm::default());
        let body = r#"{"simproBaseUrl":"https://acme.simprosuite.com","accountsBoardId":true,"contactsBoardId":"22","dealsBoardId":"33"}"#;

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sync-quotes")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: Value = serde_json::from_slice(&bytes).expect("error body should be JSON");
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().is_some_and(|error| error.starts_with("Invalid request body:")));
        assert!(json["correlationId"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(factory.requested_urls().is_empty());
    }
}
