//! In-memory stand-in for the board API's GraphQL endpoint.
//!
//! Serves `POST /v2` with `{"query": "..."}` bodies and answers the item
//! list, user list and the create/update/delete mutations the board client
//! emits. Errors use the API's envelope (`error_code`, `error_message`,
//! `status_code`) with HTTP 200, as the real service does.

pub mod board;
pub mod document;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub use board::{Board, BoardError, User};
use document::Operation;

#[derive(Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
}

#[derive(Clone)]
pub struct AppState {
    board: Arc<RwLock<Board>>,
    token: Option<Arc<str>>,
}

pub fn app() -> Router {
    app_with(Board::sample(), None)
}

/// Router over `board`; when `token` is set, requests must send it in the
/// `authorization` header.
pub fn app_with(board: Board, token: Option<&str>) -> Router {
    let state = AppState {
        board: Arc::new(RwLock::new(board)),
        token: token.map(Arc::from),
    };
    Router::new()
        .route("/v2", post(graphql))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, board: Board, token: Option<&str>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(board, token)).await
}

async fn graphql(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GraphQlRequest>,
) -> (StatusCode, Json<Value>) {
    if let Some(expected) = &state.token {
        let sent = headers.get("authorization").and_then(|v| v.to_str().ok());
        if sent != Some(expected.as_ref()) {
            tracing::debug!("rejecting request with missing or wrong token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "errors": [{ "message": "Not Authenticated" }] })),
            );
        }
    }

    let operation = match document::parse(&request.query) {
        Ok(operation) => operation,
        Err(message) => {
            tracing::debug!(%message, "unsupported document");
            return (
                StatusCode::OK,
                Json(json!({ "errors": [{ "message": message, "extensions": { "code": "GRAPHQL_PARSE_FAILED" } }] })),
            );
        }
    };
    tracing::debug!(?operation, "handling operation");

    let result = execute(&state.board, operation).await;
    let body = match result {
        Ok(data) => json!({ "data": data, "account_id": 1 }),
        Err(e) => json!({
            "error_code": e.code(),
            "error_message": e.message(),
            "status_code": 200,
        }),
    };
    (StatusCode::OK, Json(body))
}

async fn execute(board: &RwLock<Board>, operation: Operation) -> Result<Value, BoardError> {
    match operation {
        Operation::ListItems { board_id } => {
            let board = board.read().await;
            if board.check_board(&board_id).is_err() {
                return Ok(json!({ "boards": [] }));
            }
            Ok(json!({ "boards": [{ "items_page": { "items": board.items_json() } }] }))
        }
        Operation::ListUsers => Ok(json!({ "users": board.read().await.users() })),
        Operation::CreateItem {
            board_id,
            group_id,
            item_name,
            column_values,
        } => {
            let id = board
                .write()
                .await
                .create_item(&board_id, &group_id, &item_name, &column_values)?;
            Ok(json!({ "create_item": { "id": id.to_string() } }))
        }
        Operation::ChangeColumnValues {
            board_id,
            item_id,
            column_values,
        } => {
            let id = board
                .write()
                .await
                .change_column_values(&board_id, &item_id, &column_values)?;
            Ok(json!({ "change_multiple_column_values": { "id": id.to_string() } }))
        }
        Operation::DeleteItem { item_id } => {
            let id = board.write().await.delete_item(&item_id)?;
            Ok(json!({ "delete_item": { "id": id.to_string() } }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_request_requires_query() {
        let result: Result<GraphQlRequest, _> = serde_json::from_str(r#"{"variables":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn user_serializes_to_json() {
        let user = User {
            id: "1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn list_items_for_other_board_is_empty() {
        let board = RwLock::new(Board::sample());
        let data = execute(
            &board,
            Operation::ListItems {
                board_id: "999".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(data, json!({ "boards": [] }));
    }
}
