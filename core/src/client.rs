//! Stateless HTTP request builder and response parser for the board API.
//!
//! # Design
//! `BoardClient` holds only the endpoint, token and API version, and carries
//! no mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The caller executes the actual HTTP round-trip, keeping
//! this type deterministic and free of I/O dependencies.
//!
//! The API reports most failures with HTTP 200 and an error envelope
//! (`error_code`, `status_code`, `errors`), so status handling inspects the
//! body as well as the status line.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::column::ColumnValueMap;
use crate::config::BoardConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::mutation;
use crate::types::{Decision, Item, ItemRef, User};

pub const DEFAULT_API_URL: &str = "https://api.monday.com/v2";
pub const DEFAULT_API_VERSION: &str = "2023-10";

/// Error codes the API uses for "over budget, try again later".
const RETRYABLE_CODES: &[&str] = &["ComplexityException", "RateLimitExceeded", "maxConcurrencyExceeded"];

/// Synchronous, stateless client for the board API.
#[derive(Debug, Clone)]
pub struct BoardClient {
    api_url: String,
    api_token: Option<String>,
    api_version: String,
}

impl BoardClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn from_config(config: &BoardConfig) -> Self {
        let client = Self::new(&config.api_url).with_api_version(&config.api_version);
        match &config.api_token {
            Some(token) => client.with_token(token),
            None => client,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_string());
        self
    }

    pub fn with_api_version(mut self, version: &str) -> Self {
        self.api_version = version.to_string();
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Wrap a GraphQL document in a `POST` to the API endpoint.
    pub fn build_query(&self, document: &str) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(&serde_json::json!({ "query": document }))
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut headers = vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("api-version".to_string(), self.api_version.clone()),
        ];
        if let Some(token) = &self.api_token {
            headers.push(("authorization".to_string(), token.clone()));
        }
        Ok(HttpRequest {
            url: self.api_url.clone(),
            headers,
            body,
        })
    }

    pub fn build_list_items(&self, board_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_query(&mutation::board_items(board_id))
    }

    pub fn build_list_users(&self) -> Result<HttpRequest, ApiError> {
        self.build_query(&mutation::account_users())
    }

    pub fn build_create_item(
        &self,
        board_id: &str,
        item_name: &str,
        values: &ColumnValueMap,
    ) -> Result<HttpRequest, ApiError> {
        self.build_query(&mutation::create_item(board_id, item_name, values))
    }

    pub fn build_update_item(
        &self,
        board_id: &str,
        item_id: &str,
        values: &ColumnValueMap,
    ) -> Result<HttpRequest, ApiError> {
        self.build_query(&mutation::change_column_values(board_id, item_id, values))
    }

    pub fn build_delete_item(&self, item_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_query(&mutation::delete_item(item_id))
    }

    pub fn build_status_decision(
        &self,
        board_id: &str,
        item_id: &str,
        decision: Decision,
    ) -> Result<HttpRequest, ApiError> {
        self.build_query(&mutation::status_decision(board_id, item_id, decision))
    }

    /// Items of the first board in the response; no board means no items.
    pub fn parse_list_items(&self, response: HttpResponse) -> Result<Vec<Item>, ApiError> {
        #[derive(Deserialize)]
        struct Boards {
            #[serde(default)]
            boards: Vec<Board>,
        }
        #[derive(Deserialize)]
        struct Board {
            items_page: Option<ItemsPage>,
        }
        #[derive(Deserialize)]
        struct ItemsPage {
            #[serde(default)]
            items: Vec<Item>,
        }

        let data: Boards = decode(check_response(&response)?)?;
        Ok(data
            .boards
            .into_iter()
            .next()
            .and_then(|board| board.items_page)
            .map(|page| page.items)
            .unwrap_or_default())
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<User>, ApiError> {
        data_field(&response, "users")
    }

    pub fn parse_create_item(&self, response: HttpResponse) -> Result<ItemRef, ApiError> {
        data_field(&response, "create_item")
    }

    /// Also parses the result of `build_status_decision`.
    pub fn parse_update_item(&self, response: HttpResponse) -> Result<ItemRef, ApiError> {
        data_field(&response, "change_multiple_column_values")
    }

    pub fn parse_delete_item(&self, response: HttpResponse) -> Result<ItemRef, ApiError> {
        data_field(&response, "delete_item")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
    error_code: Option<String>,
    error_message: Option<String>,
    status_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    extensions: Option<Value>,
}

impl GraphQlError {
    fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

/// Classify the response and return its `data` object.
fn check_response(response: &HttpResponse) -> Result<Value, ApiError> {
    if matches!(response.status, 401 | 403) {
        return Err(ApiError::Unauthorized);
    }

    let envelope: Envelope = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(_) if response.status == 429 => {
            return Err(ApiError::Retryable {
                code: "HTTP_429".to_string(),
                message: response.body.clone(),
            })
        }
        Err(_) if response.status != 200 => {
            return Err(ApiError::Http {
                status: response.status,
                body: response.body.clone(),
            })
        }
        Err(e) => return Err(ApiError::Deserialization(e.to_string())),
    };

    if matches!(envelope.status_code, Some(401 | 403)) {
        return Err(ApiError::Unauthorized);
    }
    if let Some(code) = envelope.error_code {
        let message = envelope.error_message.unwrap_or_default();
        return Err(classify(code, message));
    }
    if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
        let code = errors
            .iter()
            .find_map(GraphQlError::code)
            .unwrap_or("GraphQLError")
            .to_string();
        let message = errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(classify(code, message));
    }
    if response.status == 429 {
        return Err(ApiError::Retryable {
            code: "HTTP_429".to_string(),
            message: response.body.clone(),
        });
    }
    if response.status != 200 {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body.clone(),
        });
    }

    envelope
        .data
        .ok_or_else(|| ApiError::Deserialization("response has no data".to_string()))
}

fn classify(code: String, message: String) -> ApiError {
    if RETRYABLE_CODES.contains(&code.as_str()) {
        ApiError::Retryable { code, message }
    } else {
        ApiError::Remote { code, message }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

fn data_field<T: DeserializeOwned>(response: &HttpResponse, field: &str) -> Result<T, ApiError> {
    let mut data = check_response(response)?;
    let value = data
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| ApiError::Deserialization(format!("response data has no `{field}`")))?;
    decode(value)
}
