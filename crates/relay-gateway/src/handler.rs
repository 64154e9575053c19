use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_core::{ChatResponse, ModelSelector, RelayError, RelayResult};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

const MISSING_MESSAGE: &str = "Please provide a \"message\" field in the request body";
const UNREADABLE_BODY: &str = "Request body could not be read";

/// A validated chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// The user's message, never empty.
    pub message: String,
    /// The resolved model; [`ModelSelector::Default`] when omitted.
    pub model: ModelSelector,
}

impl ChatRequest {
    /// Validates a raw request body.
    ///
    /// The body must be a JSON object with a non-empty string `message`.
    /// `model` is optional (absent or `null` means default); anything else
    /// must name a known selector.
    pub fn from_body(body: &[u8]) -> RelayResult<Self> {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        let message = value
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| RelayError::InvalidInput(MISSING_MESSAGE.to_string()))?;

        let model = match value.get("model") {
            None | Some(Value::Null) => ModelSelector::default(),
            Some(Value::String(name)) => name.parse()?,
            Some(_) => {
                return Err(RelayError::InvalidInput(format!(
                    "Available models: {}",
                    ModelSelector::available()
                )))
            }
        };

        Ok(Self {
            message: message.to_string(),
            model,
        })
    }
}

#[derive(Serialize)]
struct ChatSuccess {
    success: bool,
    data: ChatResponse,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

/// Failures as seen by HTTP callers.
#[derive(Debug)]
pub enum ApiError {
    /// 400: the request body was rejected.
    BadRequest(String),
    /// 405: anything but POST or OPTIONS.
    MethodNotAllowed,
    /// 500: the upstream exchange failed.
    Internal(String),
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        if e.is_client_error() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "Bad request", message),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed",
                "Please use POST method".to_string(),
            ),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// Chat endpoint, mounted for every method.
///
/// `OPTIONS` is a bare 200 for CORS preflight, `POST` runs a chat turn and
/// everything else is a 405. A body that cannot be read (over the size
/// limit, broken stream) is a 400.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    if method != Method::POST {
        warn!(method = %method, "Rejected chat request: method not allowed");
        return ApiError::MethodNotAllowed.into_response();
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                status = %rejection.status(),
                error = %rejection.body_text(),
                "Rejected chat request body"
            );
            return ApiError::BadRequest(UNREADABLE_BODY.to_string()).into_response();
        }
    };

    let request = match ChatRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Rejected chat request");
            return ApiError::from(e).into_response();
        }
    };

    info!(
        model = %request.model,
        message_len = request.message.len(),
        "Relaying chat request"
    );

    match state.backend.chat(&request.message, request.model).await {
        Ok(data) => (
            StatusCode::OK,
            Json(ChatSuccess {
                success: true,
                data,
            }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Copilot request failed");
            ApiError::from(e).into_response()
        }
    }
}
