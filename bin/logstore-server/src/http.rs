//! JSON handlers for the storage API.
//!
//! Values are raw bytes, carried base64-encoded in the JSON bodies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use logstore_common::Error;
use logstore_store::StorageServer;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Shared handler state
pub struct AppState {
    pub store: Arc<StorageServer>,
}

/// Error wrapper mapping core errors to HTTP statuses
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match e {
            Error::Append(_) | Error::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            // A read failure behind a resolved index entry means the log
            // and the index have diverged.
            Error::NotFound { .. }
            | Error::Replay(_)
            | Error::Serialization(_)
            | Error::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, "request failed: {}", self.message);
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct KeyValue {
    pub key: String,
    /// base64-encoded bytes
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct MultiPutRequest {
    pub kvs: Vec<KeyValue>,
}

#[derive(Debug, Serialize)]
pub struct MultiPutResponse {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct MultiGetRequest {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MultiGetResponse {
    /// key -> base64-encoded bytes, absent keys omitted
    pub values: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub applied: u64,
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn multi_put(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultiPutRequest>,
) -> Result<Json<MultiPutResponse>, ApiError> {
    let mut kvs = Vec::with_capacity(req.kvs.len());
    for kv in req.kvs {
        let value = BASE64
            .decode(&kv.value)
            .map_err(|e| ApiError::bad_request(format!("invalid base64 for '{}': {e}", kv.key)))?;
        kvs.push((kv.key, Bytes::from(value)));
    }

    state.store.multi_put(kvs).await?;
    Ok(Json(MultiPutResponse { ok: true }))
}

pub async fn multi_get(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultiGetRequest>,
) -> Result<Json<MultiGetResponse>, ApiError> {
    let values = state.store.multi_get(&req.keys).await?;
    let values = values
        .into_iter()
        .map(|(key, value)| (key, BASE64.encode(value)))
        .collect();
    Ok(Json(MultiGetResponse { values }))
}

pub async fn rebuild(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RebuildResponse>, ApiError> {
    let applied = state.store.rebuild_index().await?;
    Ok(Json(RebuildResponse { applied }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let e: ApiError = Error::append("down").into();
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);

        let e: ApiError = Error::not_found(7, 0).into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_request_bodies_parse() {
        let req: MultiPutRequest =
            serde_json::from_str(r#"{"kvs":[{"key":"k1","value":"djE="}]}"#).unwrap();
        assert_eq!(req.kvs.len(), 1);
        assert_eq!(BASE64.decode(&req.kvs[0].value).unwrap(), b"v1");

        let req: MultiGetRequest = serde_json::from_str(r#"{"keys":["k1","k2"]}"#).unwrap();
        assert_eq!(req.keys, vec!["k1".to_string(), "k2".to_string()]);
    }
}
