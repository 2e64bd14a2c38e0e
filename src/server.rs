//! HTTP front end
//!
//! Speaks the AWS JSON 1.1 protocol: every action is a `POST /` naming the
//! operation in `X-Amz-Target`, with the parameters as the JSON body.

use crate::inspector::InspectorError;
use crate::service::dispatch;
use crate::service::regions::RegionRegistry;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const TARGET_PREFIX: &str = "InspectorService.";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

const X_AMZ_TARGET: &str = "x-amz-target";
const X_AMZN_REQUEST_ID: &str = "x-amzn-requestid";

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RegionRegistry>,
}

impl AppState {
    pub fn new(registry: RegionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_action))
        .route("/_reset", post(handle_reset))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<AwsJson, InspectorError> {
    let operation = operation_name(&headers)?;
    let region = resolve_region(&headers, state.registry.default_region());
    let params = parse_body(&body)?;

    tracing::debug!("{} in {}", operation, region);

    let response = {
        let mut backend = state.registry.backend(&region)?;
        dispatch::invoke(&mut backend, &operation, &params)?
    };

    Ok(AwsJson(StatusCode::OK, response))
}

async fn handle_reset(State(state): State<AppState>) -> AwsJson {
    state.registry.reset_all();
    AwsJson(StatusCode::OK, json!({ "status": "ok" }))
}

/// JSON 1.1 response document
pub struct AwsJson(StatusCode, Value);

impl IntoResponse for AwsJson {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let mut response = (self.0, self.1.to_string()).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(AMZ_JSON));
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(HeaderName::from_static(X_AMZN_REQUEST_ID), value);
        }
        response
    }
}

impl IntoResponse for InspectorError {
    fn into_response(self) -> Response {
        tracing::warn!("{}: {}", self.code(), self);

        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
        let body = json!({
            "__type": self.code(),
            "message": self.to_string()
        });

        AwsJson(status, body).into_response()
    }
}

fn operation_name(headers: &HeaderMap) -> Result<String, InspectorError> {
    let target = headers
        .get(X_AMZ_TARGET)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    target
        .strip_prefix(TARGET_PREFIX)
        .filter(|op| !op.is_empty())
        .map(|op| op.to_string())
        .ok_or_else(|| InspectorError::UnknownOperation(target.to_string()))
}

/// Region from the SigV4 credential scope, else the default region
fn resolve_region(headers: &HeaderMap, default_region: &str) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(region_from_authorization)
        .unwrap_or(default_region)
        .to_string()
}

/// `Credential=<key>/<date>/<region>/<service>/aws4_request`
fn region_from_authorization(authorization: &str) -> Option<&str> {
    let scope = authorization.split("Credential=").nth(1)?;
    let scope = scope.split([',', ' ']).next()?;
    scope.split('/').nth(2).filter(|region| !region.is_empty())
}

fn parse_body(body: &[u8]) -> Result<Value, InspectorError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    let params: Value =
        serde_json::from_slice(body).map_err(|e| InspectorError::Serialization(e.to_string()))?;
    if !params.is_object() {
        return Err(InspectorError::Serialization(
            "Request body must be a JSON object".to_string(),
        ));
    }
    Ok(params)
}
