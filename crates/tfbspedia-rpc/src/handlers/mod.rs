//! JSON-RPC request handlers, split by domain.

mod catalog;
mod search;

use crate::server::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tfbspedia_core::{
    parse_search_query, retain_chromosome, write_export_csv, BatchRequest, EvidenceType, PageWindow, SearchTarget,
    Species, TfbsError,
};
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard code for a method the server does not know.
const METHOD_NOT_FOUND: i32 = -32601;

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> tfbspedia_core::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| TfbsError::invalid(snake, format!("Missing required parameter: {}", snake)))
}

/// Extract an optional i64 parameter, supporting both snake_case and camelCase.
pub(crate) fn get_i64_param(params: &Value, snake: &str, camel: &str) -> Option<i64> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_i64())
}

/// Species selector; absent means human.
pub(crate) fn species_param(params: &Value) -> tfbspedia_core::Result<Species> {
    match get_str_param(params, "species", "species") {
        None => Ok(Species::default()),
        Some(raw) => Species::from_str(raw)
            .ok_or_else(|| TfbsError::invalid("species", format!("Unknown species: {}", raw))),
    }
}

/// Evidence selector. The legacy form field `tfbs_type` is accepted too.
pub(crate) fn evidence_param(params: &Value) -> tfbspedia_core::Result<EvidenceType> {
    let raw = get_str_param(params, "evidence", "evidence")
        .or_else(|| get_str_param(params, "tfbs_type", "tfbsType"));
    match raw {
        None => Ok(EvidenceType::All),
        Some(raw) => EvidenceType::from_str(raw)
            .ok_or_else(|| TfbsError::invalid("evidence", format!("Unknown evidence type: {}", raw))),
    }
}

pub(crate) fn cell_tissue_param(params: &Value) -> Option<&str> {
    get_str_param(params, "cell_tissue", "cellTissue")
}

/// Pagination window from `offset` and `limit`.
pub(crate) fn window_param(params: &Value) -> tfbspedia_core::Result<PageWindow> {
    let default = PageWindow::default();
    let offset = get_i64_param(params, "offset", "offset").unwrap_or(default.offset() as i64);
    let limit = get_i64_param(params, "limit", "limit").unwrap_or(default.limit() as i64);
    PageWindow::from_signed(offset, limit)
}

/// Build a batch request from either a `targets` array or uploaded `text`.
///
/// Array items may be query strings or tagged target objects.
pub(crate) fn batch_request_param(
    state: &AppState,
    params: &Value,
) -> tfbspedia_core::Result<BatchRequest> {
    let species = species_param(params)?;
    let evidence = evidence_param(params)?;
    let cell_tissue = cell_tissue_param(params);

    if let Some(items) = params.get("targets").and_then(|v| v.as_array()) {
        let targets = items
            .iter()
            .map(|item| match item.as_str() {
                Some(query) => parse_search_query(query),
                None => serde_json::from_value::<SearchTarget>(item.clone())
                    .map_err(|e| TfbsError::invalid("targets", e.to_string())),
            })
            .collect::<tfbspedia_core::Result<Vec<_>>>()?;
        let mut request = BatchRequest::new(species, targets).with_evidence(evidence);
        request.cell_tissue = cell_tissue.map(str::to_string);
        return Ok(request);
    }

    let text = require_str_param(params, "text", "text")?;
    state
        .api
        .batch_request_from_text(species, &text, cell_tissue, evidence)
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(Some(value)) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Ok(None) => {
            warn!("Method not found: {}", method);
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", method),
                )),
            )
        }
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            let code = e.to_rpc_error_code();
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, code, e.to_string())),
            )
        }
    }
}

/// CSV download of a single search (`query`) or a batch (`targets`/`text`).
pub async fn handle_export(
    State(state): State<Arc<AppState>>,
    Json(params): Json<Value>,
) -> Response {
    let (filename, result) = if params.get("query").is_some() {
        ("search_results.csv", export_search_csv(&state, &params).await)
    } else {
        ("batch_search_results.csv", export_batch_csv(&state, &params).await)
    };

    match result {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Export failed: {}", e);
            (
                export_status(&e),
                Json(json!({"success": false, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

fn export_status(err: &TfbsError) -> StatusCode {
    match err {
        TfbsError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        e if e.is_store_error() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn export_search_csv(state: &AppState, params: &Value) -> tfbspedia_core::Result<Vec<u8>> {
    let species = species_param(params)?;
    let evidence = evidence_param(params)?;
    let target = parse_search_query(&require_str_param(params, "query", "query")?)?;

    let mut rows = state
        .api
        .export_search(species, &target, cell_tissue_param(params), evidence)
        .await?;
    retain_chromosome(&mut rows, get_str_param(params, "chromosome", "chromosome"));
    let mut body = Vec::new();
    write_export_csv(&rows, &mut body)?;
    Ok(body)
}

async fn export_batch_csv(state: &AppState, params: &Value) -> tfbspedia_core::Result<Vec<u8>> {
    let request = batch_request_param(state, params)?;
    let rows = state.api.export_batch(&request).await?;
    let mut body = Vec::new();
    write_export_csv(&rows, &mut body)?;
    Ok(body)
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
///
/// `Ok(None)` means the method is unknown.
async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> tfbspedia_core::Result<Option<Value>> {
    let value = match method {
        // Searches
        "search" => search::search(state, params).await?,
        "search_by_location" => search::search_by_location(state, params).await?,
        "search_by_name" => search::search_by_name(state, params).await?,
        "batch_search" => search::batch_search(state, params).await?,
        "batch_estimate" => search::batch_estimate(state, params).await?,

        // Catalog & status
        "factor_names" => catalog::factor_names(state, params).await?,
        "cell_tissues" => catalog::cell_tissues(state, params).await?,
        "record_details" => catalog::record_details(state, params).await?,
        "cache_status" => catalog::cache_status(state, params).await?,

        _ => return Ok(None),
    };
    Ok(Some(value))
}
