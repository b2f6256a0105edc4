//! Search and batch handlers.

use crate::handlers::{
    batch_request_param, cell_tissue_param, evidence_param, get_i64_param, require_str_param,
    species_param, window_param,
};
use crate::server::AppState;
use serde_json::{json, Value};
use tfbspedia_core::{GenomicRegion, PageWindow, SearchPage};

fn page_json(page: SearchPage, window: PageWindow) -> Value {
    json!({
        "success": true,
        "records": page.records,
        "total": page.total,
        "offset": window.offset(),
        "limit": window.limit()
    })
}

pub async fn search(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let query = require_str_param(params, "query", "query")?;
    let window = window_param(params)?;

    let page = state
        .api
        .search_query(
            species_param(params)?,
            &query,
            cell_tissue_param(params),
            evidence_param(params)?,
            window,
        )
        .await?;
    Ok(page_json(page, window))
}

pub async fn search_by_location(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let region = GenomicRegion {
        chromosome: require_str_param(params, "chromosome", "chromosome")?,
        start: get_i64_param(params, "start", "start"),
        end: get_i64_param(params, "end", "end"),
    };
    let window = window_param(params)?;

    let page = state
        .api
        .search_by_location(
            species_param(params)?,
            &region,
            cell_tissue_param(params),
            evidence_param(params)?,
            window,
        )
        .await?;
    Ok(page_json(page, window))
}

pub async fn search_by_name(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let factor = require_str_param(params, "factor", "factor")?;
    let window = window_param(params)?;

    let page = state
        .api
        .search_by_name(
            species_param(params)?,
            &factor,
            cell_tissue_param(params),
            evidence_param(params)?,
            window,
        )
        .await?;
    Ok(page_json(page, window))
}

pub async fn batch_search(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let request = batch_request_param(state, params)?;
    let window = window_param(params)?;

    let page = state.api.batch_search(&request, window).await?;
    let mut result = page_json(page, window);
    result["targets"] = json!(request.targets.len());
    Ok(result)
}

/// Display-only size hint; `null` when no cheap estimate exists.
pub async fn batch_estimate(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let request = batch_request_param(state, params)?;
    let estimate = state.api.batch_estimate(&request).await?;
    Ok(json!({
        "success": true,
        "estimate": estimate
    }))
}
