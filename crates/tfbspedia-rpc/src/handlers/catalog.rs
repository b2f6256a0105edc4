//! Autocomplete, cell/tissue list, record details and cache status.

use crate::handlers::{get_i64_param, get_str_param, species_param};
use crate::server::AppState;
use serde_json::{json, Value};
use tfbspedia_core::TfbsError;

pub async fn factor_names(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let fragment = get_str_param(params, "query", "query").unwrap_or("");
    let names = state
        .api
        .factor_names(species_param(params)?, fragment)
        .await?;
    Ok(json!({
        "success": true,
        "names": names
    }))
}

pub async fn cell_tissues(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let labels = state.api.cell_tissues(species_param(params)?).await;
    Ok(json!({
        "success": true,
        "cell_tissues": labels
    }))
}

pub async fn record_details(state: &AppState, params: &Value) -> tfbspedia_core::Result<Value> {
    let id = get_i64_param(params, "id", "id")
        .ok_or_else(|| TfbsError::invalid("id", "Missing required parameter: id"))?;

    match state.api.record_details(species_param(params)?, id).await? {
        Some(details) => Ok(json!({
            "success": true,
            "details": details
        })),
        None => Ok(json!({
            "success": false,
            "details": null,
            "error": format!("No record with id {}", id)
        })),
    }
}

pub async fn cache_status(state: &AppState, _params: &Value) -> tfbspedia_core::Result<Value> {
    Ok(json!({
        "success": true,
        "status": state.api.status()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::seeded_api;

    #[tokio::test]
    async fn test_factor_names_and_details() {
        let (_dir, api) = seeded_api();
        let state = AppState { api };

        let names = factor_names(&state, &json!({"query": "ct"})).await.unwrap();
        assert_eq!(names["names"], json!(["CTCF"]));

        let details = record_details(&state, &json!({"id": 1})).await.unwrap();
        assert_eq!(details["success"], json!(true));
        assert_eq!(details["details"]["directFactors"], json!("CTCF"));
        assert_eq!(details["details"]["scores"]["confident"], json!(0.8));

        let missing = record_details(&state, &json!({"id": 999})).await.unwrap();
        assert_eq!(missing["success"], json!(false));

        assert!(record_details(&state, &json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_cache_status_reports_loads() {
        let (_dir, api) = seeded_api();
        let state = AppState { api };

        crate::handlers::search::search(&state, &json!({"query": "chr1", "cellTissue": "HepG2"}))
            .await
            .unwrap();

        let status = cache_status(&state, &json!({})).await.unwrap();
        assert_eq!(status["status"]["identifierSets"]["loadedKeys"], json!(1));
        assert_eq!(status["status"]["identifierSets"]["sourceReads"], json!(1));
        assert!(status["status"]["startedAt"].is_string());
    }
}
