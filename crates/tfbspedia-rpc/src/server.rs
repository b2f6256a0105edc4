//! HTTP server implementation using Axum.

use crate::handlers::{handle_export, handle_health, handle_rpc};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tfbspedia_core::config::SearchConfig;
use tfbspedia_core::TfbsApi;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Core API (caches, store and engines)
    pub api: TfbsApi,
}

/// Request bodies may carry a whole batch upload plus its JSON framing.
const MAX_BODY_BYTES: usize = SearchConfig::MAX_BATCH_TEXT_BYTES + 64 * 1024;

/// Build the router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .route("/export", post(handle_export))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(api: TfbsApi, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let state = Arc::new(AppState { api });
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::seeded_api;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tfbspedia_core::search::EXPORT_HEADER;
    use tower::ServiceExt;

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }

    async fn rpc(app: Router, method: &str, params: Value) -> Value {
        let (status, _, body) = post_json(
            app,
            "/rpc",
            json!({"jsonrpc": "2.0", "method": method, "params": params, "id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_server_starts() {
        let (_dir, api) = seeded_api();
        let addr = start_server(api, "127.0.0.1", 0).await.unwrap();
        assert!(addr.port() > 0);
    }

    #[tokio::test]
    async fn test_health_route() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rpc_search_by_query_string() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));

        let response = rpc(
            app,
            "search",
            json!({"species": "human", "query": "chr1,0,1000", "cellTissue": "HepG2", "limit": 10}),
        )
        .await;
        let result = &response["result"];
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["total"], json!(2));
        assert_eq!(result["records"][0]["id"], json!(1));
    }

    #[tokio::test]
    async fn test_rpc_invalid_params_error_code() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));

        let response = rpc(app, "search", json!({"species": "human", "query": "chr1,9,1"})).await;
        assert_eq!(response["error"]["code"], json!(-32602));
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_rpc_unknown_method() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));

        let response = rpc(app, "no_such_method", json!({})).await;
        assert_eq!(response["error"]["code"], json!(-32601));
    }

    #[tokio::test]
    async fn test_batch_count_matches_export_rows() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));
        let text = "CTCF\nGATA1\nchr1,0,250\n";

        let response = rpc(
            app.clone(),
            "batch_search",
            json!({"species": "human", "text": text}),
        )
        .await;
        let total = response["result"]["total"].as_u64().unwrap();
        assert_eq!(total, 4);

        let (status, headers, body) =
            post_json(app, "/export", json!({"species": "human", "text": text})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        let csv = String::from_utf8(body).unwrap();
        // Header plus one line per distinct record.
        assert_eq!(csv.lines().count() as u64, total + 1);
    }

    #[tokio::test]
    async fn test_search_export_keeps_requested_chromosome() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));

        let (_, _, all) = post_json(app.clone(), "/export", json!({"query": "GATA1"})).await;
        assert_eq!(String::from_utf8(all).unwrap().lines().count(), 3);

        let (status, _, body) = post_json(
            app,
            "/export",
            json!({"query": "GATA1", "chromosome": "chr2"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(body).unwrap();
        assert_eq!(csv, format!("{}\nchr2,50,80,4,,\n", EXPORT_HEADER.join(",")));
    }

    #[tokio::test]
    async fn test_export_rejects_bad_request() {
        let (_dir, api) = seeded_api();
        let app = build_router(Arc::new(AppState { api }));

        let (status, _, _) = post_json(app, "/export", json!({"species": "human"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
