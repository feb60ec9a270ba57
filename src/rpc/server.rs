use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use super::types::*;
use crate::backend::{ApiClient, BackendError, ProfileSource};
use crate::billing::{BillingError, BillingProvider, DisabledBilling, RevenueCatClient};
use crate::config::AppConfig;
use crate::entitlement::{
    self, check_resource_limit, extract_session_token, EntitlementStore, FreeLimits,
    SharedEntitlementStore,
};

pub struct AppState {
    pub store: SharedEntitlementStore,
    pub api: Arc<ApiClient>,
    pub limits: FreeLimits,
    /// Cancelled on teardown so in-flight refreshes stop updating state
    /// for an interest that no longer exists.
    pub shutdown: CancellationToken,
}

fn build_state(config: AppConfig) -> Result<Arc<AppState>> {
    let api = Arc::new(ApiClient::new(config.backend_base()?));

    let billing: Arc<dyn BillingProvider> = match &config.billing_api_key {
        Some(key) => {
            let app_user_id = config
                .billing_app_user_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            Arc::new(RevenueCatClient::new(key.clone(), app_user_id))
        }
        None => {
            tracing::warn!("No billing API key configured; billing source disabled");
            Arc::new(DisabledBilling)
        }
    };

    let profile: Arc<dyn ProfileSource> = api.clone();
    let store = EntitlementStore::shared(billing, profile, config.products.clone());

    Ok(Arc::new(AppState {
        store,
        api,
        limits: config.limits,
        shutdown: CancellationToken::new(),
    }))
}

pub async fn run_http_server(host: &str, port: u16, config: AppConfig) -> Result<()> {
    let state = build_state(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/entitlement", get(entitlement_get))
        .route("/api/entitlement/refresh", post(entitlement_refresh))
        .route("/api/entitlement/restore", post(entitlement_restore))
        .route("/api/offerings", get(offerings_get))
        .route("/api/limits", get(limits_get))
        .route("/api/limits/check", post(limits_check))
        .route("/api/limits/guard", post(limits_guard))
        .route("/api/counts", get(counts_get))
        .route("/rpc", post(json_rpc_handler))
        .layer(cors)
        .with_state(state.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await?;
    Ok(())
}

pub async fn run_stdio_server(config: AppConfig) -> Result<()> {
    let state = build_state(config)?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut stdout = stdout;

    tracing::info!("JSON-RPC server running on stdio");

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_jsonrpc_request(&state, line).await;

        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    state.shutdown.cancel();
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}

async fn entitlement_get(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    (StatusCode::OK, Json(snapshot))
}

async fn entitlement_refresh(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let token = extract_session_token(&headers);

    match state.store.refresh(token.as_deref(), &state.shutdown).await {
        Ok(outcome) => {
            let entitlement = state.store.snapshot().await;
            (
                StatusCode::OK,
                Json(RefreshResponse {
                    outcome,
                    entitlement,
                }),
            )
                .into_response()
        }
        Err(BackendError::Auth) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Session token missing or rejected"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn entitlement_restore(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let token = extract_session_token(&headers);

    match state.store.restore(token.as_deref(), &state.shutdown).await {
        Ok(restored) => {
            let entitlement = state.store.snapshot().await;
            (
                StatusCode::OK,
                Json(RestoreResponse {
                    restored,
                    entitlement,
                }),
            )
                .into_response()
        }
        Err(BillingError::NotConfigured) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "Billing is not configured"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn offerings_get(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.offerings().await {
        Ok(packages) => (StatusCode::OK, Json(OfferingsResponse { packages })).into_response(),
        Err(BillingError::NotConfigured) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error": "Billing is not configured"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn limits_get(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(LimitsResponse {
            limits: state.limits.clone(),
        }),
    )
}

async fn limits_check(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LimitCheckRequest>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;
    let decision = entitlement::evaluate(
        &snapshot,
        &state.limits,
        request.kind,
        request.current_count,
    );
    (StatusCode::OK, Json(decision))
}

async fn limits_guard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LimitCheckRequest>,
) -> impl IntoResponse {
    let snapshot = state.store.snapshot().await;

    if let Err(err) =
        check_resource_limit(&snapshot, &state.limits, request.kind, request.current_count)
    {
        return err.into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn counts_get(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let token = extract_session_token(&headers);

    match state.api.fetch_counts(token.as_deref()).await {
        Ok(counts) => (StatusCode::OK, Json(CountsResponse { counts })).into_response(),
        Err(BackendError::Auth) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "Session token missing or rejected"})),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn json_rpc_handler(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let response = handle_jsonrpc_request(&state, &body).await;
    (StatusCode::OK, response)
}

async fn handle_jsonrpc_request(state: &Arc<AppState>, request: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(request) {
        Ok(json) => {
            let method = json.get("method").and_then(|m| m.as_str()).unwrap_or("");
            let params = json
                .get("params")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let id = json.get("id").cloned().unwrap_or(serde_json::Value::Null);

            match dispatch_method(state, method, params).await {
                Ok(value) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "result": value,
                    "id": id
                })
                .to_string(),
                Err(e) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "error": {
                        "code": -32603,
                        "message": e.to_string()
                    },
                    "id": id
                })
                .to_string(),
            }
        }
        Err(e) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {
                "code": -32700,
                "message": format!("Parse error: {}", e)
            },
            "id": null
        })
        .to_string(),
    }
}

async fn dispatch_method(
    state: &Arc<AppState>,
    method: &str,
    params: serde_json::Value,
) -> Result<serde_json::Value> {
    match method {
        "system.version" => Ok(serde_json::json!(env!("CARGO_PKG_VERSION"))),
        "system.ping" => Ok(serde_json::json!("pong")),
        "entitlement.get" => {
            let snapshot = state.store.snapshot().await;
            Ok(serde_json::to_value(snapshot)?)
        }
        "entitlement.refresh" => {
            let token = params
                .get("token")
                .and_then(|t| t.as_str())
                .map(str::to_string);
            let outcome = state.store.refresh(token.as_deref(), &state.shutdown).await?;
            let entitlement = state.store.snapshot().await;
            Ok(serde_json::to_value(RefreshResponse {
                outcome,
                entitlement,
            })?)
        }
        "limits.check" => {
            let request: LimitCheckRequest = serde_json::from_value(params)?;
            let snapshot = state.store.snapshot().await;
            let decision = entitlement::evaluate(
                &snapshot,
                &state.limits,
                request.kind,
                request.current_count,
            );
            Ok(serde_json::to_value(decision)?)
        }
        _ => anyhow::bail!("Unknown method: {}", method),
    }
}
