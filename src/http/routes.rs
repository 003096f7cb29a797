//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::store::record::CREATED_AT_FIELD;
use crate::store::{DocumentId, Record};
use crate::util::time::{now_rfc3339, uptime_secs};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(state.config.client_origin.as_deref());

    let item_routes = Router::new()
        .route("/items", get(list_items_handler).post(create_item_handler))
        .route(
            "/items/:id",
            get(get_item_handler)
                .patch(update_item_handler)
                .delete(delete_item_handler),
        );

    let stock_routes = Router::new()
        .route(
            "/stock-in",
            get(list_stock_in_handler).post(create_stock_in_handler),
        )
        .route(
            "/stock-in/:id",
            axum::routing::put(put_stock_in_handler).delete(delete_stock_in_handler),
        )
        .route(
            "/stock-out",
            get(list_stock_out_handler).post(create_stock_out_handler),
        )
        .route(
            "/stock-out/:id",
            get(get_stock_out_handler)
                .put(put_stock_out_handler)
                .delete(delete_stock_out_handler),
        );

    let directory_routes = Router::new()
        .route("/suppliers", get(list_suppliers_handler))
        .route(
            "/suppliers/:id",
            axum::routing::put(put_supplier_handler).delete(delete_supplier_handler),
        )
        .route("/warehouses", get(list_warehouses_handler))
        .route(
            "/warehouses/:id",
            axum::routing::put(put_warehouse_handler).delete(delete_warehouse_handler),
        );

    Router::new()
        .route("/health", get(health_handler))
        .merge(item_routes)
        .merge(stock_routes)
        .merge(directory_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS: the configured origins (comma-separated), or any origin when unset
fn build_cors(client_origin: Option<&str>) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    match client_origin {
        Some(origins) => {
            let allowed_origins: Vec<header::HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods(methods)
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}

// ============================================================================
// Shared response shapes
// ============================================================================

#[derive(Serialize)]
struct ListResponse {
    count: usize,
    records: Vec<Record>,
}

impl From<Vec<Record>> for ListResponse {
    fn from(records: Vec<Record>) -> Self {
        Self {
            count: records.len(),
            records,
        }
    }
}

#[derive(Serialize)]
struct MutationResponse {
    success: bool,
    id: String,
}

/// Turn a gateway outcome into a response; the gateway already logged why
fn mutation_result(ok: bool, id: String, action: &str) -> Result<Json<MutationResponse>, AppError> {
    if ok {
        Ok(Json(MutationResponse { success: true, id }))
    } else {
        Err(AppError::Unavailable(format!("Failed to {} {}", action, id)))
    }
}

/// Stamp `created_at` on a new stock movement unless the caller set one
fn with_created_at(mut record: Record) -> Record {
    record
        .entry(CREATED_AT_FIELD)
        .or_insert_with(|| Value::String(now_rfc3339()));
    record
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    record_store: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        record_store: if state.records.is_available() {
            "available"
        } else {
            "unavailable"
        },
    })
}

// ============================================================================
// Item endpoints
// ============================================================================

async fn list_items_handler(State(state): State<AppState>) -> Json<ListResponse> {
    Json(state.records.get_all_items().await.into())
}

async fn create_item_handler(
    State(state): State<AppState>,
    Json(item): Json<Record>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let id = DocumentId::from_record(&item)
        .ok_or_else(|| AppError::BadRequest("Item must carry a non-empty `id`".to_string()))?;

    let ok = state.records.save_item(&item).await;
    let response = mutation_result(ok, id.to_string(), "save item")?;
    Ok((StatusCode::CREATED, response))
}

async fn get_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    state
        .records
        .get_item(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {}", id)))
}

async fn update_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Record>,
) -> Result<Json<MutationResponse>, AppError> {
    if data.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    let ok = state.records.update_item(&id, &data).await;
    mutation_result(ok, id, "update item")
}

async fn delete_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.delete_item(&id).await;
    mutation_result(ok, id, "delete item")
}

// ============================================================================
// Stock movement endpoints
// ============================================================================

async fn list_stock_in_handler(State(state): State<AppState>) -> Json<ListResponse> {
    Json(state.records.get_stock_in_records().await.into())
}

async fn create_stock_in_handler(
    State(state): State<AppState>,
    Json(data): Json<Record>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let id = Uuid::new_v4().to_string();
    let ok = state
        .records
        .save_stock_in(&id, &with_created_at(data))
        .await;
    Ok((StatusCode::CREATED, mutation_result(ok, id, "save stock-in")?))
}

async fn put_stock_in_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Record>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.save_stock_in(&id, &data).await;
    mutation_result(ok, id, "save stock-in")
}

async fn delete_stock_in_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.delete_stock_in(&id).await;
    mutation_result(ok, id, "delete stock-in")
}

async fn list_stock_out_handler(State(state): State<AppState>) -> Json<ListResponse> {
    Json(state.records.get_stock_out_records().await.into())
}

async fn create_stock_out_handler(
    State(state): State<AppState>,
    Json(data): Json<Record>,
) -> Result<(StatusCode, Json<MutationResponse>), AppError> {
    let id = Uuid::new_v4().to_string();
    let ok = state
        .records
        .save_stock_out(&id, &with_created_at(data))
        .await;
    Ok((StatusCode::CREATED, mutation_result(ok, id, "save stock-out")?))
}

async fn get_stock_out_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    state
        .records
        .get_stock_out_record(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Stock-out record {}", id)))
}

async fn put_stock_out_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Record>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.save_stock_out(&id, &data).await;
    mutation_result(ok, id, "save stock-out")
}

async fn delete_stock_out_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.delete_stock_out(&id).await;
    mutation_result(ok, id, "delete stock-out")
}

// ============================================================================
// Supplier and warehouse endpoints
// ============================================================================

async fn list_suppliers_handler(State(state): State<AppState>) -> Json<ListResponse> {
    Json(state.records.get_all_suppliers().await.into())
}

async fn put_supplier_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Record>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.save_supplier(&id, &data).await;
    mutation_result(ok, id, "save supplier")
}

async fn delete_supplier_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.delete_supplier(&id).await;
    mutation_result(ok, id, "delete supplier")
}

async fn list_warehouses_handler(State(state): State<AppState>) -> Json<ListResponse> {
    Json(state.records.get_all_warehouses().await.into())
}

async fn put_warehouse_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<Record>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.save_warehouse(&id, &data).await;
    mutation_result(ok, id, "save warehouse")
}

async fn delete_warehouse_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let ok = state.records.delete_warehouse(&id).await;
    mutation_result(ok, id, "delete warehouse")
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("{} not found", msg)),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
