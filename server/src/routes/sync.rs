//! Sync and record routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};

use crate::auth::AuthOwner;
use crate::error::Result;
use crate::handlers::{
    handle_get_record, handle_list_records, handle_sync, ListQuery, ListResponse, SyncRequest,
    SyncResponse,
};
use crate::AppState;
use reel_engine::RemoteRecord;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync_handler))
        .route("/records", get(list_records_handler))
        .route("/records/{id}", get(get_record_handler))
}

/// POST /sync - One reconciliation round trip for the authenticated owner.
async fn sync_handler(
    State(state): State<AppState>,
    auth: AuthOwner,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let response = handle_sync(&state.pool, &auth.owner_id, request).await?;
    Ok(Json(response))
}

/// GET /records - List the owner's authoritative records.
async fn list_records_handler(
    State(state): State<AppState>,
    auth: AuthOwner,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let response = handle_list_records(&state.pool, &auth.owner_id, query).await?;
    Ok(Json(response))
}

/// GET /records/{id} - Fetch one of the owner's records.
async fn get_record_handler(
    State(state): State<AppState>,
    auth: AuthOwner,
    Path(id): Path<String>,
) -> Result<Json<RemoteRecord>> {
    let record = handle_get_record(&state.pool, &auth.owner_id, &id).await?;
    Ok(Json(record))
}
