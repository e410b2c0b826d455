//! Router assembly

use super::handlers::{
    AppState, create_record, delete_record, get_record, list_records, route_not_found,
    update_record,
};
use super::middleware::{GateState, access_gate};
use axum::{Json, Router, middleware, routing::get};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// Build resource routes
///
/// - GET /api/{resource} - List one page
/// - POST /api/{resource} - Create a record
/// - GET /api/{resource}/{id} - Get a record
/// - PATCH /api/{resource}/{id} - Update a record
/// - DELETE /api/{resource}/{id} - Delete a record
pub fn build_resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/{resource}", get(list_records).post(create_record))
        .route(
            "/api/{resource}/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .with_state(state)
}

pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "roost-admin"
    }))
}

/// Complete application router
///
/// The gate wraps every route and the fallback; health routes pass because
/// they are not protected.
pub fn build_router(state: AppState, gate: Option<GateState>, custom_routes: Vec<Router>) -> Router {
    let mut app = health_routes().merge(build_resource_routes(state));
    for custom in custom_routes {
        app = app.merge(custom);
    }
    app = app.fallback(route_not_found);

    if let Some(gate) = gate {
        app = app.layer(middleware::from_fn_with_state(gate, access_gate));
    }

    app.layer(TraceLayer::new_for_http())
}
