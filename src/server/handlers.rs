//! HTTP handlers for resource operations
//!
//! All handlers are resource-agnostic: the resource name comes from the path
//! and is resolved by the facade. Responses wrap records in `{ "data": .. }`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::core::error::{AdminResult, ValidationError};
use crate::core::facade::DataAccessFacade;
use crate::core::query::{ListQueryParams, PaginationMeta};
use crate::core::service::{DataProvider, MutationRequest, Payload};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub facade: DataAccessFacade,
    pub default_page_size: u64,
}

/// Access token of the session that passed the gate
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

impl AppState {
    fn facade(&self, session: Option<Extension<SessionToken>>) -> DataAccessFacade {
        let token = session.as_ref().map(|Extension(SessionToken(t))| t.as_str());
        self.facade.scoped(token)
    }
}

/// Response for the list endpoint
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub data: Vec<Value>,
    pub total: u64,
    pub pagination: PaginationMeta,
}

fn payload(body: Result<Json<Value>, JsonRejection>, operation: &str) -> AdminResult<Payload> {
    let Json(value) = body.map_err(|e| ValidationError::InvalidJson {
        message: e.body_text(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ValidationError::InvalidMutation {
            operation: operation.to_string(),
            message: format!("payload must be a JSON object, got {other}"),
        }
        .into()),
    }
}

/// List one page of a resource
///
/// GET /api/{resource}?current=&pageSize=&filters=&sorters=&select=
pub async fn list_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(params): Query<ListQueryParams>,
    session: Option<Extension<SessionToken>>,
) -> AdminResult<Json<ListResponse>> {
    let request = params.into_request(resource, state.default_page_size)?;
    let pagination = request.pagination;

    let result = state.facade(session).list(&request).await?;

    Ok(Json(ListResponse {
        pagination: PaginationMeta::new(pagination, result.total),
        total: result.total,
        data: result.rows,
    }))
}

/// GET /api/{resource}/{id}
pub async fn get_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    session: Option<Extension<SessionToken>>,
) -> AdminResult<Json<Value>> {
    let record = state.facade(session).get_one(&resource, &id).await?;
    Ok(Json(json!({ "data": record })))
}

/// POST /api/{resource}
pub async fn create_record(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    session: Option<Extension<SessionToken>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AdminResult<Response> {
    let payload = payload(body, "create")?;
    let record = state
        .facade(session)
        .execute(MutationRequest::create(resource, payload))
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": record }))).into_response())
}

/// PATCH /api/{resource}/{id}
pub async fn update_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    session: Option<Extension<SessionToken>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AdminResult<Json<Value>> {
    let payload = payload(body, "update")?;
    let record = state
        .facade(session)
        .execute(MutationRequest::update(resource, id, payload))
        .await?;

    Ok(Json(json!({ "data": record })))
}

/// DELETE /api/{resource}/{id}
///
/// Only the identifier of the deleted record is returned.
pub async fn delete_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    session: Option<Extension<SessionToken>>,
) -> AdminResult<Json<Value>> {
    let deleted = state
        .facade(session)
        .execute(MutationRequest::delete(resource, id))
        .await?;

    Ok(Json(json!({ "data": deleted })))
}

/// Fallback for unknown routes
pub async fn route_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "code": "ROUTE_NOT_FOUND",
            "message": "no such route",
        })),
    )
        .into_response()
}
