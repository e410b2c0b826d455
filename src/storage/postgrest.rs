//! PostgREST backend over HTTP using reqwest
//!
//! Provides [`PostgrestClient`], a [`Backend`] talking to the REST endpoint of
//! a hosted Postgres service (`{url}/rest/v1`). Each call is one HTTP request:
//!
//! | operation | request |
//! |-----------|---------|
//! | select    | `GET /{table}?select=..&col=eq.v&order=..&offset=..&limit=..` with `Prefer: count=exact` when counting |
//! | insert    | `POST /{table}` with `Prefer: return=representation` |
//! | update    | `PATCH /{table}?{id_column}=eq.{id}` with `Prefer: return=representation` |
//! | delete    | `DELETE /{table}?{id_column}=eq.{id}` with `Prefer: return=representation` |
//! | rpc       | `POST /rpc/{function}` with the arguments as the JSON body |
//!
//! The client is an explicit handle: build one per process and pass it to
//! whatever needs it. [`PostgrestClient::with_access_token`] derives a handle
//! that acts as a signed-in user, so row-level security applies to them.

use crate::core::error::{AdminResult, StorageError};
use crate::core::service::{Backend, Payload};
use crate::core::store::{SelectResult, TableQuery};
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Error body returned by PostgREST
#[derive(Debug, Default, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

/// HTTP client for a PostgREST endpoint
#[derive(Clone)]
pub struct PostgrestClient {
    http: reqwest::Client,
    rest_url: String,
    api_key: String,
    bearer: String,
}

impl fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("rest_url", &self.rest_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl PostgrestClient {
    /// Client for the project at `base_url` authenticating with `api_key`
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            http: reqwest::Client::new(),
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            bearer: api_key.clone(),
            api_key,
        }
    }

    /// Handle acting as the user holding `access_token`
    pub fn with_access_token(&self, access_token: &str) -> Self {
        Self {
            bearer: access_token.to_string(),
            ..self.clone()
        }
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    async fn send(&self, request: RequestBuilder) -> AdminResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(backend_error(response).await.into())
    }

    async fn rows(response: Response) -> AdminResult<Vec<Value>> {
        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(StorageError::UnexpectedShape {
                message: format!("expected rows, got {other}"),
            }
            .into()),
        }
    }
}

/// Turn a non-success response into a backend error carrying its description
async fn backend_error(response: Response) -> StorageError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: PostgrestErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or_else(|| (!text.is_empty()).then(|| text.clone()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    StorageError::Backend {
        status: status.as_u16(),
        code: body.code,
        message,
        details: body.details,
        hint: body.hint,
    }
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`
///
/// Returns `None` when the total is unknown (`*`) or the header is malformed.
pub fn parse_content_range(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

fn id_filter(id_column: &str, id: &str) -> [(String, String); 1] {
    [(id_column.to_string(), format!("eq.{id}"))]
}

#[async_trait]
impl Backend for PostgrestClient {
    async fn select(&self, query: &TableQuery) -> AdminResult<SelectResult> {
        let mut request = self
            .request(Method::GET, &query.table)
            .query(&query.to_query_pairs());
        if query.exact_count {
            request = request.header("Prefer", "count=exact");
        }

        tracing::debug!(table = %query.table, count = query.exact_count, "postgrest select");
        let response = self.send(request).await?;
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        Ok(SelectResult {
            rows: Self::rows(response).await?,
            total: if query.exact_count { total } else { None },
        })
    }

    async fn insert(&self, table: &str, payload: &Payload) -> AdminResult<Value> {
        let request = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(payload);

        tracing::debug!(table = %table, "postgrest insert");
        let response = self.send(request).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StorageError::UnexpectedShape {
                    message: format!("insert into {table} returned no row"),
                }
                .into()
            })
    }

    async fn update(
        &self,
        table: &str,
        id_column: &str,
        id: &str,
        payload: &Payload,
    ) -> AdminResult<Vec<Value>> {
        let request = self
            .request(Method::PATCH, table)
            .query(&id_filter(id_column, id))
            .header("Prefer", "return=representation")
            .json(payload);

        tracing::debug!(table = %table, id = %id, "postgrest update");
        Self::rows(self.send(request).await?).await
    }

    async fn delete(&self, table: &str, id_column: &str, id: &str) -> AdminResult<Vec<Value>> {
        let request = self
            .request(Method::DELETE, table)
            .query(&id_filter(id_column, id))
            .header("Prefer", "return=representation");

        tracing::debug!(table = %table, id = %id, "postgrest delete");
        Self::rows(self.send(request).await?).await
    }

    async fn rpc(&self, function: &str, args: &Value) -> AdminResult<Value> {
        let request = self
            .request(Method::POST, &format!("rpc/{function}"))
            .json(args);

        tracing::debug!(function = %function, "postgrest rpc");
        let response = self.send(request).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).map_err(|e| StorageError::UnexpectedShape {
            message: format!("{function} returned invalid JSON: {e}"),
        })?)
    }

    fn scoped(&self, access_token: &str) -> Option<Arc<dyn Backend>> {
        Some(Arc::new(self.with_access_token(access_token)))
    }
}

/// Look up a single column of the row whose `id_column` equals `id`
pub(crate) async fn fetch_column(
    client: &PostgrestClient,
    table: &str,
    id_column: &str,
    id: &str,
    column: &str,
) -> AdminResult<Option<Value>> {
    let query = TableQuery::table(table)
        .select(column)
        .eq(id_column, id)
        .range(0, 0);
    let result = client.select(&query).await?;
    Ok(result
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.get(column).cloned())
        .filter(|v| !v.is_null()))
}
