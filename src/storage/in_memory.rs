//! In-memory backend and session provider for testing and development

use crate::core::auth::{SessionProvider, SessionUser};
use crate::core::error::{AdminError, AdminResult, StorageError};
use crate::core::service::{Backend, Payload};
use crate::core::store::{SelectResult, TableQuery, filter_literal};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

type RpcHandler = Arc<dyn Fn(&Value) -> AdminResult<Value> + Send + Sync>;

fn lock_error(e: impl std::fmt::Display) -> AdminError {
    StorageError::Unavailable {
        backend: "in-memory".to_string(),
        message: format!("failed to acquire lock: {e}"),
    }
    .into()
}

/// In-memory backend
///
/// Tables are vectors of JSON rows keyed by table name. Stored procedures are
/// closures registered by name. Uses RwLock for thread-safe access.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    procedures: Arc<RwLock<HashMap<String, RpcHandler>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to a table, creating it if needed
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) -> AdminResult<()> {
        let mut tables = self.tables.write().map_err(lock_error)?;
        tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    /// Register a stored procedure
    pub fn register_rpc(
        &self,
        function: &str,
        handler: impl Fn(&Value) -> AdminResult<Value> + Send + Sync + 'static,
    ) -> AdminResult<()> {
        let mut procedures = self.procedures.write().map_err(lock_error)?;
        procedures.insert(function.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Snapshot of a table's rows in storage order
    pub fn rows(&self, table: &str) -> AdminResult<Vec<Value>> {
        let tables = self.tables.read().map_err(lock_error)?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }
}

/// Value at a possibly dotted path
fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |value, key| value.get(key))
}

fn matches_id(row: &Value, id_column: &str, id: &str) -> bool {
    row.get(id_column)
        .is_some_and(|value| filter_literal(value) == id)
}

/// Total order over JSON scalars with nulls sorting last
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => filter_literal(x).cmp(&filter_literal(y)),
    }
}

fn project(row: Value, columns: &str) -> Value {
    let wanted: Vec<&str> = columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if wanted.contains(&"*") {
        return row;
    }
    let Value::Object(source) = row else {
        return row;
    };
    // Embedded resources are not modelled here.
    Value::Object(
        wanted
            .into_iter()
            .filter(|c| !c.contains('('))
            .filter_map(|c| source.get(c).map(|v| (c.to_string(), v.clone())))
            .collect(),
    )
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn select(&self, query: &TableQuery) -> AdminResult<SelectResult> {
        let tables = self.tables.read().map_err(lock_error)?;
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .predicates
                            .iter()
                            .all(|p| p.matches(lookup(row, &p.column)))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);

        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|o| {
                        let ordering = compare_values(lookup(a, &o.column), lookup(b, &o.column));
                        if o.ascending { ordering } else { ordering.reverse() }
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let total = query.exact_count.then_some(rows.len() as u64);
        let rows = match query.range {
            Some((start, end)) => rows
                .into_iter()
                .skip(start as usize)
                .take(end.saturating_add(1).saturating_sub(start) as usize)
                .collect(),
            None => rows,
        };

        Ok(SelectResult {
            rows: rows
                .into_iter()
                .map(|row| project(row, &query.columns))
                .collect(),
            total,
        })
    }

    async fn insert(&self, table: &str, payload: &Payload) -> AdminResult<Value> {
        let mut row = payload.clone();
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        let row = Value::Object(row);

        let mut tables = self.tables.write().map_err(lock_error)?;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        id_column: &str,
        id: &str,
        payload: &Payload,
    ) -> AdminResult<Vec<Value>> {
        let mut tables = self.tables.write().map_err(lock_error)?;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_id(row, id_column, id)) {
            if let Value::Object(fields) = row {
                for (key, value) in payload {
                    fields.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, id_column: &str, id: &str) -> AdminResult<Vec<Value>> {
        let mut tables = self.tables.write().map_err(lock_error)?;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let (deleted, kept): (Vec<Value>, Vec<Value>) = rows
            .drain(..)
            .partition(|row| matches_id(row, id_column, id));
        *rows = kept;
        Ok(deleted)
    }

    async fn rpc(&self, function: &str, args: &Value) -> AdminResult<Value> {
        let handler = {
            let procedures = self.procedures.read().map_err(lock_error)?;
            procedures.get(function).cloned()
        };
        match handler {
            Some(handler) => handler(args),
            None => Err(StorageError::Backend {
                status: 404,
                code: Some("PGRST202".to_string()),
                message: format!("Could not find the function public.{function}"),
                details: None,
                hint: None,
            }
            .into()),
        }
    }
}

/// In-memory session provider
///
/// Sessions map tokens to users; roles map user ids to role tags. Signing out
/// removes the session.
#[derive(Clone, Default)]
pub struct InMemorySessionProvider {
    sessions: Arc<RwLock<HashMap<String, SessionUser>>>,
    roles: Arc<RwLock<HashMap<String, String>>>,
    unavailable_roles: bool,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `user_id` under `token`
    pub fn with_session(self, token: &str, user_id: &str) -> Self {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(
                token.to_string(),
                SessionUser {
                    id: user_id.to_string(),
                    email: None,
                },
            );
        }
        self
    }

    /// Set the profile role of `user_id`
    pub fn with_role(self, user_id: &str, role: &str) -> Self {
        if let Ok(mut roles) = self.roles.write() {
            roles.insert(user_id.to_string(), role.to_string());
        }
        self
    }

    /// Make every role lookup fail
    pub fn with_unavailable_roles(mut self) -> Self {
        self.unavailable_roles = true;
        self
    }

    /// Whether `token` still maps to a session
    pub fn is_active(&self, token: &str) -> bool {
        self.sessions
            .read()
            .map(|sessions| sessions.contains_key(token))
            .unwrap_or(false)
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn current_user(&self, access_token: &str) -> AdminResult<Option<SessionUser>> {
        let sessions = self.sessions.read().map_err(lock_error)?;
        Ok(sessions.get(access_token).cloned())
    }

    async fn lookup_role(&self, user_id: &str) -> AdminResult<Option<String>> {
        if self.unavailable_roles {
            return Err(StorageError::Unavailable {
                backend: "in-memory".to_string(),
                message: "role lookups disabled".to_string(),
            }
            .into());
        }
        let roles = self.roles.read().map_err(lock_error)?;
        Ok(roles.get(user_id).cloned())
    }

    async fn sign_out(&self, access_token: &str) -> AdminResult<()> {
        let mut sessions = self.sessions.write().map_err(lock_error)?;
        sessions.remove(access_token);
        Ok(())
    }
}
