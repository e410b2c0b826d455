//! Service traits for backend access and the data-access facade

use crate::core::error::{AdminResult, ValidationError};
use crate::core::query::{ListRequest, ListResult};
use crate::core::store::{SelectResult, TableQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Field/value payload of a create or update
pub type Payload = Map<String, Value>;

/// Remote data gateway
///
/// Implementations translate each call into exactly one round trip against
/// the hosted backend. Errors are returned as the backend described them.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Read rows from a table or view
    async fn select(&self, query: &TableQuery) -> AdminResult<SelectResult>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, payload: &Payload) -> AdminResult<Value>;

    /// Patch the rows whose `id_column` equals `id`, returning them as stored
    async fn update(
        &self,
        table: &str,
        id_column: &str,
        id: &str,
        payload: &Payload,
    ) -> AdminResult<Vec<Value>>;

    /// Delete the rows whose `id_column` equals `id`, returning them
    async fn delete(&self, table: &str, id_column: &str, id: &str) -> AdminResult<Vec<Value>>;

    /// Invoke a stored procedure with named arguments
    async fn rpc(&self, function: &str, args: &Value) -> AdminResult<Value>;

    /// A handle acting on behalf of the session holding `access_token`
    ///
    /// Backends without per-session identity return `None` and are used as-is.
    fn scoped(&self, _access_token: &str) -> Option<Arc<dyn Backend>> {
        None
    }
}

/// Uniform data operations consumed by the presentation layer
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// One page of a resource; zero matching rows is an empty result
    async fn list(&self, request: &ListRequest) -> AdminResult<ListResult>;

    /// The record with this identifier
    async fn get_one(&self, resource: &str, id: &str) -> AdminResult<Value>;

    /// Insert a record, returning it with server-assigned fields
    async fn create(&self, resource: &str, payload: Payload) -> AdminResult<Value>;

    /// Partially update a record, returning it as stored
    async fn update(&self, resource: &str, id: &str, payload: Payload) -> AdminResult<Value>;

    /// Delete a record, returning only its identifier
    async fn delete_one(&self, resource: &str, id: &str) -> AdminResult<DeletedRecord>;
}

/// Identifier of a deleted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: String,
}

/// Kind of single-record mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

/// A single-record create, update or delete
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub kind: MutationKind,
    pub resource: String,
    pub id: Option<String>,
    pub payload: Option<Payload>,
}

impl MutationRequest {
    pub fn create(resource: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind: MutationKind::Create,
            resource: resource.into(),
            id: None,
            payload: Some(payload),
        }
    }

    pub fn update(resource: impl Into<String>, id: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind: MutationKind::Update,
            resource: resource.into(),
            id: Some(id.into()),
            payload: Some(payload),
        }
    }

    pub fn delete(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::Delete,
            resource: resource.into(),
            id: Some(id.into()),
            payload: None,
        }
    }

    /// Check that id and payload are present exactly where the kind needs them
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidMutation {
            operation: self.kind.as_str().to_string(),
            message: message.to_string(),
        };

        match self.kind {
            MutationKind::Create if self.id.is_some() => {
                Err(invalid("an identifier is assigned by the backend"))
            }
            MutationKind::Create | MutationKind::Update if self.payload.is_none() => {
                Err(invalid("a payload is required"))
            }
            MutationKind::Update | MutationKind::Delete
                if self.id.as_deref().is_none_or(|id| id.trim().is_empty()) =>
            {
                Err(invalid("an identifier is required"))
            }
            _ => Ok(()),
        }
    }
}
