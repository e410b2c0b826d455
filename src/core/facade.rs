//! Data access facade
//!
//! [`DataAccessFacade`] is the one entry point the presentation layer uses for
//! every resource. Lists go through the [`QueryTranslator`]; single-record
//! operations are direct eq-by-identifier calls on the backing table.

use crate::core::error::{AdminResult, ResourceError};
use crate::core::query::{ListRequest, ListResult};
use crate::core::resource::{ResourceDefinition, ResourceRegistry};
use crate::core::service::{
    Backend, DataProvider, DeletedRecord, MutationKind, MutationRequest, Payload,
};
use crate::core::store::TableQuery;
use crate::core::translator::QueryTranslator;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Stateless facade over one backend handle
#[derive(Clone)]
pub struct DataAccessFacade {
    backend: Arc<dyn Backend>,
    resources: Arc<ResourceRegistry>,
    translator: QueryTranslator,
}

impl DataAccessFacade {
    pub fn new(backend: Arc<dyn Backend>, resources: Arc<ResourceRegistry>) -> Self {
        Self {
            backend,
            translator: QueryTranslator::new(resources.clone()),
            resources,
        }
    }

    /// Facade acting on behalf of one session, when the backend supports it
    pub fn scoped(&self, access_token: Option<&str>) -> Self {
        match access_token.and_then(|token| self.backend.scoped(token)) {
            Some(backend) => Self {
                backend,
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Run a validated single-record mutation
    ///
    /// Creates and updates yield the stored record, deletes yield `{id}`.
    pub async fn execute(&self, request: MutationRequest) -> AdminResult<Value> {
        request.validate()?;
        let MutationRequest {
            kind,
            resource,
            id,
            payload,
        } = request;
        let id = id.unwrap_or_default();
        let payload = payload.unwrap_or_default();

        match kind {
            MutationKind::Create => self.create(&resource, payload).await,
            MutationKind::Update => self.update(&resource, &id, payload).await,
            MutationKind::Delete => {
                let deleted = self.delete_one(&resource, &id).await?;
                Ok(serde_json::to_value(deleted)?)
            }
        }
    }

    fn resolve(&self, resource: &str) -> AdminResult<ResourceDefinition> {
        Ok(self.resources.resolve(resource)?)
    }
}

fn not_found(resource: &str, id: &str) -> ResourceError {
    ResourceError::NotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl DataProvider for DataAccessFacade {
    async fn list(&self, request: &ListRequest) -> AdminResult<ListResult> {
        self.translator.list(self.backend.as_ref(), request).await
    }

    async fn get_one(&self, resource: &str, id: &str) -> AdminResult<Value> {
        let definition = self.resolve(resource)?;
        let query = TableQuery::table(definition.table_name())
            .eq(definition.id_column.as_str(), id)
            .range(0, 0);

        self.backend
            .select(&query)
            .await?
            .rows
            .into_iter()
            .next()
            .ok_or_else(|| not_found(resource, id).into())
    }

    async fn create(&self, resource: &str, payload: Payload) -> AdminResult<Value> {
        let definition = self.resolve(resource)?;
        let record = self
            .backend
            .insert(definition.table_name(), &payload)
            .await?;
        tracing::debug!(resource = %resource, "record created");
        Ok(record)
    }

    async fn update(&self, resource: &str, id: &str, payload: Payload) -> AdminResult<Value> {
        let definition = self.resolve(resource)?;
        let record = self
            .backend
            .update(definition.table_name(), &definition.id_column, id, &payload)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(resource, id))?;
        tracing::debug!(resource = %resource, id = %id, "record updated");
        Ok(record)
    }

    async fn delete_one(&self, resource: &str, id: &str) -> AdminResult<DeletedRecord> {
        let definition = self.resolve(resource)?;
        self.backend
            .delete(definition.table_name(), &definition.id_column, id)
            .await?;
        tracing::debug!(resource = %resource, id = %id, "record deleted");
        Ok(DeletedRecord { id: id.to_string() })
    }
}
