//! # Roost Admin
//!
//! Data-access core of the Roost back office: staff moderate submitted
//! content, review reports and claims, and manage taxonomies through one
//! uniform facade over a hosted PostgREST backend.
//!
//! ## Features
//!
//! - **Uniform Facade**: list, get-one, create, update and delete for every resource
//! - **Query Translation**: pagination, equality filters and sorters mapped to table queries
//! - **Paged Procedures**: resources listed through a stored procedure that counts server-side
//! - **Access Gate**: per-navigation session and role check with forced sign-out
//! - **Pluggable Backends**: PostgREST over HTTP, or in memory for tests
//! - **Configuration-Based**: YAML file plus environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roost::prelude::*;
//!
//! let backend = InMemoryBackend::new();
//! backend.seed("amenities", vec![json!({"id": 1, "name": "Hide"})])?;
//!
//! let facade = DataAccessFacade::new(Arc::new(backend), Arc::new(ResourceRegistry::default()));
//! let page = facade.list(&ListRequest::new("amenities").page(1, 10)).await?;
//! assert_eq!(page.total, 1);
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{
            AccessDecision, AccessOutcome, AccessPolicy, AccessPolicyGate, Role, SessionProvider,
            SessionUser,
        },
        error::{AdminError, AdminResult},
        facade::DataAccessFacade,
        query::{Filter, FilterOperator, ListRequest, ListResult, Pagination, Sorter},
        resource::{ListStrategy, ResourceDefinition, ResourceRegistry},
        service::{Backend, DataProvider, DeletedRecord, MutationRequest, Payload},
        store::{SelectResult, TableQuery},
        translator::{ListPlan, QueryTranslator},
    };

    // === Storage ===
    pub use crate::storage::{
        GoTrueSessionProvider, InMemoryBackend, InMemorySessionProvider, PostgrestClient,
    };

    // === Config ===
    pub use crate::config::AdminConfig;

    // === Server ===
    pub use crate::server::ServerBuilder;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;
}
