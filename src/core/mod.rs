//! Core module containing the request types, translation and facade

pub mod auth;
pub mod error;
pub mod facade;
pub mod query;
pub mod resource;
pub mod service;
pub mod store;
pub mod translator;

pub use auth::{
    AccessDecision, AccessOutcome, AccessPolicy, AccessPolicyGate, Role, SessionProvider,
    SessionUser,
};
pub use error::{AdminError, AdminResult};
pub use facade::DataAccessFacade;
pub use query::{Filter, FilterOperator, ListRequest, ListResult, Pagination, Sorter, SortDirection};
pub use resource::{ListStrategy, ResourceDefinition, ResourceRegistry};
pub use service::{Backend, DataProvider, DeletedRecord, MutationRequest, Payload};
pub use store::{SelectResult, TableQuery};
pub use translator::{ListPlan, QueryTranslator};
