//! Server module exposing the data-access facade over HTTP
//!
//! This module provides a `ServerBuilder` that registers:
//! - resource routes under `/api/{resource}`
//! - health routes (`/health`, `/healthz`)
//! - the access gate in front of every route

pub mod builder;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::{AppState, SessionToken};
pub use middleware::GateState;
