//! ServerBuilder for fluent API to build the admin HTTP server

use super::handlers::AppState;
use super::middleware::GateState;
use super::router::build_router;
use crate::config::AdminConfig;
use crate::core::auth::{AccessPolicyGate, SessionProvider};
use crate::core::facade::DataAccessFacade;
use crate::core::resource::ResourceRegistry;
use crate::core::service::Backend;
use crate::storage::{GoTrueSessionProvider, PostgrestClient};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the admin HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(config)
///     .with_backend(InMemoryBackend::new())
///     .with_session_provider(InMemorySessionProvider::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AdminConfig,
    backend: Option<Arc<dyn Backend>>,
    session_provider: Option<Arc<dyn SessionProvider>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with the built-in configuration
    pub fn new() -> Self {
        Self {
            config: AdminConfig::default_config(),
            backend: None,
            session_provider: None,
            custom_routes: Vec::new(),
        }
    }

    /// Builder wired to the hosted backend described by `config`
    ///
    /// Data calls use the public key and act as the signed-in user; role
    /// lookups use the privileged key against the configured profile table.
    pub fn connect(config: AdminConfig) -> Self {
        let backend = &config.backend;
        let data = PostgrestClient::new(&backend.url, backend.anon_key.clone());
        let profiles = PostgrestClient::new(&backend.url, backend.privileged_key().to_string());
        let sessions = GoTrueSessionProvider::new(&backend.url, backend.anon_key.clone(), profiles)
            .with_profile_source(backend.profiles_table.clone(), backend.role_column.clone());

        Self::new()
            .with_config(config)
            .with_backend(data)
            .with_session_provider(sessions)
    }

    pub fn with_config(mut self, config: AdminConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the backend (required)
    pub fn with_backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Set the session provider; without one the access gate is not installed
    pub fn with_session_provider(mut self, provider: impl SessionProvider + 'static) -> Self {
        self.session_provider = Some(Arc::new(provider));
        self
    }

    /// Add custom routes to the server
    ///
    /// Custom routes sit behind the access gate like the resource routes.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the final router
    pub fn build(self) -> Result<Router> {
        let backend = self
            .backend
            .ok_or_else(|| anyhow::anyhow!("Backend is required. Call .with_backend()"))?;

        let resources = Arc::new(ResourceRegistry::new(self.config.resources.clone()));
        let state = AppState {
            facade: DataAccessFacade::new(backend, resources),
            default_page_size: self.config.pagination.default_page_size,
        };

        let gate = match self.session_provider {
            Some(provider) => Some(GateState {
                gate: Arc::new(AccessPolicyGate::new(self.config.access.clone(), provider)),
                session_cookie: self.config.server.session_cookie.clone(),
            }),
            None => {
                tracing::warn!("no session provider configured, access gate disabled");
                None
            }
        };

        Ok(build_router(state, gate, self.custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to `server.listen_addr` and handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.listen_addr.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
