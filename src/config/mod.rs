//! Configuration loading and management
//!
//! Configuration comes from a YAML file (or the built-in defaults) and is then
//! overridden from the environment:
//!
//! | variable                 | field                       |
//! |--------------------------|-----------------------------|
//! | `ROOST_BACKEND_URL`      | `backend.url`               |
//! | `ROOST_ANON_KEY`         | `backend.anon_key`          |
//! | `ROOST_SERVICE_ROLE_KEY` | `backend.service_role_key`  |
//! | `ROOST_LISTEN_ADDR`      | `server.listen_addr`        |
//!
//! `ROOST_CONFIG` names the YAML file read by the binary.

use crate::core::auth::AccessPolicy;
use crate::core::error::ConfigError;
use crate::core::query::MAX_PAGE_SIZE;
use crate::core::resource::ResourceDefinition;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::SocketAddr;

pub const ENV_CONFIG_PATH: &str = "ROOST_CONFIG";
pub const ENV_BACKEND_URL: &str = "ROOST_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "ROOST_ANON_KEY";
pub const ENV_SERVICE_ROLE_KEY: &str = "ROOST_SERVICE_ROLE_KEY";
pub const ENV_LISTEN_ADDR: &str = "ROOST_LISTEN_ADDR";

/// Where the hosted backend lives and which keys to use
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL; `/rest/v1` and `/auth/v1` are appended
    pub url: String,

    /// Public key sent as `apikey` on every request
    #[serde(default)]
    pub anon_key: String,

    /// Privileged key for role lookups; falls back to `anon_key`
    #[serde(default)]
    pub service_role_key: Option<String>,

    /// Table holding one profile row per user, keyed by `id`
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,

    /// Column of `profiles_table` holding the role tag
    #[serde(default = "default_role_column")]
    pub role_column: String,
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

fn default_role_column() -> String {
    "role".to_string()
}

impl BackendConfig {
    /// Key used for lookups that must bypass row-level security
    pub fn privileged_key(&self) -> &str {
        self.service_role_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.anon_key)
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "<redacted>"),
            )
            .field("profiles_table", &self.profiles_table)
            .field("role_column", &self.role_column)
            .finish()
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_session_cookie() -> String {
    "sb-access-token".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Cookie carrying the access token when no `Authorization` header is sent
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            session_cookie: default_session_cookie(),
        }
    }
}

fn default_page_size() -> u64 {
    crate::core::query::DEFAULT_PAGE_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when a list request carries none (or a bad one)
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

/// Complete configuration for the admin service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub backend: BackendConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub access: AccessPolicy,

    /// Resources needing more than the table-of-the-same-name default
    ///
    /// Entries read from YAML replace the built-in entry of the same name
    /// and keep the rest, so `reports` stays a paged procedure unless
    /// redefined.
    #[serde(
        default = "default_resources",
        deserialize_with = "merge_over_default_resources"
    )]
    pub resources: Vec<ResourceDefinition>,
}

/// Built-in resource set: `reports` through its counting procedure, the
/// remaining back-office tables by name
pub fn default_resources() -> Vec<ResourceDefinition> {
    let tables = [
        "amenities",
        "categories",
        "services",
        "cities",
        "states",
        "images",
        "comments",
        "photos",
        "claims",
        "emails",
    ];

    let mut resources = vec![ResourceDefinition::paged_rpc(
        "reports",
        "get_pending_reports_with_details",
    )];
    resources.extend(tables.into_iter().map(ResourceDefinition::table));
    resources
}

fn merge_over_default_resources<'de, D>(deserializer: D) -> Result<Vec<ResourceDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    let configured = Vec::<ResourceDefinition>::deserialize(deserializer)?;
    let mut resources = default_resources();
    for definition in configured {
        match resources.iter_mut().find(|r| r.name == definition.name) {
            Some(slot) => *slot = definition,
            None => resources.push(definition),
        }
    }
    Ok(resources)
}

impl AdminConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("cannot read '{path}': {e}"),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Built-in configuration for a local backend
    ///
    /// Keys are left empty and must come from the environment.
    pub fn default_config() -> Self {
        Self {
            backend: BackendConfig {
                url: "http://127.0.0.1:54321".to_string(),
                anon_key: String::new(),
                service_role_key: None,
                profiles_table: default_profiles_table(),
                role_column: default_role_column(),
            },
            server: ServerConfig::default(),
            pagination: PaginationConfig::default(),
            access: AccessPolicy::default(),
            resources: default_resources(),
        }
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = get(ENV_ANON_KEY) {
            self.backend.anon_key = key;
        }
        if let Some(key) = get(ENV_SERVICE_ROLE_KEY) {
            self.backend.service_role_key = Some(key);
        }
        if let Some(addr) = get(ENV_LISTEN_ADDR) {
            self.server.listen_addr = addr;
        }
        self
    }

    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("backend.url", url, "must be an http(s) URL"));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(invalid(
                "backend.anon_key",
                "",
                &format!("must be set (or provide {ENV_ANON_KEY})"),
            ));
        }
        if self.server.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "server.listen_addr",
                &self.server.listen_addr,
                "must be a socket address such as 127.0.0.1:3000",
            ));
        }
        if self.server.session_cookie.is_empty() {
            return Err(invalid("server.session_cookie", "", "must not be empty"));
        }
        if self.pagination.default_page_size == 0 {
            return Err(invalid("pagination.default_page_size", "0", "must be at least 1"));
        }
        if self.pagination.default_page_size > MAX_PAGE_SIZE {
            return Err(invalid(
                "pagination.default_page_size",
                &self.pagination.default_page_size.to_string(),
                &format!("must be at most {MAX_PAGE_SIZE}"),
            ));
        }
        for (field, name) in [
            ("backend.profiles_table", &self.backend.profiles_table),
            ("backend.role_column", &self.backend.role_column),
        ] {
            if name.trim().is_empty() {
                return Err(invalid(field, name, "must not be empty"));
            }
        }
        for (field, path) in [
            ("access.login_path", &self.access.login_path),
            ("access.home_path", &self.access.home_path),
        ] {
            if !path.starts_with('/') {
                return Err(invalid(field, path, "must start with '/'"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
