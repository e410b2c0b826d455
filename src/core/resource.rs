//! Resource definitions and the registry that resolves them
//!
//! A resource is a named collection the presentation layer addresses by name.
//! Most resources are plain tables listed through the generic query pipeline;
//! a resource can instead be listed through a paged stored procedure that
//! joins and counts server-side.

use crate::core::error::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static RESOURCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("resource name pattern is valid")
});

/// How a resource is listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ListStrategy {
    /// Generic select / filter / order / range against the backing table
    #[default]
    Table,

    /// Stored procedure taking a page size and page number and returning
    /// rows with the matching-row count replicated in `total_column`
    PagedRpc {
        function: String,
        #[serde(default = "default_page_size_arg")]
        page_size_arg: String,
        #[serde(default = "default_page_arg")]
        page_arg: String,
        #[serde(default = "default_total_column")]
        total_column: String,
    },
}

fn default_page_size_arg() -> String {
    "page_size".to_string()
}

fn default_page_arg() -> String {
    "current_page".to_string()
}

fn default_total_column() -> String {
    "total_count".to_string()
}

fn default_id_column() -> String {
    "id".to_string()
}

/// One addressable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Name used by the presentation layer
    pub name: String,

    /// Backing table or view, defaults to `name`
    #[serde(default)]
    pub table: Option<String>,

    /// Identifier column for single-record operations
    #[serde(default = "default_id_column")]
    pub id_column: String,

    #[serde(default)]
    pub list: ListStrategy,
}

impl ResourceDefinition {
    /// Plain table resource backed by a table of the same name
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            id_column: default_id_column(),
            list: ListStrategy::Table,
        }
    }

    /// Resource listed through a paged stored procedure with default argument names
    pub fn paged_rpc(name: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            list: ListStrategy::PagedRpc {
                function: function.into(),
                page_size_arg: default_page_size_arg(),
                page_arg: default_page_arg(),
                total_column: default_total_column(),
            },
            ..Self::table(name)
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// Lookup of resource definitions by name
///
/// Names without a definition resolve to a table of the same name.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    definitions: HashMap<String, ResourceDefinition>,
}

impl ResourceRegistry {
    pub fn new(definitions: impl IntoIterator<Item = ResourceDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Resolve a resource name, rejecting names that cannot be a table
    pub fn resolve(&self, name: &str) -> Result<ResourceDefinition, ValidationError> {
        if !RESOURCE_NAME.is_match(name) {
            return Err(ValidationError::InvalidResource {
                resource: name.to_string(),
            });
        }
        Ok(self
            .definitions
            .get(name)
            .cloned()
            .unwrap_or_else(|| ResourceDefinition::table(name)))
    }

    /// Names with an explicit definition
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
