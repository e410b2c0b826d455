//! Translation of list requests into backend reads
//!
//! Planning is pure: [`QueryTranslator::plan`] turns a [`ListRequest`] into a
//! [`ListPlan`] without touching the backend, and [`QueryTranslator::execute`]
//! runs the plan. Table-backed resources go through the generic
//! select/filter/order/range pipeline; resources configured with
//! [`ListStrategy::PagedRpc`] are served by a stored procedure that applies its
//! own fixed predicate, so caller filters and sorters are not forwarded.

use crate::core::error::{AdminResult, StorageError};
use crate::core::query::{FilterOperator, ListRequest, ListResult, Pagination};
use crate::core::resource::{ListStrategy, ResourceRegistry};
use crate::core::service::Backend;
use crate::core::store::TableQuery;
use serde_json::{Map, Value};
use std::sync::Arc;

/// How one list request will be served
#[derive(Debug, Clone, PartialEq)]
pub enum ListPlan {
    /// Generic read with an exact count
    Table {
        query: TableQuery,
        page_size: u64,
    },

    /// Paged stored procedure call
    PagedRpc {
        function: String,
        args: Value,
        total_column: String,
    },
}

/// Resource query translator
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    resources: Arc<ResourceRegistry>,
}

impl QueryTranslator {
    pub fn new(resources: Arc<ResourceRegistry>) -> Self {
        Self { resources }
    }

    /// Validate the request and decide how it is served
    pub fn plan(&self, request: &ListRequest) -> AdminResult<ListPlan> {
        request.validate()?;
        let resource = self.resources.resolve(&request.resource)?;
        let Pagination { page, page_size } = request.pagination;

        let plan = match resource.list {
            ListStrategy::PagedRpc {
                function,
                page_size_arg,
                page_arg,
                total_column,
            } => {
                let mut args = Map::new();
                args.insert(page_size_arg, Value::from(page_size));
                args.insert(page_arg, Value::from(page));
                ListPlan::PagedRpc {
                    function,
                    args: Value::Object(args),
                    total_column,
                }
            }
            ListStrategy::Table => {
                let mut query =
                    TableQuery::table(resource.table_name()).select(request.selection.trim());

                for filter in &request.filters {
                    match filter.operator {
                        FilterOperator::Eq => {
                            query = query.eq(filter.field.clone(), filter.value.clone());
                        }
                    }
                }
                for sorter in &request.sorters {
                    query = query.order(sorter.field.clone(), sorter.direction.is_ascending());
                }

                let (start, end) = request.pagination.range();
                ListPlan::Table {
                    query: query.range(start, end).exact_count(),
                    page_size,
                }
            }
        };
        Ok(plan)
    }

    /// Run a plan against the backend
    pub async fn execute(&self, backend: &dyn Backend, plan: ListPlan) -> AdminResult<ListResult> {
        match plan {
            ListPlan::Table { query, page_size } => {
                let result = backend.select(&query).await?;
                let mut rows = result.rows;
                let total = result.total.unwrap_or(rows.len() as u64);
                rows.truncate(page_size as usize);
                Ok(ListResult { rows, total })
            }
            ListPlan::PagedRpc {
                function,
                args,
                total_column,
            } => {
                let rows = match backend.rpc(&function, &args).await? {
                    Value::Array(rows) => rows,
                    Value::Null => Vec::new(),
                    other => {
                        return Err(StorageError::UnexpectedShape {
                            message: format!(
                                "{function} returned {} instead of a row set",
                                json_kind(&other)
                            ),
                        }
                        .into());
                    }
                };
                let total = match rows.first() {
                    Some(first) => replicated_total(first, &total_column).unwrap_or_else(|| {
                        tracing::warn!(
                            function = %function,
                            column = %total_column,
                            "paged procedure row carries no usable count, using row count"
                        );
                        rows.len() as u64
                    }),
                    None => 0,
                };
                Ok(ListResult { rows, total })
            }
        }
    }

    /// Plan and execute in one step
    pub async fn list(&self, backend: &dyn Backend, request: &ListRequest) -> AdminResult<ListResult> {
        let plan = self.plan(request)?;
        tracing::debug!(
            resource = %request.resource,
            page = request.pagination.page,
            page_size = request.pagination.page_size,
            strategy = match &plan {
                ListPlan::Table { .. } => "table",
                ListPlan::PagedRpc { .. } => "paged_rpc",
            },
            "listing resource"
        );
        self.execute(backend, plan).await
    }
}

/// Count column of a paged-procedure row, as a number or numeric string
fn replicated_total(row: &Value, column: &str) -> Option<u64> {
    match row.get(column)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
