//! Table query builder shared by every backend
//!
//! A [`TableQuery`] is the backend-neutral description of a read against one
//! table or view: a projection, equality predicates, ordering, a row range and
//! whether an exact count is wanted. The HTTP backend renders it to PostgREST
//! query parameters; the in-memory backend evaluates it directly.

use serde_json::Value;

/// Equality predicate on one column
///
/// A null value tests for SQL `NULL` (`is.null`) rather than comparing.
#[derive(Debug, Clone, PartialEq)]
pub struct EqPredicate {
    pub column: String,
    pub value: Value,
}

impl EqPredicate {
    /// PostgREST operand for this predicate
    pub fn operand(&self) -> String {
        match &self.value {
            Value::Null => "is.null".to_string(),
            value => format!("eq.{}", filter_literal(value)),
        }
    }

    /// Whether a stored column value satisfies this predicate
    ///
    /// A missing column counts as null, and null never equals anything.
    pub fn matches(&self, stored: Option<&Value>) -> bool {
        match (stored.filter(|v| !v.is_null()), &self.value) {
            (None, Value::Null) => true,
            (Some(_), Value::Null) | (None, _) => false,
            (Some(v), expected) => filter_literal(v) == filter_literal(expected),
        }
    }
}

/// Order clause on one column
#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub column: String,
    pub ascending: bool,
}

/// A read against one table or view
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub columns: String,
    pub predicates: Vec<EqPredicate>,
    pub order: Vec<OrderClause>,
    /// Inclusive `[start, end]` row range
    pub range: Option<(u64, u64)>,
    pub exact_count: bool,
}

impl TableQuery {
    /// Select every column of `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            predicates: Vec::new(),
            order: Vec::new(),
            range: None,
            exact_count: false,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(EqPredicate {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(OrderClause {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn range(mut self, start: u64, end: u64) -> Self {
        self.range = Some((start, end));
        self
    }

    pub fn exact_count(mut self) -> Self {
        self.exact_count = true;
        self
    }

    /// Render as PostgREST query parameters
    ///
    /// The count request travels in a header and is not part of the output.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), compact_columns(&self.columns))];

        for predicate in &self.predicates {
            pairs.push((predicate.column.clone(), predicate.operand()));
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some((start, end)) = self.range {
            pairs.push(("offset".to_string(), start.to_string()));
            pairs.push((
                "limit".to_string(),
                end.saturating_add(1).saturating_sub(start).to_string(),
            ));
        }

        pairs
    }
}

/// Text form of a filter value as the backend compares it
pub fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Strip whitespace outside quoted identifiers, as PostgREST expects
fn compact_columns(columns: &str) -> String {
    let mut quoted = false;
    columns
        .chars()
        .filter(|c| {
            if *c == '"' {
                quoted = !quoted;
            }
            quoted || !c.is_whitespace()
        })
        .collect()
}

/// Rows returned by a read, plus the exact count when one was requested
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectResult {
    pub rows: Vec<Value>,
    pub total: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn test_default_query_selects_everything() {
        let query = TableQuery::table("amenities");
        assert_eq!(query.to_query_pairs(), vec![pair("select", "*")]);
        assert!(!query.exact_count);
    }

    #[test]
    fn test_full_query_rendering() {
        let query = TableQuery::table("cities")
            .select("id, name, states(name)")
            .eq("state_id", 4)
            .eq("published", true)
            .eq("slug", "austin")
            .order("name", true)
            .order("created_at", false)
            .range(20, 29)
            .exact_count();

        assert_eq!(
            query.to_query_pairs(),
            vec![
                pair("select", "id,name,states(name)"),
                pair("state_id", "eq.4"),
                pair("published", "eq.true"),
                pair("slug", "eq.austin"),
                pair("order", "name.asc,created_at.desc"),
                pair("offset", "20"),
                pair("limit", "10"),
            ]
        );
        assert!(query.exact_count);
    }

    #[test]
    fn test_filter_literal() {
        assert_eq!(filter_literal(&json!("pending")), "pending");
        assert_eq!(filter_literal(&json!(12)), "12");
        assert_eq!(filter_literal(&json!(false)), "false");
        assert_eq!(filter_literal(&json!(null)), "null");
    }

    #[test]
    fn test_null_predicate_renders_is_null() {
        let query = TableQuery::table("claims").eq("reviewed_at", Value::Null).eq("status", "null");
        assert_eq!(
            query.to_query_pairs(),
            vec![
                pair("select", "*"),
                pair("reviewed_at", "is.null"),
                pair("status", "eq.null"),
            ]
        );
    }

    #[test]
    fn test_predicate_matching_follows_sql_null() {
        let is_null = EqPredicate {
            column: "reviewed_at".to_string(),
            value: Value::Null,
        };
        assert!(is_null.matches(None));
        assert!(is_null.matches(Some(&json!(null))));
        assert!(!is_null.matches(Some(&json!("null"))));

        let eq_text = EqPredicate {
            column: "status".to_string(),
            value: json!("null"),
        };
        assert!(!eq_text.matches(Some(&json!(null))));
        assert!(!eq_text.matches(None));
        assert!(eq_text.matches(Some(&json!("null"))));

        let eq_number = EqPredicate {
            column: "likes".to_string(),
            value: json!(5),
        };
        assert!(eq_number.matches(Some(&json!("5"))));
        assert!(!eq_number.matches(Some(&json!(6))));
    }

    #[test]
    fn test_unbounded_range_does_not_overflow() {
        let query = TableQuery::table("photos").range(u64::MAX, u64::MAX);
        assert!(query.to_query_pairs().contains(&pair("limit", "0")));
    }

    #[test]
    fn test_quoted_columns_keep_spaces() {
        let query = TableQuery::table("photos").select(r#"id, "display name""#);
        assert_eq!(
            query.to_query_pairs(),
            vec![pair("select", r#"id,"display name""#)]
        );
    }
}
