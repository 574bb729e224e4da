//! RQL dialect: `eq(field,value)`, `and(...)`, `select(...)` and friends.
//!
//! Empty input never means "match nothing" here. A combinator or `in()`
//! with nothing to say renders as the empty string, and the request layer
//! drops empty clauses when it joins the body.

use std::collections::BTreeMap;
use std::fmt;

use super::value::{encode_rql, percent_encode, Value};
use crate::{Error, Result};

/// Number of rows requested when the caller does not set a limit.
pub const DEFAULT_LIMIT: usize = 1000;

/// Comparison operators understood by the RQL endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
}

impl CmpOp {
    fn name(self) -> &'static str {
        match self {
            CmpOp::Eq => "eq",
            CmpOp::Gt => "gt",
            CmpOp::Lt => "lt",
        }
    }
}

/// An RQL predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Cmp { op: CmpOp, field: String, value: Value },
    In { field: String, values: Vec<Value> },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    /// Full-text `keyword(...)` search.
    Keyword(String),
    /// Pre-rendered RQL passed through untouched.
    Raw(String),
}

impl Filter {
    /// Render to the wire form. May be empty.
    pub fn render(&self) -> String {
        match self {
            Filter::Cmp { op, field, value } => {
                format!("{}({},{})", op.name(), field, encode_rql(value))
            }
            Filter::In { field, values } => {
                if values.is_empty() {
                    return String::new();
                }
                let encoded: Vec<String> = values.iter().map(encode_rql).collect();
                format!("in({},{})", field, encoded.join(","))
            }
            Filter::And(parts) => render_group("and", parts),
            Filter::Or(parts) => render_group("or", parts),
            Filter::Keyword(text) => format!("keyword({})", percent_encode(text)),
            Filter::Raw(text) => text.clone(),
        }
    }

    /// True when the filter renders to nothing (no constraint).
    pub fn is_empty(&self) -> bool {
        self.render().is_empty()
    }

    /// True when every value in the tree is encodable (no NaN or infinity).
    pub fn is_finite(&self) -> bool {
        match self {
            Filter::Cmp { value, .. } => value.is_finite(),
            Filter::In { values, .. } => values.iter().all(Value::is_finite),
            Filter::And(parts) | Filter::Or(parts) => parts.iter().all(Filter::is_finite),
            Filter::Keyword(_) | Filter::Raw(_) => true,
        }
    }
}

fn render_group(name: &str, parts: &[Filter]) -> String {
    let rendered: Vec<String> = parts
        .iter()
        .map(Filter::render)
        .filter(|p| !p.is_empty())
        .collect();
    match rendered.len() {
        0 => String::new(),
        1 => rendered.into_iter().next().unwrap_or_default(),
        _ => format!("{}({})", name, rendered.join(",")),
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Filter {
    fn from(s: &str) -> Self {
        Filter::Raw(s.to_string())
    }
}

impl From<String> for Filter {
    fn from(s: String) -> Self {
        Filter::Raw(s)
    }
}

pub fn eq(field: &str, value: impl Into<Value>) -> Filter {
    Filter::Cmp { op: CmpOp::Eq, field: field.to_string(), value: value.into() }
}

pub fn gt(field: &str, value: impl Into<Value>) -> Filter {
    Filter::Cmp { op: CmpOp::Gt, field: field.to_string(), value: value.into() }
}

pub fn lt(field: &str, value: impl Into<Value>) -> Filter {
    Filter::Cmp { op: CmpOp::Lt, field: field.to_string(), value: value.into() }
}

pub fn and(parts: impl IntoIterator<Item = Filter>) -> Filter {
    Filter::And(parts.into_iter().collect())
}

pub fn or(parts: impl IntoIterator<Item = Filter>) -> Filter {
    Filter::Or(parts.into_iter().collect())
}

/// Set membership. An empty set is no constraint, not an empty match.
pub fn in_<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Filter {
    Filter::In {
        field: field.to_string(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

pub fn keyword(text: &str) -> Filter {
    Filter::Keyword(text.to_string())
}

/// One `eq` per entry of the mapping.
pub fn eqs_from(filters: &BTreeMap<String, Value>) -> Vec<Filter> {
    filters.iter().map(|(k, v)| eq(k, v.clone())).collect()
}

/// AND together one `eq` per entry. A single entry stays unwrapped.
pub fn build_and_from(filters: &BTreeMap<String, Value>) -> Filter {
    and(eqs_from(filters))
}

// Directives

pub fn select<S: AsRef<str>>(fields: &[S]) -> String {
    if fields.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
    format!("select({})", names.join(","))
}

pub fn sort(expr: &str) -> String {
    if expr.is_empty() {
        String::new()
    } else {
        format!("sort({})", expr)
    }
}

pub fn limit(n: Option<usize>) -> String {
    n.map(|n| format!("limit({})", n)).unwrap_or_default()
}

pub fn http_download(enable: bool) -> String {
    if enable {
        "http_download=true".to_string()
    } else {
        String::new()
    }
}

/// Per-request options for the RQL endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RqlOptions {
    /// Fields to return (`select(...)`).
    pub select: Vec<String>,
    /// Sort expression, e.g. `+genome_id` or `genome_name asc`.
    pub sort: Option<String>,
    /// Row limit. Defaults to [`DEFAULT_LIMIT`].
    pub limit: Option<usize>,
    /// Bulk download mode. Requires `sort`.
    pub http_download: bool,
}

impl RqlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, expr: impl Into<String>) -> Self {
        self.sort = Some(expr.into());
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn http_download(mut self, enable: bool) -> Self {
        self.http_download = enable;
        self
    }
}

/// Assemble the `&`-joined request body for the RQL endpoint.
pub fn build_body(filter: &Filter, options: &RqlOptions) -> Result<String> {
    let sort_expr = options.sort.as_deref().unwrap_or("");
    if options.http_download && sort_expr.is_empty() {
        return Err(Error::Validation(
            "sort is required when http_download is enabled".to_string(),
        ));
    }
    if !filter.is_finite() {
        return Err(Error::Validation(
            "NaN and infinite floats have no RQL encoding".to_string(),
        ));
    }

    let parts = [
        filter.render(),
        select(&options.select),
        sort(sort_expr),
        limit(Some(options.limit.unwrap_or(DEFAULT_LIMIT))),
        http_download(options.http_download),
    ];

    Ok(parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("&"))
}
