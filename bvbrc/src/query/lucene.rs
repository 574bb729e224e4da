//! Lucene/Solr dialect: `field:value`, bracketed ranges, boolean groups.
//!
//! Unlike RQL, an empty `in_()` here matches everything (`*:*`). Solr has
//! no notion of a dropped top-level clause, so "no constraint" has to be
//! spelled out.

use std::fmt;

use super::value::{encode_lucene, Value};

/// The match-everything query.
pub const MATCH_ALL: &str = "*:*";

/// One end of a range.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Inclusive(Value),
    Exclusive(Value),
    Unbounded,
}

impl Bound {
    fn new(value: Value, inclusive: bool) -> Self {
        if inclusive {
            Bound::Inclusive(value)
        } else {
            Bound::Exclusive(value)
        }
    }

    fn term(&self) -> String {
        match self {
            Bound::Inclusive(v) | Bound::Exclusive(v) => encode_lucene(v),
            Bound::Unbounded => "*".to_string(),
        }
    }
}

/// A Lucene query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Eq { field: String, value: Value },
    Range { field: String, start: Bound, end: Bound },
    In { field: String, values: Vec<Value> },
    And(Vec<Clause>),
    Or(Vec<Clause>),
    MatchAll,
    Raw(String),
}

impl Clause {
    pub fn render(&self) -> String {
        match self {
            Clause::Eq { field, value } => format!("{}:{}", field, encode_lucene(value)),
            Clause::Range { field, start, end } => {
                // An open lower end always opens with '[', an open upper end
                // always closes with ']'.
                let left = match start {
                    Bound::Exclusive(_) => '{',
                    _ => '[',
                };
                let right = match end {
                    Bound::Exclusive(_) => '}',
                    _ => ']',
                };
                format!("{}:{}{} TO {}{}", field, left, start.term(), end.term(), right)
            }
            Clause::In { field, values } => {
                if values.is_empty() {
                    return MATCH_ALL.to_string();
                }
                let terms: Vec<String> = values.iter().map(encode_lucene).collect();
                format!("{}:({})", field, terms.join(" OR "))
            }
            Clause::And(parts) => render_group("AND", parts),
            Clause::Or(parts) => render_group("OR", parts),
            Clause::MatchAll => MATCH_ALL.to_string(),
            Clause::Raw(text) => text.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.render().is_empty()
    }
}

fn render_group(joiner: &str, parts: &[Clause]) -> String {
    let rendered: Vec<String> = parts
        .iter()
        .map(Clause::render)
        .filter(|p| !p.is_empty())
        .collect();
    match rendered.len() {
        0 => String::new(),
        1 => rendered.into_iter().next().unwrap_or_default(),
        _ => format!("({})", rendered.join(&format!(" {} ", joiner))),
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Clause {
    fn from(s: &str) -> Self {
        Clause::Raw(s.to_string())
    }
}

impl From<String> for Clause {
    fn from(s: String) -> Self {
        Clause::Raw(s)
    }
}

/// Normalize a main query: empty means match everything.
pub fn q(expr: &str) -> String {
    if expr.is_empty() {
        MATCH_ALL.to_string()
    } else {
        expr.to_string()
    }
}

pub fn eq(field: &str, value: impl Into<Value>) -> Clause {
    Clause::Eq { field: field.to_string(), value: value.into() }
}

/// Values above `value`; the upper end is open.
pub fn gt(field: &str, value: impl Into<Value>, inclusive: bool) -> Clause {
    Clause::Range {
        field: field.to_string(),
        start: Bound::new(value.into(), inclusive),
        end: Bound::Unbounded,
    }
}

/// Values below `value`; the lower end is open.
pub fn lt(field: &str, value: impl Into<Value>, inclusive: bool) -> Clause {
    Clause::Range {
        field: field.to_string(),
        start: Bound::Unbounded,
        end: Bound::new(value.into(), inclusive),
    }
}

pub fn between(
    field: &str,
    start: impl Into<Value>,
    end: impl Into<Value>,
    include_start: bool,
    include_end: bool,
) -> Clause {
    Clause::Range {
        field: field.to_string(),
        start: Bound::new(start.into(), include_start),
        end: Bound::new(end.into(), include_end),
    }
}

/// Disjunction over `values`. An empty set matches everything.
pub fn in_<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Clause {
    Clause::In {
        field: field.to_string(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

pub fn and(parts: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::And(parts.into_iter().collect())
}

pub fn or(parts: impl IntoIterator<Item = Clause>) -> Clause {
    Clause::Or(parts.into_iter().collect())
}

/// Field list for `fl`.
pub fn fl<S: AsRef<str>>(fields: &[S]) -> String {
    fields.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
}
