//! Solr request parameters.
//!
//! [`QueryParams`] keeps insertion order so the wire form is stable and
//! easy to compare in tests. `fq` is the only parameter that repeats.

use serde_json::{Map, Value as Json};

use super::lucene::{self, MATCH_ALL};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// The value when single-valued.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            ParamValue::Multi(_) => None,
        }
    }

    fn to_json(&self) -> Json {
        match self {
            ParamValue::Single(s) => Json::String(s.clone()),
            ParamValue::Multi(v) => Json::Array(v.iter().cloned().map(Json::String).collect()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Single(s)
    }
}

impl From<usize> for ParamValue {
    fn from(n: usize) -> Self {
        ParamValue::Single(n.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Multi(v)
    }
}

/// Ordered wire parameters for one Solr request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Single value of `name`, if present and single-valued.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to name/value pairs, repeating multi-valued names.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (name, value) in &self.entries {
            match value {
                ParamValue::Single(s) => pairs.push((name.clone(), s.clone())),
                ParamValue::Multi(values) => {
                    pairs.extend(values.iter().map(|v| (name.clone(), v.clone())))
                }
            }
        }
        pairs
    }

    /// JSON request envelope: `{"params": {...}}`.
    pub fn to_json_envelope(&self) -> Json {
        let params: Map<String, Json> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let mut envelope = Map::new();
        envelope.insert("params".to_string(), Json::Object(params));
        Json::Object(envelope)
    }
}

/// Builder for [`QueryParams`].
///
/// Parameters are emitted in a fixed order: `q`, `fq`, `fl`, `sort`,
/// `rows`, `cursorMark`, `defType`, then the `extra` overlay.
#[derive(Debug, Clone, Default)]
pub struct ParamsBuilder {
    q: Option<String>,
    fq: Vec<String>,
    fields: Vec<String>,
    sort: Option<String>,
    rows: Option<usize>,
    cursor_mark: Option<String>,
    def_type: Option<String>,
    extra: Vec<(String, ParamValue)>,
}

impl ParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn q(mut self, expr: impl Into<String>) -> Self {
        self.q = Some(expr.into());
        self
    }

    /// Add one filter query. Empty filters are skipped.
    pub fn fq(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.fq.push(filter);
        }
        self
    }

    pub fn fq_all<S: Into<String>>(mut self, filters: impl IntoIterator<Item = S>) -> Self {
        for f in filters {
            self = self.fq(f);
        }
        self
    }

    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, expr: impl Into<String>) -> Self {
        self.sort = Some(expr.into());
        self
    }

    pub fn rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn cursor_mark(mut self, mark: impl Into<String>) -> Self {
        self.cursor_mark = Some(mark.into());
        self
    }

    /// Query parser override, e.g. `edismax`.
    pub fn def_type(mut self, def_type: impl Into<String>) -> Self {
        self.def_type = Some(def_type.into());
        self
    }

    /// Arbitrary parameter applied after everything else.
    pub fn extra(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> QueryParams {
        let mut params = QueryParams::new();
        params.set("q", lucene::q(self.q.as_deref().unwrap_or(MATCH_ALL)));
        if !self.fq.is_empty() {
            params.set("fq", self.fq);
        }
        if !self.fields.is_empty() {
            params.set("fl", lucene::fl(&self.fields));
        }
        if let Some(sort) = self.sort.filter(|s| !s.is_empty()) {
            params.set("sort", sort);
        }
        if let Some(rows) = self.rows {
            params.set("rows", rows);
        }
        if let Some(mark) = self.cursor_mark {
            params.set("cursorMark", mark);
        }
        if let Some(def_type) = self.def_type.filter(|s| !s.is_empty()) {
            params.set("defType", def_type);
        }
        for (name, value) in self.extra {
            params.set(name, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_to_match_all() {
        let params = ParamsBuilder::new().build();
        assert_eq!(params.get_str("q"), Some("*:*"));
        assert_eq!(params.len(), 1);

        let params = ParamsBuilder::new().q("").build();
        assert_eq!(params.get_str("q"), Some("*:*"));
    }

    #[test]
    fn test_full_build_order() {
        let params = ParamsBuilder::new()
            .q("genome_name:coli")
            .fq("genome_status:Complete")
            .fq("")
            .fq("taxon_id:562")
            .fields(["genome_id", "genome_name"])
            .sort("genome_id asc")
            .rows(50)
            .cursor_mark("*")
            .def_type("edismax")
            .build();

        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["q", "fq", "fl", "sort", "rows", "cursorMark", "defType"]);
        assert_eq!(
            params.get("fq"),
            Some(&ParamValue::Multi(vec![
                "genome_status:Complete".to_string(),
                "taxon_id:562".to_string()
            ]))
        );
        assert_eq!(params.get_str("fl"), Some("genome_id,genome_name"));
        assert_eq!(params.get_str("rows"), Some("50"));
    }

    #[test]
    fn test_extra_overrides() {
        let params = ParamsBuilder::new()
            .rows(10)
            .extra("rows", "99")
            .extra("facet", "false")
            .build();
        assert_eq!(params.get_str("rows"), Some("99"));
        assert_eq!(params.get_str("facet"), Some("false"));
    }

    #[test]
    fn test_pairs_repeat_fq() {
        let params = ParamsBuilder::new().fq_all(["a:1", "b:2"]).build();
        assert_eq!(
            params.to_pairs(),
            vec![
                ("q".to_string(), "*:*".to_string()),
                ("fq".to_string(), "a:1".to_string()),
                ("fq".to_string(), "b:2".to_string()),
            ]
        );
    }

    #[test]
    fn test_json_envelope() {
        let params = ParamsBuilder::new().fq("a:1").rows(5).build();
        assert_eq!(
            params.to_json_envelope(),
            json!({"params": {"q": "*:*", "fq": ["a:1"], "rows": "5"}})
        );
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut params = ParamsBuilder::new().sort("a asc").rows(1).build();
        params.set("sort", "b desc");
        let names: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["q", "sort", "rows"]);
        assert_eq!(params.remove("sort"), Some(ParamValue::Single("b desc".into())));
        assert!(!params.contains("sort"));
    }
}
