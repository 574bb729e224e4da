//! Scalar values and their literal encodings in each query dialect.

use std::fmt;

/// A scalar value that can appear on the right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // Plain decimal, never exponent form; whole floats keep ".0"
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) if x.is_finite() => write!(f, "{}", x),
            Value::Float(x) if x.is_nan() => f.write_str("NaN"),
            Value::Float(x) if *x > 0.0 => f.write_str("Infinity"),
            Value::Float(_) => f.write_str("-Infinity"),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl Value {
    /// False only for NaN and infinite floats.
    pub fn is_finite(&self) -> bool {
        !matches!(self, Value::Float(x) if !x.is_finite())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Encode a value for an RQL argument position.
///
/// The bare strings `+` and `-` are operators in the RQL grammar, so they
/// are quoted before percent-encoding.
pub fn encode_rql(value: &Value) -> String {
    match value {
        Value::Str(s) if s == "+" || s == "-" => percent_encode(&format!("\"{}\"", s)),
        other => percent_encode(&other.to_string()),
    }
}

/// Encode a value as a Lucene term.
///
/// Numeric-looking strings (genome ids such as `208964.12`) stay unquoted;
/// the backend indexes those id fields as plain tokens. Non-finite floats
/// render as `NaN`, `Infinity` or `-Infinity`, the spellings Solr's float
/// parser accepts.
pub fn encode_lucene(value: &Value) -> String {
    match value {
        Value::Null => "\"\"".to_string(),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => value.to_string(),
        Value::Str(s) if looks_numeric(s) => s.clone(),
        Value::Str(s) => format!("\"{}\"", escape_lucene(s)),
    }
}

/// Digits with at most one `.` and an optional leading `-`.
///
/// A `-` anywhere else (`12-3`, `2024-`) makes the value text.
pub fn looks_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let digits = unsigned.replacen('.', "", 1);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Backslash-escape Lucene query syntax characters.
pub fn escape_lucene(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~'
                | '*' | '?' | ':' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn percent_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_rql_plain() {
        assert_eq!(encode_rql(&"208964.12".into()), "208964.12");
        assert_eq!(encode_rql(&"Escherichia coli".into()), "Escherichia%20coli");
        assert_eq!(encode_rql(&"a/b,c".into()), "a%2Fb%2Cc");
    }

    #[test]
    fn test_encode_rql_operator_literals() {
        assert_eq!(encode_rql(&"+".into()), "%22%2B%22");
        assert_eq!(encode_rql(&"-".into()), "%22-%22");
        // Only the bare operator is special
        assert_eq!(encode_rql(&"a+b".into()), "a%2Bb");
    }

    #[test]
    fn test_encode_rql_scalars() {
        assert_eq!(encode_rql(&true.into()), "true");
        assert_eq!(encode_rql(&42.into()), "42");
        assert_eq!(encode_rql(&50.0.into()), "50.0");
    }

    #[test]
    fn test_encode_lucene_numeric_heuristic() {
        assert_eq!(encode_lucene(&"208964.12".into()), "208964.12");
        assert_eq!(encode_lucene(&"-5".into()), "-5");
        assert_eq!(encode_lucene(&"1.2.3".into()), "\"1.2.3\"");
        assert_eq!(encode_lucene(&"".into()), "\"\"");
    }

    #[test]
    fn test_encode_lucene_quotes_text() {
        assert_eq!(encode_lucene(&"E. coli".into()), "\"E. coli\"");
        assert_eq!(encode_lucene(&"a:b (c)".into()), "\"a\\:b \\(c\\)\"");
        assert_eq!(encode_lucene(&"say \"hi\"".into()), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_encode_lucene_scalars() {
        assert_eq!(encode_lucene(&Value::Null), "\"\"");
        assert_eq!(encode_lucene(&false.into()), "false");
        assert_eq!(encode_lucene(&7.into()), "7");
        assert_eq!(encode_lucene(&0.5.into()), "0.5");
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("83332.12"));
        assert!(looks_numeric("12"));
        assert!(!looks_numeric("."));
        assert!(!looks_numeric("12a"));
        assert!(!looks_numeric("--1"));
        assert!(looks_numeric("-12.5"));
    }

    #[test]
    fn test_inner_dash_is_text() {
        assert!(!looks_numeric("12-3"));
        assert!(!looks_numeric("2024-"));
        assert_eq!(encode_lucene(&"12-3".into()), "\"12\\-3\"");
    }

    #[test]
    fn test_float_display_has_no_exponent() {
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000.0");
        assert_eq!(Value::from(1e-7).to_string(), "0.0000001");
        assert_eq!(encode_lucene(&(-2.5).into()), "-2.5");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(Value::from(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert!(!Value::from(f64::NAN).is_finite());
        assert!(Value::from(1.5).is_finite());
        assert!(Value::from("NaN").is_finite());
    }
}
