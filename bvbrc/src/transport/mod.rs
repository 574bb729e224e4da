//! Request execution against the RQL and Solr endpoints.
//!
//! [`BlockingClient`] and [`AsyncClient`] share everything except the
//! send step: URL building, header merging, wire-format selection and
//! response classification all live here.
//!
//! # Wire format selection (Solr endpoint)
//!
//! 1. Explicit mode passed to `select_with`
//! 2. `wire_format` parameter in the request params (removed before sending)
//! 3. `X-Request-Format` header in the configured headers
//! 4. [`Config::wire_format`]

mod asynchronous;
mod blocking;

use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::query::{percent_encode, ParamValue, QueryParams};
use crate::{Config, Error, Result};

pub use asynchronous::AsyncClient;
pub use blocking::BlockingClient;

/// Per-call parameter alias selecting the wire format.
pub const WIRE_FORMAT_PARAM: &str = "wire_format";

/// Configured header selecting the wire format.
pub const WIRE_FORMAT_HEADER: &str = "X-Request-Format";

const RQL_CONTENT_TYPE: &str = "application/rqlquery+x-www-form-urlencoded";
const SOLR_FORM_CONTENT_TYPE: &str = "application/solrquery+x-www-form-urlencoded";
const SOLR_ACCEPT: &str = "application/solr+json";

/// Body encoding for Solr requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Form-encoded fields, `fq` repeated.
    #[default]
    Form,
    /// JSON request envelope `{"params": {...}}`.
    Json,
}

impl WireFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            WireFormat::Form => "form",
            WireFormat::Json => "json",
        }
    }
}

impl FromStr for WireFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(WireFormat::Form),
            "json" => Ok(WireFormat::Json),
            other => Err(Error::Validation(format!(
                "unknown wire format '{}' (expected form or json)",
                other
            ))),
        }
    }
}

/// Blocking page fetch. The cursor pager is generic over this.
pub trait Fetch {
    /// Run one Solr select against `collection` and return the parsed body.
    fn select(&self, collection: &str, params: &QueryParams) -> Result<Json>;
}

impl<T: Fetch + ?Sized> Fetch for &T {
    fn select(&self, collection: &str, params: &QueryParams) -> Result<Json> {
        (**self).select(collection, params)
    }
}

/// Awaitable page fetch. Mirror of [`Fetch`].
pub trait AsyncFetch {
    fn select(
        &self,
        collection: &str,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Json>> + Send;
}

impl<T: AsyncFetch + Sync + ?Sized> AsyncFetch for &T {
    fn select(
        &self,
        collection: &str,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Json>> + Send {
        (**self).select(collection, params)
    }
}

/// A fully prepared POST request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Set for Solr requests.
    pub format: Option<WireFormat>,
}

/// Build the RQL request for `collection` from an already joined body.
pub fn prepare_rql(config: &Config, collection: &str, body: String) -> PreparedRequest {
    let mut headers = vec![
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), RQL_CONTENT_TYPE.to_string()),
    ];
    merge_headers(&mut headers, config);

    PreparedRequest {
        url: config.rql_url(collection),
        headers,
        body,
        format: None,
    }
}

/// Build the Solr select request for `collection`.
pub fn prepare_select(
    config: &Config,
    collection: &str,
    params: &QueryParams,
    mode: Option<WireFormat>,
) -> Result<PreparedRequest> {
    let mut params = params.clone();
    let alias = match params.remove(WIRE_FORMAT_PARAM) {
        Some(ParamValue::Single(s)) => Some(s.parse::<WireFormat>()?),
        Some(ParamValue::Multi(_)) => {
            return Err(Error::Validation(format!(
                "'{}' takes a single value",
                WIRE_FORMAT_PARAM
            )))
        }
        None => None,
    };
    let header = config
        .header(WIRE_FORMAT_HEADER)
        .map(str::parse::<WireFormat>)
        .transpose()?;
    let format = mode.or(alias).or(header).unwrap_or(config.wire_format);

    if !params.contains("wt") {
        params.set("wt", "json");
    }

    let mut headers = Vec::new();
    merge_headers(&mut headers, config);
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(WIRE_FORMAT_HEADER));
    set_header(&mut headers, "Accept", SOLR_ACCEPT);

    let body = match format {
        WireFormat::Form => {
            set_header(&mut headers, "Content-Type", SOLR_FORM_CONTENT_TYPE);
            form_encode(&params.to_pairs())
        }
        WireFormat::Json => {
            set_header(&mut headers, "Content-Type", "application/json");
            params.to_json_envelope().to_string()
        }
    };

    Ok(PreparedRequest {
        url: config.solr_url(collection),
        headers,
        body,
        format: Some(format),
    })
}

/// Configured headers win over the defaults already in `headers`.
fn merge_headers(headers: &mut Vec<(String, String)>, config: &Config) {
    for (name, value) in &config.headers {
        set_header(headers, name, value);
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}

/// `application/x-www-form-urlencoded` body from name/value pairs.
pub fn form_encode(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Turn a status code and body into parsed JSON or a classified error.
pub(crate) fn parse_response(status: u16, body: &str) -> Result<Json> {
    if !(200..300).contains(&status) {
        return Err(Error::Http { status, body: body.to_string() });
    }
    serde_json::from_str(body).map_err(|e| Error::Decode(e.to_string()))
}

/// Map a reqwest failure onto the client's error kinds.
pub(crate) fn classify(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(err.to_string())
    } else if err.is_builder() {
        Error::Config(err.to_string())
    } else if err.is_decode() {
        Error::Decode(err.to_string())
    } else if let Some(status) = err.status() {
        Error::Http { status: status.as_u16(), body: err.to_string() }
    } else {
        Error::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ParamsBuilder;
    use serde_json::json;

    fn header<'a>(req: &'a PreparedRequest, name: &str) -> Option<&'a str> {
        req.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_prepare_rql() {
        let config = Config::default().with_header("Authorization", "abc");
        let req = prepare_rql(&config, "genome", "eq(genome_id,1.1)&limit(1)".to_string());
        assert_eq!(req.url, "https://www.bv-brc.org/api/genome/");
        assert_eq!(req.body, "eq(genome_id,1.1)&limit(1)");
        assert_eq!(header(&req, "content-type"), Some(RQL_CONTENT_TYPE));
        assert_eq!(header(&req, "accept"), Some("application/json"));
        assert_eq!(header(&req, "authorization"), Some("abc"));
        assert_eq!(req.format, None);
    }

    #[test]
    fn test_prepare_select_form() {
        let params = ParamsBuilder::new().fq("a:1").fq("b:\"x y\"").rows(2).build();
        let req = prepare_select(&Config::default(), "genome", &params, None).unwrap();
        assert_eq!(req.url, "https://www.bv-brc.org/api-bulk/genome/");
        assert_eq!(req.format, Some(WireFormat::Form));
        assert_eq!(
            req.body,
            "q=%2A%3A%2A&fq=a%3A1&fq=b%3A%22x%20y%22&rows=2&wt=json"
        );
        assert_eq!(header(&req, "content-type"), Some(SOLR_FORM_CONTENT_TYPE));
        assert_eq!(header(&req, "accept"), Some(SOLR_ACCEPT));
    }

    #[test]
    fn test_prepare_select_json() {
        let params = ParamsBuilder::new().fq("a:1").build();
        let req =
            prepare_select(&Config::default(), "genome", &params, Some(WireFormat::Json)).unwrap();
        let body: Json = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body, json!({"params": {"q": "*:*", "fq": ["a:1"], "wt": "json"}}));
        assert_eq!(header(&req, "content-type"), Some("application/json"));
    }

    #[test]
    fn test_keeps_caller_wt() {
        let params = ParamsBuilder::new().extra("wt", "xml").build();
        let req = prepare_select(&Config::default(), "genome", &params, None).unwrap();
        assert!(req.body.ends_with("wt=xml"));
    }

    #[test]
    fn test_wire_format_precedence() {
        let config = Config::default().with_header(WIRE_FORMAT_HEADER, "json");
        let plain = ParamsBuilder::new().build();
        let aliased = ParamsBuilder::new().extra(WIRE_FORMAT_PARAM, "form").build();

        // header beats config default
        let req = prepare_select(&config, "genome", &plain, None).unwrap();
        assert_eq!(req.format, Some(WireFormat::Json));
        assert_eq!(header(&req, WIRE_FORMAT_HEADER), None);

        // param alias beats header, and is not sent
        let req = prepare_select(&config, "genome", &aliased, None).unwrap();
        assert_eq!(req.format, Some(WireFormat::Form));
        assert!(!req.body.contains(WIRE_FORMAT_PARAM));

        // explicit mode beats everything
        let req = prepare_select(&config, "genome", &aliased, Some(WireFormat::Json)).unwrap();
        assert_eq!(req.format, Some(WireFormat::Json));
    }

    #[test]
    fn test_bad_wire_format_alias() {
        let params = ParamsBuilder::new().extra(WIRE_FORMAT_PARAM, "xml").build();
        let err = prepare_select(&Config::default(), "genome", &params, None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(parse_response(200, "{\"a\":1}").unwrap(), json!({"a": 1}));

        match parse_response(404, "missing core") {
            Err(Error::Http { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "missing core");
            }
            other => panic!("expected Http error, got {:?}", other),
        }

        assert!(matches!(parse_response(200, "<html>"), Err(Error::Decode(_))));
    }

    // Nothing listens on port 1, so the connect is refused.
    fn refused_config() -> Config {
        Config::default()
            .with_base_url("http://127.0.0.1:1")
            .with_solr_base_url("http://127.0.0.1:1")
            .with_timeout_secs(5)
    }

    // The kernel completes the handshake on a bound listener even without
    // accept(), but nobody ever answers.
    fn silent_server() -> (std::net::TcpListener, Config) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let config = Config::default()
            .with_base_url(url.as_str())
            .with_solr_base_url(url.as_str())
            .with_timeout_secs(1);
        (listener, config)
    }

    #[test]
    fn test_refused_connection_is_connection_error() {
        let client = BlockingClient::new(refused_config()).unwrap();
        let err = client.execute_rql("genome", "limit(1)".to_string()).unwrap_err();
        assert!(matches!(err, Error::Connection(_)), "got {:?}", err);
        assert_eq!(err.kind(), "connection");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_silent_server_is_timeout_error() {
        let (_listener, config) = silent_server();
        let client = BlockingClient::new(config).unwrap();
        let err = client.select_with("genome", &ParamsBuilder::new().build(), None).unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn test_async_client_separates_connection_and_timeout() {
        let client = AsyncClient::new(refused_config()).unwrap();
        let err = client.execute_rql("genome", "limit(1)".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)), "got {:?}", err);

        let (_listener, config) = silent_server();
        let client = AsyncClient::new(config).unwrap();
        let err = client
            .select_with("genome", &ParamsBuilder::new().build(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
    }
}
