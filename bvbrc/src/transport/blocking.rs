//! Blocking client over `reqwest::blocking`.

use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use super::{classify, parse_response, prepare_rql, prepare_select, Fetch, PreparedRequest, WireFormat};
use crate::config::Auth;
use crate::query::rql::{build_body, Filter, RqlOptions};
use crate::query::QueryParams;
use crate::{Config, Result};

/// Blocking BV-BRC client.
///
/// Cloning is cheap and clones share one connection pool. The client holds
/// no per-request state, so any number of pagers may share it.
#[derive(Debug, Clone)]
pub struct BlockingClient {
    http: reqwest::blocking::Client,
    config: Arc<Config>,
}

impl BlockingClient {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(classify)?;
        Ok(Self { http, config: Arc::new(config) })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run an RQL query: filter plus select/sort/limit options.
    pub fn rql(&self, collection: &str, filter: &Filter, options: &RqlOptions) -> Result<Json> {
        let body = build_body(filter, options)?;
        self.execute_rql(collection, body)
    }

    /// POST an already assembled RQL body.
    pub fn execute_rql(&self, collection: &str, body: String) -> Result<Json> {
        self.send(prepare_rql(&self.config, collection, body))
    }

    /// Solr select with an explicit wire format.
    pub fn select_with(
        &self,
        collection: &str,
        params: &QueryParams,
        mode: Option<WireFormat>,
    ) -> Result<Json> {
        let request = prepare_select(&self.config, collection, params, mode)?;
        self.send(request)
    }

    fn send(&self, request: PreparedRequest) -> Result<Json> {
        debug!(url = %request.url, format = ?request.format, "POST");

        let mut builder = self.http.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &self.config.auth {
            Some(Auth::Bearer { bearer }) => builder.bearer_auth(bearer),
            Some(Auth::Basic { user, password }) => builder.basic_auth(user, Some(password)),
            None => builder,
        };

        let response = builder.body(request.body).send().map_err(classify)?;
        let status = response.status().as_u16();
        let text = response.text().map_err(classify)?;
        debug!(status, bytes = text.len(), "response");
        parse_response(status, &text)
    }
}

impl Fetch for BlockingClient {
    fn select(&self, collection: &str, params: &QueryParams) -> Result<Json> {
        self.select_with(collection, params, None)
    }
}
