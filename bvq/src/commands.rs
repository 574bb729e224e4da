//! CLI command implementations.

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use bvbrc::rql::{self, Filter, RqlOptions};
use bvbrc::{BlockingClient, Collection, Config, StreamOptions, Value};
use serde_json::Value as Json;
use tracing::info;

use crate::OutputFormat;

/// Global flags that override the loaded config.
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub solr_base_url: Option<String>,
    pub timeout: Option<u64>,
}

impl Overrides {
    fn load_config(&self) -> bvbrc::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.as_str());
        }
        if let Some(url) = &self.solr_base_url {
            config = config.with_solr_base_url(url.as_str());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout_secs(secs);
        }
        Ok(config.normalized())
    }

    fn client(&self) -> bvbrc::Result<BlockingClient> {
        BlockingClient::new(self.load_config()?)
    }
}

/// Combine a raw RQL filter with FIELD=VALUE equality pairs.
fn build_filter(raw: Option<&str>, pairs: &[(String, String)]) -> Filter {
    let eqs: BTreeMap<String, Value> = pairs
        .iter()
        .map(|(field, value)| (field.clone(), Value::from(value.as_str())))
        .collect();

    let mut parts: Vec<Filter> = raw.filter(|s| !s.is_empty()).map(Filter::from).into_iter().collect();
    parts.extend(rql::eqs_from(&eqs));
    rql::and(parts)
}

#[allow(clippy::too_many_arguments)]
pub fn query(
    overrides: &Overrides,
    collection: &str,
    raw_filter: Option<&str>,
    pairs: &[(String, String)],
    select: &[String],
    sort: Option<&str>,
    limit: Option<usize>,
    download: bool,
) -> bvbrc::Result<()> {
    let collection: Collection = collection.parse()?;

    let mut options = RqlOptions::new().select(select.iter().cloned()).http_download(download);
    if let Some(sort) = sort {
        options = options.sort(sort);
    }
    if let Some(n) = limit {
        options = options.limit(n);
    }
    let filter = build_filter(raw_filter, pairs);
    // Fail on a bad body before building a client or touching the network.
    rql::build_body(&filter, &options)?;

    let client = overrides.client()?;
    let body = client.resource(collection).query(&filter, &options)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &body)?;
    writeln!(out)?;
    Ok(())
}

pub fn stream(
    overrides: &Overrides,
    collection: &str,
    options: &StreamOptions,
    max_docs: Option<usize>,
    format: OutputFormat,
) -> bvbrc::Result<()> {
    let collection: Collection = collection.parse()?;
    let client = overrides.client()?;
    let pager = client.resource(collection).stream(options)?;
    info!(
        collection = %collection,
        sort = pager.state().effective_sort(),
        rows = pager.state().rows(),
        "streaming"
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let docs = pager.take(max_docs.unwrap_or(usize::MAX));
    let (printed, result) = write_stream(&mut out, docs, format);
    out.flush()?;

    eprintln!("Printed {} document(s).", printed);
    result
}

/// Write every document, then close the JSON array even if a page failed.
/// Returns the number written alongside the first error.
fn write_stream(
    out: &mut impl Write,
    docs: impl Iterator<Item = bvbrc::Result<Json>>,
    format: OutputFormat,
) -> (usize, bvbrc::Result<()>) {
    let json = format == OutputFormat::Json;
    let mut printed = 0;
    let open = if json { write!(out, "[").map_err(bvbrc::Error::from) } else { Ok(()) };
    let written = open.and_then(|()| write_docs(&mut *out, docs, format, &mut printed));
    let close = if json { writeln!(out, "\n]").map_err(bvbrc::Error::from) } else { Ok(()) };
    (printed, written.and(close))
}

fn write_docs(
    out: &mut impl Write,
    docs: impl Iterator<Item = bvbrc::Result<Json>>,
    format: OutputFormat,
    printed: &mut usize,
) -> bvbrc::Result<()> {
    for doc in docs {
        let doc = doc?;
        match format {
            OutputFormat::Json => {
                if *printed > 0 {
                    write!(out, ",")?;
                }
                writeln!(out)?;
                serde_json::to_writer(&mut *out, &doc)?;
            }
            OutputFormat::Ndjson => {
                serde_json::to_writer(&mut *out, &doc)?;
                writeln!(out)?;
            }
        }
        *printed += 1;
    }
    Ok(())
}

pub fn collections() -> bvbrc::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for c in Collection::ALL {
        writeln!(out, "{:<24} {}", c.name(), c.id_field())?;
    }
    Ok(())
}
