//! bvq: query and stream BV-BRC collections from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "bvq")]
#[command(about = "Query and stream BV-BRC data collections")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $BVBRC_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RQL API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Solr (bulk) API base URL
    #[arg(long, global = true)]
    solr_base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log requests and pager progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an RQL query against a collection
    #[command(visible_alias = "q")]
    Query {
        /// Collection name, e.g. genome
        collection: String,

        /// Raw RQL filter, e.g. "eq(genus,Escherichia)"
        #[arg(short, long)]
        filter: Option<String>,

        /// Equality filter FIELD=VALUE (repeatable, ANDed)
        #[arg(short, long = "eq", value_parser = parse_pair)]
        eq: Vec<(String, String)>,

        /// Comma-separated fields to return
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,

        /// Sort expression: "+field", "-field" or "field desc"
        #[arg(long)]
        sort: Option<String>,

        /// Maximum number of documents
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Use the bulk download path (requires --sort)
        #[arg(long)]
        download: bool,
    },

    /// Stream every matching document with Solr cursor paging
    #[command(visible_alias = "s")]
    Stream {
        /// Collection name, e.g. genome_feature
        collection: String,

        /// Main Lucene query
        #[arg(long)]
        q: Option<String>,

        /// Filter query (repeatable)
        #[arg(long)]
        fq: Vec<String>,

        /// Comma-separated fields to return
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Documents per page
        #[arg(short, long, default_value_t = bvbrc::cursor::DEFAULT_ROWS)]
        rows: usize,

        /// Solr sort, e.g. "genome_name asc"
        #[arg(long)]
        sort: Option<String>,

        /// Tie-breaker field (defaults to the collection's id field)
        #[arg(long)]
        unique_key: Option<String>,

        /// Resume from a previously returned cursor mark
        #[arg(long, default_value = bvbrc::cursor::START_CURSOR)]
        start_cursor: String,

        /// Stop after this many documents
        #[arg(short = 'n', long)]
        max_docs: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Ndjson)]
        format: OutputFormat,
    },

    /// List known collections and their id fields
    Collections,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array
    Json,
    /// One document per line
    Ndjson,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got '{}'", s)),
    }
}

fn init_logging(verbose: bool) {
    let directive = if verbose { "bvbrc=debug" } else { "bvbrc=warn" };
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = directive.parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let overrides = commands::Overrides {
        config: cli.config,
        base_url: cli.base_url,
        solr_base_url: cli.solr_base_url,
        timeout: cli.timeout,
    };

    let result = match cli.command {
        Commands::Query { collection, filter, eq, select, sort, limit, download } => {
            commands::query(
                &overrides,
                &collection,
                filter.as_deref(),
                &eq,
                &select,
                sort.as_deref(),
                limit,
                download,
            )
        }
        Commands::Stream {
            collection,
            q,
            fq,
            fields,
            rows,
            sort,
            unique_key,
            start_cursor,
            max_docs,
            format,
        } => {
            let options = bvbrc::StreamOptions {
                rows,
                sort,
                unique_key,
                fields,
                q,
                fq,
                start_cursor,
            };
            commands::stream(&overrides, &collection, &options, max_docs, format)
        }
        Commands::Collections => commands::collections(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
