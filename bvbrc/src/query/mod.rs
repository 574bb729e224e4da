//! Query builders for the two BV-BRC query dialects.
//!
//! # Dialects
//!
//! - **RQL** ([`rql`]): `eq(genome_id,208964.12)`, `and(...)`, `select(...)`.
//!   Sent to the data API as a form-style body.
//! - **Lucene/Solr** ([`lucene`], [`params`]): `genome_id:208964.12`,
//!   `[a TO b]` ranges, `(x AND y)` groups, carried in `q`/`fq` parameters.
//!
//! The two grammars share value types ([`Value`]) but nothing else. A
//! predicate built for one endpoint cannot be sent to the other.

pub mod lucene;
pub mod params;
pub mod rql;
mod value;

pub use params::{ParamValue, ParamsBuilder, QueryParams};
pub use value::{encode_lucene, encode_rql, escape_lucene, looks_numeric, percent_encode, Value};

#[cfg(test)]
mod tests;
