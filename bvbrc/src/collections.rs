//! BV-BRC collections and per-collection query handles.
//!
//! Every collection is queried the same way; only the name and the id
//! field differ. [`Resource`] and [`AsyncResource`] bind a client to one
//! collection and expose the usual lookups plus cursor streaming.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value as Json;

use crate::cursor::{AsyncCursorPager, CursorPager, PagerOptions, DEFAULT_ROWS, START_CURSOR};
use crate::query::rql::{self, Filter, RqlOptions};
use crate::query::{ParamsBuilder, QueryParams, Value};
use crate::transport::{AsyncClient, BlockingClient};
use crate::{Error, Result};

macro_rules! collections {
    ($($variant:ident => $name:literal, $id:literal;)+) => {
        /// A BV-BRC data collection.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Collection {
            $($variant,)+
        }

        impl Collection {
            /// Every known collection, in alphabetical order.
            pub const ALL: &'static [Collection] = &[$(Collection::$variant,)+];

            /// Wire name used in request URLs.
            pub fn name(self) -> &'static str {
                match self {
                    $(Collection::$variant => $name,)+
                }
            }

            /// Field holding the document id. Also the cursor tie-breaker.
            pub fn id_field(self) -> &'static str {
                match self {
                    $(Collection::$variant => $id,)+
                }
            }
        }
    };
}

collections! {
    Antibiotics => "antibiotics", "pubchem_cid";
    Bioset => "bioset", "bioset_id";
    BiosetResult => "bioset_result", "id";
    EnzymeClassRef => "enzyme_class_ref", "ec_number";
    Epitope => "epitope", "epitope_id";
    EpitopeAssay => "epitope_assay", "assay_id";
    Experiment => "experiment", "exp_id";
    GeneOntologyRef => "gene_ontology_ref", "go_id";
    Genome => "genome", "genome_id";
    GenomeAmr => "genome_amr", "id";
    GenomeFeature => "genome_feature", "feature_id";
    GenomeSequence => "genome_sequence", "sequence_id";
    IdRef => "id_ref", "id";
    MiscNiaidSgc => "misc_niaid_sgc", "target_id";
    Pathway => "pathway", "id";
    PathwayRef => "pathway_ref", "id";
    Ppi => "ppi", "id";
    ProteinFamilyRef => "protein_family_ref", "family_id";
    ProteinFeature => "protein_feature", "id";
    ProteinStructure => "protein_structure", "pdb_id";
    SequenceFeature => "sequence_feature", "id";
    SequenceFeatureVt => "sequence_feature_vt", "id";
    Serology => "serology", "id";
    SpGene => "sp_gene", "id";
    SpikeLineage => "spike_lineage", "id";
    SpikeVariant => "spike_variant", "id";
    Strain => "strain", "id";
    StructuredAssertion => "structured_assertion", "id";
    Subsystem => "subsystem", "id";
    SubsystemRef => "subsystem_ref", "id";
    Surveillance => "surveillance", "id";
    Taxonomy => "taxonomy", "taxon_id";
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| Error::Validation(format!("unknown collection '{}'", s)))
    }
}

/// Options for cursor streaming over the Solr endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    pub rows: usize,
    pub sort: Option<String>,
    /// Tie-breaker override. Defaults to the collection's id field.
    pub unique_key: Option<String>,
    pub fields: Vec<String>,
    pub q: Option<String>,
    pub fq: Vec<String>,
    pub start_cursor: String,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            sort: None,
            unique_key: None,
            fields: Vec::new(),
            q: None,
            fq: Vec::new(),
            start_cursor: START_CURSOR.to_string(),
        }
    }
}

impl StreamOptions {
    fn base_params(&self) -> QueryParams {
        let mut builder = ParamsBuilder::new().fq_all(self.fq.iter().cloned()).fields(self.fields.iter().cloned());
        if let Some(q) = &self.q {
            builder = builder.q(q.clone());
        }
        builder.build()
    }

    fn pager_options(&self, collection: Collection) -> PagerOptions {
        let unique_key = self.unique_key.as_deref().unwrap_or(collection.id_field());
        let mut options = PagerOptions::new()
            .rows(self.rows)
            .unique_key(unique_key)
            .start_cursor(self.start_cursor.clone());
        if let Some(sort) = &self.sort {
            options = options.sort(sort.clone());
        }
        options
    }
}

/// Filters shared by both resource flavors.
fn range_filter(field: &str, min: Value, max: Value) -> Filter {
    rql::and([rql::gt(field, min), rql::lt(field, max)])
}

/// Blocking handle on one collection.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    client: &'a BlockingClient,
    collection: Collection,
}

impl BlockingClient {
    pub fn resource(&self, collection: Collection) -> Resource<'_> {
        Resource { client: self, collection }
    }
}

impl<'a> Resource<'a> {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn query(&self, filter: &Filter, options: &RqlOptions) -> Result<Json> {
        self.client.rql(self.collection.name(), filter, options)
    }

    pub fn get_by_id(&self, id: impl Into<Value>, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::eq(self.collection.id_field(), id), options)
    }

    pub fn get_by(&self, field: &str, value: impl Into<Value>, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::eq(field, value), options)
    }

    pub fn query_by(&self, filters: &BTreeMap<String, Value>, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::build_and_from(filters), options)
    }

    /// Open range: `min < field < max`.
    pub fn range(
        &self,
        field: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
        options: &RqlOptions,
    ) -> Result<Json> {
        self.query(&range_filter(field, min.into(), max.into()), options)
    }

    pub fn search_by_keyword(&self, text: &str, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::keyword(text), options)
    }

    pub fn get_all(&self, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::and([]), options)
    }

    /// Stream every matching document through the Solr cursor API.
    pub fn stream(&self, options: &StreamOptions) -> Result<CursorPager<&'a BlockingClient>> {
        CursorPager::new(
            self.client,
            self.collection.name(),
            options.base_params(),
            options.pager_options(self.collection),
        )
    }
}

/// Async handle on one collection.
#[derive(Debug, Clone, Copy)]
pub struct AsyncResource<'a> {
    client: &'a AsyncClient,
    collection: Collection,
}

impl AsyncClient {
    pub fn resource(&self, collection: Collection) -> AsyncResource<'_> {
        AsyncResource { client: self, collection }
    }
}

impl<'a> AsyncResource<'a> {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn query(&self, filter: &Filter, options: &RqlOptions) -> Result<Json> {
        self.client.rql(self.collection.name(), filter, options).await
    }

    pub async fn get_by_id(&self, id: impl Into<Value>, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::eq(self.collection.id_field(), id), options).await
    }

    pub async fn get_by(&self, field: &str, value: impl Into<Value>, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::eq(field, value), options).await
    }

    pub async fn query_by(&self, filters: &BTreeMap<String, Value>, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::build_and_from(filters), options).await
    }

    pub async fn range(
        &self,
        field: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
        options: &RqlOptions,
    ) -> Result<Json> {
        self.query(&range_filter(field, min.into(), max.into()), options).await
    }

    pub async fn search_by_keyword(&self, text: &str, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::keyword(text), options).await
    }

    pub async fn get_all(&self, options: &RqlOptions) -> Result<Json> {
        self.query(&rql::and([]), options).await
    }

    pub fn stream(&self, options: &StreamOptions) -> Result<AsyncCursorPager<&'a AsyncClient>> {
        AsyncCursorPager::new(
            self.client,
            self.collection.name(),
            options.base_params(),
            options.pager_options(self.collection),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorState;

    #[test]
    fn test_names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(c.name().parse::<Collection>().unwrap(), *c);
        }
        assert_eq!(Collection::ALL.len(), 32);
    }

    #[test]
    fn test_unknown_collection() {
        let err = "genomes".parse::<Collection>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_id_fields() {
        assert_eq!(Collection::Genome.id_field(), "genome_id");
        assert_eq!(Collection::GenomeFeature.id_field(), "feature_id");
        assert_eq!(Collection::Antibiotics.id_field(), "pubchem_cid");
        assert_eq!(Collection::Taxonomy.to_string(), "taxonomy");
    }

    #[test]
    fn test_stream_defaults_to_id_tie_breaker() {
        let opts = StreamOptions::default();
        let state = CursorState::new(
            "genome",
            opts.base_params(),
            opts.pager_options(Collection::Genome),
        )
        .unwrap();
        assert_eq!(state.effective_sort(), "genome_id asc");
        assert_eq!(state.page_params().get_str("q"), Some("*:*"));
    }

    #[test]
    fn test_stream_keeps_caller_sort() {
        let opts = StreamOptions {
            sort: Some("date_inserted desc".into()),
            fields: vec!["feature_id".into(), "product".into()],
            fq: vec!["genome_id:208964.12".into()],
            ..StreamOptions::default()
        };
        let state = CursorState::new(
            "genome_feature",
            opts.base_params(),
            opts.pager_options(Collection::GenomeFeature),
        )
        .unwrap();
        assert_eq!(state.effective_sort(), "date_inserted desc, feature_id asc");
        let params = state.page_params();
        assert_eq!(params.get_str("fl"), Some("feature_id,product"));
        assert!(params.contains("fq"));
    }

    #[test]
    fn test_range_filter() {
        assert_eq!(
            range_filter("genome_length", 1000.into(), 5000.into()).render(),
            "and(gt(genome_length,1000),lt(genome_length,5000))"
        );
    }
}
