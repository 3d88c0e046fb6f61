//! Quadstore - an in-memory RDF quad store
//!
//! A dataset of one default graph and any number of named graphs, with a
//! SPARQL 1.1 query evaluator over pre-parsed algebra and an update
//! processor for the SPARQL Update command set.
//!
//! # Architecture
//!
//! - [`term`] - RDF terms, triples and the total term order
//! - [`store`] - indexed triple collections, graphs, datasets and quads
//! - [`sparql`] - algebra, expressions, the evaluator and the update processor
//! - [`core`] - namespaces and the [`GraphResolver`] / [`ServiceHandler`] seams
//! - [`config`] - TOML configuration with environment overrides
//! - [`error`] - structured errors with numeric codes
//!
//! Parsing SPARQL text and serialising results are left to the host.
//!
//! # Example
//!
//! ```rust,ignore
//! use quadstore::{Algebra, Dataset, Quad, Query, QueryOptions, Term, Triple, TriplePattern};
//!
//! let mut dataset = Dataset::new();
//! dataset.add_quad(Quad::in_graph(
//!     Triple::new(
//!         Term::uri("http://example.org/socrates"),
//!         Term::uri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
//!         Term::uri("http://example.org/Human"),
//!     )?,
//!     Term::uri("http://example.org/people"),
//! ));
//!
//! let query = Query::select_all(Algebra::graph(
//!     Term::var("g"),
//!     Algebra::bgp(vec![TriplePattern::new(Term::var("s"), Term::var("p"), Term::var("o"))]),
//! ));
//! let result = dataset.evaluate(&query, &QueryOptions::new())?;
//! ```

pub mod core;
pub mod config;
pub mod error;
pub mod term;
pub mod store;
pub mod sparql;

pub use crate::core::{ns, GraphResolver, ServiceHandler};

pub use term::{BlankNode, Datatype, Literal, Term, Triple, Uri, Variable};

pub use store::{BlankNodeMapping, Dataset, DatasetScope, Graph, Quad, TripleCollection};

pub use sparql::{
    Algebra, EvaluationContext, Expression, Query, QueryEngine, QueryForm, QueryOptions,
    QueryResult, Solution, TriplePattern,
    GraphTarget, QuadPattern, UpdateCommand, UpdateCommandSet, UpdateProcessor, UpdateReport,
};

pub use config::{ConfigError, GeneralConfig, LogLevel, QueryConfig, StoreConfig, UpdateConfig};

pub use error::{ErrorCode, ErrorContext, RdfError, RdfResult};
