//! Triple storage
//!
//! - `index`: the indexed triple collection backing every graph
//! - `graph`: a named set of triples with prefix metadata
//! - `isomorphism`: graph equality modulo blank node renaming
//! - `dataset`: default graph plus named graphs, and per-query scoping

pub mod dataset;
pub mod graph;
pub mod index;
pub mod isomorphism;

pub use dataset::{Dataset, DatasetScope, Quad};
pub use graph::{BlankNodeMapping, Graph};
pub use index::TripleCollection;
