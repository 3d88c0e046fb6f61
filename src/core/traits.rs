//! Traits for the collaborators the store does not implement itself
//!
//! - [`GraphResolver`] fetches and parses the graph behind a LOAD IRI
//! - [`ServiceHandler`] answers the inner pattern of a SERVICE clause
//!
//! Both are object safe and passed by reference, so hosts can back them
//! with network clients, caches or test fixtures.
//!
//! # Example
//!
//! ```ignore
//! struct Fixtures(HashMap<String, Graph>);
//!
//! impl GraphResolver for Fixtures {
//!     fn resolve(&self, iri: &str) -> RdfResult<Graph> {
//!         self.0.get(iri).cloned().ok_or_else(|| RdfError::load_failed(iri, "unknown fixture"))
//!     }
//! }
//! ```

use std::fmt::Debug;

use crate::error::RdfResult;
use crate::sparql::algebra::Algebra;
use crate::sparql::solution::Solution;
use crate::store::Graph;
use crate::term::Term;

/// Resolves a LOAD source IRI to a parsed graph
pub trait GraphResolver: Debug {
    /// Fetch and parse the document at `iri`
    fn resolve(&self, iri: &str) -> RdfResult<Graph>;
}

/// Evaluates the inner pattern of a SERVICE clause at a remote endpoint
pub trait ServiceHandler: Debug {
    /// Solutions of `algebra` at `endpoint`
    fn execute(&self, endpoint: &Term, algebra: &Algebra) -> RdfResult<Vec<Solution>>;
}
