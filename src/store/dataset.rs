//! RDF dataset
//!
//! A dataset holds one default graph and any number of named graphs, keyed by
//! graph IRI.
//!
//! Queries never see the dataset directly. [`Dataset::scope`] resolves the
//! FROM / FROM NAMED clauses of one evaluation into a [`DatasetScope`]: the
//! active default graph and the active named graphs. The scope borrows the
//! dataset and is dropped when the evaluation ends, so the dataset itself
//! never carries per-query state.
//!
//! # Example
//!
//! ```ignore
//! use quadstore::store::{Dataset, Quad};
//! use quadstore::term::{Term, Triple};
//!
//! let mut dataset = Dataset::new();
//! let g = Term::uri("http://example.org/g1");
//! dataset.add_quad(Quad::in_graph(triple, g.clone()));
//! assert!(dataset.has_graph(&g));
//! ```

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use super::graph::{BlankNodeMapping, Graph};
use crate::error::RdfResult;
use crate::sparql::{Query, QueryEngine, QueryOptions, QueryResult};
use crate::term::{Term, Triple};

/// A triple with the graph it belongs to; `None` is the default graph
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    triple: Triple,
    graph: Option<Term>,
}

impl Quad {
    pub fn new(triple: Triple, graph: Option<Term>) -> Self {
        Quad { triple, graph }
    }

    /// A quad in the default graph
    pub fn in_default(triple: Triple) -> Self {
        Quad { triple, graph: None }
    }

    /// A quad in a named graph
    pub fn in_graph(triple: Triple, graph: Term) -> Self {
        Quad { triple, graph: Some(graph) }
    }

    pub fn triple(&self) -> &Triple {
        &self.triple
    }

    pub fn graph(&self) -> Option<&Term> {
        self.graph.as_ref()
    }

    pub fn is_default_graph(&self) -> bool {
        self.graph.is_none()
    }

    pub fn into_parts(self) -> (Triple, Option<Term>) {
        (self.triple, self.graph)
    }
}

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.triple.subject(),
            self.triple.predicate(),
            self.triple.object()
        )?;
        if let Some(g) = &self.graph {
            write!(f, " {}", g)?;
        }
        write!(f, " .")
    }
}

/// An RDF dataset: a default graph plus named graphs
#[derive(Clone, Default)]
pub struct Dataset {
    default_graph: Graph,
    named_graphs: IndexMap<Term, Graph>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset { default_graph: Graph::new(), named_graphs: IndexMap::new() }
    }

    /// Create a dataset around an existing default graph
    pub fn with_default(default_graph: Graph) -> Self {
        Dataset { default_graph, named_graphs: IndexMap::new() }
    }

    pub fn default_graph(&self) -> &Graph {
        &self.default_graph
    }

    pub fn default_graph_mut(&mut self) -> &mut Graph {
        &mut self.default_graph
    }

    /// The default graph for `None`, a named graph otherwise
    pub fn graph(&self, name: Option<&Term>) -> Option<&Graph> {
        match name {
            None => Some(&self.default_graph),
            Some(name) => self.named_graphs.get(name),
        }
    }

    pub fn graph_mut(&mut self, name: Option<&Term>) -> Option<&mut Graph> {
        match name {
            None => Some(&mut self.default_graph),
            Some(name) => self.named_graphs.get_mut(name),
        }
    }

    /// Get a named graph, creating an empty one if missing
    pub fn get_or_create_graph(&mut self, name: &Term) -> &mut Graph {
        self.named_graphs
            .entry(name.clone())
            .or_insert_with(|| Graph::named(name.clone()))
    }

    /// Add or replace a graph under its own name. An unnamed graph replaces
    /// the default graph. Returns the graph it replaced.
    pub fn add_graph(&mut self, graph: Graph) -> Option<Graph> {
        match graph.name().cloned() {
            None => Some(std::mem::replace(&mut self.default_graph, graph)),
            Some(name) => self.named_graphs.insert(name, graph),
        }
    }

    pub fn has_graph(&self, name: &Term) -> bool {
        self.named_graphs.contains_key(name)
    }

    /// Remove a named graph
    pub fn remove_graph(&mut self, name: &Term) -> Option<Graph> {
        self.named_graphs.shift_remove(name)
    }

    /// Names of all named graphs, in insertion order
    pub fn graph_names(&self) -> impl Iterator<Item = &Term> + '_ {
        self.named_graphs.keys()
    }

    pub fn named_graph_count(&self) -> usize {
        self.named_graphs.len()
    }

    /// Triples across the default graph and every named graph
    pub fn total_triple_count(&self) -> usize {
        self.default_graph.len() + self.named_graphs.values().map(Graph::len).sum::<usize>()
    }

    /// Add a quad, creating its named graph if needed. Returns false if the
    /// quad was already present.
    pub fn add_quad(&mut self, quad: Quad) -> bool {
        let (triple, graph) = quad.into_parts();
        match graph {
            None => self.default_graph.assert(triple),
            Some(name) => self.get_or_create_graph(&name).assert(triple),
        }
    }

    /// Remove a quad. The named graph stays, even when it becomes empty.
    pub fn remove_quad(&mut self, quad: &Quad) -> bool {
        self.graph_mut(quad.graph())
            .map_or(false, |g| g.retract(quad.triple()))
    }

    /// Empty the default graph and drop every named graph
    pub fn clear(&mut self) {
        self.default_graph.clear();
        self.named_graphs.clear();
    }

    /// Every triple with the name of its graph; default graph first
    pub fn all_triples(&self) -> impl Iterator<Item = (Option<&Term>, &Triple)> + '_ {
        let default = self.default_graph.triples().map(|t| (None, t));
        let named = self
            .named_graphs
            .iter()
            .flat_map(|(name, graph)| graph.triples().map(move |t| (Some(name), t)));
        default.chain(named)
    }

    /// Owned quads of the whole dataset
    pub fn iter_quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.all_triples()
            .map(|(g, t)| Quad::new(t.clone(), g.cloned()))
    }

    /// Resolve the active graphs of one evaluation.
    ///
    /// - FROM given: the active default graph is the union of those graphs
    /// - only FROM NAMED given: the active default graph is empty
    /// - neither: the dataset's default graph
    ///
    /// The active named graphs are the FROM NAMED graphs that exist; with
    /// FROM but no FROM NAMED there are none; with neither, all of them.
    pub fn scope(&self, from: &[Term], from_named: &[Term]) -> DatasetScope<'_> {
        let default = match from {
            [] if from_named.is_empty() => Cow::Borrowed(&self.default_graph),
            [] => Cow::Owned(Graph::new()),
            [single] => match self.named_graphs.get(single) {
                Some(graph) => Cow::Borrowed(graph),
                None => Cow::Owned(Graph::new()),
            },
            many => {
                let mut merged = Graph::new();
                for name in many {
                    if let Some(graph) = self.named_graphs.get(name) {
                        merged.merge_with(graph, BlankNodeMapping::Shared);
                    }
                }
                Cow::Owned(merged)
            }
        };

        let named = if !from_named.is_empty() {
            from_named
                .iter()
                .filter_map(|name| self.named_graphs.get_key_value(name))
                .collect()
        } else if !from.is_empty() {
            IndexMap::new()
        } else {
            self.named_graphs.iter().collect()
        };

        debug!(
            default_triples = default.len(),
            named_graphs = named.len(),
            "dataset scope resolved"
        );
        DatasetScope { default, named }
    }

    /// A scope whose default graph is the named graph `name` (empty when
    /// missing), with every named graph still visible
    pub fn scope_with_default(&self, name: &Term) -> DatasetScope<'_> {
        let default = match self.named_graphs.get(name) {
            Some(graph) => Cow::Borrowed(graph),
            None => Cow::Owned(Graph::new()),
        };
        DatasetScope { default, named: self.named_graphs.iter().collect() }
    }

    /// Evaluate a query against this dataset
    pub fn evaluate(&self, query: &Query, options: &QueryOptions) -> RdfResult<QueryResult> {
        QueryEngine::new(self).execute(query, options)
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("default_triples", &self.default_graph.len())
            .field("named_graphs", &self.named_graphs.len())
            .finish()
    }
}

/// The active default graph and named graphs of one evaluation
pub struct DatasetScope<'a> {
    default: Cow<'a, Graph>,
    named: IndexMap<&'a Term, &'a Graph>,
}

impl<'a> DatasetScope<'a> {
    /// A scope over a single graph with no named graphs
    pub fn from_graph(graph: &'a Graph) -> Self {
        DatasetScope { default: Cow::Borrowed(graph), named: IndexMap::new() }
    }

    pub fn default_graph(&self) -> &Graph {
        &self.default
    }

    pub fn named_graph(&self, name: &Term) -> Option<&'a Graph> {
        self.named.get(name).copied()
    }

    pub fn named_graphs(&self) -> impl Iterator<Item = (&'a Term, &'a Graph)> + '_ {
        self.named.iter().map(|(name, graph)| (*name, *graph))
    }

    pub fn named_graph_count(&self) -> usize {
        self.named.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(s: &str) -> Term {
        Term::uri(format!("http://ex.org/{}", s))
    }

    fn t(s: &str, o: &str) -> Triple {
        Triple::new(ex(s), ex("p"), ex(o)).unwrap()
    }

    fn dataset() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_quad(Quad::in_default(t("d", "1")));
        ds.add_quad(Quad::in_graph(t("a", "1"), ex("g1")));
        ds.add_quad(Quad::in_graph(t("b", "2"), ex("g2")));
        ds
    }

    #[test]
    fn test_quads_and_graphs() {
        let mut ds = dataset();
        assert_eq!(ds.named_graph_count(), 2);
        assert_eq!(ds.total_triple_count(), 3);
        assert!(!ds.add_quad(Quad::in_graph(t("a", "1"), ex("g1"))));

        assert!(ds.remove_quad(&Quad::in_graph(t("a", "1"), ex("g1"))));
        assert!(ds.has_graph(&ex("g1")));
        assert!(!ds.remove_quad(&Quad::in_graph(t("a", "1"), ex("missing"))));
        assert_eq!(ds.total_triple_count(), 2);
    }

    #[test]
    fn test_add_graph_replaces_by_name() {
        let mut ds = dataset();
        let mut replacement = Graph::named(ex("g1"));
        replacement.assert(t("x", "y"));
        replacement.assert(t("x", "z"));
        let old = ds.add_graph(replacement).unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(ds.graph(Some(&ex("g1"))).unwrap().len(), 2);

        let old_default = ds.add_graph(Graph::new()).unwrap();
        assert_eq!(old_default.len(), 1);
        assert!(ds.default_graph().is_empty());
    }

    #[test]
    fn test_all_triples_and_quads() {
        let ds = dataset();
        let graphs: Vec<Option<&Term>> = ds.all_triples().map(|(g, _)| g).collect();
        assert_eq!(graphs[0], None);
        assert_eq!(graphs.len(), 3);
        assert_eq!(ds.iter_quads().filter(|q| q.is_default_graph()).count(), 1);
    }

    #[test]
    fn test_scope_without_clauses() {
        let ds = dataset();
        let scope = ds.scope(&[], &[]);
        assert_eq!(scope.default_graph().len(), 1);
        assert_eq!(scope.named_graph_count(), 2);
    }

    #[test]
    fn test_scope_from_merges_graphs() {
        let ds = dataset();
        let scope = ds.scope(&[ex("g1"), ex("g2")], &[]);
        assert_eq!(scope.default_graph().len(), 2);
        assert_eq!(scope.named_graph_count(), 0);
    }

    #[test]
    fn test_scope_from_named_only() {
        let ds = dataset();
        let scope = ds.scope(&[], &[ex("g2"), ex("missing")]);
        assert!(scope.default_graph().is_empty());
        assert_eq!(scope.named_graph_count(), 1);
        assert!(scope.named_graph(&ex("g2")).is_some());
        assert!(scope.named_graph(&ex("g1")).is_none());
    }

    #[test]
    fn test_scope_with_default_keeps_named() {
        let ds = dataset();
        let scope = ds.scope_with_default(&ex("g1"));
        assert_eq!(scope.default_graph().len(), 1);
        assert!(scope.default_graph().contains(&t("a", "1")));
        assert_eq!(scope.named_graph_count(), 2);
    }
}
