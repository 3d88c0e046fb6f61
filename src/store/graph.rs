//! RDF graph
//!
//! A graph owns an indexed triple collection plus display metadata: a
//! namespace prefix map, an optional name and an optional base IRI.

use fnv::{FnvHashMap, FnvHashSet};
use indexmap::IndexMap;

use super::index::TripleCollection;
use super::isomorphism;
use crate::config::StoreConfig;
use crate::core::namespaces::ns;
use crate::term::{BlankNode, Term, Triple, Uri};

/// How blank nodes of a merged graph relate to those of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlankNodeMapping {
    /// Blank nodes of the source are distinct from the target's and get fresh ids
    #[default]
    Fresh,
    /// The caller declares that equal ids denote the same node
    Shared,
}

/// A set of triples with optional name and base IRI
#[derive(Clone, Default)]
pub struct Graph {
    triples: TripleCollection,
    namespaces: IndexMap<String, String>,
    name: Option<Term>,
    base: Option<Uri>,
}

impl Graph {
    /// Create a new empty graph with the standard prefixes
    pub fn new() -> Self {
        let mut graph = Graph::default();
        for (prefix, namespace) in ns::DEFAULT_PREFIXES {
            graph.set_prefix(prefix, namespace);
        }
        graph
    }

    /// Create an empty graph with a name
    pub fn named(name: Term) -> Self {
        let mut graph = Graph::new();
        graph.name = Some(name);
        graph
    }

    /// Create an empty graph carrying the configured prefixes
    pub fn with_config(config: &StoreConfig) -> Self {
        let mut graph = Graph::new();
        for (prefix, namespace) in &config.prefixes {
            graph.set_prefix(prefix, namespace);
        }
        graph
    }

    /// The graph name, if any
    pub fn name(&self) -> Option<&Term> {
        self.name.as_ref()
    }

    /// Set or clear the graph name
    pub fn set_name(&mut self, name: Option<Term>) {
        self.name = name;
    }

    /// The base IRI, if any
    pub fn base(&self) -> Option<&Uri> {
        self.base.as_ref()
    }

    /// Set or clear the base IRI
    pub fn set_base(&mut self, base: Option<Uri>) {
        self.base = base;
    }

    /// Add a triple. Returns false when it was already present.
    pub fn assert(&mut self, triple: Triple) -> bool {
        self.triples.insert(triple)
    }

    /// Remove a triple. Returns false when it was absent.
    pub fn retract(&mut self, triple: &Triple) -> bool {
        self.triples.remove(triple)
    }

    /// Add many triples, returning how many were new
    pub fn assert_all(&mut self, triples: impl IntoIterator<Item = Triple>) -> usize {
        triples.into_iter().filter(|t| self.triples.insert(t.clone())).count()
    }

    /// Remove many triples, returning how many were present
    pub fn retract_all<'a>(&mut self, triples: impl IntoIterator<Item = &'a Triple>) -> usize {
        triples.into_iter().filter(|t| self.triples.remove(t)).count()
    }

    /// Check if the graph contains a triple
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Lazily enumerate matching triples; `None` is a wildcard
    pub fn matching<'a>(
        &'a self,
        s: Option<&'a Term>,
        p: Option<&'a Term>,
        o: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        self.triples.matching(s, p, o)
    }

    /// Iterate over all triples
    pub fn triples(&self) -> impl Iterator<Item = &Triple> + '_ {
        self.triples.iter()
    }

    /// The underlying indexed collection
    pub fn collection(&self) -> &TripleCollection {
        &self.triples
    }

    /// Get the number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Remove all triples; name, base and prefixes are kept
    pub fn clear(&mut self) {
        self.triples.clear();
    }

    /// Merge another graph into this one, relabelling its blank nodes so they
    /// cannot collide with ours. Returns the number of new triples.
    pub fn merge(&mut self, other: &Graph) -> usize {
        self.merge_with(other, BlankNodeMapping::Fresh)
    }

    /// Merge another graph with an explicit blank node policy
    pub fn merge_with(&mut self, other: &Graph, mapping: BlankNodeMapping) -> usize {
        for (prefix, namespace) in &other.namespaces {
            if !self.namespaces.contains_key(prefix) {
                self.namespaces.insert(prefix.clone(), namespace.clone());
            }
        }

        if mapping == BlankNodeMapping::Shared {
            return self.assert_all(other.triples().cloned());
        }

        let taken: FnvHashSet<String> = self
            .triples
            .nodes()
            .filter_map(|t| t.as_blank().map(|b| b.id().to_string()))
            .collect();
        let mut relabel: FnvHashMap<BlankNode, Term> = FnvHashMap::default();
        let mut added = 0;

        for triple in other.triples() {
            let mapped = triple.map_terms(|t| match t {
                Term::BlankNode(b) => relabel
                    .entry(b.clone())
                    .or_insert_with(|| fresh_blank_avoiding(&taken))
                    .clone(),
                _ => t.clone(),
            });
            if let Ok(mapped) = mapped {
                if self.triples.insert(mapped) {
                    added += 1;
                }
            }
        }
        added
    }

    /// The prefix map
    pub fn namespaces(&self) -> &IndexMap<String, String> {
        &self.namespaces
    }

    /// Bind a prefix to a namespace IRI
    pub fn set_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.namespaces.insert(prefix.into(), namespace.into());
    }

    /// Expand a `prefix:local` name with the prefix map
    pub fn resolve_prefixed(&self, qname: &str) -> Option<Uri> {
        let (prefix, local) = qname.split_once(':')?;
        self.namespaces
            .get(prefix)
            .map(|namespace| Uri::new(format!("{}{}", namespace, local)))
    }

    /// Resolve an IRI reference against the base IRI; without a base only
    /// absolute references resolve
    pub fn resolve_iri(&self, reference: &str) -> Option<Uri> {
        match &self.base {
            Some(base) => Some(base.resolve(reference)),
            None => Uri::parse(reference).ok(),
        }
    }

    /// Whether some bijection of blank nodes maps this graph onto `other`
    pub fn is_isomorphic(&self, other: &Graph) -> bool {
        isomorphism::is_isomorphic(&self.triples, &other.triples)
    }

    /// Cheap comparison of the ground parts; see [`isomorphism::ground_equals`]
    pub fn ground_equals(&self, other: &Graph) -> bool {
        isomorphism::ground_equals(&self.triples, &other.triples)
    }
}

fn fresh_blank_avoiding(taken: &FnvHashSet<String>) -> Term {
    loop {
        let candidate = BlankNode::fresh();
        if !taken.contains(candidate.id()) {
            return Term::BlankNode(candidate);
        }
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.is_isomorphic(other)
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut graph = Graph::new();
        graph.assert_all(iter);
        graph
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "Graph {} {{", name)?,
            None => writeln!(f, "Graph {{")?,
        }
        for triple in self.triples() {
            writeln!(f, "  {:?}", triple)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: Term, p: &str, o: Term) -> Triple {
        Triple::new(s, Term::uri(format!("http://ex.org/{}", p)), o).unwrap()
    }

    fn ex(s: &str) -> Term {
        Term::uri(format!("http://ex.org/{}", s))
    }

    #[test]
    fn test_assert_retract_idempotent() {
        let mut g = Graph::new();
        let triple = t(ex("a"), "p", Term::literal("1"));
        assert!(g.assert(triple.clone()));
        assert!(!g.assert(triple.clone()));
        assert_eq!(g.len(), 1);
        assert!(g.retract(&triple));
        assert!(!g.retract(&triple));
        assert!(g.is_empty());
    }

    #[test]
    fn test_matching() {
        let g: Graph = vec![
            t(ex("a"), "p", Term::literal("1")),
            t(ex("b"), "p", Term::literal("2")),
        ]
        .into_iter()
        .collect();
        let p = ex("p");
        assert_eq!(g.matching(None, Some(&p), None).count(), 2);
        assert_eq!(g.matching(Some(&ex("a")), None, None).count(), 1);
    }

    #[test]
    fn test_merge_relabels_blank_nodes() {
        let mut g: Graph = vec![t(Term::blank("x"), "p", Term::literal("mine"))].into_iter().collect();
        let other: Graph = vec![t(Term::blank("x"), "p", Term::literal("theirs"))].into_iter().collect();

        assert_eq!(g.merge(&other), 1);
        assert_eq!(g.len(), 2);
        let subjects: FnvHashSet<Term> = g.triples().map(|t| t.subject().clone()).collect();
        assert_eq!(subjects.len(), 2);
    }

    #[test]
    fn test_merge_disjoint_ground_graphs() {
        let mut g: Graph = vec![
            t(ex("a"), "p", Term::literal("1")),
            t(ex("b"), "p", ex("c")),
        ]
        .into_iter()
        .collect();
        let other: Graph = vec![
            t(ex("c"), "q", Term::integer(2)),
            t(ex("d"), "q", Term::literal("3")),
            t(ex("a"), "q", ex("d")),
        ]
        .into_iter()
        .collect();
        let mut expected: FnvHashSet<Triple> = g.triples().cloned().collect();
        expected.extend(other.triples().cloned());

        assert_eq!(g.merge(&other), 3);
        assert_eq!(g.len(), 5);
        let all: FnvHashSet<Triple> = g.matching(None, None, None).cloned().collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_merge_shared_keeps_ids() {
        let mut g: Graph = vec![t(Term::blank("x"), "p", Term::literal("1"))].into_iter().collect();
        let other: Graph = vec![t(Term::blank("x"), "q", Term::literal("2"))].into_iter().collect();
        g.merge_with(&other, BlankNodeMapping::Shared);
        let x = Term::blank("x");
        assert_eq!(g.matching(Some(&x), None, None).count(), 2);
    }

    #[test]
    fn test_merge_into_empty_is_isomorphic() {
        let source: Graph = vec![
            t(Term::blank("x"), "knows", Term::blank("y")),
            t(Term::blank("y"), "name", Term::literal("Bob")),
        ]
        .into_iter()
        .collect();
        let mut target = Graph::new();
        target.merge(&source);
        assert!(target.is_isomorphic(&source));
        assert_eq!(target, source);
        assert!(!target.contains(&t(Term::blank("y"), "name", Term::literal("Bob"))));
    }

    #[test]
    fn test_prefixes() {
        let mut g = Graph::new();
        assert_eq!(
            g.resolve_prefixed("xsd:integer").unwrap().as_str(),
            "http://www.w3.org/2001/XMLSchema#integer"
        );
        g.set_prefix("ex", "http://ex.org/");
        assert_eq!(g.resolve_prefixed("ex:a").unwrap().as_str(), "http://ex.org/a");
        assert!(g.resolve_prefixed("nope:a").is_none());
    }

    #[test]
    fn test_resolve_against_base() {
        let mut g = Graph::new();
        assert!(g.resolve_iri("doc#a").is_none());
        g.set_base(Some(Uri::new("http://ex.org/data/doc".to_string())));
        assert_eq!(g.resolve_iri("#a").unwrap().as_str(), "http://ex.org/data/doc#a");
        assert_eq!(g.resolve_iri("other").unwrap().as_str(), "http://ex.org/data/other");
        assert_eq!(g.resolve_iri("urn:x:y").unwrap().as_str(), "urn:x:y");
    }

    #[test]
    fn test_clear_keeps_metadata() {
        let mut g = Graph::named(ex("g"));
        g.assert(t(ex("a"), "p", Term::literal("1")));
        g.clear();
        assert!(g.is_empty());
        assert_eq!(g.name(), Some(&ex("g")));
    }
}
