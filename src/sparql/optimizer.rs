//! Statistics-guided ordering of basic graph patterns
//!
//! Patterns of a BGP are joined left to right, so the order decides how
//! many intermediate rows the nested-loop join produces. The optimizer
//! estimates each pattern's cardinality from graph statistics and greedily
//! picks the cheapest pattern that shares a variable with what is already
//! bound, penalising cartesian products.

use std::collections::HashSet;

use tracing::trace;

use super::algebra::TriplePattern;
use crate::store::Graph;
use crate::term::{Term, Variable};

/// Statistics about the data for cost estimation
#[derive(Clone, Debug, Default)]
pub struct DataStatistics {
    /// Total number of triples
    pub triple_count: usize,
    /// Distinct subjects
    pub subject_count: usize,
    /// Distinct predicates
    pub predicate_count: usize,
    /// Distinct objects
    pub object_count: usize,
}

impl DataStatistics {
    /// Collect statistics from a graph; all counts come from the indexes
    pub fn collect(graph: &Graph) -> Self {
        let collection = graph.collection();
        DataStatistics {
            triple_count: collection.len(),
            subject_count: collection.distinct_subjects(),
            predicate_count: collection.distinct_predicates(),
            object_count: collection.distinct_objects(),
        }
    }

    /// Estimate the fraction of triples matching a pattern. Variables in
    /// `bound` count as bound to an unknown value.
    pub fn estimate_selectivity(&self, graph: &Graph, pattern: &TriplePattern, bound: &HashSet<&Variable>) -> f64 {
        if self.triple_count == 0 {
            return 0.0;
        }
        let total = self.triple_count as f64;
        let collection = graph.collection();
        let mut selectivity = 1.0;

        selectivity *= match position(&pattern.subject, bound) {
            Position::Constant(t) => collection.subject_count(t) as f64 / total,
            Position::Joined => 1.0 / self.subject_count.max(1) as f64,
            Position::Free => 1.0,
        };
        selectivity *= match position(&pattern.predicate, bound) {
            Position::Constant(t) => collection.predicate_count(t) as f64 / total,
            Position::Joined => 1.0 / self.predicate_count.max(1) as f64,
            Position::Free => 1.0,
        };
        selectivity *= match position(&pattern.object, bound) {
            Position::Constant(t) => collection.object_count(t) as f64 / total,
            Position::Joined => 1.0 / self.object_count.max(1) as f64,
            Position::Free => 1.0,
        };

        selectivity
    }

    /// Estimate result cardinality for a pattern
    pub fn estimate_cardinality(&self, graph: &Graph, pattern: &TriplePattern, bound: &HashSet<&Variable>) -> f64 {
        self.triple_count as f64 * self.estimate_selectivity(graph, pattern, bound)
    }
}

enum Position<'a> {
    Constant(&'a Term),
    Joined,
    Free,
}

fn position<'a>(term: &'a Term, bound: &HashSet<&Variable>) -> Position<'a> {
    match term {
        Term::Variable(v) if bound.contains(v) => Position::Joined,
        Term::Variable(_) => Position::Free,
        t => Position::Constant(t),
    }
}

/// Return the patterns in greedy join order
pub fn order_patterns(graph: &Graph, patterns: &[TriplePattern]) -> Vec<TriplePattern> {
    if patterns.len() < 2 {
        return patterns.to_vec();
    }
    let stats = DataStatistics::collect(graph);
    let mut remaining: Vec<&TriplePattern> = patterns.iter().collect();
    let mut bound: HashSet<&Variable> = HashSet::new();
    let mut ordered = Vec::with_capacity(patterns.len());

    while !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f64::MAX;

        for (idx, pattern) in remaining.iter().enumerate() {
            let cardinality = stats.estimate_cardinality(graph, pattern, &bound);
            let shared = pattern.variables().iter().filter(|v| bound.contains(*v)).count();
            let connected = bound.is_empty() || shared > 0 || pattern.variables().is_empty();

            // Score: prefer joined patterns with few expected rows
            let score = if connected { cardinality } else { cardinality * 1000.0 + 1.0 };
            if score < best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        let next = remaining.remove(best_idx);
        trace!(pattern = %next, estimate = best_score, "bgp pattern scheduled");
        bound.extend(next.variables());
        ordered.push(next.clone());
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Triple;

    fn ex(s: &str) -> Term {
        Term::uri(format!("http://ex.org/{}", s))
    }

    fn graph() -> Graph {
        let mut triples = Vec::new();
        for i in 0..50 {
            triples.push(Triple::new(ex(&format!("p{}", i)), ex("type"), ex("Person")).unwrap());
        }
        triples.push(Triple::new(ex("p1"), ex("email"), Term::literal("a@ex.org")).unwrap());
        triples.into_iter().collect()
    }

    #[test]
    fn test_statistics_collection() {
        let stats = DataStatistics::collect(&graph());
        assert_eq!(stats.triple_count, 51);
        assert_eq!(stats.subject_count, 50);
        assert_eq!(stats.predicate_count, 2);
        assert_eq!(stats.object_count, 2);
    }

    #[test]
    fn test_selectivity_uses_index_counts() {
        let g = graph();
        let stats = DataStatistics::collect(&g);
        let bound = HashSet::new();
        let typed = TriplePattern::new(Term::var("x"), ex("type"), ex("Person"));
        let email = TriplePattern::new(Term::var("x"), ex("email"), Term::var("e"));
        assert!(
            stats.estimate_cardinality(&g, &email, &bound) < stats.estimate_cardinality(&g, &typed, &bound)
        );
        let missing = TriplePattern::new(Term::var("x"), ex("nothing"), Term::var("y"));
        assert_eq!(stats.estimate_cardinality(&g, &missing, &bound), 0.0);
    }

    #[test]
    fn test_join_ordering() {
        let g = graph();
        let patterns = vec![
            TriplePattern::new(Term::var("x"), ex("type"), ex("Person")),
            TriplePattern::new(Term::var("y"), ex("type"), ex("Person")),
            TriplePattern::new(Term::var("x"), ex("email"), Term::var("e")),
        ];
        let ordered = order_patterns(&g, &patterns);
        assert_eq!(ordered[0], patterns[2]);
        // the connected pattern comes before the cartesian product
        assert_eq!(ordered[1], patterns[0]);
        assert_eq!(ordered[2], patterns[1]);
    }
}
