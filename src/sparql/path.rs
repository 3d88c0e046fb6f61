//! Property path evaluation
//!
//! Evaluates SPARQL 1.1 property paths over one graph:
//! - predicate and inverse steps go straight to the graph indexes
//! - sequences evaluate from whichever end is bound
//! - `*` and `+` run a breadth-first closure per start node, so every
//!   reachable node is reported once and cycles terminate
//!
//! The evaluator checks the evaluation deadline per expanded node.

use fnv::FnvHashSet;
use std::collections::VecDeque;

use super::algebra::PropertyPath;
use super::context::EvaluationContext;
use crate::error::RdfResult;
use crate::store::Graph;
use crate::term::Term;

/// Statistics for path evaluation
#[derive(Debug, Clone, Default)]
pub struct PathStats {
    /// Number of triples read from the graph
    pub triples_scanned: usize,
    /// Number of nodes expanded in closures
    pub nodes_visited: usize,
    /// Deepest closure level reached
    pub max_depth: usize,
}

/// Property path evaluator over one graph
pub struct PathEvaluator<'a> {
    graph: &'a Graph,
    ctx: &'a EvaluationContext,
    stats: PathStats,
}

type Pairs = Vec<(Term, Term)>;

impl<'a> PathEvaluator<'a> {
    pub fn new(graph: &'a Graph, ctx: &'a EvaluationContext) -> Self {
        PathEvaluator { graph, ctx, stats: PathStats::default() }
    }

    /// Get evaluation statistics
    pub fn stats(&self) -> &PathStats {
        &self.stats
    }

    /// All (subject, object) pairs connected by `path`, restricted by the
    /// bound ends
    pub fn evaluate(
        &mut self,
        path: &PropertyPath,
        subject: Option<&Term>,
        object: Option<&Term>,
    ) -> RdfResult<Pairs> {
        match path {
            PropertyPath::Predicate(p) => Ok(self.step(p, subject, object)),
            PropertyPath::Inverse(inner) => Ok(self
                .evaluate(inner, object, subject)?
                .into_iter()
                .map(|(s, o)| (o, s))
                .collect()),
            PropertyPath::Sequence(left, right) => self.sequence(left, right, subject, object),
            PropertyPath::Alternative(left, right) => {
                let mut pairs = self.evaluate(left, subject, object)?;
                pairs.extend(self.evaluate(right, subject, object)?);
                Ok(pairs)
            }
            PropertyPath::ZeroOrMore(inner) => self.closure(inner, subject, object, true),
            PropertyPath::OneOrMore(inner) => self.closure(inner, subject, object, false),
            PropertyPath::ZeroOrOne(inner) => {
                let mut seen = FnvHashSet::default();
                let mut pairs = Vec::new();
                for pair in self.zero_length(subject, object) {
                    if seen.insert(pair.clone()) {
                        pairs.push(pair);
                    }
                }
                for pair in self.evaluate(inner, subject, object)? {
                    if seen.insert(pair.clone()) {
                        pairs.push(pair);
                    }
                }
                Ok(pairs)
            }
            PropertyPath::NegatedSet { forward, inverse } => {
                let mut pairs = Vec::new();
                if !forward.is_empty() || inverse.is_empty() {
                    for triple in self.graph.matching(subject, None, object) {
                        self.stats.triples_scanned += 1;
                        if !forward.contains(triple.predicate()) {
                            pairs.push((triple.subject().clone(), triple.object().clone()));
                        }
                    }
                }
                if !inverse.is_empty() {
                    for triple in self.graph.matching(object, None, subject) {
                        self.stats.triples_scanned += 1;
                        if !inverse.contains(triple.predicate()) {
                            pairs.push((triple.object().clone(), triple.subject().clone()));
                        }
                    }
                }
                Ok(pairs)
            }
        }
    }

    fn step(&mut self, predicate: &Term, subject: Option<&Term>, object: Option<&Term>) -> Pairs {
        let pairs: Pairs = self
            .graph
            .matching(subject, Some(predicate), object)
            .map(|t| (t.subject().clone(), t.object().clone()))
            .collect();
        self.stats.triples_scanned += pairs.len();
        pairs
    }

    fn sequence(
        &mut self,
        left: &PropertyPath,
        right: &PropertyPath,
        subject: Option<&Term>,
        object: Option<&Term>,
    ) -> RdfResult<Pairs> {
        let mut pairs = Vec::new();
        if subject.is_none() && object.is_some() {
            // evaluate from the bound object backwards
            for (middle, o) in self.evaluate(right, None, object)? {
                if self.ctx.should_stop()? {
                    break;
                }
                for (s, _) in self.evaluate(left, None, Some(&middle))? {
                    pairs.push((s, o.clone()));
                }
            }
        } else {
            for (s, middle) in self.evaluate(left, subject, None)? {
                if self.ctx.should_stop()? {
                    break;
                }
                for (_, o) in self.evaluate(right, Some(&middle), object)? {
                    pairs.push((s.clone(), o));
                }
            }
        }
        Ok(pairs)
    }

    /// Pairs of the zero-length path: every node of the graph to itself, or
    /// the bound end to itself
    fn zero_length(&self, subject: Option<&Term>, object: Option<&Term>) -> Pairs {
        match (subject, object) {
            (Some(s), Some(o)) => {
                if s == o {
                    vec![(s.clone(), s.clone())]
                } else {
                    Vec::new()
                }
            }
            (Some(n), None) | (None, Some(n)) => vec![(n.clone(), n.clone())],
            (None, None) => self
                .graph
                .collection()
                .nodes()
                .map(|n| (n.clone(), n.clone()))
                .collect(),
        }
    }

    fn closure(
        &mut self,
        inner: &PropertyPath,
        subject: Option<&Term>,
        object: Option<&Term>,
        include_zero: bool,
    ) -> RdfResult<Pairs> {
        // with only the object bound, walk the inverse path from it
        if subject.is_none() {
            if let Some(o) = object {
                let reversed = self.reachable(inner, o, include_zero, true)?;
                return Ok(reversed.into_iter().map(|s| (s, o.clone())).collect());
            }
        }

        let starts: Vec<Term> = match subject {
            Some(s) => vec![s.clone()],
            None => self.graph.collection().nodes().cloned().collect(),
        };

        let mut pairs = Vec::new();
        for start in starts {
            for end in self.reachable(inner, &start, include_zero, false)? {
                if object.map_or(true, |o| *o == end) {
                    pairs.push((start.clone(), end));
                }
            }
        }
        Ok(pairs)
    }

    /// Nodes reachable from `start` by repeating `inner`, each reported once
    fn reachable(
        &mut self,
        inner: &PropertyPath,
        start: &Term,
        include_zero: bool,
        backwards: bool,
    ) -> RdfResult<Vec<Term>> {
        let mut seen: FnvHashSet<Term> = FnvHashSet::default();
        let mut out = Vec::new();
        if include_zero {
            seen.insert(start.clone());
            out.push(start.clone());
        }

        let mut queue = VecDeque::from([(start.clone(), 0usize)]);
        let mut expanded: FnvHashSet<Term> = FnvHashSet::default();
        while let Some((node, depth)) = queue.pop_front() {
            if depth >= self.ctx.max_path_depth() || self.ctx.should_stop()? {
                break;
            }
            if !expanded.insert(node.clone()) {
                continue;
            }
            self.stats.nodes_visited += 1;
            self.stats.max_depth = self.stats.max_depth.max(depth + 1);

            let next = if backwards {
                self.evaluate(inner, None, Some(&node))?
                    .into_iter()
                    .map(|(s, _)| s)
                    .collect::<Vec<_>>()
            } else {
                self.evaluate(inner, Some(&node), None)?
                    .into_iter()
                    .map(|(_, o)| o)
                    .collect::<Vec<_>>()
            };
            for n in next {
                if seen.insert(n.clone()) {
                    out.push(n.clone());
                }
                if !expanded.contains(&n) {
                    queue.push_back((n, depth + 1));
                }
            }
        }
        Ok(out)
    }
}
