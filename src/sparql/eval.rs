//! Algebra evaluation
//!
//! [`Evaluator`] walks an [`Algebra`] tree with one exhaustive `match` and
//! materialises the solutions of each operator. It evaluates against an
//! *active graph*: the scope's default graph at the top, a named graph inside
//! `GRAPH`. The deadline in the [`EvaluationContext`] is checked per pattern
//! lookup and per row in the operators whose output is unbounded.
//!
//! Expression errors never escape an operator. A failing FILTER drops the
//! row, a failing BIND or sort key leaves the value unbound. Only timeouts
//! and SERVICE failures propagate.

use std::cmp::Ordering;

use fnv::FnvHashSet;
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::aggregate::evaluate_aggregate;
use super::algebra::{Aggregate, Algebra, GroupKey, OrderCondition, TriplePattern};
use super::context::EvaluationContext;
use super::expression::{ExistsEvaluator, Expression};
use super::optimizer;
use super::path::PathEvaluator;
use super::solution::Solution;
use crate::core::traits::ServiceHandler;
use crate::error::{RdfError, RdfResult};
use crate::store::{DatasetScope, Graph};
use crate::term::order::cmp_optional;
use crate::term::{Term, Triple, Variable};

/// Evaluates algebra trees against one dataset scope
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    scope: &'a DatasetScope<'a>,
    active: &'a Graph,
    ctx: &'a EvaluationContext,
    service: Option<&'a dyn ServiceHandler>,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a DatasetScope<'a>, ctx: &'a EvaluationContext) -> Self {
        Evaluator { scope, active: scope.default_graph(), ctx, service: None }
    }

    /// Route SERVICE clauses to `handler`
    pub fn with_service_handler(mut self, handler: &'a dyn ServiceHandler) -> Self {
        self.service = Some(handler);
        self
    }

    fn with_active(self, graph: &'a Graph) -> Self {
        Evaluator { active: graph, ..self }
    }

    /// All solutions of `algebra`
    pub fn evaluate(&self, algebra: &Algebra) -> RdfResult<Vec<Solution>> {
        match algebra {
            Algebra::Bgp(patterns) => self.bgp(patterns),
            Algebra::Path { subject, path, object } => {
                let (subject, object) = (hide_blank(subject), hide_blank(object));
                let mut paths = PathEvaluator::new(self.active, self.ctx);
                let pairs = paths.evaluate(path, ground(&subject), ground(&object))?;
                trace!(pairs = pairs.len(), scanned = paths.stats().triples_scanned, "path evaluated");
                Ok(pairs
                    .into_iter()
                    .filter_map(|(s, o)| {
                        let mut row = Solution::new();
                        (bind(&mut row, &subject, s) && bind(&mut row, &object, o)).then(|| {
                            row.remove_blank_placeholders();
                            row
                        })
                    })
                    .collect())
            }
            Algebra::Join(left, right) => self.join(left, right),
            Algebra::LeftJoin(left, right, filter) => self.left_join(left, right, filter.as_ref()),
            Algebra::Union(left, right) => {
                let mut rows = self.evaluate(left)?;
                rows.extend(self.evaluate(right)?);
                Ok(rows)
            }
            Algebra::Filter(expression, inner) => {
                let mut out = Vec::new();
                for row in self.evaluate(inner)? {
                    if self.ctx.should_stop()? {
                        break;
                    }
                    if self.test(expression, &row)? {
                        out.push(row);
                    }
                }
                Ok(out)
            }
            Algebra::Extend(inner, variable, expression) => {
                let mut rows = self.evaluate(inner)?;
                for row in rows.iter_mut() {
                    if row.contains(variable) {
                        debug!(variable = %variable, "BIND target already bound, row kept");
                        continue;
                    }
                    if let Some(value) = self.value(expression, row)? {
                        row.insert(variable.clone(), value);
                    }
                }
                Ok(rows)
            }
            Algebra::Minus(left, right) => self.minus(left, right),
            Algebra::Group { inner, keys, aggregates } => self.group(inner, keys, aggregates),
            Algebra::OrderBy(inner, conditions) => self.order_by(inner, conditions),
            Algebra::Distinct(inner) | Algebra::Reduced(inner) => {
                let mut seen = FnvHashSet::default();
                let mut rows = self.evaluate(inner)?;
                rows.retain(|row| seen.insert(row.clone()));
                Ok(rows)
            }
            Algebra::Slice { inner, offset, limit } => {
                if *limit == Some(0) {
                    return Ok(Vec::new());
                }
                Ok(self
                    .evaluate(inner)?
                    .into_iter()
                    .skip(*offset)
                    .take(limit.unwrap_or(usize::MAX))
                    .collect())
            }
            Algebra::Project(inner, variables) => Ok(self
                .evaluate(inner)?
                .iter()
                .map(|row| row.project(variables))
                .collect()),
            Algebra::Graph { name, inner } => self.graph(name, inner),
            Algebra::Values { variables, rows } => Ok(rows
                .iter()
                .map(|cells| {
                    variables
                        .iter()
                        .zip(cells)
                        .filter_map(|(v, cell)| cell.clone().map(|t| (v.clone(), t)))
                        .collect()
                })
                .collect()),
            Algebra::Service { endpoint, inner, silent } => self.remote(endpoint, inner, *silent),
            Algebra::Empty => Ok(vec![Solution::new()]),
        }
    }

    // ------------------------------------------------------------------
    // Basic graph patterns
    // ------------------------------------------------------------------

    fn bgp(&self, patterns: &[TriplePattern]) -> RdfResult<Vec<Solution>> {
        let has_blanks = patterns
            .iter()
            .any(|p| p.subject.is_blank() || p.predicate.is_blank() || p.object.is_blank());
        let mut patterns: Vec<TriplePattern> = patterns
            .iter()
            .map(|p| TriplePattern::new(hide_blank(&p.subject), hide_blank(&p.predicate), hide_blank(&p.object)))
            .collect();
        if self.ctx.optimize_bgp() && patterns.len() > 1 {
            patterns = optimizer::order_patterns(self.active, &patterns);
        }
        let mut out = Vec::new();
        self.extend_bgp(&patterns, Solution::new(), &mut out)?;
        if has_blanks {
            out.iter_mut().for_each(Solution::remove_blank_placeholders);
        }
        Ok(out)
    }

    /// Depth-first nested-loop join; only complete rows reach `out`, so a
    /// deadline stop never yields half-matched solutions. Returns true once
    /// evaluation must stop.
    fn extend_bgp(&self, patterns: &[TriplePattern], row: Solution, out: &mut Vec<Solution>) -> RdfResult<bool> {
        let Some((first, rest)) = patterns.split_first() else {
            out.push(row);
            return Ok(false);
        };
        if self.ctx.should_stop()? {
            return Ok(true);
        }
        let bound = first.substitute(&row);
        trace!(pattern = %bound, "bgp lookup");
        for triple in self.active.matching(ground(&bound.subject), ground(&bound.predicate), ground(&bound.object)) {
            if let Some(next) = bind_triple(&bound, triple, &row) {
                if self.extend_bgp(rest, next, out)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    // ------------------------------------------------------------------
    // Joins
    // ------------------------------------------------------------------

    fn join(&self, left: &Algebra, right: &Algebra) -> RdfResult<Vec<Solution>> {
        let left = self.evaluate(left)?;
        if left.is_empty() {
            return Ok(left);
        }
        let right = self.evaluate(right)?;
        let mut out = Vec::new();
        for a in &left {
            if self.ctx.should_stop()? {
                break;
            }
            out.extend(right.iter().filter_map(|b| a.merge(b)));
        }
        Ok(out)
    }

    fn left_join(&self, left: &Algebra, right: &Algebra, filter: Option<&Expression>) -> RdfResult<Vec<Solution>> {
        let left = self.evaluate(left)?;
        if left.is_empty() {
            return Ok(left);
        }
        let right = self.evaluate(right)?;
        let mut out = Vec::new();
        for a in left {
            if self.ctx.should_stop()? {
                break;
            }
            let mut matched = false;
            for b in &right {
                let Some(merged) = a.merge(b) else { continue };
                let keep = match filter {
                    Some(expression) => self.test(expression, &merged)?,
                    None => true,
                };
                if keep {
                    out.push(merged);
                    matched = true;
                }
            }
            if !matched {
                out.push(a);
            }
        }
        Ok(out)
    }

    /// Keep left rows without a compatible right row sharing a variable
    fn minus(&self, left: &Algebra, right: &Algebra) -> RdfResult<Vec<Solution>> {
        let left = self.evaluate(left)?;
        if left.is_empty() {
            return Ok(left);
        }
        let right = self.evaluate(right)?;
        let mut out = Vec::new();
        for a in left {
            if self.ctx.should_stop()? {
                break;
            }
            if !right.iter().any(|b| a.shares_variable(b) && a.is_compatible(b)) {
                out.push(a);
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Grouping and ordering
    // ------------------------------------------------------------------

    fn group(&self, inner: &Algebra, keys: &[GroupKey], aggregates: &[(Variable, Aggregate)]) -> RdfResult<Vec<Solution>> {
        let rows = self.evaluate(inner)?;
        let mut groups: IndexMap<Vec<Option<Term>>, Vec<&Solution>> = IndexMap::new();
        for row in &rows {
            let key = keys
                .iter()
                .map(|k| self.value(&k.expression, row))
                .collect::<RdfResult<Vec<_>>>()?;
            groups.entry(key).or_default().push(row);
        }
        // an implicit group exists even over no rows: COUNT(*) is 0
        if groups.is_empty() && keys.is_empty() {
            groups.insert(Vec::new(), Vec::new());
        }

        let mut out = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let mut row = Solution::new();
            for (group_key, value) in keys.iter().zip(key) {
                if let (Some(variable), Some(value)) = (group_key.output_variable(), value) {
                    row.insert(variable.clone(), value);
                }
            }
            for (variable, aggregate) in aggregates {
                if let Some(value) = evaluate_aggregate(aggregate, &members, self)? {
                    row.insert(variable.clone(), value);
                }
            }
            out.push(row);
        }
        trace!(groups = out.len(), "grouped");
        Ok(out)
    }

    fn order_by(&self, inner: &Algebra, conditions: &[OrderCondition]) -> RdfResult<Vec<Solution>> {
        let mut keyed = Vec::new();
        for row in self.evaluate(inner)? {
            let keys = conditions
                .iter()
                .map(|c| self.value(&c.expression, &row))
                .collect::<RdfResult<Vec<_>>>()?;
            keyed.push((keys, row));
        }

        // sort_by is stable: rows with equal keys keep their order
        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), condition) in a.iter().zip(b).zip(conditions) {
                let ordering = cmp_optional(x.as_ref(), y.as_ref());
                let ordering = if condition.descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    // ------------------------------------------------------------------
    // Graphs and services
    // ------------------------------------------------------------------

    fn graph(&self, name: &Term, inner: &Algebra) -> RdfResult<Vec<Solution>> {
        let variable = match name {
            Term::Variable(v) => v,
            _ => {
                return match self.scope.named_graph(name) {
                    Some(graph) => self.with_active(graph).evaluate(inner),
                    None => Ok(Vec::new()),
                };
            }
        };

        // ?g ranges over the named graphs only, never the default graph
        let mut out = Vec::new();
        for (graph_name, graph) in self.scope.named_graphs() {
            if self.ctx.should_stop()? {
                break;
            }
            for mut row in self.with_active(graph).evaluate(inner)? {
                match row.get(variable) {
                    Some(bound) if bound != graph_name => continue,
                    Some(_) => {}
                    None => row.insert(variable.clone(), graph_name.clone()),
                }
                out.push(row);
            }
        }
        Ok(out)
    }

    fn remote(&self, endpoint: &Term, inner: &Algebra, silent: bool) -> RdfResult<Vec<Solution>> {
        let result = match self.service {
            Some(handler) => handler.execute(endpoint, inner),
            None => Err(RdfError::service(&endpoint.to_string(), "no service handler configured")),
        };
        match result {
            Ok(rows) => Ok(rows),
            Err(e) if silent && !e.is_timeout() => {
                warn!(endpoint = %endpoint, error = %e, "SERVICE SILENT failed, continuing with one empty row");
                Ok(vec![Solution::new()])
            }
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Effective boolean value of a filter; errors other than timeouts are false
    fn test(&self, expression: &Expression, row: &Solution) -> RdfResult<bool> {
        match expression.effective_boolean(row, self) {
            Ok(b) => Ok(b),
            Err(e) if e.is_timeout() => Err(e),
            Err(_) => Ok(false),
        }
    }

    /// Value of an expression; errors other than timeouts are unbound
    fn value(&self, expression: &Expression, row: &Solution) -> RdfResult<Option<Term>> {
        match expression.evaluate(row, self) {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.is_timeout() => Err(e),
            Err(_) => Ok(None),
        }
    }
}

impl ExistsEvaluator for Evaluator<'_> {
    fn exists(&self, pattern: &Algebra, row: &Solution) -> RdfResult<bool> {
        let rows = self.evaluate(&pattern.substitute(row))?;
        Ok(rows.iter().any(|r| r.is_compatible(row)))
    }

    fn regex(&self, pattern: &str, flags: &str) -> RdfResult<regex::Regex> {
        self.ctx.regex(pattern, flags)
    }

    fn labelled_blank(&self, label: &str, row: &Solution) -> Term {
        self.ctx.labelled_blank(label, row)
    }
}

/// Pattern blank nodes match like variables that never reach the result
fn hide_blank(term: &Term) -> Term {
    match term {
        Term::BlankNode(b) => Term::Variable(Variable::for_blank(b.id())),
        _ => term.clone(),
    }
}

/// The term itself when it is concrete; `None` for variables
fn ground(term: &Term) -> Option<&Term> {
    if term.is_variable() {
        None
    } else {
        Some(term)
    }
}

/// Bind a pattern position to a value; false on conflict with an earlier binding
fn bind(row: &mut Solution, pattern: &Term, value: Term) -> bool {
    match pattern {
        Term::Variable(v) => match row.get(v) {
            Some(existing) => *existing == value,
            None => {
                row.insert(v.clone(), value);
                true
            }
        },
        _ => true,
    }
}

fn bind_triple(pattern: &TriplePattern, triple: &Triple, row: &Solution) -> Option<Solution> {
    let mut next = row.clone();
    let positions = [
        (&pattern.subject, triple.subject()),
        (&pattern.predicate, triple.predicate()),
        (&pattern.object, triple.object()),
    ];
    for (term, value) in positions {
        if !bind(&mut next, term, value.clone()) {
            return None;
        }
    }
    Some(next)
}
