//! SPARQL algebra
//!
//! Queries reach the evaluator as a closed tree of [`Algebra`] operators,
//! produced by an external parser or built directly with the constructor
//! helpers below.

use std::collections::BTreeSet;
use std::fmt;

use super::expression::Expression;
use super::solution::Solution;
use crate::term::{Term, Variable};

/// A triple pattern; any position may hold a variable
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        TriplePattern { subject, predicate, object }
    }

    /// Variables of the pattern, in position order and without duplicates
    pub fn variables(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = Vec::with_capacity(3);
        for term in [&self.subject, &self.predicate, &self.object] {
            if let Term::Variable(v) = term {
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
        }
        vars
    }

    /// Number of positions holding a concrete term
    pub fn bound_count(&self) -> usize {
        [&self.subject, &self.predicate, &self.object]
            .iter()
            .filter(|t| !t.is_variable())
            .count()
    }

    /// Replace variables bound in `solution` by their values
    pub fn substitute(&self, solution: &Solution) -> TriplePattern {
        TriplePattern {
            subject: solution.resolve(&self.subject),
            predicate: solution.resolve(&self.predicate),
            object: solution.resolve(&self.object),
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// SPARQL 1.1 property path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    /// A single predicate IRI
    Predicate(Term),
    /// `^path`
    Inverse(Box<PropertyPath>),
    /// `path1 / path2`
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    /// `path1 | path2`
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    /// `path*`
    ZeroOrMore(Box<PropertyPath>),
    /// `path+`
    OneOrMore(Box<PropertyPath>),
    /// `path?`
    ZeroOrOne(Box<PropertyPath>),
    /// `!(iri1 | ^iri2 | ...)`
    NegatedSet {
        forward: Vec<Term>,
        inverse: Vec<Term>,
    },
}

impl PropertyPath {
    pub fn predicate(iri: &str) -> Self {
        PropertyPath::Predicate(Term::uri(iri))
    }

    pub fn inverse(self) -> Self {
        PropertyPath::Inverse(Box::new(self))
    }

    pub fn then(self, next: PropertyPath) -> Self {
        PropertyPath::Sequence(Box::new(self), Box::new(next))
    }

    pub fn or(self, other: PropertyPath) -> Self {
        PropertyPath::Alternative(Box::new(self), Box::new(other))
    }

    pub fn zero_or_more(self) -> Self {
        PropertyPath::ZeroOrMore(Box::new(self))
    }

    pub fn one_or_more(self) -> Self {
        PropertyPath::OneOrMore(Box::new(self))
    }

    pub fn zero_or_one(self) -> Self {
        PropertyPath::ZeroOrOne(Box::new(self))
    }
}

/// Aggregate functions
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat { separator: String },
    Median,
    Mode,
    /// MIN over the numeric values only
    NumericMin,
    /// MAX over the numeric values only
    NumericMax,
}

/// One aggregate of a GROUP BY
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFunction,
    /// The aggregated expression; `None` is `COUNT(*)`
    pub expression: Option<Expression>,
    pub distinct: bool,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, expression: Expression) -> Self {
        Aggregate { function, expression: Some(expression), distinct: false }
    }

    /// `COUNT(*)`
    pub fn count_all() -> Self {
        Aggregate { function: AggregateFunction::Count, expression: None, distinct: false }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// A GROUP BY key; variables keep their name, other expressions need an alias
/// to be visible after grouping
#[derive(Clone, Debug, PartialEq)]
pub struct GroupKey {
    pub expression: Expression,
    pub alias: Option<Variable>,
}

impl GroupKey {
    pub fn variable(name: &str) -> Self {
        GroupKey { expression: Expression::var(name), alias: None }
    }

    /// The variable the key value is bound to in the output rows
    pub fn output_variable(&self) -> Option<&Variable> {
        match (&self.alias, &self.expression) {
            (Some(alias), _) => Some(alias),
            (None, Expression::Variable(v)) => Some(v),
            _ => None,
        }
    }
}

/// ORDER BY condition
#[derive(Clone, Debug, PartialEq)]
pub struct OrderCondition {
    pub expression: Expression,
    pub descending: bool,
}

impl OrderCondition {
    pub fn asc(expression: Expression) -> Self {
        OrderCondition { expression, descending: false }
    }

    pub fn desc(expression: Expression) -> Self {
        OrderCondition { expression, descending: true }
    }
}

/// SPARQL algebra operators
#[derive(Clone, Debug, PartialEq)]
pub enum Algebra {
    /// Basic graph pattern
    Bgp(Vec<TriplePattern>),
    /// Property path pattern
    Path {
        subject: Term,
        path: PropertyPath,
        object: Term,
    },
    Join(Box<Algebra>, Box<Algebra>),
    /// OPTIONAL with its optional filter
    LeftJoin(Box<Algebra>, Box<Algebra>, Option<Expression>),
    Union(Box<Algebra>, Box<Algebra>),
    Filter(Expression, Box<Algebra>),
    /// BIND
    Extend(Box<Algebra>, Variable, Expression),
    Minus(Box<Algebra>, Box<Algebra>),
    Group {
        inner: Box<Algebra>,
        keys: Vec<GroupKey>,
        aggregates: Vec<(Variable, Aggregate)>,
    },
    OrderBy(Box<Algebra>, Vec<OrderCondition>),
    Distinct(Box<Algebra>),
    Reduced(Box<Algebra>),
    Slice {
        inner: Box<Algebra>,
        offset: usize,
        limit: Option<usize>,
    },
    Project(Box<Algebra>, Vec<Variable>),
    /// GRAPH pattern; `name` is an IRI or a variable
    Graph {
        name: Term,
        inner: Box<Algebra>,
    },
    /// Inline data; `None` cells are UNDEF
    Values {
        variables: Vec<Variable>,
        rows: Vec<Vec<Option<Term>>>,
    },
    /// Federated query delegated to a service handler
    Service {
        endpoint: Term,
        inner: Box<Algebra>,
        silent: bool,
    },
    /// The single empty solution
    Empty,
}

impl Algebra {
    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Algebra::Bgp(patterns)
    }

    pub fn join(left: Algebra, right: Algebra) -> Self {
        Algebra::Join(Box::new(left), Box::new(right))
    }

    pub fn left_join(left: Algebra, right: Algebra, filter: Option<Expression>) -> Self {
        Algebra::LeftJoin(Box::new(left), Box::new(right), filter)
    }

    pub fn union(left: Algebra, right: Algebra) -> Self {
        Algebra::Union(Box::new(left), Box::new(right))
    }

    pub fn filter(self, expression: Expression) -> Self {
        Algebra::Filter(expression, Box::new(self))
    }

    pub fn extend(self, variable: &str, expression: Expression) -> Self {
        Algebra::Extend(Box::new(self), Variable::new(variable), expression)
    }

    pub fn minus(left: Algebra, right: Algebra) -> Self {
        Algebra::Minus(Box::new(left), Box::new(right))
    }

    pub fn group(self, keys: Vec<GroupKey>, aggregates: Vec<(Variable, Aggregate)>) -> Self {
        Algebra::Group { inner: Box::new(self), keys, aggregates }
    }

    pub fn order_by(self, conditions: Vec<OrderCondition>) -> Self {
        Algebra::OrderBy(Box::new(self), conditions)
    }

    pub fn distinct(self) -> Self {
        Algebra::Distinct(Box::new(self))
    }

    pub fn reduced(self) -> Self {
        Algebra::Reduced(Box::new(self))
    }

    pub fn slice(self, offset: usize, limit: Option<usize>) -> Self {
        Algebra::Slice { inner: Box::new(self), offset, limit }
    }

    pub fn project(self, variables: &[&str]) -> Self {
        Algebra::Project(Box::new(self), variables.iter().map(|v| Variable::new(v)).collect())
    }

    pub fn graph(name: Term, inner: Algebra) -> Self {
        Algebra::Graph { name, inner: Box::new(inner) }
    }

    pub fn path(subject: Term, path: PropertyPath, object: Term) -> Self {
        Algebra::Path { subject, path, object }
    }

    /// Variables that may be bound in the solutions of this operator, in
    /// first-appearance order
    pub fn visible_variables(&self) -> Vec<Variable> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        self.collect_visible(&mut seen, &mut out);
        out
    }

    fn collect_visible(&self, seen: &mut BTreeSet<Variable>, out: &mut Vec<Variable>) {
        fn push(v: &Variable, seen: &mut BTreeSet<Variable>, out: &mut Vec<Variable>) {
            if seen.insert(v.clone()) {
                out.push(v.clone());
            }
        }
        match self {
            Algebra::Bgp(patterns) => {
                for pattern in patterns {
                    for v in pattern.variables() {
                        push(v, seen, out);
                    }
                }
            }
            Algebra::Path { subject, object, .. } => {
                for term in [subject, object] {
                    if let Term::Variable(v) = term {
                        push(v, seen, out);
                    }
                }
            }
            Algebra::Join(l, r) | Algebra::LeftJoin(l, r, _) | Algebra::Union(l, r) => {
                l.collect_visible(seen, out);
                r.collect_visible(seen, out);
            }
            Algebra::Minus(l, _) => l.collect_visible(seen, out),
            Algebra::Filter(_, inner)
            | Algebra::OrderBy(inner, _)
            | Algebra::Distinct(inner)
            | Algebra::Reduced(inner)
            | Algebra::Slice { inner, .. }
            | Algebra::Service { inner, .. } => inner.collect_visible(seen, out),
            Algebra::Extend(inner, v, _) => {
                inner.collect_visible(seen, out);
                push(v, seen, out);
            }
            Algebra::Group { keys, aggregates, .. } => {
                for key in keys {
                    if let Some(v) = key.output_variable() {
                        push(v, seen, out);
                    }
                }
                for (v, _) in aggregates {
                    push(v, seen, out);
                }
            }
            Algebra::Project(_, vars) | Algebra::Values { variables: vars, .. } => {
                for v in vars {
                    push(v, seen, out);
                }
            }
            Algebra::Graph { name, inner } => {
                if let Term::Variable(v) = name {
                    push(v, seen, out);
                }
                inner.collect_visible(seen, out);
            }
            Algebra::Empty => {}
        }
    }

    /// Replace variables bound in `solution` by their values throughout the
    /// tree. Used to evaluate EXISTS against one outer row.
    pub fn substitute(&self, solution: &Solution) -> Algebra {
        if solution.is_empty() {
            return self.clone();
        }
        let sub = |a: &Algebra| Box::new(a.substitute(solution));
        match self {
            Algebra::Bgp(patterns) => {
                Algebra::Bgp(patterns.iter().map(|p| p.substitute(solution)).collect())
            }
            Algebra::Path { subject, path, object } => Algebra::Path {
                subject: solution.resolve(subject),
                path: path.clone(),
                object: solution.resolve(object),
            },
            Algebra::Join(l, r) => Algebra::Join(sub(l), sub(r)),
            Algebra::LeftJoin(l, r, e) => {
                Algebra::LeftJoin(sub(l), sub(r), e.as_ref().map(|e| e.substitute(solution)))
            }
            Algebra::Union(l, r) => Algebra::Union(sub(l), sub(r)),
            Algebra::Filter(e, inner) => Algebra::Filter(e.substitute(solution), sub(inner)),
            Algebra::Extend(inner, v, e) => {
                Algebra::Extend(sub(inner), v.clone(), e.substitute(solution))
            }
            Algebra::Minus(l, r) => Algebra::Minus(sub(l), sub(r)),
            Algebra::Group { inner, keys, aggregates } => Algebra::Group {
                inner: sub(inner),
                keys: keys.clone(),
                aggregates: aggregates.clone(),
            },
            Algebra::OrderBy(inner, c) => Algebra::OrderBy(sub(inner), c.clone()),
            Algebra::Distinct(inner) => Algebra::Distinct(sub(inner)),
            Algebra::Reduced(inner) => Algebra::Reduced(sub(inner)),
            Algebra::Slice { inner, offset, limit } => Algebra::Slice {
                inner: sub(inner),
                offset: *offset,
                limit: *limit,
            },
            // projection hides inner variables from the outer row
            Algebra::Project(inner, vars) => Algebra::Project(
                Box::new(inner.substitute(&solution.project(vars))),
                vars.clone(),
            ),
            Algebra::Graph { name, inner } => Algebra::Graph {
                name: solution.resolve(name),
                inner: sub(inner),
            },
            Algebra::Values { .. } | Algebra::Empty => self.clone(),
            Algebra::Service { endpoint, inner, silent } => Algebra::Service {
                endpoint: endpoint.clone(),
                inner: sub(inner),
                silent: *silent,
            },
        }
    }
}
