//! SPARQL query and update evaluation
//!
//! Queries arrive already parsed, as a [`Query`] holding the query form, the
//! FROM / FROM NAMED graphs and the algebra tree of the WHERE clause.
//! [`QueryEngine`] resolves the dataset scope, evaluates the algebra and
//! shapes the solutions into the result of the query form.
//!
//! # Example
//!
//! ```ignore
//! use quadstore::sparql::{Algebra, Query, QueryOptions, TriplePattern};
//!
//! let where_clause = Algebra::bgp(vec![TriplePattern::new(
//!     Term::var("s"),
//!     Term::uri("http://xmlns.com/foaf/0.1/name"),
//!     Term::var("name"),
//! )]);
//! let result = dataset.evaluate(&Query::select(&["name"], where_clause), &QueryOptions::new())?;
//! ```

pub mod aggregate;
pub mod algebra;
pub mod context;
pub mod eval;
pub mod expression;
pub mod optimizer;
pub mod path;
pub mod solution;
pub mod update;

use fnv::FnvHashMap;
use tracing::debug;

pub use algebra::{
    Aggregate, AggregateFunction, Algebra, GroupKey, OrderCondition, PropertyPath, TriplePattern,
};
pub use context::{EvaluationContext, QueryOptions};
pub use eval::Evaluator;
pub use expression::{ExistsEvaluator, Expression, Function};
pub use solution::{Solution, SolutionSequence};
pub use update::{GraphTarget, QuadPattern, UpdateCommand, UpdateCommandSet, UpdateProcessor, UpdateReport};

use crate::core::traits::ServiceHandler;
use crate::error::RdfResult;
use crate::store::{Dataset, Graph};
use crate::term::{Term, Triple, Variable};

/// The form of a query and its form-specific parts
#[derive(Clone, Debug, PartialEq)]
pub enum QueryForm {
    /// `None` is `SELECT *`
    Select { variables: Option<Vec<Variable>> },
    Ask,
    Construct { template: Vec<TriplePattern> },
    /// Resources may be IRIs or variables bound by the WHERE clause
    Describe { resources: Vec<Term> },
}

/// A parsed query
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub form: QueryForm,
    /// FROM graphs
    pub default_graphs: Vec<Term>,
    /// FROM NAMED graphs
    pub named_graphs: Vec<Term>,
    pub algebra: Algebra,
}

impl Query {
    pub fn new(form: QueryForm, algebra: Algebra) -> Self {
        Query { form, default_graphs: Vec::new(), named_graphs: Vec::new(), algebra }
    }

    pub fn select(variables: &[&str], algebra: Algebra) -> Self {
        let variables = variables.iter().map(|v| Variable::new(v)).collect();
        Self::new(QueryForm::Select { variables: Some(variables) }, algebra)
    }

    /// `SELECT *`
    pub fn select_all(algebra: Algebra) -> Self {
        Self::new(QueryForm::Select { variables: None }, algebra)
    }

    pub fn ask(algebra: Algebra) -> Self {
        Self::new(QueryForm::Ask, algebra)
    }

    pub fn construct(template: Vec<TriplePattern>, algebra: Algebra) -> Self {
        Self::new(QueryForm::Construct { template }, algebra)
    }

    pub fn describe(resources: Vec<Term>, algebra: Algebra) -> Self {
        Self::new(QueryForm::Describe { resources }, algebra)
    }

    /// Add a FROM graph
    pub fn from(mut self, graph: Term) -> Self {
        self.default_graphs.push(graph);
        self
    }

    /// Add a FROM NAMED graph
    pub fn from_named(mut self, graph: Term) -> Self {
        self.named_graphs.push(graph);
        self
    }
}

/// The result of a query
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    /// SELECT
    Solutions(SolutionSequence),
    /// ASK
    Boolean(bool),
    /// CONSTRUCT and DESCRIBE
    Graph(Graph),
}

impl QueryResult {
    pub fn solutions(&self) -> Option<&SolutionSequence> {
        match self {
            QueryResult::Solutions(s) => Some(s),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match self {
            QueryResult::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn graph(&self) -> Option<&Graph> {
        match self {
            QueryResult::Graph(g) => Some(g),
            _ => None,
        }
    }
}

/// Evaluates queries against a dataset
pub struct QueryEngine<'a> {
    dataset: &'a Dataset,
    service: Option<&'a dyn ServiceHandler>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        QueryEngine { dataset, service: None }
    }

    /// Route SERVICE clauses to `handler`
    pub fn with_service_handler(mut self, handler: &'a dyn ServiceHandler) -> Self {
        self.service = Some(handler);
        self
    }

    /// Evaluate a query
    pub fn execute(&self, query: &Query, options: &QueryOptions) -> RdfResult<QueryResult> {
        let scope = self.dataset.scope(&query.default_graphs, &query.named_graphs);
        let ctx = EvaluationContext::new(options);
        let mut evaluator = Evaluator::new(&scope, &ctx);
        if let Some(handler) = self.service {
            evaluator = evaluator.with_service_handler(handler);
        }
        debug!(form = form_name(&query.form), "query started");

        let rows = evaluator.evaluate(&query.algebra)?;
        let partial = ctx.is_truncated();

        let result = match &query.form {
            QueryForm::Select { variables } => {
                let variables = variables
                    .clone()
                    .unwrap_or_else(|| query.algebra.visible_variables());
                let rows = rows.iter().map(|row| row.project(&variables)).collect();
                QueryResult::Solutions(SolutionSequence::new(variables, rows).with_partial(partial))
            }
            QueryForm::Ask => QueryResult::Boolean(!rows.is_empty()),
            QueryForm::Construct { template } => QueryResult::Graph(construct(template, &rows)),
            QueryForm::Describe { resources } => {
                let mut graph = Graph::new();
                for resource in describe_targets(resources, &rows) {
                    let default = scope.default_graph();
                    graph.assert_all(default.matching(Some(&resource), None, None).cloned());
                    if options.describe_objects {
                        graph.assert_all(default.matching(None, None, Some(&resource)).cloned());
                    }
                }
                QueryResult::Graph(graph)
            }
        };

        debug!(
            rows = rows.len(),
            partial,
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "query finished"
        );
        Ok(result)
    }
}

fn form_name(form: &QueryForm) -> &'static str {
    match form {
        QueryForm::Select { .. } => "SELECT",
        QueryForm::Ask => "ASK",
        QueryForm::Construct { .. } => "CONSTRUCT",
        QueryForm::Describe { .. } => "DESCRIBE",
    }
}

/// Instantiate the template once per row. Blank nodes are fresh per row;
/// triples with unbound variables or invalid positions are skipped.
fn construct(template: &[TriplePattern], rows: &[Solution]) -> Graph {
    let mut graph = Graph::new();
    for row in rows {
        let mut blanks: FnvHashMap<Term, Term> = FnvHashMap::default();
        for pattern in template {
            if let Some(triple) = instantiate(pattern, row, &mut blanks) {
                graph.assert(triple);
            }
        }
    }
    graph
}

/// One template triple under one row, or `None` if it cannot be built
pub(crate) fn instantiate(
    pattern: &TriplePattern,
    row: &Solution,
    blanks: &mut FnvHashMap<Term, Term>,
) -> Option<Triple> {
    let mut resolve = |term: &Term| -> Option<Term> {
        match term {
            Term::Variable(v) => row.get(v).cloned(),
            Term::BlankNode(_) => Some(blanks.entry(term.clone()).or_insert_with(Term::fresh_blank).clone()),
            _ => Some(term.clone()),
        }
    };
    let subject = resolve(&pattern.subject)?;
    let predicate = resolve(&pattern.predicate)?;
    let object = resolve(&pattern.object)?;
    Triple::new(subject, predicate, object).ok()
}

fn describe_targets(resources: &[Term], rows: &[Solution]) -> Vec<Term> {
    let mut targets = Vec::new();
    for resource in resources {
        match resource {
            Term::Variable(v) => targets.extend(rows.iter().filter_map(|row| row.get(v).cloned())),
            _ => targets.push(resource.clone()),
        }
    }
    targets.sort();
    targets.dedup();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespaces::xsd;
    use crate::store::Quad;
    use std::time::Duration;

    fn ex(s: &str) -> Term {
        Term::uri(format!("http://ex.org/{}", s))
    }

    fn tp(s: Term, p: &str, o: Term) -> TriplePattern {
        TriplePattern::new(s, ex(p), o)
    }

    fn quad(s: &str, p: &str, o: Term, g: Option<&str>) -> Quad {
        Quad::new(Triple::new(ex(s), ex(p), o).unwrap(), g.map(ex))
    }

    fn select(dataset: &Dataset, query: &Query) -> SolutionSequence {
        match dataset.evaluate(query, &QueryOptions::new()).unwrap() {
            QueryResult::Solutions(s) => s,
            other => panic!("expected solutions, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_on_typed_integer() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("alice", "age", Term::typed_literal("30", xsd::INTEGER), None));
        ds.add_quad(quad("bob", "age", Term::typed_literal("17", xsd::INTEGER), None));
        ds.add_quad(quad("carol", "age", Term::literal("99"), None));

        let algebra = Algebra::bgp(vec![tp(Term::var("x"), "age", Term::var("age"))])
            .filter(Expression::ge(Expression::var("age"), Expression::integer(18)));
        let result = select(&ds, &Query::select(&["x"], algebra));
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows()[0].get_by_name("x"), Some(&ex("alice")));
    }

    #[test]
    fn test_graph_variable_over_from_named() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("d", "p", Term::integer(0), None));
        ds.add_quad(quad("a", "p", Term::integer(1), Some("g1")));
        ds.add_quad(quad("b", "p", Term::integer(2), Some("g2")));

        let algebra = Algebra::graph(
            Term::var("g"),
            Algebra::bgp(vec![tp(Term::var("s"), "p", Term::var("o"))]),
        );
        let query = Query::select(&["g", "s"], algebra).from_named(ex("g1"));
        let result = select(&ds, &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result.rows()[0].get_by_name("g"), Some(&ex("g1")));
        assert_eq!(result.rows()[0].get_by_name("s"), Some(&ex("a")));

        // the active default graph is empty when only FROM NAMED is given
        let plain = Query::select_all(Algebra::bgp(vec![tp(Term::var("s"), "p", Term::var("o"))]))
            .from_named(ex("g1"));
        assert!(select(&ds, &plain).is_empty());
    }

    #[test]
    fn test_numeric_order_by() {
        let mut ds = Dataset::new();
        for (s, n) in [("a", 10), ("b", 9), ("c", 100)] {
            ds.add_quad(quad(s, "n", Term::integer(n), None));
        }
        let algebra = Algebra::bgp(vec![tp(Term::var("x"), "n", Term::var("n"))])
            .order_by(vec![OrderCondition::asc(Expression::var("n"))]);
        let result = select(&ds, &Query::select(&["n"], algebra));
        let values: Vec<&Term> = result.column("n").flatten().collect();
        assert_eq!(values, vec![&Term::integer(9), &Term::integer(10), &Term::integer(100)]);

        let desc = Algebra::bgp(vec![tp(Term::var("x"), "n", Term::var("n"))])
            .order_by(vec![OrderCondition::desc(Expression::var("n"))]);
        let result = select(&ds, &Query::select(&["x"], desc));
        assert_eq!(result.rows()[0].get_by_name("x"), Some(&ex("c")));
    }

    #[test]
    fn test_select_star_schema() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("a", "p", Term::integer(1), None));
        let algebra = Algebra::bgp(vec![tp(Term::var("s"), "p", Term::var("o"))]);
        let result = select(&ds, &Query::select_all(algebra));
        let names: Vec<&str> = result.variables().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["s", "o"]);
        assert!(!result.is_partial());
    }

    #[test]
    fn test_ask() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("a", "p", Term::integer(1), None));
        let yes = Query::ask(Algebra::bgp(vec![tp(ex("a"), "p", Term::var("o"))]));
        let no = Query::ask(Algebra::bgp(vec![tp(ex("b"), "p", Term::var("o"))]));
        assert_eq!(ds.evaluate(&yes, &QueryOptions::new()).unwrap().boolean(), Some(true));
        assert_eq!(ds.evaluate(&no, &QueryOptions::new()).unwrap().boolean(), Some(false));
    }

    #[test]
    fn test_construct_fresh_blank_per_row() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("a", "name", Term::literal("A"), None));
        ds.add_quad(quad("b", "name", Term::literal("B"), None));
        ds.add_quad(quad("b", "nick", Term::literal("Bee"), None));

        let template = vec![
            tp(Term::blank("card"), "label", Term::var("n")),
            tp(Term::blank("card"), "nick", Term::var("k")),
        ];
        let algebra = Algebra::left_join(
            Algebra::bgp(vec![tp(Term::var("x"), "name", Term::var("n"))]),
            Algebra::bgp(vec![tp(Term::var("x"), "nick", Term::var("k"))]),
            None,
        );
        let result = ds.evaluate(&Query::construct(template, algebra), &QueryOptions::new()).unwrap();
        let graph = result.graph().unwrap();
        // the nick triple is skipped for the row without ?k
        assert_eq!(graph.len(), 3);
        let subjects: std::collections::BTreeSet<&Term> = graph.triples().map(|t| t.subject()).collect();
        assert_eq!(subjects.len(), 2);
        assert!(subjects.iter().all(|s| s.is_blank()));
    }

    #[test]
    fn test_describe() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("a", "knows", ex("b"), None));
        ds.add_quad(quad("b", "name", Term::literal("B"), None));
        ds.add_quad(quad("c", "name", Term::literal("C"), None));

        let query = Query::describe(vec![ex("b")], Algebra::Empty);
        let result = ds.evaluate(&query, &QueryOptions::new()).unwrap();
        assert_eq!(result.graph().unwrap().len(), 2);

        let mut options = QueryOptions::new();
        options.describe_objects = false;
        let result = ds.evaluate(&query, &options).unwrap();
        assert_eq!(result.graph().unwrap().len(), 1);
    }

    #[test]
    fn test_partial_results_on_timeout() {
        let mut ds = Dataset::new();
        ds.add_quad(quad("a", "p", Term::integer(1), None));
        let query = Query::select_all(Algebra::bgp(vec![tp(Term::var("s"), "p", Term::var("o"))]));

        let strict = QueryOptions::new().with_timeout(Duration::ZERO);
        assert!(ds.evaluate(&query, &strict).unwrap_err().is_timeout());

        let lenient = strict.with_partial_results(true);
        let result = ds.evaluate(&query, &lenient).unwrap();
        assert!(result.solutions().unwrap().is_partial());
    }
}
