//! SPARQL 1.1 Update
//!
//! # Supported Operations
//!
//! - `INSERT DATA` / `DELETE DATA` - ground quads
//! - `DELETE ... INSERT ... WHERE` - with `WITH`, `USING` and `USING NAMED`
//! - `CLEAR` / `DROP` - `DEFAULT`, `NAMED`, `ALL` or one graph
//! - `CREATE` - a new empty named graph
//! - `LOAD` - through a [`GraphResolver`]
//! - `COPY` / `MOVE` / `ADD` - between graphs
//!
//! A command set runs in order. The first failing command stops the set;
//! commands before it stay applied and the error records the failing index
//! and how many commands committed. `SILENT` commands log their failure and
//! let the set continue.
//!
//! # Example
//!
//! ```ignore
//! use quadstore::sparql::update::{UpdateCommand, UpdateCommandSet, UpdateProcessor};
//!
//! let set = UpdateCommandSet::new()
//!     .with(UpdateCommand::InsertData { quads })
//!     .with(UpdateCommand::Drop { target: GraphTarget::Named(g), silent: true });
//! let report = UpdateProcessor::new().apply(&set, &mut dataset)?;
//! ```

use std::time::Instant;

use fnv::FnvHashMap;
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use super::algebra::{Algebra, TriplePattern};
use super::context::{EvaluationContext, QueryOptions};
use super::eval::Evaluator;
use super::instantiate;
use super::solution::Solution;
use crate::config::StoreConfig;
use crate::core::traits::{GraphResolver, ServiceHandler};
use crate::error::{ErrorCode, RdfError, RdfResult};
use crate::rdf_ensure;
use crate::store::{BlankNodeMapping, Dataset, Graph, Quad};
use crate::term::{Term, Triple};

/// A quad template; any position and the graph may be variables
#[derive(Debug, Clone, PartialEq)]
pub struct QuadPattern {
    pub pattern: TriplePattern,
    /// `None` targets the default graph, or the WITH graph if one is given
    pub graph: Option<Term>,
}

impl QuadPattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        QuadPattern { pattern: TriplePattern::new(subject, predicate, object), graph: None }
    }

    pub fn in_graph(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        QuadPattern { pattern: TriplePattern::new(subject, predicate, object), graph: Some(graph) }
    }
}

/// Target of CLEAR and DROP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphTarget {
    Default,
    Named(Term),
    /// Every named graph
    AllNamed,
    /// The default graph and every named graph
    All,
}

/// One update command. Graph references of COPY, MOVE and ADD use `None`
/// for the default graph.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCommand {
    InsertData {
        quads: Vec<Quad>,
    },
    DeleteData {
        quads: Vec<Quad>,
    },
    Modify {
        with: Option<Term>,
        delete: Vec<QuadPattern>,
        insert: Vec<QuadPattern>,
        using: Vec<Term>,
        using_named: Vec<Term>,
        pattern: Algebra,
    },
    Clear {
        target: GraphTarget,
        silent: bool,
    },
    Drop {
        target: GraphTarget,
        silent: bool,
    },
    Create {
        graph: Term,
        silent: bool,
    },
    Load {
        source: String,
        into: Option<Term>,
        silent: bool,
    },
    Copy {
        source: Option<Term>,
        destination: Option<Term>,
        silent: bool,
    },
    Move {
        source: Option<Term>,
        destination: Option<Term>,
        silent: bool,
    },
    Add {
        source: Option<Term>,
        destination: Option<Term>,
        silent: bool,
    },
}

impl UpdateCommand {
    /// `DELETE { patterns } INSERT { } WHERE { pattern }`
    pub fn delete_insert(delete: Vec<QuadPattern>, insert: Vec<QuadPattern>, pattern: Algebra) -> Self {
        UpdateCommand::Modify {
            with: None,
            delete,
            insert,
            using: Vec::new(),
            using_named: Vec::new(),
            pattern,
        }
    }

    /// `DELETE WHERE { patterns }`: the patterns are both the template and
    /// the WHERE clause
    pub fn delete_where(patterns: Vec<QuadPattern>) -> Self {
        let mut default = Vec::new();
        let mut by_graph: IndexMap<Term, Vec<TriplePattern>> = IndexMap::new();
        for quad in &patterns {
            match &quad.graph {
                None => default.push(quad.pattern.clone()),
                Some(g) => by_graph.entry(g.clone()).or_default().push(quad.pattern.clone()),
            }
        }
        let pattern = by_graph
            .into_iter()
            .fold(Algebra::bgp(default), |acc, (g, bgp)| {
                Algebra::join(acc, Algebra::graph(g, Algebra::bgp(bgp)))
            });
        Self::delete_insert(patterns, Vec::new(), pattern)
    }

    /// Whether failures of this command are ignored
    pub fn is_silent(&self) -> bool {
        match self {
            UpdateCommand::InsertData { .. }
            | UpdateCommand::DeleteData { .. }
            | UpdateCommand::Modify { .. } => false,
            UpdateCommand::Clear { silent, .. }
            | UpdateCommand::Drop { silent, .. }
            | UpdateCommand::Create { silent, .. }
            | UpdateCommand::Load { silent, .. }
            | UpdateCommand::Copy { silent, .. }
            | UpdateCommand::Move { silent, .. }
            | UpdateCommand::Add { silent, .. } => *silent,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpdateCommand::InsertData { .. } => "INSERT DATA",
            UpdateCommand::DeleteData { .. } => "DELETE DATA",
            UpdateCommand::Modify { .. } => "MODIFY",
            UpdateCommand::Clear { .. } => "CLEAR",
            UpdateCommand::Drop { .. } => "DROP",
            UpdateCommand::Create { .. } => "CREATE",
            UpdateCommand::Load { .. } => "LOAD",
            UpdateCommand::Copy { .. } => "COPY",
            UpdateCommand::Move { .. } => "MOVE",
            UpdateCommand::Add { .. } => "ADD",
        }
    }
}

/// An ordered list of update commands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateCommandSet {
    pub commands: Vec<UpdateCommand>,
}

impl UpdateCommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, command: UpdateCommand) -> Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl From<Vec<UpdateCommand>> for UpdateCommandSet {
    fn from(commands: Vec<UpdateCommand>) -> Self {
        UpdateCommandSet { commands }
    }
}

/// What an applied command set changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Commands that ran, including SILENT ones that failed
    pub commands: usize,
    /// Triples added
    pub inserted: usize,
    /// Triples removed
    pub deleted: usize,
}

/// Applies update command sets to a dataset
#[derive(Debug, Clone)]
pub struct UpdateProcessor<'a> {
    options: QueryOptions,
    allow_load: bool,
    resolver: Option<&'a dyn GraphResolver>,
    service: Option<&'a dyn ServiceHandler>,
}

impl Default for UpdateProcessor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> UpdateProcessor<'a> {
    pub fn new() -> Self {
        UpdateProcessor {
            options: QueryOptions::default(),
            allow_load: true,
            resolver: None,
            service: None,
        }
    }

    /// WHERE evaluation uses the `[update]` timeout and the `[query]`
    /// optimizer settings
    pub fn with_config(config: &StoreConfig) -> Self {
        let mut options = QueryOptions::from_config(config);
        options.timeout = config.update.timeout();
        options.partial_results_on_timeout = false;
        UpdateProcessor { options, allow_load: config.update.allow_load, resolver: None, service: None }
    }

    /// Resolver used by LOAD
    pub fn with_resolver(mut self, resolver: &'a dyn GraphResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Handler for SERVICE clauses inside WHERE
    pub fn with_service_handler(mut self, handler: &'a dyn ServiceHandler) -> Self {
        self.service = Some(handler);
        self
    }

    /// Apply every command in order
    pub fn apply(&self, set: &UpdateCommandSet, dataset: &mut Dataset) -> RdfResult<UpdateReport> {
        let started = Instant::now();
        let mut report = UpdateReport::default();
        debug!(commands = set.len(), "update started");

        for (index, command) in set.commands.iter().enumerate() {
            let (inserted, deleted) = (report.inserted, report.deleted);
            match self.execute(command, dataset, &mut report) {
                Ok(()) => trace!(
                    index,
                    command = command.name(),
                    inserted = report.inserted - inserted,
                    deleted = report.deleted - deleted,
                    "update command applied"
                ),
                Err(e) if command.is_silent() && !e.is_timeout() => {
                    warn!(index, command = command.name(), error = %e, "SILENT update command failed");
                }
                Err(e) => {
                    warn!(index, command = command.name(), error = %e, "update command failed");
                    return Err(e.in_command(index, index));
                }
            }
            report.commands += 1;
        }

        debug!(
            commands = report.commands,
            inserted = report.inserted,
            deleted = report.deleted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "update finished"
        );
        Ok(report)
    }

    fn execute(&self, command: &UpdateCommand, dataset: &mut Dataset, report: &mut UpdateReport) -> RdfResult<()> {
        match command {
            UpdateCommand::InsertData { quads } => {
                for quad in quads {
                    if dataset.add_quad(quad.clone()) {
                        report.inserted += 1;
                    }
                }
                Ok(())
            }
            UpdateCommand::DeleteData { quads } => {
                for quad in quads {
                    if dataset.remove_quad(quad) {
                        report.deleted += 1;
                    }
                }
                Ok(())
            }
            UpdateCommand::Modify { with, delete, insert, using, using_named, pattern } => {
                self.modify(dataset, with.as_ref(), delete, insert, using, using_named, pattern, report)
            }
            UpdateCommand::Clear { target, .. } => clear(dataset, target, report),
            UpdateCommand::Drop { target, .. } => drop_graphs(dataset, target, report),
            UpdateCommand::Create { graph, .. } => {
                if dataset.has_graph(graph) {
                    return Err(RdfError::graph_exists(graph));
                }
                dataset.get_or_create_graph(graph);
                Ok(())
            }
            UpdateCommand::Load { source, into, .. } => self.load(dataset, source, into.as_ref(), report),
            UpdateCommand::Copy { source, destination, .. } => {
                transfer(dataset, source.as_ref(), destination.as_ref(), Transfer::Copy, report)
            }
            UpdateCommand::Move { source, destination, .. } => {
                transfer(dataset, source.as_ref(), destination.as_ref(), Transfer::Move, report)
            }
            UpdateCommand::Add { source, destination, .. } => {
                transfer(dataset, source.as_ref(), destination.as_ref(), Transfer::Add, report)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn modify(
        &self,
        dataset: &mut Dataset,
        with: Option<&Term>,
        delete: &[QuadPattern],
        insert: &[QuadPattern],
        using: &[Term],
        using_named: &[Term],
        pattern: &Algebra,
        report: &mut UpdateReport,
    ) -> RdfResult<()> {
        let (deletions, insertions) = {
            let scope = match with {
                Some(graph) if using.is_empty() && using_named.is_empty() => dataset.scope_with_default(graph),
                _ => dataset.scope(using, using_named),
            };
            let ctx = EvaluationContext::new(&self.options);
            let mut evaluator = Evaluator::new(&scope, &ctx);
            if let Some(handler) = self.service {
                evaluator = evaluator.with_service_handler(handler);
            }
            let rows = evaluator.evaluate(pattern)?;
            trace!(rows = rows.len(), "update WHERE evaluated");
            (
                instantiate_quads(delete, &rows, with, false),
                instantiate_quads(insert, &rows, with, true),
            )
        };

        // all deletions land before any insertion
        for (graph, triple) in deletions {
            if dataset.graph_mut(graph.as_ref()).map_or(false, |g| g.retract(&triple)) {
                report.deleted += 1;
            }
        }
        for (graph, triple) in insertions {
            if dataset.add_quad(Quad::new(triple, graph)) {
                report.inserted += 1;
            }
        }
        Ok(())
    }

    fn load(&self, dataset: &mut Dataset, source: &str, into: Option<&Term>, report: &mut UpdateReport) -> RdfResult<()> {
        rdf_ensure!(self.allow_load, ErrorCode::LoadDisabled, "LOAD of <{}> is disabled by configuration", source);
        let resolver = self.resolver.ok_or_else(|| {
            RdfError::new(ErrorCode::NoResolver, "No graph resolver configured for LOAD")
                .with_context("source", source)
                .with_hint("Pass a GraphResolver to UpdateProcessor::with_resolver")
        })?;
        let loaded = resolver
            .resolve(source)
            .map_err(|e| RdfError::load_failed(source, e.to_string()))?;

        let target = match into {
            Some(name) => dataset.get_or_create_graph(name),
            None => dataset.default_graph_mut(),
        };
        report.inserted += target.merge(&loaded);
        Ok(())
    }
}

/// Instantiate templates for every row. Insert templates get fresh blank
/// nodes per row; delete templates with blank nodes are skipped.
fn instantiate_quads(
    templates: &[QuadPattern],
    rows: &[Solution],
    with: Option<&Term>,
    fresh_blanks: bool,
) -> Vec<(Option<Term>, Triple)> {
    let mut out = Vec::new();
    for row in rows {
        let mut blanks = FnvHashMap::default();
        for template in templates {
            let p = &template.pattern;
            if !fresh_blanks && [&p.subject, &p.predicate, &p.object].iter().any(|t| t.is_blank()) {
                continue;
            }
            let graph = match &template.graph {
                Some(Term::Variable(v)) => match row.get(v) {
                    Some(g) if g.is_uri() => Some(g.clone()),
                    _ => continue,
                },
                Some(g) => Some(g.clone()),
                None => with.cloned(),
            };
            if let Some(triple) = instantiate(p, row, &mut blanks) {
                out.push((graph, triple));
            }
        }
    }
    out
}

fn clear(dataset: &mut Dataset, target: &GraphTarget, report: &mut UpdateReport) -> RdfResult<()> {
    match target {
        GraphTarget::Default => clear_graph(dataset.default_graph_mut(), report),
        GraphTarget::Named(name) => match dataset.graph_mut(Some(name)) {
            Some(graph) => clear_graph(graph, report),
            None => return Err(RdfError::graph_not_found(name)),
        },
        GraphTarget::AllNamed | GraphTarget::All => {
            let names: Vec<Term> = dataset.graph_names().cloned().collect();
            for name in &names {
                if let Some(graph) = dataset.graph_mut(Some(name)) {
                    clear_graph(graph, report);
                }
            }
            if *target == GraphTarget::All {
                clear_graph(dataset.default_graph_mut(), report);
            }
        }
    }
    Ok(())
}

fn clear_graph(graph: &mut Graph, report: &mut UpdateReport) {
    report.deleted += graph.len();
    graph.clear();
}

fn drop_graphs(dataset: &mut Dataset, target: &GraphTarget, report: &mut UpdateReport) -> RdfResult<()> {
    match target {
        GraphTarget::Default => clear_graph(dataset.default_graph_mut(), report),
        GraphTarget::Named(name) => match dataset.remove_graph(name) {
            Some(graph) => report.deleted += graph.len(),
            None => return Err(RdfError::graph_not_found(name)),
        },
        GraphTarget::AllNamed | GraphTarget::All => {
            let names: Vec<Term> = dataset.graph_names().cloned().collect();
            for name in &names {
                if let Some(graph) = dataset.remove_graph(name) {
                    report.deleted += graph.len();
                }
            }
            if *target == GraphTarget::All {
                clear_graph(dataset.default_graph_mut(), report);
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Copy,
    Move,
    Add,
}

fn transfer(
    dataset: &mut Dataset,
    source: Option<&Term>,
    destination: Option<&Term>,
    mode: Transfer,
    report: &mut UpdateReport,
) -> RdfResult<()> {
    if source == destination {
        return Ok(());
    }
    let copied = dataset
        .graph(source)
        .cloned()
        .ok_or_else(|| {
            let name = source.map_or_else(|| "DEFAULT".to_string(), |t| t.to_string());
            RdfError::graph_not_found(name)
        })?;

    let target = match destination {
        Some(name) => dataset.get_or_create_graph(name),
        None => dataset.default_graph_mut(),
    };
    if mode != Transfer::Add {
        clear_graph(target, report);
    }
    report.inserted += target.merge_with(&copied, BlankNodeMapping::Shared);

    if mode == Transfer::Move {
        match source {
            Some(name) => {
                dataset.remove_graph(name);
            }
            None => dataset.default_graph_mut().clear(),
        }
        report.deleted += copied.len();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ex(s: &str) -> Term {
        Term::uri(format!("http://ex.org/{}", s))
    }

    fn t(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(ex(s), ex(p), ex(o)).unwrap()
    }

    fn v(name: &str) -> Term {
        Term::var(name)
    }

    fn dataset() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_quad(Quad::in_default(t("a", "old", "x")));
        ds.add_quad(Quad::in_default(t("b", "old", "y")));
        ds.add_quad(Quad::in_graph(t("c", "p", "1"), ex("g1")));
        ds.add_quad(Quad::in_graph(t("d", "p", "2"), ex("g1")));
        ds.add_quad(Quad::in_graph(t("e", "p", "3"), ex("g1")));
        ds
    }

    fn apply(ds: &mut Dataset, commands: Vec<UpdateCommand>) -> RdfResult<UpdateReport> {
        UpdateProcessor::new().apply(&commands.into(), ds)
    }

    #[derive(Debug)]
    struct Fixtures(HashMap<String, Graph>);

    impl GraphResolver for Fixtures {
        fn resolve(&self, iri: &str) -> RdfResult<Graph> {
            self.0
                .get(iri)
                .cloned()
                .ok_or_else(|| RdfError::load_failed(iri, "unknown fixture"))
        }
    }

    #[test]
    fn test_insert_and_delete_data() {
        let mut ds = Dataset::new();
        let quads = vec![
            Quad::in_default(t("s", "p", "o")),
            Quad::in_graph(t("s", "p", "o"), ex("g")),
        ];
        let report = apply(&mut ds, vec![UpdateCommand::InsertData { quads: quads.clone() }]).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(ds.graph(Some(&ex("g"))).unwrap().len(), 1);

        let again = apply(&mut ds, vec![UpdateCommand::InsertData { quads: quads.clone() }]).unwrap();
        assert_eq!(again.inserted, 0);

        let report = apply(&mut ds, vec![UpdateCommand::DeleteData { quads }]).unwrap();
        assert_eq!(report.deleted, 2);
        assert_eq!(ds.total_triple_count(), 0);
    }

    #[test]
    fn test_delete_where_empties_named_graph() {
        let mut ds = dataset();
        let command = UpdateCommand::delete_where(vec![QuadPattern::in_graph(v("s"), v("p"), v("o"), ex("g1"))]);
        let report = apply(&mut ds, vec![command]).unwrap();
        assert_eq!(report.deleted, 3);
        assert!(ds.graph(Some(&ex("g1"))).unwrap().is_empty());
        assert!(ds.has_graph(&ex("g1")));
        assert_eq!(ds.default_graph().len(), 2);
    }

    #[test]
    fn test_delete_all_from_default_graph_with_blank_nodes() {
        let mut ds = dataset();
        let name = Triple::new(Term::blank("p1"), ex("name"), Term::literal("Ann")).unwrap();
        let link = Triple::new(ex("a"), ex("knows"), Term::blank("p1")).unwrap();
        ds.add_quad(Quad::in_default(name));
        ds.add_quad(Quad::in_default(link));
        assert_eq!(ds.default_graph().len(), 4);

        let all = || vec![QuadPattern::new(v("s"), v("p"), v("o"))];
        let where_clause = Algebra::bgp(vec![TriplePattern::new(v("s"), v("p"), v("o"))]);
        let report = apply(&mut ds, vec![UpdateCommand::delete_insert(all(), vec![], where_clause)]).unwrap();
        assert_eq!(report.deleted, 4);
        assert!(ds.default_graph().is_empty());
        assert_eq!(ds.graph(Some(&ex("g1"))).unwrap().len(), 3);
    }

    #[test]
    fn test_modify_deletes_before_inserting() {
        let mut ds = dataset();
        let command = UpdateCommand::delete_insert(
            vec![QuadPattern::new(v("s"), ex("old"), v("o"))],
            vec![QuadPattern::new(v("s"), ex("new"), v("o"))],
            Algebra::bgp(vec![TriplePattern::new(v("s"), ex("old"), v("o"))]),
        );
        let report = apply(&mut ds, vec![command]).unwrap();
        assert_eq!((report.inserted, report.deleted), (2, 2));
        assert!(ds.default_graph().contains(&t("a", "new", "x")));
        assert!(!ds.default_graph().contains(&t("a", "old", "x")));

        // a triple deleted and re-inserted by the same command survives
        let touch = UpdateCommand::delete_insert(
            vec![QuadPattern::new(v("s"), ex("new"), v("o"))],
            vec![QuadPattern::new(v("s"), ex("new"), v("o"))],
            Algebra::bgp(vec![TriplePattern::new(v("s"), ex("new"), v("o"))]),
        );
        apply(&mut ds, vec![touch]).unwrap();
        assert_eq!(ds.default_graph().len(), 2);
    }

    #[test]
    fn test_modify_with_graph() {
        let mut ds = dataset();
        let command = UpdateCommand::Modify {
            with: Some(ex("g1")),
            delete: vec![],
            insert: vec![QuadPattern::new(v("s"), ex("seen"), Term::boolean(true))],
            using: vec![],
            using_named: vec![],
            pattern: Algebra::bgp(vec![TriplePattern::new(v("s"), ex("p"), v("o"))]),
        };
        let report = apply(&mut ds, vec![command]).unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(ds.graph(Some(&ex("g1"))).unwrap().len(), 6);
        assert_eq!(ds.default_graph().len(), 2);
    }

    #[test]
    fn test_modify_using_overrides_with() {
        let mut ds = dataset();
        let command = UpdateCommand::Modify {
            with: Some(ex("elsewhere")),
            delete: vec![],
            insert: vec![QuadPattern::new(v("s"), ex("copied"), v("o"))],
            using: vec![ex("g1")],
            using_named: vec![],
            pattern: Algebra::bgp(vec![TriplePattern::new(v("s"), ex("p"), v("o"))]),
        };
        apply(&mut ds, vec![command]).unwrap();
        assert_eq!(ds.graph(Some(&ex("elsewhere"))).unwrap().len(), 3);
    }

    #[test]
    fn test_insert_template_blank_nodes_and_unbound() {
        let mut ds = dataset();
        let command = UpdateCommand::delete_insert(
            vec![],
            vec![
                QuadPattern::new(Term::blank("n"), ex("about"), v("s")),
                QuadPattern::new(v("s"), ex("tag"), v("unbound")),
            ],
            Algebra::bgp(vec![TriplePattern::new(v("s"), ex("old"), v("o"))]),
        );
        let report = apply(&mut ds, vec![command]).unwrap();
        assert_eq!(report.inserted, 2);
        let about = ex("about");
        let blanks: Vec<&Term> = ds
            .default_graph()
            .matching(None, Some(&about), None)
            .map(|t| t.subject())
            .collect();
        assert_eq!(blanks.len(), 2);
        assert_ne!(blanks[0], blanks[1]);
    }

    #[test]
    fn test_graph_management() {
        let mut ds = dataset();
        apply(&mut ds, vec![UpdateCommand::Create { graph: ex("g2"), silent: false }]).unwrap();
        assert!(ds.has_graph(&ex("g2")));

        let err = apply(&mut ds, vec![UpdateCommand::Create { graph: ex("g2"), silent: false }]).unwrap_err();
        assert!(err.is_dataset_consistency());
        apply(&mut ds, vec![UpdateCommand::Create { graph: ex("g2"), silent: true }]).unwrap();

        let report = apply(&mut ds, vec![UpdateCommand::Clear { target: GraphTarget::Named(ex("g1")), silent: false }]).unwrap();
        assert_eq!(report.deleted, 3);
        assert!(ds.has_graph(&ex("g1")));

        apply(&mut ds, vec![UpdateCommand::Drop { target: GraphTarget::AllNamed, silent: false }]).unwrap();
        assert_eq!(ds.named_graph_count(), 0);
        assert_eq!(ds.default_graph().len(), 2);

        let err = apply(&mut ds, vec![UpdateCommand::Drop { target: GraphTarget::Named(ex("g1")), silent: false }]).unwrap_err();
        assert_eq!(err.code, ErrorCode::GraphNotFound);

        apply(&mut ds, vec![UpdateCommand::Clear { target: GraphTarget::All, silent: false }]).unwrap();
        assert_eq!(ds.total_triple_count(), 0);
    }

    #[test]
    fn test_copy_move_add() {
        let mut ds = dataset();
        let copy = UpdateCommand::Copy { source: Some(ex("g1")), destination: None, silent: false };
        apply(&mut ds, vec![copy]).unwrap();
        assert_eq!(ds.default_graph().len(), 3);
        assert_eq!(ds.graph(Some(&ex("g1"))).unwrap().len(), 3);

        let add = UpdateCommand::Add { source: None, destination: Some(ex("g2")), silent: false };
        apply(&mut ds, vec![add]).unwrap();
        assert_eq!(ds.graph(Some(&ex("g2"))).unwrap().len(), 3);

        let mv = UpdateCommand::Move { source: Some(ex("g1")), destination: Some(ex("g3")), silent: false };
        apply(&mut ds, vec![mv]).unwrap();
        assert!(!ds.has_graph(&ex("g1")));
        assert_eq!(ds.graph(Some(&ex("g3"))).unwrap().len(), 3);

        let same = UpdateCommand::Move { source: Some(ex("g3")), destination: Some(ex("g3")), silent: false };
        apply(&mut ds, vec![same]).unwrap();
        assert!(ds.has_graph(&ex("g3")));

        let missing = UpdateCommand::Copy { source: Some(ex("nope")), destination: None, silent: false };
        assert!(apply(&mut ds, vec![missing]).unwrap_err().is_dataset_consistency());
        let quiet = UpdateCommand::Copy { source: Some(ex("nope")), destination: None, silent: true };
        apply(&mut ds, vec![quiet]).unwrap();
        assert_eq!(ds.default_graph().len(), 3);
    }

    #[test]
    fn test_load() {
        let mut fixture = Graph::new();
        fixture.assert(t("doc", "p", "o"));
        let resolver = Fixtures([("http://ex.org/doc".to_string(), fixture)].into_iter().collect());

        let mut ds = Dataset::new();
        let load = UpdateCommand::Load { source: "http://ex.org/doc".to_string(), into: Some(ex("g")), silent: false };
        let report = UpdateProcessor::new()
            .with_resolver(&resolver)
            .apply(&vec![load.clone()].into(), &mut ds)
            .unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(ds.graph(Some(&ex("g"))).unwrap().len(), 1);

        let err = UpdateProcessor::new().apply(&vec![load].into(), &mut ds).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoResolver);

        let broken = UpdateCommand::Load { source: "http://ex.org/missing".to_string(), into: None, silent: false };
        let err = UpdateProcessor::new()
            .with_resolver(&resolver)
            .apply(&vec![broken].into(), &mut ds)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::LoadFailed);
        assert!(err.is_update_failure());
    }

    #[test]
    fn test_load_disabled_by_config() {
        let mut config = StoreConfig::new();
        config.update.allow_load = false;
        let mut ds = Dataset::new();
        let load = UpdateCommand::Load { source: "http://ex.org/doc".to_string(), into: None, silent: false };
        let err = UpdateProcessor::with_config(&config).apply(&vec![load].into(), &mut ds).unwrap_err();
        assert_eq!(err.code, ErrorCode::LoadDisabled);
    }

    #[test]
    fn test_failure_reports_committed_commands() {
        let mut ds = dataset();
        let commands = vec![
            UpdateCommand::InsertData { quads: vec![Quad::in_default(t("new", "p", "o"))] },
            UpdateCommand::Drop { target: GraphTarget::Named(ex("missing")), silent: true },
            UpdateCommand::Drop { target: GraphTarget::Named(ex("missing")), silent: false },
            UpdateCommand::Clear { target: GraphTarget::Default, silent: false },
        ];
        let err = apply(&mut ds, commands).unwrap_err();
        assert_eq!(err.command_index, Some(2));
        assert_eq!(err.committed, Some(2));
        // earlier commands stay applied, later ones never ran
        assert!(ds.default_graph().contains(&t("new", "p", "o")));
        assert_eq!(ds.default_graph().len(), 3);
    }
}
