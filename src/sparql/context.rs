//! Evaluation options and the per-evaluation deadline context

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use regex::Regex;
use tracing::{trace, warn};

use super::expression::compile_regex;
use super::solution::Solution;
use crate::config::StoreConfig;
use crate::error::{RdfError, RdfResult};
use crate::term::Term;

/// Caller-facing options for one query evaluation
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Wall-clock budget for the evaluation; `None` means unbounded
    pub timeout: Option<Duration>,
    /// On timeout, return what was produced so far instead of failing
    pub partial_results_on_timeout: bool,
    /// Reorder BGP patterns by estimated selectivity
    pub optimize_bgp: bool,
    /// Maximum traversal depth of `*` and `+` property paths
    pub max_path_depth: usize,
    /// DESCRIBE also returns triples with the resource as object
    pub describe_objects: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            timeout: None,
            partial_results_on_timeout: false,
            optimize_bgp: true,
            max_path_depth: 1_000,
            describe_objects: true,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from the `[query]` section of the configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        QueryOptions {
            timeout: config.query.timeout(),
            partial_results_on_timeout: config.query.partial_results,
            optimize_bgp: config.query.optimize_bgp,
            max_path_depth: config.query.max_path_depth,
            describe_objects: config.query.describe_objects,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_partial_results(mut self, partial: bool) -> Self {
        self.partial_results_on_timeout = partial;
        self
    }

    pub fn with_optimization(mut self, optimize: bool) -> Self {
        self.optimize_bgp = optimize;
        self
    }
}

/// Deadline tracking and function state for one evaluation.
///
/// Operators call [`should_stop`](Self::should_stop) between index lookups
/// and per produced row. Once the deadline passes, the call either fails
/// with `TimeoutExceeded` or, when partial results are allowed, marks the
/// evaluation truncated and tells every operator to stop.
///
/// Compiled regexes and the blank nodes of `BNODE(label)` live here for the
/// length of the evaluation.
#[derive(Debug)]
pub struct EvaluationContext {
    started: Instant,
    deadline: Option<Instant>,
    limit: Option<Duration>,
    allow_partial: bool,
    truncated: Cell<bool>,
    optimize_bgp: bool,
    max_path_depth: usize,
    regexes: RefCell<FnvHashMap<(String, String), Regex>>,
    labelled_blanks: RefCell<FnvHashMap<(String, Solution), Term>>,
}

impl EvaluationContext {
    pub fn new(options: &QueryOptions) -> Self {
        let started = Instant::now();
        EvaluationContext {
            started,
            deadline: options.timeout.map(|t| started + t),
            limit: options.timeout,
            allow_partial: options.partial_results_on_timeout,
            truncated: Cell::new(false),
            optimize_bgp: options.optimize_bgp,
            max_path_depth: options.max_path_depth,
            regexes: RefCell::new(FnvHashMap::default()),
            labelled_blanks: RefCell::new(FnvHashMap::default()),
        }
    }

    /// A context without deadline
    pub fn unbounded() -> Self {
        Self::new(&QueryOptions::default())
    }

    /// Check the deadline. `Ok(true)` means stop producing rows.
    pub fn should_stop(&self) -> RdfResult<bool> {
        if self.truncated.get() {
            return Ok(true);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                let elapsed = self.started.elapsed().as_millis();
                let limit = self.limit.map_or(0, |l| l.as_millis());
                if self.allow_partial {
                    warn!(elapsed_ms = elapsed as u64, limit_ms = limit as u64, "evaluation truncated at deadline");
                    self.truncated.set(true);
                    Ok(true)
                } else {
                    warn!(elapsed_ms = elapsed as u64, limit_ms = limit as u64, "evaluation timed out");
                    Err(RdfError::timeout(elapsed, limit))
                }
            }
            _ => Ok(false),
        }
    }

    /// Whether a deadline cut the evaluation short
    pub fn is_truncated(&self) -> bool {
        self.truncated.get()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn optimize_bgp(&self) -> bool {
        self.optimize_bgp
    }

    pub fn max_path_depth(&self) -> usize {
        self.max_path_depth
    }

    /// `pattern` compiled with `flags`, compiling at most once per evaluation
    pub fn regex(&self, pattern: &str, flags: &str) -> RdfResult<Regex> {
        let key = (pattern.to_string(), flags.to_string());
        if let Some(re) = self.regexes.borrow().get(&key) {
            return Ok(re.clone());
        }
        let re = compile_regex(pattern, flags)?;
        trace!(pattern, flags, "compiled regex");
        self.regexes.borrow_mut().insert(key, re.clone());
        Ok(re)
    }

    /// The blank node for `label` in `row`
    pub fn labelled_blank(&self, label: &str, row: &Solution) -> Term {
        self.labelled_blanks
            .borrow_mut()
            .entry((label.to_string(), row.clone()))
            .or_insert_with(Term::fresh_blank)
            .clone()
    }
}
