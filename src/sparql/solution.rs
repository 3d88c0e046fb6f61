//! Solution bindings and solution sequences

use std::collections::BTreeMap;
use std::fmt;

use crate::term::{Term, Variable};

/// One solution: a partial mapping from variables to concrete terms.
/// Unbound variables are simply absent.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Solution {
    bindings: BTreeMap<Variable, Term>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of a variable
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.bindings.get(variable)
    }

    /// Get the value of a variable by name
    pub fn get_by_name(&self, name: &str) -> Option<&Term> {
        self.bindings.get(&Variable::new(name))
    }

    /// Bind a variable; variables and unbound markers are never stored
    pub fn insert(&mut self, variable: Variable, term: Term) {
        if !term.is_variable() {
            self.bindings.insert(variable, term);
        }
    }

    /// Remove a binding
    pub fn remove(&mut self, variable: &Variable) -> Option<Term> {
        self.bindings.remove(variable)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> + '_ {
        self.bindings.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.bindings.keys()
    }

    /// Value of a pattern term under this solution: bound variables resolve
    /// to their value, everything else is returned unchanged
    pub fn resolve(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => self.bindings.get(v).cloned().unwrap_or_else(|| term.clone()),
            _ => term.clone(),
        }
    }

    /// Two solutions are compatible when every shared variable has the same
    /// value in both
    pub fn is_compatible(&self, other: &Solution) -> bool {
        let (small, large) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        small
            .bindings
            .iter()
            .all(|(v, t)| large.bindings.get(v).map_or(true, |u| u == t))
    }

    /// Whether the two solutions bind at least one common variable
    pub fn shares_variable(&self, other: &Solution) -> bool {
        let (small, large) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        small.bindings.keys().any(|v| large.bindings.contains_key(v))
    }

    /// Union of two compatible solutions; `None` if they conflict
    pub fn merge(&self, other: &Solution) -> Option<Solution> {
        if !self.is_compatible(other) {
            return None;
        }
        let mut merged = self.clone();
        for (v, t) in &other.bindings {
            merged.bindings.entry(v.clone()).or_insert_with(|| t.clone());
        }
        Some(merged)
    }

    /// Drop the stand-ins for pattern blank nodes
    pub fn remove_blank_placeholders(&mut self) {
        self.bindings.retain(|v, _| !v.is_blank_placeholder());
    }

    /// Restrict to the given variables
    pub fn project(&self, variables: &[Variable]) -> Solution {
        Solution {
            bindings: variables
                .iter()
                .filter_map(|v| self.bindings.get(v).map(|t| (v.clone(), t.clone())))
                .collect(),
        }
    }
}

impl FromIterator<(Variable, Term)> for Solution {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        let mut solution = Solution::new();
        for (v, t) in iter {
            solution.insert(v, t);
        }
        solution
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, t)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} -> {}", v, t)?;
        }
        write!(f, "}}")
    }
}

/// The result rows of a SELECT, with the declared variable schema
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolutionSequence {
    variables: Vec<Variable>,
    rows: Vec<Solution>,
    partial: bool,
}

impl SolutionSequence {
    pub fn new(variables: Vec<Variable>, rows: Vec<Solution>) -> Self {
        SolutionSequence { variables, rows, partial: false }
    }

    /// Mark the sequence as truncated by a timeout
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// The declared variables, in projection order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn rows(&self) -> &[Solution] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Solution> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when evaluation stopped at the deadline and only part of the
    /// answer is present
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Values of one variable down the rows
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = Option<&'a Term>> + 'a {
        let variable = Variable::new(name);
        self.rows.iter().map(move |row| row.get(&variable))
    }
}
