//! RDF term representations
//!
//! This module defines the core data types for representing RDF terms:
//! - URIs (named nodes)
//! - Literals (with optional datatype or language tag)
//! - Blank nodes (local to a graph)
//! - Variables (the unbound marker used in patterns)
//!
//! Terms carry a total order (see [`order`]) used by ORDER BY, MIN/MAX and
//! sorted output.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{RdfError, RdfResult};

pub mod uri;
mod literal;
mod blank;
mod variable;
pub mod order;

pub use uri::Uri;
pub use literal::{Literal, Datatype};
pub use blank::BlankNode;
pub use variable::Variable;

/// A term in RDF
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A variable (patterns only)
    Variable(Variable),
    /// A blank node
    BlankNode(BlankNode),
    /// A URI reference (named node)
    Uri(Arc<Uri>),
    /// A literal value
    Literal(Arc<Literal>),
}

impl Term {
    /// Create a URI term
    pub fn uri(s: impl Into<String>) -> Self {
        Term::Uri(Arc::new(Uri::new(s.into())))
    }

    /// Create a URI term, validating the IRI
    pub fn try_uri(s: impl Into<String>) -> RdfResult<Self> {
        Ok(Term::Uri(Arc::new(Uri::parse(s)?)))
    }

    /// Create a simple literal
    pub fn literal(s: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::plain(s.into())))
    }

    /// Create a typed literal
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::typed(value.into(), datatype.into())))
    }

    /// Create a language-tagged literal
    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Arc::new(Literal::with_language(value.into(), lang.into())))
    }

    /// Create a literal from optional language and datatype, rejecting both
    pub fn try_literal(
        value: impl Into<String>,
        language: Option<&str>,
        datatype: Option<&str>,
    ) -> RdfResult<Self> {
        Ok(Term::Literal(Arc::new(Literal::new(value, language, datatype)?)))
    }

    /// Create an xsd:integer literal
    pub fn integer(value: i64) -> Self {
        Term::typed_literal(value.to_string(), crate::core::namespaces::xsd::INTEGER)
    }

    /// Create an xsd:boolean literal
    pub fn boolean(value: bool) -> Self {
        Term::typed_literal(value.to_string(), crate::core::namespaces::xsd::BOOLEAN)
    }

    /// Create a blank node with a local id
    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode(BlankNode::new(id))
    }

    /// Create a fresh blank node
    pub fn fresh_blank() -> Self {
        Term::BlankNode(BlankNode::fresh())
    }

    /// Create a variable
    pub fn var(name: &str) -> Self {
        Term::Variable(Variable::new(name))
    }

    /// Check if this term is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Check if this term is a blank node
    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    /// Check if this term is a URI
    pub fn is_uri(&self) -> bool {
        matches!(self, Term::Uri(_))
    }

    /// Check if this term is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }

    /// Check if this term is ground (not a variable)
    pub fn is_ground(&self) -> bool {
        !self.is_variable()
    }

    /// Get the URI if this is a URI term
    pub fn as_uri(&self) -> Option<&Uri> {
        match self {
            Term::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Get the literal if this is a literal term
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Get the blank node if this is one
    pub fn as_blank(&self) -> Option<&BlankNode> {
        match self {
            Term::BlankNode(b) => Some(b),
            _ => None,
        }
    }

    /// Get the variable if this is one
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Uri(u) => write!(f, "{}", u),
            Term::Literal(l) => write!(f, "{}", l),
            Term::BlankNode(b) => write!(f, "{}", b),
            Term::Variable(v) => write!(f, "{}", v),
        }
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Term::Variable(v)
    }
}

impl From<BlankNode> for Term {
    fn from(b: BlankNode) -> Self {
        Term::BlankNode(b)
    }
}

impl From<Uri> for Term {
    fn from(u: Uri) -> Self {
        Term::Uri(Arc::new(u))
    }
}

impl From<Literal> for Term {
    fn from(l: Literal) -> Self {
        Term::Literal(Arc::new(l))
    }
}

/// A triple (statement) in RDF.
///
/// Construction checks positions: the subject is a URI or blank node, the
/// predicate a URI, and the object any non-variable term.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    subject: Term,
    predicate: Term,
    object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: Term, object: Term) -> RdfResult<Self> {
        if !matches!(subject, Term::Uri(_) | Term::BlankNode(_)) {
            return Err(RdfError::invalid_position("subject", &subject));
        }
        if !predicate.is_uri() {
            return Err(RdfError::invalid_position("predicate", &predicate));
        }
        if object.is_variable() {
            return Err(RdfError::invalid_position("object", &object));
        }
        Ok(Triple { subject, predicate, object })
    }

    pub fn subject(&self) -> &Term {
        &self.subject
    }

    pub fn predicate(&self) -> &Term {
        &self.predicate
    }

    pub fn object(&self) -> &Term {
        &self.object
    }

    /// Decompose into (subject, predicate, object)
    pub fn into_parts(self) -> (Term, Term, Term) {
        (self.subject, self.predicate, self.object)
    }

    /// Whether any position holds a blank node
    pub fn has_blank_nodes(&self) -> bool {
        self.subject.is_blank() || self.object.is_blank()
    }

    /// Rebuild the triple with each term passed through `f`.
    /// Fails if the mapped terms violate the position rules.
    pub fn map_terms(&self, mut f: impl FnMut(&Term) -> Term) -> RdfResult<Triple> {
        Triple::new(f(&self.subject), f(&self.predicate), f(&self.object))
    }
}

impl fmt::Debug for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} {:?} .", self.subject, self.predicate, self.object)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
