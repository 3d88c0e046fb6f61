//! Query variables

use std::fmt;
use std::sync::Arc;

/// A named query variable. Only ever appears in patterns and solution keys,
/// never in stored triples.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    name: Arc<str>,
}

impl Variable {
    /// Create a variable; a leading `?` or `$` is stripped
    pub fn new(name: &str) -> Self {
        let name = name.strip_prefix(|c: char| c == '?' || c == '$').unwrap_or(name);
        Variable { name: Arc::from(name) }
    }

    /// Stand-in for a blank node of a query pattern. The `_:` prefix cannot
    /// occur in a parsed variable name.
    pub fn for_blank(id: &str) -> Self {
        Variable { name: Arc::from(format!("_:{}", id)) }
    }

    /// Whether this variable stands in for a pattern blank node
    pub fn is_blank_placeholder(&self) -> bool {
        self.name.starts_with("_:")
    }

    /// Get the variable name without the sigil
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}
