//! Blank node representation

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique blank node IDs
static BLANK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Prefix of generated blank node ids
const FRESH_PREFIX: &str = "genid";

/// A blank node, identified by a local id that is only meaningful within
/// one graph
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNode {
    id: String,
}

impl BlankNode {
    /// Create a blank node with a given local id
    pub fn new(id: impl Into<String>) -> Self {
        BlankNode { id: id.into() }
    }

    /// Create a fresh blank node with a process-wide unique ID
    pub fn fresh() -> Self {
        let n = BLANK_COUNTER.fetch_add(1, Ordering::Relaxed);
        BlankNode {
            id: format!("{}{}", FRESH_PREFIX, n),
        }
    }

    /// Get the local id
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.id)
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_blank_nodes_are_unique() {
        let b1 = BlankNode::fresh();
        let b2 = BlankNode::fresh();
        assert_ne!(b1.id(), b2.id());
        assert_ne!(b1, b2);
    }

    #[test]
    fn test_equality_is_by_id() {
        let b = BlankNode::new("x");
        assert_eq!(b, BlankNode::new("x"));
        assert_eq!(format!("{}", b), "_:x");
    }
}
