//! Graph isomorphism
//!
//! Two graphs are isomorphic when some bijection between their blank nodes
//! maps one triple set onto the other. The check rejects cheaply first
//! (size, ground triples, blank node signatures) and only then runs a
//! backtracking search over signature-compatible candidates.

use fnv::{FnvHashMap, FnvHashSet};

use super::index::TripleCollection;
use crate::term::{BlankNode, Term, Triple};

/// Ground-only comparison in linear time: same size, same ground triples,
/// same number of blank-node triples. A necessary condition for isomorphism
/// and sufficient when neither side has blank nodes.
pub fn ground_equals(a: &TripleCollection, b: &TripleCollection) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a_blank = 0usize;
    for triple in a.iter() {
        if triple.has_blank_nodes() {
            a_blank += 1;
        } else if !b.contains(triple) {
            return false;
        }
    }
    let b_blank = b.iter().filter(|t| t.has_blank_nodes()).count();
    a_blank == b_blank
}

/// Full isomorphism check
pub fn is_isomorphic(a: &TripleCollection, b: &TripleCollection) -> bool {
    if !ground_equals(a, b) {
        return false;
    }

    let a_triples: Vec<&Triple> = a.iter().filter(|t| t.has_blank_nodes()).collect();
    if a_triples.is_empty() {
        return true;
    }
    let b_triples: Vec<&Triple> = b.iter().filter(|t| t.has_blank_nodes()).collect();

    let a_sigs = signatures(&a_triples);
    let b_sigs = signatures(&b_triples);
    if a_sigs.len() != b_sigs.len() {
        return false;
    }

    let mut a_hist: FnvHashMap<&Signature, usize> = FnvHashMap::default();
    for sig in a_sigs.values() {
        *a_hist.entry(sig).or_default() += 1;
    }
    let mut b_hist: FnvHashMap<&Signature, usize> = FnvHashMap::default();
    for sig in b_sigs.values() {
        *b_hist.entry(sig).or_default() += 1;
    }
    if a_hist != b_hist {
        return false;
    }

    // Most constrained blank nodes first
    let mut order: Vec<&BlankNode> = a_sigs.keys().copied().collect();
    order.sort_by_key(|n| (a_hist[&a_sigs[n]], n.id().to_string()));

    let mut by_node: FnvHashMap<&BlankNode, Vec<&Triple>> = FnvHashMap::default();
    for triple in &a_triples {
        for term in [triple.subject(), triple.object()] {
            if let Term::BlankNode(n) = term {
                let entry = by_node.entry(n).or_default();
                if entry.last() != Some(triple) {
                    entry.push(triple);
                }
            }
        }
    }

    let search = Search {
        order,
        a_sigs: &a_sigs,
        b_sigs: &b_sigs,
        by_node: &by_node,
        target: b,
    };
    let mut mapping = FnvHashMap::default();
    let mut used = FnvHashSet::default();
    search.extend(0, &mut mapping, &mut used)
}

type Signature = Vec<(u8, String, String)>;

/// Per blank node: the sorted multiset of (position, predicate, other end)
/// over the triples it occurs in, with other blank nodes anonymised
fn signatures<'a>(triples: &[&'a Triple]) -> FnvHashMap<&'a BlankNode, Signature> {
    let mut sigs: FnvHashMap<&BlankNode, Signature> = FnvHashMap::default();
    let anon = |t: &Term| if t.is_blank() { "_".to_string() } else { t.to_string() };
    for triple in triples {
        let predicate = triple.predicate().to_string();
        if let Term::BlankNode(n) = triple.subject() {
            let other = if triple.object() == triple.subject() {
                "self".to_string()
            } else {
                anon(triple.object())
            };
            sigs.entry(n).or_default().push((0, predicate.clone(), other));
        }
        if let Term::BlankNode(n) = triple.object() {
            if triple.object() != triple.subject() {
                sigs.entry(n).or_default().push((1, predicate, anon(triple.subject())));
            }
        }
    }
    for sig in sigs.values_mut() {
        sig.sort();
    }
    sigs
}

struct Search<'a> {
    order: Vec<&'a BlankNode>,
    a_sigs: &'a FnvHashMap<&'a BlankNode, Signature>,
    b_sigs: &'a FnvHashMap<&'a BlankNode, Signature>,
    by_node: &'a FnvHashMap<&'a BlankNode, Vec<&'a Triple>>,
    target: &'a TripleCollection,
}

impl<'a> Search<'a> {
    fn extend(
        &self,
        depth: usize,
        mapping: &mut FnvHashMap<&'a BlankNode, &'a BlankNode>,
        used: &mut FnvHashSet<&'a BlankNode>,
    ) -> bool {
        let node = match self.order.get(depth) {
            Some(node) => *node,
            None => return true,
        };
        let sig = &self.a_sigs[node];

        for (&candidate, candidate_sig) in self.b_sigs.iter() {
            if candidate_sig != sig || used.contains(candidate) {
                continue;
            }
            mapping.insert(node, candidate);
            used.insert(candidate);

            if self.consistent(node, mapping) && self.extend(depth + 1, mapping, used) {
                return true;
            }

            mapping.remove(node);
            used.remove(candidate);
        }
        false
    }

    /// Every triple of `node` whose blank nodes are all mapped must exist in
    /// the target under the mapping
    fn consistent(&self, node: &BlankNode, mapping: &FnvHashMap<&'a BlankNode, &'a BlankNode>) -> bool {
        let triples = match self.by_node.get(node) {
            Some(t) => t,
            None => return true,
        };
        triples.iter().all(|triple| {
            let mut complete = true;
            let mapped = triple.map_terms(|t| match t {
                Term::BlankNode(n) => match mapping.get(n) {
                    Some(m) => Term::BlankNode((*m).clone()),
                    None => {
                        complete = false;
                        t.clone()
                    }
                },
                _ => t.clone(),
            });
            match mapped {
                Ok(m) => !complete || self.target.contains(&m),
                Err(_) => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Term {
        Term::uri(format!("http://ex.org/{}", s))
    }

    fn collection(triples: &[(Term, &str, Term)]) -> TripleCollection {
        triples
            .iter()
            .map(|(s, p, o)| Triple::new(s.clone(), uri(p), o.clone()).unwrap())
            .collect()
    }

    #[test]
    fn test_ground_graphs() {
        let a = collection(&[(uri("a"), "p", Term::literal("1"))]);
        let b = collection(&[(uri("a"), "p", Term::literal("1"))]);
        let c = collection(&[(uri("a"), "p", Term::literal("2"))]);
        assert!(ground_equals(&a, &b));
        assert!(is_isomorphic(&a, &b));
        assert!(!is_isomorphic(&a, &c));
    }

    #[test]
    fn test_blank_relabelling_is_isomorphic() {
        let a = collection(&[
            (Term::blank("x"), "knows", Term::blank("y")),
            (Term::blank("y"), "name", Term::literal("Bob")),
            (Term::blank("x"), "name", Term::literal("Alice")),
        ]);
        let b = collection(&[
            (Term::blank("n1"), "knows", Term::blank("n2")),
            (Term::blank("n2"), "name", Term::literal("Bob")),
            (Term::blank("n1"), "name", Term::literal("Alice")),
        ]);
        assert!(is_isomorphic(&a, &b));
    }

    #[test]
    fn test_structure_mismatch() {
        // a cycle of two versus two self loops
        let a = collection(&[
            (Term::blank("x"), "p", Term::blank("y")),
            (Term::blank("y"), "p", Term::blank("x")),
        ]);
        let b = collection(&[
            (Term::blank("x"), "p", Term::blank("x")),
            (Term::blank("y"), "p", Term::blank("y")),
        ]);
        assert!(ground_equals(&a, &b));
        assert!(!is_isomorphic(&a, &b));
    }

    #[test]
    fn test_backtracking_needed() {
        // same signatures for all nodes; only one of the two rings maps
        let ring = |names: [&str; 3]| {
            collection(&[
                (Term::blank(names[0]), "p", Term::blank(names[1])),
                (Term::blank(names[1]), "p", Term::blank(names[2])),
                (Term::blank(names[2]), "p", Term::blank(names[0])),
            ])
        };
        assert!(is_isomorphic(&ring(["a", "b", "c"]), &ring(["z", "y", "x"])));
    }

    #[test]
    fn test_blank_count_mismatch() {
        let a = collection(&[(Term::blank("x"), "p", Term::literal("1")), (Term::blank("x"), "q", Term::literal("1"))]);
        let b = collection(&[(Term::blank("x"), "p", Term::literal("1")), (Term::blank("y"), "q", Term::literal("1"))]);
        assert!(!is_isomorphic(&a, &b));
    }
}
