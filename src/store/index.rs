//! Indexed triple collection
//!
//! The base set holds every triple once; three hash indexes map each
//! subject, predicate and object to the triples carrying it. All eight
//! bound/unbound lookup shapes are served lazily from the smallest
//! applicable bucket.

use indexmap::{IndexMap, IndexSet};

use crate::term::{Term, Triple};

type Bucket = IndexSet<Triple>;

/// A set of triples with subject, predicate and object indexes
#[derive(Clone, Default)]
pub struct TripleCollection {
    triples: IndexSet<Triple>,
    by_subject: IndexMap<Term, Bucket>,
    by_predicate: IndexMap<Term, Bucket>,
    by_object: IndexMap<Term, Bucket>,
}

impl TripleCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a triple; returns false if it was already present
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.triples.contains(&triple) {
            return false;
        }
        let triple = triple
            .map_terms(|t| self.intern(t))
            .unwrap_or(triple);

        self.by_subject
            .entry(triple.subject().clone())
            .or_default()
            .insert(triple.clone());
        self.by_predicate
            .entry(triple.predicate().clone())
            .or_default()
            .insert(triple.clone());
        self.by_object
            .entry(triple.object().clone())
            .or_default()
            .insert(triple.clone());
        self.triples.insert(triple)
    }

    /// Remove a triple; returns false if it was absent
    pub fn remove(&mut self, triple: &Triple) -> bool {
        if !self.triples.swap_remove(triple) {
            return false;
        }
        remove_from(&mut self.by_subject, triple.subject(), triple);
        remove_from(&mut self.by_predicate, triple.predicate(), triple);
        remove_from(&mut self.by_object, triple.object(), triple);
        true
    }

    /// Check if the collection contains a triple
    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Get the number of triples
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Iterate over all triples
    pub fn iter(&self) -> impl Iterator<Item = &Triple> + '_ {
        self.triples.iter()
    }

    /// Clear all triples and indexes
    pub fn clear(&mut self) {
        self.triples.clear();
        self.by_subject.clear();
        self.by_predicate.clear();
        self.by_object.clear();
    }

    /// Lazily enumerate the triples matching a pattern; `None` positions are
    /// wildcards. An unmatched pattern yields an empty iterator.
    pub fn matching<'a>(
        &'a self,
        s: Option<&'a Term>,
        p: Option<&'a Term>,
        o: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        match (s, p, o) {
            (None, None, None) => Box::new(self.triples.iter()),
            (Some(s), Some(p), Some(o)) => {
                let found = Triple::new(s.clone(), p.clone(), o.clone())
                    .ok()
                    .and_then(|t| self.triples.get(&t));
                Box::new(found.into_iter())
            }
            (Some(s), None, None) => Box::new(bucket(&self.by_subject, s)),
            (None, Some(p), None) => Box::new(bucket(&self.by_predicate, p)),
            (None, None, Some(o)) => Box::new(bucket(&self.by_object, o)),
            _ => {
                let candidates = [
                    s.map(|t| (self.subject_count(t), &self.by_subject, t)),
                    p.map(|t| (self.predicate_count(t), &self.by_predicate, t)),
                    o.map(|t| (self.object_count(t), &self.by_object, t)),
                ];
                let smallest = candidates
                    .into_iter()
                    .flatten()
                    .min_by_key(|(count, _, _)| *count);
                match smallest {
                    Some((_, index, key)) => Box::new(bucket(index, key).filter(move |t| {
                        s.map_or(true, |s| t.subject() == s)
                            && p.map_or(true, |p| t.predicate() == p)
                            && o.map_or(true, |o| t.object() == o)
                    })),
                    None => Box::new(std::iter::empty()),
                }
            }
        }
    }

    /// Number of triples with the given subject
    pub fn subject_count(&self, term: &Term) -> usize {
        self.by_subject.get(term).map_or(0, |b| b.len())
    }

    /// Number of triples with the given predicate
    pub fn predicate_count(&self, term: &Term) -> usize {
        self.by_predicate.get(term).map_or(0, |b| b.len())
    }

    /// Number of triples with the given object
    pub fn object_count(&self, term: &Term) -> usize {
        self.by_object.get(term).map_or(0, |b| b.len())
    }

    /// Number of distinct subjects
    pub fn distinct_subjects(&self) -> usize {
        self.by_subject.len()
    }

    /// Number of distinct predicates
    pub fn distinct_predicates(&self) -> usize {
        self.by_predicate.len()
    }

    /// Number of distinct objects
    pub fn distinct_objects(&self) -> usize {
        self.by_object.len()
    }

    /// All indexed terms appearing in subject or object position
    pub fn nodes(&self) -> impl Iterator<Item = &Term> + '_ {
        self.by_subject
            .keys()
            .chain(self.by_object.keys().filter(move |t| !self.by_subject.contains_key(*t)))
    }

    /// Return the stored copy of an equal term, so that equal terms share
    /// their allocation
    pub fn intern(&self, term: &Term) -> Term {
        self.by_subject
            .get_key_value(term)
            .or_else(|| self.by_object.get_key_value(term))
            .or_else(|| self.by_predicate.get_key_value(term))
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| term.clone())
    }
}

fn bucket<'a>(index: &'a IndexMap<Term, Bucket>, key: &Term) -> impl Iterator<Item = &'a Triple> + 'a {
    index.get(key).into_iter().flat_map(|b| b.iter())
}

fn remove_from(index: &mut IndexMap<Term, Bucket>, key: &Term, triple: &Triple) {
    if let Some(b) = index.get_mut(key) {
        b.swap_remove(triple);
        if b.is_empty() {
            index.swap_remove(key);
        }
    }
}

impl FromIterator<Triple> for TripleCollection {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut collection = TripleCollection::new();
        for triple in iter {
            collection.insert(triple);
        }
        collection
    }
}

impl std::fmt::Debug for TripleCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TripleCollection {{")?;
        for triple in &self.triples {
            writeln!(f, "  {:?}", triple)?;
        }
        write!(f, "}}")
    }
}
