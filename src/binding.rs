//! Name scopes and ambiguous bindings
//!
//! Each naming scope (schema-level qualified names, container sets, type
//! members) binds names through a table that tolerates collisions instead of
//! rejecting input: the first collision for a name promotes the slot to an
//! ambiguity that records every distinct candidate and synthesizes exactly
//! one structural error. Lookups surface the ambiguity to the caller, who
//! degrades it to a poisoned element with neutral answers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::diag::{ErrorCode, Location, StructuralError};

// =============================================================================
// Ambiguities
// =============================================================================

/// A name bound to more than one element in a single scope.
///
/// Candidates are kept in first-seen order and deduplicated by identity;
/// there are always at least two. The structural error is synthesized once,
/// when the collision is first detected, and reports the first candidate's
/// position.
#[derive(Debug, Clone)]
pub struct Ambiguity<T> {
    name: String,
    location: Location,
    candidates: Vec<T>,
    error: StructuralError,
}

impl<T> Ambiguity<T> {
    /// The colliding name (shared by every candidate).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrite the candidates through `f`, keeping the name, position, and
    /// synthesized error.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Ambiguity<U> {
        Ambiguity {
            name: self.name.clone(),
            location: self.location.clone(),
            candidates: self.candidates.iter().map(f).collect(),
            error: self.error.clone(),
        }
    }

    /// Position of the first candidate bound to the name.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Every distinct element bound to the name, in first-seen order.
    pub fn candidates(&self) -> &[T] {
        &self.candidates
    }

    /// The one structural error this collision contributes to a report.
    pub fn error(&self) -> &StructuralError {
        &self.error
    }
}

// =============================================================================
// Lookup Results
// =============================================================================

/// Result of resolving a name in one scope.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    /// Exactly one element is bound to the name.
    Found(T),
    /// Two or more elements are bound to the name.
    Ambiguous(Arc<Ambiguity<T>>),
    /// Nothing is bound to the name.
    Missing,
}

impl<T: Clone> Lookup<T> {
    /// The uniquely bound element, if there is one.
    pub fn found(&self) -> Option<T> {
        match self {
            Lookup::Found(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Lookup::Missing)
    }
}

// =============================================================================
// Binding Tables
// =============================================================================

#[derive(Debug, Clone)]
enum Slot<T> {
    Single { candidate: T, location: Location },
    Ambiguous(Arc<Ambiguity<T>>),
}

/// Collision-tolerant name table for one scope.
///
/// Bindings are added while the scope is being built, before any lookup
/// shares its ambiguities; after that the table is read-only.
#[derive(Debug, Clone)]
pub struct BindingTable<T> {
    entries: HashMap<String, Slot<T>>,
}

impl<T> Default for BindingTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> BindingTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every bound name, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Unambiguously bound entries, in no particular order.
    pub fn singles(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().filter_map(|(name, slot)| match slot {
            Slot::Single { candidate, .. } => Some((name.as_str(), candidate)),
            Slot::Ambiguous(_) => None,
        })
    }
}

impl<T: Clone + PartialEq> BindingTable<T> {
    /// Bind `candidate` to `name`.
    ///
    /// The first binding for a name wins the slot; a second distinct
    /// candidate promotes the slot to an [`Ambiguity`] and synthesizes its
    /// one error; further distinct candidates only join the candidate list.
    /// Re-adding an element already bound to the name changes nothing.
    pub fn add(&mut self, name: impl Into<String>, candidate: T, location: &Location) {
        match self.entries.entry(name.into()) {
            Entry::Vacant(slot) => {
                slot.insert(Slot::Single {
                    candidate,
                    location: location.clone(),
                });
            }
            Entry::Occupied(mut slot) => {
                let name = slot.key().clone();
                let value = slot.get_mut();
                match value {
                    Slot::Single {
                        candidate: first,
                        location: first_location,
                    } => {
                        let first = first.clone();
                        if first == candidate {
                            return;
                        }
                        let first_location = first_location.clone();
                        let error = StructuralError::new(
                            first_location.clone(),
                            ErrorCode::AmbiguousBinding,
                            format!("The name '{}' is ambiguous", name),
                        );
                        *value = Slot::Ambiguous(Arc::new(Ambiguity {
                            name,
                            location: first_location,
                            candidates: vec![first, candidate],
                            error,
                        }));
                    }
                    Slot::Ambiguous(existing) => {
                        let ambiguity = Arc::make_mut(existing);
                        if !ambiguity.candidates.contains(&candidate) {
                            ambiguity.candidates.push(candidate);
                        }
                    }
                }
            }
        }
    }

    /// Resolve `name` in this scope.
    pub fn get(&self, name: &str) -> Lookup<T> {
        match self.entries.get(name) {
            None => Lookup::Missing,
            Some(Slot::Single { candidate, .. }) => Lookup::Found(candidate.clone()),
            Some(Slot::Ambiguous(ambiguity)) => Lookup::Ambiguous(Arc::clone(ambiguity)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All collisions in this scope, in name order for deterministic reports.
    pub fn ambiguities(&self) -> Vec<Arc<Ambiguity<T>>> {
        let mut out: Vec<_> = self
            .entries
            .values()
            .filter_map(|slot| match slot {
                Slot::Ambiguous(ambiguity) => Some(Arc::clone(ambiguity)),
                Slot::Single { .. } => None,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Rewrite every bound element through `f`, preserving slot structure,
    /// collision errors, and candidate order.
    pub fn map<U: Clone + PartialEq>(&self, mut f: impl FnMut(&T) -> U) -> BindingTable<U> {
        let entries = self
            .entries
            .iter()
            .map(|(name, slot)| {
                let mapped = match slot {
                    Slot::Single {
                        candidate,
                        location,
                    } => Slot::Single {
                        candidate: f(candidate),
                        location: location.clone(),
                    },
                    Slot::Ambiguous(ambiguity) => {
                        Slot::Ambiguous(Arc::new(ambiguity.map(&mut f)))
                    }
                };
                (name.clone(), mapped)
            })
            .collect();
        BindingTable { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_binding() {
        let mut table = BindingTable::new();
        table.add("NS.Customer", 1u32, &Location::new(1, 1));

        assert_eq!(table.get("NS.Customer").found(), Some(1));
        assert!(table.get("NS.Order").is_missing());
        assert!(table.ambiguities().is_empty());
    }

    #[test]
    fn test_collision_synthesizes_one_error() {
        let mut table = BindingTable::new();
        table.add("NS.Customer", 1u32, &Location::new(1, 1));
        table.add("NS.Customer", 2u32, &Location::new(5, 1));
        table.add("NS.Customer", 3u32, &Location::new(9, 1));

        let ambiguity = match table.get("NS.Customer") {
            Lookup::Ambiguous(a) => a,
            other => panic!("expected ambiguous lookup, got {:?}", other),
        };
        assert_eq!(ambiguity.candidates(), &[1, 2, 3]);
        assert_eq!(ambiguity.name(), "NS.Customer");
        // One collision, one error, no matter how many candidates joined.
        assert_eq!(table.ambiguities().len(), 1);
        assert_eq!(ambiguity.error().code, ErrorCode::AmbiguousBinding);
    }

    #[test]
    fn test_duplicate_candidate_is_not_a_collision() {
        let mut table = BindingTable::new();
        table.add("NS.Customer", 1u32, &Location::new(1, 1));
        table.add("NS.Customer", 1u32, &Location::new(1, 1));

        assert_eq!(table.get("NS.Customer").found(), Some(1));

        table.add("NS.Customer", 2u32, &Location::new(5, 1));
        table.add("NS.Customer", 1u32, &Location::new(1, 1));

        let ambiguity = match table.get("NS.Customer") {
            Lookup::Ambiguous(a) => a,
            other => panic!("expected ambiguous lookup, got {:?}", other),
        };
        assert_eq!(ambiguity.candidates(), &[1, 2]);
    }

    #[test]
    fn test_ambiguity_reports_first_candidate_position() {
        let mut table = BindingTable::new();
        table.add("NS.Customer", 1u32, &Location::new(1, 5));
        table.add("NS.Customer", 2u32, &Location::new(2, 7));

        let ambiguity = match table.get("NS.Customer") {
            Lookup::Ambiguous(a) => a,
            other => panic!("expected ambiguous lookup, got {:?}", other),
        };
        assert_eq!(ambiguity.location(), &Location::new(1, 5));
        assert_eq!(ambiguity.error().location, Location::new(1, 5));
    }
}
