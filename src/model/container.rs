//! Entity containers and entity sets
//!
//! A container is the named scope that groups entity sets. Containers are
//! findable by simple or namespace-qualified name; a collision on either
//! path yields a merged ambiguous stand-in that answers neutrally.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::binding::{Ambiguity, BindingTable, Lookup};
use crate::cache::MemoCell;
use crate::diag::{Location, StructuralError};

use super::element::{ContainerId, StoredTypeRef, TypeRef};
use super::Model;

// =============================================================================
// Containers
// =============================================================================

/// An entity container declaration.
#[derive(Debug)]
pub struct EntityContainer {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) location: Location,
    pub(crate) sets: Vec<EntitySet>,
    pub(crate) set_table: MemoCell<Arc<BindingTable<u32>>>,
}

impl EntityContainer {
    pub(crate) fn new(namespace: String, name: String, location: Location) -> Self {
        Self {
            name,
            namespace,
            location,
            sets: Vec::new(),
            set_table: MemoCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn set_count(&self) -> u32 {
        self.sets.len() as u32
    }

    pub fn set(&self, index: u32) -> &EntitySet {
        &self.sets[index as usize]
    }
}

/// An entity set declaration.
#[derive(Debug)]
pub struct EntitySet {
    pub(crate) name: String,
    pub(crate) element_type_name: String,
    pub(crate) location: Location,
    pub(crate) element_type: MemoCell<StoredTypeRef>,
}

impl EntitySet {
    pub(crate) fn new(name: String, element_type_name: String, location: Location) -> Self {
        Self {
            name,
            element_type_name,
            location,
            element_type: MemoCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element type name as declared, unresolved.
    pub fn element_type_name(&self) -> &str {
        &self.element_type_name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

// =============================================================================
// Container Handles
// =============================================================================

/// An entity container paired with its declaring model.
#[derive(Clone)]
pub struct ContainerHandle {
    pub(crate) model: Arc<Model>,
    pub(crate) id: ContainerId,
}

impl ContainerHandle {
    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn name(&self) -> &str {
        self.model.container_at(self.id).name()
    }

    pub fn namespace(&self) -> &str {
        self.model.container_at(self.id).namespace()
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.namespace(), self.name())
    }

    pub fn location(&self) -> &Location {
        self.model.container_at(self.id).location()
    }

    /// Resolve an entity set by name within this container.
    pub fn find_entity_set(&self, name: &str) -> Lookup<EntitySetHandle> {
        self.model.find_entity_set_in(self.id, name)
    }

    pub fn entity_sets(&self) -> impl Iterator<Item = EntitySetHandle> + '_ {
        let count = self.model.container_at(self.id).set_count();
        (0..count).map(move |index| EntitySetHandle {
            container: self.clone(),
            index,
        })
    }
}

impl PartialEq for ContainerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.id == other.id
    }
}

impl Eq for ContainerHandle {}

impl Hash for ContainerHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.model) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerHandle({})", self.full_name())
    }
}

/// An entity set paired with its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntitySetHandle {
    pub(crate) container: ContainerHandle,
    pub(crate) index: u32,
}

impl EntitySetHandle {
    pub fn container(&self) -> &ContainerHandle {
        &self.container
    }

    pub fn name(&self) -> &str {
        self.set().name()
    }

    pub fn declared_type_name(&self) -> &str {
        self.set().element_type_name()
    }

    pub fn location(&self) -> &Location {
        self.set().location()
    }

    /// Resolved element type, memoized per set.
    pub fn element_type(&self) -> TypeRef {
        self.container
            .model
            .entity_set_type(self.container.id, self.index)
    }

    fn set(&self) -> &EntitySet {
        self.container.model.container_at(self.container.id).set(self.index)
    }
}

// =============================================================================
// Container Lookup
// =============================================================================

/// Result of resolving a container name, simple or qualified.
#[derive(Debug, Clone)]
pub enum ContainerLookup {
    Found(ContainerHandle),
    /// More than one container is bound to the name; the stand-in answers
    /// neutrally.
    Ambiguous(AmbiguousContainer),
    Missing,
}

impl ContainerLookup {
    pub fn found(&self) -> Option<&ContainerHandle> {
        match self {
            ContainerLookup::Found(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Merged stand-in for an ambiguously named container.
#[derive(Debug, Clone)]
pub struct AmbiguousContainer {
    pub(crate) ambiguity: Arc<Ambiguity<ContainerHandle>>,
}

impl AmbiguousContainer {
    pub fn name(&self) -> &str {
        self.ambiguity.name()
    }

    /// Namespace reported for the merged container: the first candidate's.
    /// Deterministic, but callers must not depend on which candidate it is.
    pub fn namespace(&self) -> &str {
        self.ambiguity
            .candidates()
            .first()
            .map(|c| c.namespace())
            .unwrap_or("")
    }

    pub fn candidates(&self) -> &[ContainerHandle] {
        self.ambiguity.candidates()
    }

    pub fn error(&self) -> &StructuralError {
        self.ambiguity.error()
    }

    /// Set lookups on an ambiguous container find nothing.
    pub fn find_entity_set(&self, _name: &str) -> Lookup<EntitySetHandle> {
        Lookup::Missing
    }
}
