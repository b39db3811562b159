//! Structured type declarations
//!
//! Entity and complex types with their structural and navigation properties.
//! Derived facts (qualified name, base type, key, member table) are memoized
//! in cycle-safe cells owned here; the computations live on
//! [`Model`](super::Model) because they walk the whole graph.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::binding::BindingTable;
use crate::cache::MemoCell;
use crate::diag::Location;

use super::element::{StoredMember, StoredTypeRef};

// =============================================================================
// Type Kinds
// =============================================================================

/// Kind of a structured type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Identified by a key; may back entity sets and navigation targets.
    Entity,
    /// Structured value without identity.
    Complex,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity type",
            Self::Complex => "complex type",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Structured Types
// =============================================================================

/// An entity or complex type declaration.
///
/// Immutable once the model is frozen; the memo cells are the only interior
/// mutability and are safe under concurrent readers.
#[derive(Debug)]
pub struct StructuredType {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) kind: TypeKind,
    pub(crate) is_abstract: bool,
    pub(crate) base_type_name: Option<String>,
    /// Key property names as declared; `None` when this type declares no key
    /// of its own (it may still inherit one).
    pub(crate) declared_key: Option<Vec<String>>,
    pub(crate) properties: Vec<Property>,
    pub(crate) navigations: Vec<NavigationProperty>,
    pub(crate) location: Location,

    pub(crate) full_name: MemoCell<Arc<str>>,
    pub(crate) base: MemoCell<Option<StoredTypeRef>>,
    pub(crate) key: MemoCell<Arc<[Arc<str>]>>,
    pub(crate) members: MemoCell<Arc<BindingTable<StoredMember>>>,
}

impl StructuredType {
    pub(crate) fn new(namespace: String, name: String, kind: TypeKind, location: Location) -> Self {
        Self {
            name,
            namespace,
            kind,
            is_abstract: false,
            base_type_name: None,
            declared_key: None,
            properties: Vec::new(),
            navigations: Vec::new(),
            location,
            full_name: MemoCell::new(),
            base: MemoCell::new(),
            key: MemoCell::new(),
            members: MemoCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn base_type_name(&self) -> Option<&str> {
        self.base_type_name.as_deref()
    }

    pub fn declared_key(&self) -> Option<&[String]> {
        self.declared_key.as_deref()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn property_count(&self) -> u32 {
        self.properties.len() as u32
    }

    pub fn navigation_count(&self) -> u32 {
        self.navigations.len() as u32
    }

    pub fn property(&self, index: u32) -> &Property {
        &self.properties[index as usize]
    }

    pub fn navigation(&self, index: u32) -> &NavigationProperty {
        &self.navigations[index as usize]
    }
}

// =============================================================================
// Properties
// =============================================================================

/// A structural property declaration.
#[derive(Debug)]
pub struct Property {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) location: Location,
    pub(crate) resolved: MemoCell<StoredTypeRef>,
}

impl Property {
    pub(crate) fn new(name: String, type_name: String, location: Location) -> Self {
        Self {
            name,
            type_name,
            location,
            resolved: MemoCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type name as declared, unresolved.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// A navigation (relationship) property declaration.
#[derive(Debug)]
pub struct NavigationProperty {
    pub(crate) name: String,
    pub(crate) target_name: String,
    pub(crate) contains_target: bool,
    pub(crate) location: Location,
    pub(crate) target: MemoCell<StoredTypeRef>,
}

impl NavigationProperty {
    pub(crate) fn new(
        name: String,
        target_name: String,
        contains_target: bool,
        location: Location,
    ) -> Self {
        Self {
            name,
            target_name,
            contains_target,
            location,
            target: MemoCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target type name as declared, unresolved.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Whether target entities are owned by (contained in) the source.
    pub fn contains_target(&self) -> bool {
        self.contains_target
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}
