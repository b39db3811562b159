//! Element identities and reference values
//!
//! Model elements live in arenas owned by their [`Model`]; everything else
//! refers to them through small ids, or through handles pairing an id with
//! the owning model. Resolution failures become poison values carrying their
//! own errors, so a malformed model still answers every question.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::Model;
use crate::binding::Lookup;
use crate::diag::{Location, StructuralError};

// =============================================================================
// Element Ids
// =============================================================================

/// Index of a structured type in its model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) u32);

/// Index of a value term in its model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TermId(pub(crate) u32);

/// Index of an entity container in its model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub(crate) u32);

/// Index of an operation in its model's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(pub(crate) u32);

// =============================================================================
// Element Kinds
// =============================================================================

/// What kind of declaration a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    EntityType,
    ComplexType,
    Property,
    NavigationProperty,
    EntityContainer,
    EntitySet,
    Operation,
    Term,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityType => "entity type",
            Self::ComplexType => "complex type",
            Self::Property => "property",
            Self::NavigationProperty => "navigation property",
            Self::EntityContainer => "entity container",
            Self::EntitySet => "entity set",
            Self::Operation => "operation",
            Self::Term => "term",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Primitive Types
// =============================================================================

/// Builtin scalar types of the `Edm` namespace.
///
/// Primitive names resolve before any declared type, so a declaration cannot
/// shadow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Single,
    String,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Binary => "Edm.Binary",
            Self::Boolean => "Edm.Boolean",
            Self::Byte => "Edm.Byte",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::Decimal => "Edm.Decimal",
            Self::Double => "Edm.Double",
            Self::Guid => "Edm.Guid",
            Self::Int16 => "Edm.Int16",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::Single => "Edm.Single",
            Self::String => "Edm.String",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Edm.Binary" => Some(Self::Binary),
            "Edm.Boolean" => Some(Self::Boolean),
            "Edm.Byte" => Some(Self::Byte),
            "Edm.DateTimeOffset" => Some(Self::DateTimeOffset),
            "Edm.Decimal" => Some(Self::Decimal),
            "Edm.Double" => Some(Self::Double),
            "Edm.Guid" => Some(Self::Guid),
            "Edm.Int16" => Some(Self::Int16),
            "Edm.Int32" => Some(Self::Int32),
            "Edm.Int64" => Some(Self::Int64),
            "Edm.Single" => Some(Self::Single),
            "Edm.String" => Some(Self::String),
            _ => None,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Poison Elements
// =============================================================================

/// Stand-in for an element that could not be produced.
///
/// Carries the errors explaining the failure; healthy declarations never
/// hold errors themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadElement {
    name: String,
    location: Location,
    errors: Vec<StructuralError>,
}

impl BadElement {
    pub fn new(name: impl Into<String>, location: Location, error: StructuralError) -> Self {
        Self {
            name: name.into(),
            location,
            errors: vec![error],
        }
    }

    /// The name that failed to resolve (or the colliding name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn errors(&self) -> &[StructuralError] {
        &self.errors
    }
}

// =============================================================================
// Type Handles and References
// =============================================================================

/// A structured type paired with the model that declares it.
///
/// Identity (equality, hashing) is the declaring model plus the arena id:
/// two handles are equal exactly when they designate the same declaration.
#[derive(Clone)]
pub struct TypeHandle {
    pub(crate) model: Arc<Model>,
    pub(crate) id: TypeId,
}

impl TypeHandle {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn name(&self) -> &str {
        self.model.type_at(self.id).name()
    }

    pub fn namespace(&self) -> &str {
        self.model.type_at(self.id).namespace()
    }

    pub fn kind(&self) -> super::TypeKind {
        self.model.type_at(self.id).kind()
    }

    pub fn is_abstract(&self) -> bool {
        self.model.type_at(self.id).is_abstract()
    }

    pub fn location(&self) -> &Location {
        self.model.type_at(self.id).location()
    }

    /// Namespace-qualified name, computed once and memoized.
    pub fn full_name(&self) -> Arc<str> {
        self.model.full_type_name(self.id)
    }

    /// Resolved base type; `None` when no base is declared. A cyclic base
    /// chain resolves every participant to [`TypeRef::Bad`].
    pub fn base_type(&self) -> Option<TypeRef> {
        self.model.base_type(self.id)
    }

    /// Effective key property names, own or inherited. Empty when no key is
    /// declared anywhere in the base chain.
    pub fn key(&self) -> Arc<[Arc<str>]> {
        self.model.key(self.id)
    }

    /// Resolve a member name among own and inherited members.
    pub fn find_member(&self, name: &str) -> Lookup<Member> {
        self.model.find_member(self.id, name)
    }

    /// Structural properties declared directly on this type.
    pub fn properties(&self) -> impl Iterator<Item = PropertyHandle> + '_ {
        let count = self.model.type_at(self.id).property_count();
        (0..count).map(move |index| PropertyHandle {
            ty: self.clone(),
            index,
        })
    }

    /// Navigation properties declared directly on this type.
    pub fn navigations(&self) -> impl Iterator<Item = NavigationHandle> + '_ {
        let count = self.model.type_at(self.id).navigation_count();
        (0..count).map(move |index| NavigationHandle {
            ty: self.clone(),
            index,
        })
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.id == other.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.model) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({}.{})", self.namespace(), self.name())
    }
}

/// Outcome of resolving a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// A builtin scalar type.
    Primitive(PrimitiveKind),
    /// A declared structured type, possibly in a referenced model.
    Declared(TypeHandle),
    /// The name did not resolve to exactly one usable type.
    Bad(Arc<BadElement>),
}

impl TypeRef {
    pub fn is_bad(&self) -> bool {
        matches!(self, TypeRef::Bad(_))
    }

    pub fn declared(&self) -> Option<&TypeHandle> {
        match self {
            TypeRef::Declared(handle) => Some(handle),
            _ => None,
        }
    }

    /// Errors carried by a poison reference; healthy references have none.
    pub fn errors(&self) -> &[StructuralError] {
        match self {
            TypeRef::Bad(bad) => bad.errors(),
            _ => &[],
        }
    }
}

/// Reference form kept inside memo cells. Local ids stay bare: a cached
/// value must never hold its own model's `Arc`.
#[derive(Debug, Clone)]
pub(crate) enum StoredTypeRef {
    Primitive(PrimitiveKind),
    Local(TypeId),
    External(Arc<Model>, TypeId),
    Bad(Arc<BadElement>),
}

// =============================================================================
// Members
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Property,
    Navigation,
}

/// Member reference as kept in cached member tables. `model: None` stands
/// for the table's owning model, so a type's own members never hold its Arc.
#[derive(Debug, Clone)]
pub(crate) struct StoredMember {
    pub(crate) model: Option<Arc<Model>>,
    pub(crate) ty: TypeId,
    pub(crate) kind: MemberKind,
    pub(crate) index: u32,
}

impl StoredMember {
    pub(crate) fn local(ty: TypeId, kind: MemberKind, index: u32) -> Self {
        Self {
            model: None,
            ty,
            kind,
            index,
        }
    }

    /// Pin a member inherited from `origin` to that model, so the reference
    /// stays meaningful inside another model's table.
    pub(crate) fn rebased(&self, origin: &Arc<Model>) -> Self {
        Self {
            model: Some(self.model.clone().unwrap_or_else(|| Arc::clone(origin))),
            ty: self.ty,
            kind: self.kind,
            index: self.index,
        }
    }

    /// Context-free identity, with `owner` filling in for `None`.
    pub(crate) fn identity(&self, owner: &Arc<Model>) -> MemberIdentity {
        let model = self.model.as_ref().unwrap_or(owner);
        MemberIdentity {
            model: Arc::as_ptr(model) as usize,
            ty: self.ty,
            kind: self.kind,
            index: self.index,
        }
    }
}

// Both sides of a comparison always come from the same table, so `None`
// means the same owner on both.
impl PartialEq for StoredMember {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && self.kind == other.kind
            && self.index == other.index
            && match (&self.model, &other.model) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

/// Identity of a member declaration, comparable across member tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MemberIdentity {
    model: usize,
    ty: TypeId,
    kind: MemberKind,
    index: u32,
}

/// A structural property paired with its declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyHandle {
    pub(crate) ty: TypeHandle,
    pub(crate) index: u32,
}

impl PropertyHandle {
    pub fn declaring_type(&self) -> &TypeHandle {
        &self.ty
    }

    pub fn name(&self) -> &str {
        self.property().name()
    }

    pub fn declared_type_name(&self) -> &str {
        self.property().type_name()
    }

    pub fn location(&self) -> &Location {
        self.property().location()
    }

    /// Resolved property type, memoized per property.
    pub fn property_type(&self) -> TypeRef {
        self.ty.model.property_type(self.ty.id, self.index)
    }

    fn property(&self) -> &super::Property {
        self.ty.model.type_at(self.ty.id).property(self.index)
    }
}

/// A navigation property paired with its declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavigationHandle {
    pub(crate) ty: TypeHandle,
    pub(crate) index: u32,
}

impl NavigationHandle {
    pub fn declaring_type(&self) -> &TypeHandle {
        &self.ty
    }

    pub fn name(&self) -> &str {
        self.navigation().name()
    }

    pub fn declared_target_name(&self) -> &str {
        self.navigation().target_name()
    }

    /// Whether the target entities are owned by (contained in) the source.
    pub fn contains_target(&self) -> bool {
        self.navigation().contains_target()
    }

    pub fn location(&self) -> &Location {
        self.navigation().location()
    }

    /// Resolved target type, memoized per navigation property.
    pub fn target(&self) -> TypeRef {
        self.ty.model.navigation_target(self.ty.id, self.index)
    }

    fn navigation(&self) -> &super::NavigationProperty {
        self.ty.model.type_at(self.ty.id).navigation(self.index)
    }
}

/// A member of a structured type, own or inherited.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Property(PropertyHandle),
    Navigation(NavigationHandle),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Property(p) => p.name(),
            Member::Navigation(n) => n.name(),
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Member::Property(_) => MemberKind::Property,
            Member::Navigation(_) => MemberKind::Navigation,
        }
    }

    pub fn declaring_type(&self) -> &TypeHandle {
        match self {
            Member::Property(p) => p.declaring_type(),
            Member::Navigation(n) => n.declaring_type(),
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Member::Property(p) => p.location(),
            Member::Navigation(n) => n.location(),
        }
    }
}
