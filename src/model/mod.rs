//! The schema model graph
//!
//! [`Model`] owns every declaration in arenas and is immutable once frozen;
//! the only interior mutability left is inside memo cells, so a frozen model
//! is shared behind an `Arc` and read concurrently. Cross-references between
//! elements are names resolved lazily, which is what lets declarations form
//! cycles without ownership cycles.

mod builder;
mod container;
mod element;
mod operation;
mod types;

pub use builder::ModelBuilder;
pub use container::{
    AmbiguousContainer, ContainerHandle, ContainerLookup, EntityContainer, EntitySet,
    EntitySetHandle,
};
pub use element::{
    BadElement, ContainerId, ElementKind, Member, MemberKind, NavigationHandle, OperationId,
    PrimitiveKind, PropertyHandle, TermId, TypeHandle, TypeId, TypeRef,
};
pub use operation::{Operation, OperationHandle, Parameter, TermHandle, ValueTerm};
pub use types::{NavigationProperty, Property, StructuredType, TypeKind};

pub(crate) use element::{MemberIdentity, StoredMember, StoredTypeRef};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::binding::{Ambiguity, BindingTable, Lookup};
use crate::cache::CycleGroup;
use crate::diag::{ErrorCode, Location, StructuralError};

// =============================================================================
// Model
// =============================================================================

/// An immutable schema graph: arenas of declarations, the name tables over
/// them, and the serialization groups for cycle-capable computed properties.
pub struct Model {
    pub(crate) types: Vec<StructuredType>,
    pub(crate) terms: Vec<ValueTerm>,
    pub(crate) containers: Vec<EntityContainer>,
    pub(crate) operations: Vec<Operation>,

    pub(crate) types_by_full: BindingTable<TypeId>,
    pub(crate) terms_by_full: BindingTable<TermId>,
    pub(crate) containers_by_full: BindingTable<ContainerId>,
    pub(crate) containers_by_simple: BindingTable<ContainerId>,
    /// Overloads are legal, so every declaration for a name is kept.
    pub(crate) operations_by_full: HashMap<String, Vec<OperationId>>,
    /// Types indexed by their declared base type name. Enumerating derived
    /// types never forces base resolution.
    pub(crate) derived_index: HashMap<String, Vec<TypeId>>,

    pub(crate) references: Vec<Arc<Model>>,

    pub(crate) base_group: CycleGroup,
    pub(crate) key_group: CycleGroup,
    pub(crate) member_group: CycleGroup,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model({} types, {} terms, {} containers, {} operations, {} references)",
            self.types.len(),
            self.terms.len(),
            self.containers.len(),
            self.operations.len(),
            self.references.len()
        )
    }
}

impl Model {
    pub(crate) fn type_at(&self, id: TypeId) -> &StructuredType {
        &self.types[id.0 as usize]
    }

    pub(crate) fn term_at(&self, id: TermId) -> &ValueTerm {
        &self.terms[id.0 as usize]
    }

    pub(crate) fn container_at(&self, id: ContainerId) -> &EntityContainer {
        &self.containers[id.0 as usize]
    }

    pub(crate) fn operation_at(&self, id: OperationId) -> &Operation {
        &self.operations[id.0 as usize]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Models whose declarations this one may reference.
    pub fn references(&self) -> &[Arc<Model>] {
        &self.references
    }
}

// =============================================================================
// Enumeration and Lookup
// =============================================================================

impl Model {
    /// Every structured type declared in this model, in declaration order.
    pub fn types(self: &Arc<Self>) -> impl Iterator<Item = TypeHandle> + '_ {
        (0..self.types.len() as u32).map(move |i| self.type_handle(TypeId(i)))
    }

    pub fn terms(self: &Arc<Self>) -> impl Iterator<Item = TermHandle> + '_ {
        (0..self.terms.len() as u32).map(move |i| self.term_handle(TermId(i)))
    }

    pub fn containers(self: &Arc<Self>) -> impl Iterator<Item = ContainerHandle> + '_ {
        (0..self.containers.len() as u32).map(move |i| self.container_handle(ContainerId(i)))
    }

    pub fn operations(self: &Arc<Self>) -> impl Iterator<Item = OperationHandle> + '_ {
        (0..self.operations.len() as u32).map(move |i| self.operation_handle(OperationId(i)))
    }

    /// Resolve a namespace-qualified type name declared in this model.
    pub fn find_type(self: &Arc<Self>, full_name: &str) -> Lookup<TypeHandle> {
        match self.types_by_full.get(full_name) {
            Lookup::Found(id) => Lookup::Found(self.type_handle(id)),
            Lookup::Ambiguous(a) => Lookup::Ambiguous(Arc::new(a.map(|id| self.type_handle(*id)))),
            Lookup::Missing => Lookup::Missing,
        }
    }

    /// Resolve a namespace-qualified term name declared in this model.
    pub fn find_term(self: &Arc<Self>, full_name: &str) -> Lookup<TermHandle> {
        match self.terms_by_full.get(full_name) {
            Lookup::Found(id) => Lookup::Found(self.term_handle(id)),
            Lookup::Ambiguous(a) => Lookup::Ambiguous(Arc::new(a.map(|id| self.term_handle(*id)))),
            Lookup::Missing => Lookup::Missing,
        }
    }

    /// Resolve a container by simple or namespace-qualified name.
    pub fn find_container(self: &Arc<Self>, name: &str) -> ContainerLookup {
        let table = if name.contains('.') {
            &self.containers_by_full
        } else {
            &self.containers_by_simple
        };
        match table.get(name) {
            Lookup::Found(id) => ContainerLookup::Found(self.container_handle(id)),
            Lookup::Ambiguous(a) => ContainerLookup::Ambiguous(AmbiguousContainer {
                ambiguity: Arc::new(a.map(|id| self.container_handle(*id))),
            }),
            Lookup::Missing => ContainerLookup::Missing,
        }
    }

    /// Every overload declared for a namespace-qualified operation name.
    pub fn find_operations(self: &Arc<Self>, full_name: &str) -> Vec<OperationHandle> {
        self.operations_by_full
            .get(full_name)
            .map(|ids| ids.iter().map(|id| self.operation_handle(*id)).collect())
            .unwrap_or_default()
    }

    /// Types of this model whose declared base name is `base`'s qualified
    /// name. Enumeration never forces base resolution.
    pub fn find_directly_derived_types(self: &Arc<Self>, base: &TypeHandle) -> Vec<TypeHandle> {
        let full = base.full_name();
        self.derived_index
            .get(full.as_ref())
            .map(|ids| ids.iter().map(|id| self.type_handle(*id)).collect())
            .unwrap_or_default()
    }

    /// Transitive closure of [`Self::find_directly_derived_types`]; the
    /// visited set makes it terminate on malformed cyclic declarations.
    pub fn find_all_derived_types(self: &Arc<Self>, base: &TypeHandle) -> Vec<TypeHandle> {
        let mut visited = HashSet::new();
        visited.insert(base.clone());
        let mut out = Vec::new();
        let mut stack = self.find_directly_derived_types(base);
        while let Some(next) = stack.pop() {
            if !visited.insert(next.clone()) {
                continue;
            }
            stack.extend(self.find_directly_derived_types(&next));
            out.push(next);
        }
        out
    }

    pub(crate) fn type_handle(self: &Arc<Self>, id: TypeId) -> TypeHandle {
        TypeHandle {
            model: Arc::clone(self),
            id,
        }
    }

    pub(crate) fn term_handle(self: &Arc<Self>, id: TermId) -> TermHandle {
        TermHandle {
            model: Arc::clone(self),
            id,
        }
    }

    pub(crate) fn container_handle(self: &Arc<Self>, id: ContainerId) -> ContainerHandle {
        ContainerHandle {
            model: Arc::clone(self),
            id,
        }
    }

    pub(crate) fn operation_handle(self: &Arc<Self>, id: OperationId) -> OperationHandle {
        OperationHandle {
            model: Arc::clone(self),
            id,
        }
    }
}

// =============================================================================
// Name Resolution
// =============================================================================

impl Model {
    /// Resolve a type name: primitives first, then local declarations, then
    /// referenced models in registration order.
    pub(crate) fn resolve_type_name(self: &Arc<Self>, name: &str) -> Option<StoredTypeRef> {
        if let Some(primitive) = PrimitiveKind::from_name(name) {
            return Some(StoredTypeRef::Primitive(primitive));
        }
        match self.types_by_full.get(name) {
            Lookup::Found(id) => return Some(StoredTypeRef::Local(id)),
            Lookup::Ambiguous(a) => return Some(ambiguous_type_ref(&a)),
            Lookup::Missing => {}
        }
        for referenced in &self.references {
            match referenced.types_by_full.get(name) {
                Lookup::Found(id) => {
                    return Some(StoredTypeRef::External(Arc::clone(referenced), id))
                }
                Lookup::Ambiguous(a) => return Some(ambiguous_type_ref(&a)),
                Lookup::Missing => {}
            }
        }
        None
    }

    fn unresolved_type_ref(
        &self,
        name: &str,
        location: &Location,
        code: ErrorCode,
    ) -> StoredTypeRef {
        StoredTypeRef::Bad(Arc::new(BadElement::new(
            name,
            location.clone(),
            self.unresolved_error(name, location, code),
        )))
    }

    /// The error reported for a name that resolved nowhere, with a fuzzy
    /// closest-match hint when a declared name comes close.
    pub(crate) fn unresolved_error(
        &self,
        name: &str,
        location: &Location,
        code: ErrorCode,
    ) -> StructuralError {
        let noun = match code {
            ErrorCode::UnresolvedBaseType => "base type",
            ErrorCode::UnresolvedNavigationTarget => "navigation target type",
            ErrorCode::UnresolvedEntitySetType => "entity set element type",
            _ => "type",
        };
        let mut message = format!("The {} '{}' could not be found", noun, name);
        if let Some(suggestion) = self.closest_type_name(name) {
            message.push_str(&format!(" (closest match: '{}')", suggestion));
        }
        StructuralError::new(location.clone(), code, message)
    }

    /// Best fuzzy match among declared type names, local and referenced.
    /// Ties break lexicographically so cached messages are deterministic.
    fn closest_type_name(&self, missing: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default();
        let mut best: Option<(i64, &str)> = None;
        let candidates = self
            .types_by_full
            .names()
            .chain(self.references.iter().flat_map(|r| r.types_by_full.names()));
        for name in candidates {
            if let Some(score) = matcher.fuzzy_match(name, missing) {
                let better = match &best {
                    None => true,
                    Some((s, n)) => score > *s || (score == *s && name < *n),
                };
                if better {
                    best = Some((score, name));
                }
            }
        }
        best.map(|(_, name)| name.to_string())
    }

    pub(crate) fn export_type_ref(self: &Arc<Self>, stored: &StoredTypeRef) -> TypeRef {
        match stored {
            StoredTypeRef::Primitive(kind) => TypeRef::Primitive(*kind),
            StoredTypeRef::Local(id) => TypeRef::Declared(self.type_handle(*id)),
            StoredTypeRef::External(model, id) => TypeRef::Declared(model.type_handle(*id)),
            StoredTypeRef::Bad(bad) => TypeRef::Bad(Arc::clone(bad)),
        }
    }

    pub(crate) fn export_member(self: &Arc<Self>, member: &StoredMember) -> Member {
        let model = member.model.clone().unwrap_or_else(|| Arc::clone(self));
        let ty = TypeHandle {
            model,
            id: member.ty,
        };
        match member.kind {
            MemberKind::Property => Member::Property(PropertyHandle {
                ty,
                index: member.index,
            }),
            MemberKind::Navigation => Member::Navigation(NavigationHandle {
                ty,
                index: member.index,
            }),
        }
    }
}

fn ambiguous_type_ref(ambiguity: &Ambiguity<TypeId>) -> StoredTypeRef {
    StoredTypeRef::Bad(Arc::new(BadElement::new(
        ambiguity.name(),
        ambiguity.location().clone(),
        ambiguity.error().clone(),
    )))
}

// =============================================================================
// Computed Properties
// =============================================================================

impl Model {
    /// Namespace-qualified name of a type, memoized.
    pub fn full_type_name(&self, id: TypeId) -> Arc<str> {
        let ty = self.type_at(id);
        ty.full_name
            .get_or_compute(|| format!("{}.{}", ty.namespace, ty.name).into())
    }

    /// Resolved base type of `id`; `None` when no base is declared. A cyclic
    /// base chain resolves every participant to [`TypeRef::Bad`].
    pub fn base_type(self: &Arc<Self>, id: TypeId) -> Option<TypeRef> {
        self.stored_base(id)
            .map(|stored| self.export_type_ref(&stored))
    }

    pub(crate) fn stored_base(self: &Arc<Self>, id: TypeId) -> Option<StoredTypeRef> {
        let ty = self.type_at(id);
        ty.base.get_or_compute_cyclic(
            &self.base_group,
            || self.compute_base(id),
            || Some(self.cyclic_base(id)),
        )
    }

    fn compute_base(self: &Arc<Self>, id: TypeId) -> Option<StoredTypeRef> {
        let ty = self.type_at(id);
        let base_name = ty.base_type_name.as_deref()?;
        let resolved = match self.resolve_type_name(base_name) {
            Some(resolved) => resolved,
            None => {
                self.unresolved_type_ref(base_name, &ty.location, ErrorCode::UnresolvedBaseType)
            }
        };
        // Forcing the base's own base is what routes cycle detection through
        // the shared group.
        match &resolved {
            StoredTypeRef::Local(base) => {
                let _ = self.stored_base(*base);
            }
            StoredTypeRef::External(model, base) => {
                let _ = model.stored_base(*base);
            }
            _ => {}
        }
        Some(resolved)
    }

    fn cyclic_base(&self, id: TypeId) -> StoredTypeRef {
        let ty = self.type_at(id);
        let name = ty.base_type_name.clone().unwrap_or_else(|| ty.name.clone());
        let message = format!(
            "The type '{}.{}' is invalid because its base type chain is cyclic",
            ty.namespace, ty.name
        );
        StoredTypeRef::Bad(Arc::new(BadElement::new(
            name,
            ty.location.clone(),
            StructuralError::new(ty.location.clone(), ErrorCode::CyclicBaseType, message),
        )))
    }

    /// Effective key of `id`: declared on the type, else inherited from the
    /// base chain. Empty when no key is declared anywhere.
    pub fn key(self: &Arc<Self>, id: TypeId) -> Arc<[Arc<str>]> {
        let ty = self.type_at(id);
        ty.key.get_or_compute_cyclic(
            &self.key_group,
            || self.compute_key(id),
            || Vec::new().into(),
        )
    }

    fn compute_key(self: &Arc<Self>, id: TypeId) -> Arc<[Arc<str>]> {
        let ty = self.type_at(id);
        if let Some(declared) = &ty.declared_key {
            return declared.iter().map(|n| Arc::from(n.as_str())).collect();
        }
        match self.stored_base(id) {
            Some(StoredTypeRef::Local(base)) => self.key(base),
            Some(StoredTypeRef::External(model, base)) => model.key(base),
            _ => Vec::new().into(),
        }
    }

    /// Member table of `id`: own and inherited members. A cyclic base chain
    /// degrades to own members only.
    pub(crate) fn members_table(self: &Arc<Self>, id: TypeId) -> Arc<BindingTable<StoredMember>> {
        let ty = self.type_at(id);
        ty.members.get_or_compute_cyclic(
            &self.member_group,
            || Arc::new(self.compute_members(id)),
            || Arc::new(self.own_members(id)),
        )
    }

    /// Resolve a member name among `id`'s own and inherited members.
    pub fn find_member(self: &Arc<Self>, id: TypeId, name: &str) -> Lookup<Member> {
        match self.members_table(id).get(name) {
            Lookup::Found(member) => Lookup::Found(self.export_member(&member)),
            Lookup::Ambiguous(a) => {
                Lookup::Ambiguous(Arc::new(a.map(|m| self.export_member(m))))
            }
            Lookup::Missing => Lookup::Missing,
        }
    }

    fn own_members(&self, id: TypeId) -> BindingTable<StoredMember> {
        let mut table = BindingTable::new();
        self.add_own_members(id, &mut table);
        table
    }

    fn compute_members(self: &Arc<Self>, id: TypeId) -> BindingTable<StoredMember> {
        // Inherited members first, rebased into this model's context, then
        // own declarations on top.
        let mut table = match self.stored_base(id) {
            Some(StoredTypeRef::Local(base)) => (*self.members_table(base)).clone(),
            Some(StoredTypeRef::External(model, base)) => {
                let inherited = model.members_table(base);
                inherited.map(|member| member.rebased(&model))
            }
            _ => BindingTable::new(),
        };
        self.add_own_members(id, &mut table);
        table
    }

    fn add_own_members(&self, id: TypeId, table: &mut BindingTable<StoredMember>) {
        let ty = self.type_at(id);
        for (index, property) in ty.properties.iter().enumerate() {
            table.add(
                property.name.clone(),
                StoredMember::local(id, MemberKind::Property, index as u32),
                &property.location,
            );
        }
        for (index, navigation) in ty.navigations.iter().enumerate() {
            table.add(
                navigation.name.clone(),
                StoredMember::local(id, MemberKind::Navigation, index as u32),
                &navigation.location,
            );
        }
    }

    /// Resolved type of a structural property, memoized per property.
    pub(crate) fn property_type(self: &Arc<Self>, ty: TypeId, index: u32) -> TypeRef {
        let property = self.type_at(ty).property(index);
        let stored = property.resolved.get_or_compute(|| {
            match self.resolve_type_name(&property.type_name) {
                Some(resolved) => resolved,
                None => self.unresolved_type_ref(
                    &property.type_name,
                    &property.location,
                    ErrorCode::UnresolvedType,
                ),
            }
        });
        self.export_type_ref(&stored)
    }

    /// Resolved target of a navigation property, memoized per property.
    pub(crate) fn navigation_target(self: &Arc<Self>, ty: TypeId, index: u32) -> TypeRef {
        let navigation = self.type_at(ty).navigation(index);
        let stored = navigation.target.get_or_compute(|| {
            match self.resolve_type_name(&navigation.target_name) {
                Some(resolved) => resolved,
                None => self.unresolved_type_ref(
                    &navigation.target_name,
                    &navigation.location,
                    ErrorCode::UnresolvedNavigationTarget,
                ),
            }
        });
        self.export_type_ref(&stored)
    }

    /// Resolved element type of an entity set, memoized per set.
    pub(crate) fn entity_set_type(self: &Arc<Self>, container: ContainerId, index: u32) -> TypeRef {
        let set = self.container_at(container).set(index);
        let stored = set.element_type.get_or_compute(|| {
            match self.resolve_type_name(&set.element_type_name) {
                Some(resolved) => resolved,
                None => self.unresolved_type_ref(
                    &set.element_type_name,
                    &set.location,
                    ErrorCode::UnresolvedEntitySetType,
                ),
            }
        });
        self.export_type_ref(&stored)
    }

    /// Set-name table of a container, built on first lookup.
    pub(crate) fn set_table(self: &Arc<Self>, id: ContainerId) -> Arc<BindingTable<u32>> {
        let container = self.container_at(id);
        container.set_table.get_or_compute(|| {
            let mut table = BindingTable::new();
            for (index, set) in container.sets.iter().enumerate() {
                table.add(set.name.clone(), index as u32, &set.location);
            }
            Arc::new(table)
        })
    }

    pub(crate) fn find_entity_set_in(
        self: &Arc<Self>,
        id: ContainerId,
        name: &str,
    ) -> Lookup<EntitySetHandle> {
        match self.set_table(id).get(name) {
            Lookup::Found(index) => Lookup::Found(EntitySetHandle {
                container: self.container_handle(id),
                index,
            }),
            Lookup::Ambiguous(a) => Lookup::Ambiguous(Arc::new(a.map(|index| EntitySetHandle {
                container: self.container_handle(id),
                index: *index,
            }))),
            Lookup::Missing => Lookup::Missing,
        }
    }
}

// =============================================================================
// Search
// =============================================================================

/// A fuzzy search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub full_name: String,
    pub kind: ElementKind,
    pub score: i64,
}

impl Model {
    /// Fuzzy search over every declared name, best matches first.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        let matcher = SkimMatcherV2::default();
        let mut results = Vec::new();
        for (full_name, kind) in self.all_declared_names() {
            if let Some(score) = matcher.fuzzy_match(&full_name, query) {
                results.push(SearchResult {
                    full_name,
                    kind,
                    score,
                });
            }
        }
        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        results
    }

    fn all_declared_names(&self) -> Vec<(String, ElementKind)> {
        let mut names = Vec::new();
        for ty in &self.types {
            let kind = match ty.kind {
                TypeKind::Entity => ElementKind::EntityType,
                TypeKind::Complex => ElementKind::ComplexType,
            };
            names.push((format!("{}.{}", ty.namespace, ty.name), kind));
        }
        for term in &self.terms {
            names.push((
                format!("{}.{}", term.namespace, term.name),
                ElementKind::Term,
            ));
        }
        for container in &self.containers {
            names.push((
                format!("{}.{}", container.namespace, container.name),
                ElementKind::EntityContainer,
            ));
        }
        for operation in &self.operations {
            names.push((
                format!("{}.{}", operation.namespace, operation.name),
                ElementKind::Operation,
            ));
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> Location {
        Location::new(line, 1)
    }

    #[test]
    fn test_full_name_is_memoized() {
        let mut b = ModelBuilder::new();
        let customer = b.entity_type("NS", "Customer", loc(1));
        let model = b.freeze();

        let first = model.full_type_name(customer);
        let second = model.full_type_name(customer);
        assert_eq!(first.as_ref(), "NS.Customer");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_base_resolution() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        let customer = b.entity_type("NS", "Customer", loc(2));
        b.set_base_type(customer, "NS.Person");
        let model = b.freeze();

        assert!(model.base_type(person).is_none());
        let base = model.base_type(customer).unwrap();
        let handle = base.declared().unwrap();
        assert_eq!(handle.full_name().as_ref(), "NS.Person");
        assert_eq!(handle.id(), person);
    }

    #[test]
    fn test_base_cycle_poisons_both_participants() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "A", loc(1));
        let c = b.entity_type("NS", "B", loc(2));
        b.set_base_type(a, "NS.B");
        b.set_base_type(c, "NS.A");
        let model = b.freeze();

        let base_a = model.base_type(a).unwrap();
        assert!(base_a.is_bad());
        assert_eq!(base_a.errors()[0].code, ErrorCode::CyclicBaseType);
        assert!(base_a.errors()[0].is_interface_critical());

        // The other participant was resolved by the same walk.
        let base_b = model.base_type(c).unwrap();
        assert!(base_b.is_bad());
        assert_eq!(base_b.errors()[0].code, ErrorCode::CyclicBaseType);
    }

    #[test]
    fn test_unresolved_base_is_poisoned_not_fatal() {
        let mut b = ModelBuilder::new();
        let customer = b.entity_type("NS", "Customer", loc(1));
        b.set_base_type(customer, "NS.Nowhere");
        let model = b.freeze();

        let base = model.base_type(customer).unwrap();
        assert!(base.is_bad());
        assert_eq!(base.errors()[0].code, ErrorCode::UnresolvedBaseType);
        assert!(!base.errors()[0].is_interface_critical());
    }

    #[test]
    fn test_key_is_inherited() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        b.declare_key(person, ["Id"]);
        let customer = b.entity_type("NS", "Customer", loc(3));
        b.set_base_type(customer, "NS.Person");
        let model = b.freeze();

        let key = model.key(customer);
        assert_eq!(key.len(), 1);
        assert_eq!(key[0].as_ref(), "Id");
    }

    #[test]
    fn test_key_of_cyclic_type_is_empty() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "A", loc(1));
        let c = b.entity_type("NS", "B", loc(2));
        b.set_base_type(a, "NS.B");
        b.set_base_type(c, "NS.A");
        b.declare_key(c, ["Id"]);
        let model = b.freeze();

        // A has no declared key and its base chain is poisoned, so nothing
        // is inherited.
        assert!(model.key(a).is_empty());
        // B's own declaration still stands.
        assert_eq!(model.key(c).len(), 1);
    }

    #[test]
    fn test_member_lookup_includes_inherited() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        let customer = b.entity_type("NS", "Customer", loc(3));
        b.set_base_type(customer, "NS.Person");
        b.property(customer, "Email", "Edm.String", loc(4));
        let model = b.freeze();

        let inherited = match model.find_member(customer, "Id") {
            Lookup::Found(member) => member,
            other => panic!("expected found, got {:?}", other),
        };
        assert_eq!(
            inherited.declaring_type().full_name().as_ref(),
            "NS.Person"
        );

        let own = match model.find_member(customer, "Email") {
            Lookup::Found(member) => member,
            other => panic!("expected found, got {:?}", other),
        };
        assert_eq!(own.declaring_type().full_name().as_ref(), "NS.Customer");

        assert!(model.find_member(customer, "Missing").is_missing());
    }

    #[test]
    fn test_member_shadowing_is_ambiguous() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        let customer = b.entity_type("NS", "Customer", loc(3));
        b.set_base_type(customer, "NS.Person");
        b.property(customer, "Id", "Edm.Guid", loc(4));
        let model = b.freeze();

        match model.find_member(customer, "Id") {
            Lookup::Ambiguous(a) => {
                assert_eq!(a.candidates().len(), 2);
                assert_eq!(a.error().code, ErrorCode::AmbiguousBinding);
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_member_table_of_cyclic_type_degrades_to_own() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "A", loc(1));
        let c = b.entity_type("NS", "B", loc(2));
        b.set_base_type(a, "NS.B");
        b.set_base_type(c, "NS.A");
        b.property(a, "OwnOfA", "Edm.String", loc(3));
        b.property(c, "OwnOfB", "Edm.String", loc(4));
        let model = b.freeze();

        // Force the poison first so member computation sees the bad base.
        let _ = model.base_type(a);
        assert!(matches!(
            model.find_member(a, "OwnOfA"),
            Lookup::Found(Member::Property(_))
        ));
        assert!(model.find_member(a, "OwnOfB").is_missing());
    }

    #[test]
    fn test_primitives_resolve_before_declarations() {
        let mut b = ModelBuilder::new();
        // A declaration trying to occupy a primitive name never wins.
        let _imposter = b.complex_type("Edm", "String", loc(1));
        let order = b.entity_type("NS", "Order", loc(2));
        b.property(order, "Note", "Edm.String", loc(3));
        let model = b.freeze();

        let handle = model.find_type("NS.Order").found().unwrap();
        let note = handle.properties().next().unwrap();
        assert_eq!(
            note.property_type(),
            TypeRef::Primitive(PrimitiveKind::String)
        );
    }

    #[test]
    fn test_unresolved_property_type_gets_suggestion() {
        let mut b = ModelBuilder::new();
        let customer = b.entity_type("NS", "Customer", loc(1));
        let order = b.entity_type("NS", "Order", loc(2));
        b.property(order, "Buyer", "NS.Custmer", loc(3));
        let _ = customer;
        let model = b.freeze();

        let handle = model.find_type("NS.Order").found().unwrap();
        let buyer = handle.properties().next().unwrap();
        let resolved = buyer.property_type();
        assert!(resolved.is_bad());
        let error = &resolved.errors()[0];
        assert_eq!(error.code, ErrorCode::UnresolvedType);
        assert!(
            error.message.contains("NS.Customer"),
            "expected a closest-match hint, got: {}",
            error.message
        );
    }

    #[test]
    fn test_ambiguous_container_answers_neutrally() {
        let mut b = ModelBuilder::new();
        let first = b.container("First", "Main", loc(1));
        let second = b.container("Second", "Main", loc(2));
        b.entity_set(first, "Customers", "NS.Customer", loc(3));
        b.entity_set(second, "Orders", "NS.Order", loc(4));
        let model = b.freeze();

        match model.find_container("Main") {
            ContainerLookup::Ambiguous(merged) => {
                assert_eq!(merged.namespace(), "First");
                assert_eq!(merged.candidates().len(), 2);
                assert!(merged.find_entity_set("Customers").is_missing());
                assert!(!merged.error().is_interface_critical());
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }

        // Qualified lookup still reaches each candidate.
        assert!(model.find_container("First.Main").found().is_some());
        assert!(model.find_container("Second.Main").found().is_some());
    }

    #[test]
    fn test_derived_type_enumeration_terminates_on_cycles() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "A", loc(1));
        let c = b.entity_type("NS", "B", loc(2));
        b.set_base_type(a, "NS.B");
        b.set_base_type(c, "NS.A");
        let model = b.freeze();

        let handle_a = model.type_handle(a);
        let direct = model.find_directly_derived_types(&handle_a);
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].name(), "B");

        let all = model.find_all_derived_types(&handle_a);
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_cross_model_resolution() {
        let mut base = ModelBuilder::new();
        let person = base.entity_type("Core", "Person", loc(1));
        base.property(person, "Id", "Edm.Int32", loc(2));
        base.declare_key(person, ["Id"]);
        let core = base.freeze();

        let mut b = ModelBuilder::new();
        let customer = b.entity_type("App", "Customer", loc(1));
        b.set_base_type(customer, "Core.Person");
        b.add_reference(Arc::clone(&core));
        let model = b.freeze();

        let resolved = model.base_type(customer).unwrap();
        let handle = resolved.declared().unwrap();
        assert_eq!(handle.full_name().as_ref(), "Core.Person");
        assert!(Arc::ptr_eq(handle.model(), &core));

        // Key and members flow across the reference.
        assert_eq!(model.key(customer).len(), 1);
        let inherited = match model.find_member(customer, "Id") {
            Lookup::Found(member) => member,
            other => panic!("expected found, got {:?}", other),
        };
        assert!(Arc::ptr_eq(inherited.declaring_type().model(), &core));
    }

    #[test]
    fn test_concurrent_readers_share_one_resolution() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        let customer = b.entity_type("NS", "Customer", loc(2));
        b.set_base_type(customer, "NS.Person");
        let model = b.freeze();
        let _ = person;

        std::thread::scope(|s| {
            for _ in 0..4 {
                let model = Arc::clone(&model);
                s.spawn(move || {
                    let base = model.base_type(customer).unwrap();
                    assert_eq!(
                        base.declared().unwrap().full_name().as_ref(),
                        "NS.Person"
                    );
                });
            }
        });
    }

    #[test]
    fn test_search_finds_declared_names() {
        let mut b = ModelBuilder::new();
        b.entity_type("NS", "Customer", loc(1));
        b.entity_type("NS", "CustomerGroup", loc(2));
        b.container("NS", "Main", loc(3));
        let model = b.freeze();

        let results = model.search("Customer");
        assert!(results.len() >= 2);
        assert!(results.iter().any(|r| r.full_name == "NS.Customer"));
        assert!(results
            .iter()
            .all(|r| r.kind != ElementKind::EntityContainer));
    }
}
