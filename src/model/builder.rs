//! Model construction
//!
//! The builder is the single-threaded construction phase: declarations go in,
//! [`freeze`](ModelBuilder::freeze) builds the name tables and indexes, and
//! the result is an immutable [`Model`] behind an `Arc`. Nothing is validated
//! here; malformed input freezes fine and is reported by `Model::validate`.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::binding::BindingTable;
use crate::cache::CycleGroup;
use crate::diag::Location;

use super::container::{EntityContainer, EntitySet};
use super::element::{ContainerId, OperationId, TermId, TypeId};
use super::operation::{Operation, Parameter, ValueTerm};
use super::types::{NavigationProperty, Property, StructuredType, TypeKind};
use super::Model;

/// Collects declarations and freezes them into an immutable [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    types: Vec<StructuredType>,
    terms: Vec<ValueTerm>,
    containers: Vec<EntityContainer>,
    operations: Vec<Operation>,
    references: Vec<Arc<Model>>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity type. The returned id is stable across the freeze.
    pub fn entity_type(&mut self, namespace: &str, name: &str, location: Location) -> TypeId {
        self.push_type(namespace, name, TypeKind::Entity, location)
    }

    /// Declare a complex type. The returned id is stable across the freeze.
    pub fn complex_type(&mut self, namespace: &str, name: &str, location: Location) -> TypeId {
        self.push_type(namespace, name, TypeKind::Complex, location)
    }

    fn push_type(
        &mut self,
        namespace: &str,
        name: &str,
        kind: TypeKind,
        location: Location,
    ) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(StructuredType::new(
            namespace.to_string(),
            name.to_string(),
            kind,
            location,
        ));
        id
    }

    /// Declare `ty`'s base type by qualified name. The name is resolved
    /// lazily after the freeze.
    pub fn set_base_type(&mut self, ty: TypeId, base_full_name: &str) {
        self.types[ty.0 as usize].base_type_name = Some(base_full_name.to_string());
    }

    pub fn set_abstract(&mut self, ty: TypeId, is_abstract: bool) {
        self.types[ty.0 as usize].is_abstract = is_abstract;
    }

    /// Declare the key property names of an entity type.
    pub fn declare_key<I, S>(&mut self, ty: TypeId, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types[ty.0 as usize].declared_key =
            Some(names.into_iter().map(Into::into).collect());
    }

    pub fn property(&mut self, ty: TypeId, name: &str, type_name: &str, location: Location) {
        self.types[ty.0 as usize].properties.push(Property::new(
            name.to_string(),
            type_name.to_string(),
            location,
        ));
    }

    pub fn navigation(
        &mut self,
        ty: TypeId,
        name: &str,
        target_name: &str,
        contains_target: bool,
        location: Location,
    ) {
        self.types[ty.0 as usize]
            .navigations
            .push(NavigationProperty::new(
                name.to_string(),
                target_name.to_string(),
                contains_target,
                location,
            ));
    }

    pub fn container(&mut self, namespace: &str, name: &str, location: Location) -> ContainerId {
        let id = ContainerId(self.containers.len() as u32);
        self.containers.push(EntityContainer::new(
            namespace.to_string(),
            name.to_string(),
            location,
        ));
        id
    }

    pub fn entity_set(
        &mut self,
        container: ContainerId,
        name: &str,
        element_type_name: &str,
        location: Location,
    ) {
        self.containers[container.0 as usize].sets.push(EntitySet::new(
            name.to_string(),
            element_type_name.to_string(),
            location,
        ));
    }

    pub fn operation(
        &mut self,
        namespace: &str,
        name: &str,
        is_bound: bool,
        location: Location,
    ) -> OperationId {
        let id = OperationId(self.operations.len() as u32);
        self.operations.push(Operation::new(
            namespace.to_string(),
            name.to_string(),
            is_bound,
            location,
        ));
        id
    }

    pub fn parameter(
        &mut self,
        operation: OperationId,
        name: &str,
        type_name: &str,
        location: Location,
    ) {
        self.operations[operation.0 as usize].parameters.push(Parameter::new(
            name.to_string(),
            type_name.to_string(),
            location,
        ));
    }

    pub fn set_return_type(&mut self, operation: OperationId, type_name: &str) {
        self.operations[operation.0 as usize].return_type_name = Some(type_name.to_string());
    }

    pub fn term(
        &mut self,
        namespace: &str,
        name: &str,
        type_name: &str,
        location: Location,
    ) -> TermId {
        let id = TermId(self.terms.len() as u32);
        self.terms.push(ValueTerm::new(
            namespace.to_string(),
            name.to_string(),
            type_name.to_string(),
            location,
        ));
        id
    }

    /// Register a model whose declarations this one may reference.
    ///
    /// References only point at already frozen models, so the reference
    /// graph is acyclic by construction.
    pub fn add_reference(&mut self, model: Arc<Model>) {
        self.references.push(model);
    }

    /// Freeze the declarations into an immutable, shareable model.
    pub fn freeze(self) -> Arc<Model> {
        let mut types_by_full = BindingTable::new();
        let mut derived_index: HashMap<String, Vec<TypeId>> = HashMap::new();
        for (index, ty) in self.types.iter().enumerate() {
            let id = TypeId(index as u32);
            types_by_full.add(format!("{}.{}", ty.namespace, ty.name), id, &ty.location);
            if let Some(base) = &ty.base_type_name {
                derived_index.entry(base.clone()).or_default().push(id);
            }
        }

        let mut terms_by_full = BindingTable::new();
        for (index, term) in self.terms.iter().enumerate() {
            terms_by_full.add(
                format!("{}.{}", term.namespace, term.name),
                TermId(index as u32),
                &term.location,
            );
        }

        let mut containers_by_full = BindingTable::new();
        let mut containers_by_simple = BindingTable::new();
        for (index, container) in self.containers.iter().enumerate() {
            let id = ContainerId(index as u32);
            containers_by_full.add(
                format!("{}.{}", container.namespace, container.name),
                id,
                &container.location,
            );
            containers_by_simple.add(container.name.clone(), id, &container.location);
        }

        let mut operations_by_full: HashMap<String, Vec<OperationId>> = HashMap::new();
        for (index, operation) in self.operations.iter().enumerate() {
            operations_by_full
                .entry(format!("{}.{}", operation.namespace, operation.name))
                .or_default()
                .push(OperationId(index as u32));
        }

        debug!(
            types = self.types.len(),
            terms = self.terms.len(),
            containers = self.containers.len(),
            operations = self.operations.len(),
            references = self.references.len(),
            "model frozen"
        );

        Arc::new(Model {
            types: self.types,
            terms: self.terms,
            containers: self.containers,
            operations: self.operations,
            types_by_full,
            terms_by_full,
            containers_by_full,
            containers_by_simple,
            operations_by_full,
            derived_index,
            references: self.references,
            base_group: CycleGroup::new(),
            key_group: CycleGroup::new(),
            member_group: CycleGroup::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze_keeps_declaration_ids() {
        let mut b = ModelBuilder::new();
        let first = b.entity_type("NS", "First", Location::new(1, 1));
        let second = b.complex_type("NS", "Second", Location::new(2, 1));
        b.property(second, "Name", "Edm.String", Location::new(3, 1));
        let model = b.freeze();

        assert_eq!(model.type_count(), 2);
        assert_eq!(model.type_at(first).name(), "First");
        assert_eq!(model.type_at(second).name(), "Second");
        assert_eq!(model.type_at(second).property_count(), 1);
    }
}
