//! Per-element structural rules
//!
//! Schema-scope name rules, per-type member and key rules, container and
//! operation rules. Each rule reports into the shared context and moves on;
//! poisoned inputs skip the rules that depend on them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::binding::Lookup;
use crate::diag::{ErrorCode, Location};
use crate::model::{
    ContainerId, MemberIdentity, MemberKind, Model, OperationId, StoredTypeRef, TypeHandle,
    TypeId, TypeKind, TypeRef,
};

use super::helpers;
use super::ValidationContext;

// =============================================================================
// Name Syntax
// =============================================================================

fn check_element_name(
    name: &str,
    kind_noun: &str,
    location: &Location,
    ctx: &mut ValidationContext<'_>,
) {
    if name.is_empty() {
        ctx.error(
            location.clone(),
            ErrorCode::EmptyElementName,
            format!("A {} must have a name", kind_noun),
        );
    } else if !helpers::identifier_is_valid(name) {
        ctx.error(
            location.clone(),
            ErrorCode::InvalidName,
            format!("The name '{}' is not a valid identifier", name),
        );
    }
}

fn check_namespace_name(namespace: &str, location: &Location, ctx: &mut ValidationContext<'_>) {
    if namespace.is_empty() {
        ctx.error(
            location.clone(),
            ErrorCode::EmptyElementName,
            "A schema element must have a namespace",
        );
    } else if !namespace.split('.').all(helpers::identifier_is_valid) {
        ctx.error(
            location.clone(),
            ErrorCode::InvalidName,
            format!("The namespace '{}' is not valid", namespace),
        );
    }
}

// =============================================================================
// Schema Scope
// =============================================================================

/// Name rules and collisions among schema-level declarations.
///
/// Types, terms, and containers share one name space and collide by
/// qualified name. Operations overload: they collide with non-operations by
/// name, with each other only under signature equivalence.
pub(crate) fn check_schema_scope(model: &Arc<Model>, ctx: &mut ValidationContext<'_>) {
    let mut non_operation_names: HashSet<String> = HashSet::new();

    for ty in &model.types {
        check_namespace_name(ty.namespace(), ty.location(), ctx);
        check_element_name(ty.name(), ty.kind().as_str(), ty.location(), ctx);
        let full = format!("{}.{}", ty.namespace(), ty.name());
        helpers::add_member_name_to_set(
            &full,
            ty.location(),
            &mut non_operation_names,
            ctx,
            ErrorCode::DuplicateSchemaElement,
            format!("The schema element '{}' is declared more than once", full),
        );
    }
    for term in &model.terms {
        check_namespace_name(term.namespace(), term.location(), ctx);
        check_element_name(term.name(), "term", term.location(), ctx);
        let full = format!("{}.{}", term.namespace(), term.name());
        helpers::add_member_name_to_set(
            &full,
            term.location(),
            &mut non_operation_names,
            ctx,
            ErrorCode::DuplicateSchemaElement,
            format!("The schema element '{}' is declared more than once", full),
        );
    }
    for container in &model.containers {
        check_namespace_name(container.namespace(), container.location(), ctx);
        check_element_name(container.name(), "entity container", container.location(), ctx);
        let full = format!("{}.{}", container.namespace(), container.name());
        helpers::add_member_name_to_set(
            &full,
            container.location(),
            &mut non_operation_names,
            ctx,
            ErrorCode::DuplicateSchemaElement,
            format!("The schema element '{}' is declared more than once", full),
        );
    }

    let mut operation_groups: HashMap<String, Vec<OperationId>> = HashMap::new();
    for (index, operation) in model.operations.iter().enumerate() {
        check_namespace_name(operation.namespace(), operation.location(), ctx);
        check_element_name(operation.name(), "operation", operation.location(), ctx);
        let full = format!("{}.{}", operation.namespace(), operation.name());
        if non_operation_names.contains(&full) {
            ctx.error(
                operation.location().clone(),
                ErrorCode::DuplicateSchemaElement,
                format!("The name '{}' is already used by another schema element", full),
            );
            continue;
        }
        let group = operation_groups.entry(full.clone()).or_default();
        if group
            .iter()
            .any(|prev| model.operation_at(*prev).signature_matches(operation))
        {
            ctx.error(
                operation.location().clone(),
                ErrorCode::DuplicateOperation,
                format!(
                    "The operation '{}' is declared more than once with an identical signature",
                    full
                ),
            );
        }
        group.push(OperationId(index as u32));
    }

    // Collisions the binding tables recorded for the same names.
    for ambiguity in model.types_by_full.ambiguities() {
        ctx.push(ambiguity.error().clone());
    }
    for ambiguity in model.terms_by_full.ambiguities() {
        ctx.push(ambiguity.error().clone());
    }
    for ambiguity in model.containers_by_full.ambiguities() {
        ctx.push(ambiguity.error().clone());
    }
    // Simple-name container collisions matter only across namespaces; the
    // same-namespace case is the qualified collision again.
    for ambiguity in model.containers_by_simple.ambiguities() {
        let mut namespaces = ambiguity
            .candidates()
            .iter()
            .map(|id| model.container_at(*id).namespace());
        let first = namespaces.next();
        if namespaces.any(|ns| Some(ns) != first) {
            ctx.push(ambiguity.error().clone());
        }
    }
}

// =============================================================================
// Structured Types
// =============================================================================

pub(crate) fn check_types(model: &Arc<Model>, ctx: &mut ValidationContext<'_>) {
    for index in 0..model.types.len() as u32 {
        check_structured_type(model, TypeId(index), ctx);
    }
}

fn check_structured_type(model: &Arc<Model>, id: TypeId, ctx: &mut ValidationContext<'_>) {
    let ty = model.type_at(id);
    let handle = model.type_handle(id);
    let full = model.full_type_name(id);

    for property in &ty.properties {
        check_element_name(property.name(), "property", property.location(), ctx);
    }
    for navigation in &ty.navigations {
        check_element_name(
            navigation.name(),
            "navigation property",
            navigation.location(),
            ctx,
        );
    }

    let mut base_poisoned = false;
    let mut healthy_base: Option<TypeHandle> = None;
    match model.base_type(id) {
        None => {}
        Some(TypeRef::Bad(bad)) => {
            base_poisoned = true;
            for error in bad.errors() {
                ctx.push(error.clone());
            }
        }
        Some(TypeRef::Declared(base)) => {
            if base.kind() != ty.kind() {
                ctx.error(
                    ty.location().clone(),
                    ErrorCode::BaseTypeKindMismatch,
                    format!(
                        "The {} '{}' cannot derive from the {} '{}'",
                        ty.kind(),
                        full,
                        base.kind(),
                        base.full_name()
                    ),
                );
            }
            healthy_base = Some(base);
        }
        Some(TypeRef::Primitive(primitive)) => {
            ctx.error(
                ty.location().clone(),
                ErrorCode::BaseTypeKindMismatch,
                format!(
                    "The type '{}' cannot derive from the primitive type '{}'",
                    full, primitive
                ),
            );
        }
    }

    check_member_duplicates(&handle, ctx);

    // Collisions the member table recorded, own against own or inherited.
    for ambiguity in model.members_table(id).ambiguities() {
        ctx.push(ambiguity.error().clone());
    }

    for property in handle.properties() {
        match property.property_type() {
            TypeRef::Bad(bad) => {
                for error in bad.errors() {
                    ctx.push(error.clone());
                }
            }
            TypeRef::Declared(target) if target.kind() == TypeKind::Entity => {
                ctx.error(
                    property.location().clone(),
                    ErrorCode::InvalidPropertyType,
                    format!(
                        "The property '{}' cannot be of entity type '{}'; declare a navigation property instead",
                        property.name(),
                        target.full_name()
                    ),
                );
            }
            _ => {}
        }
    }

    for navigation in handle.navigations() {
        match navigation.target() {
            TypeRef::Bad(bad) => {
                for error in bad.errors() {
                    ctx.push(error.clone());
                }
            }
            TypeRef::Primitive(primitive) => {
                ctx.error(
                    navigation.location().clone(),
                    ErrorCode::NavigationTargetMustBeEntity,
                    format!(
                        "The navigation property '{}' cannot target the primitive type '{}'",
                        navigation.name(),
                        primitive
                    ),
                );
            }
            TypeRef::Declared(target) => {
                if target.kind() != TypeKind::Entity {
                    ctx.error(
                        navigation.location().clone(),
                        ErrorCode::NavigationTargetMustBeEntity,
                        format!(
                            "The navigation property '{}' must target an entity type, not '{}'",
                            navigation.name(),
                            target.full_name()
                        ),
                    );
                } else if navigation.contains_target() {
                    let mut visited = HashSet::new();
                    if helpers::type_indirectly_contains_target(
                        model,
                        &target,
                        &handle,
                        &mut visited,
                    ) {
                        ctx.error(
                            navigation.location().clone(),
                            ErrorCode::ContainmentCycle,
                            format!(
                                "The containment navigation property '{}' on '{}' closes a containment cycle",
                                navigation.name(),
                                full
                            ),
                        );
                    }
                }
            }
        }
    }

    if ty.kind() == TypeKind::Entity {
        check_entity_key(model, id, base_poisoned, healthy_base.as_ref(), ctx);
    }
}

/// Member duplicates along the inheritance chain, root-most occurrences
/// first. A base type's internal collisions are its own report, so they are
/// suppressed here and only seed the set.
fn check_member_duplicates(handle: &TypeHandle, ctx: &mut ValidationContext<'_>) {
    let full = handle.full_name();
    let mut seen = HashSet::new();
    for link in helpers::inheritance_chain_root_first(handle) {
        let inherited = link != *handle;
        let previous = ctx.suppress_duplicate_error;
        ctx.suppress_duplicate_error = previous || inherited;
        let ty = link.model().type_at(link.id());
        for property in &ty.properties {
            helpers::add_member_name_to_set(
                property.name(),
                property.location(),
                &mut seen,
                ctx,
                ErrorCode::DuplicateMember,
                format!("A member named '{}' is already defined for '{}'", property.name(), full),
            );
        }
        for navigation in &ty.navigations {
            helpers::add_member_name_to_set(
                navigation.name(),
                navigation.location(),
                &mut seen,
                ctx,
                ErrorCode::DuplicateMember,
                format!(
                    "A member named '{}' is already defined for '{}'",
                    navigation.name(),
                    full
                ),
            );
        }
        ctx.suppress_duplicate_error = previous;
    }
}

fn check_entity_key(
    model: &Arc<Model>,
    id: TypeId,
    base_poisoned: bool,
    healthy_base: Option<&TypeHandle>,
    ctx: &mut ValidationContext<'_>,
) {
    let ty = model.type_at(id);
    let full = model.full_type_name(id);
    let key = model.key(id);

    if key.is_empty() {
        // Abstract entities may defer the key; a poisoned base already
        // carries its own report.
        if !ty.is_abstract() && !base_poisoned {
            ctx.error(
                ty.location().clone(),
                ErrorCode::EntityKeyMissing,
                format!("The entity type '{}' must declare a key or inherit one", full),
            );
        }
        return;
    }

    let table = model.members_table(id);

    let property_identities: Vec<MemberIdentity> = table
        .singles()
        .filter(|(_, member)| member.kind == MemberKind::Property)
        .map(|(_, member)| member.identity(model))
        .collect();

    let mut resolved: Vec<(&Arc<str>, MemberIdentity)> = Vec::with_capacity(key.len());
    let mut unresolved = false;
    for name in key.iter() {
        match table.get(name) {
            Lookup::Found(member) => resolved.push((name, member.identity(model))),
            // The collision carries its own report.
            Lookup::Ambiguous(_) => unresolved = true,
            Lookup::Missing => {
                ctx.error(
                    ty.location().clone(),
                    ErrorCode::UnresolvedKeyProperty,
                    format!(
                        "The key of '{}' names '{}', which is not a member of the type",
                        full, name
                    ),
                );
                unresolved = true;
            }
        }
    }

    let identities: Vec<MemberIdentity> = resolved.iter().map(|(_, identity)| *identity).collect();
    if !helpers::property_set_is_subset(&identities, &property_identities) {
        for (name, identity) in &resolved {
            if !property_identities.contains(identity) {
                ctx.error(
                    ty.location().clone(),
                    ErrorCode::UnresolvedKeyProperty,
                    format!(
                        "The key of '{}' names '{}', which is not a structural property",
                        full, name
                    ),
                );
            }
        }
        unresolved = true;
    }

    if unresolved || ty.declared_key().is_none() {
        return;
    }
    if let Some(base) = healthy_base {
        let base_key = base.key();
        if base_key.is_empty() {
            return;
        }
        if let Some(base_identities) = helpers::resolve_member_identities(base, &base_key) {
            if !helpers::property_sets_equivalent(&identities, &base_identities) {
                ctx.error(
                    ty.location().clone(),
                    ErrorCode::KeyRedeclarationMismatch,
                    format!(
                        "The key declared on '{}' does not match the key of its base type '{}'",
                        full,
                        base.full_name()
                    ),
                );
            }
        }
    }
}

// =============================================================================
// Containers
// =============================================================================

pub(crate) fn check_containers(model: &Arc<Model>, ctx: &mut ValidationContext<'_>) {
    for index in 0..model.containers.len() as u32 {
        let id = ContainerId(index);
        let container = model.container_at(id);
        let full = format!("{}.{}", container.namespace(), container.name());

        let mut seen = HashSet::new();
        for set in &container.sets {
            check_element_name(set.name(), "entity set", set.location(), ctx);
            helpers::add_member_name_to_set(
                set.name(),
                set.location(),
                &mut seen,
                ctx,
                ErrorCode::DuplicateEntitySet,
                format!(
                    "The container '{}' declares more than one entity set named '{}'",
                    full,
                    set.name()
                ),
            );
        }
        for ambiguity in model.set_table(id).ambiguities() {
            ctx.push(ambiguity.error().clone());
        }

        for (set_index, set) in container.sets.iter().enumerate() {
            match model.entity_set_type(id, set_index as u32) {
                TypeRef::Bad(bad) => {
                    for error in bad.errors() {
                        ctx.push(error.clone());
                    }
                }
                TypeRef::Primitive(primitive) => {
                    ctx.error(
                        set.location().clone(),
                        ErrorCode::EntitySetTypeMustBeEntity,
                        format!(
                            "The entity set '{}' cannot hold the primitive type '{}'",
                            set.name(),
                            primitive
                        ),
                    );
                }
                TypeRef::Declared(target) => {
                    if target.kind() != TypeKind::Entity {
                        ctx.error(
                            set.location().clone(),
                            ErrorCode::EntitySetTypeMustBeEntity,
                            format!(
                                "The entity set '{}' must hold an entity type, not '{}'",
                                set.name(),
                                target.full_name()
                            ),
                        );
                    }
                }
            }
        }
    }
}

// =============================================================================
// Operations and Terms
// =============================================================================

pub(crate) fn check_operations(model: &Arc<Model>, ctx: &mut ValidationContext<'_>) {
    for operation in &model.operations {
        let full = format!("{}.{}", operation.namespace(), operation.name());
        let mut seen = HashSet::new();
        for parameter in operation.parameters() {
            check_element_name(parameter.name(), "parameter", parameter.location(), ctx);
            helpers::add_member_name_to_set(
                parameter.name(),
                parameter.location(),
                &mut seen,
                ctx,
                ErrorCode::DuplicateMember,
                format!(
                    "The operation '{}' declares more than one parameter named '{}'",
                    full,
                    parameter.name()
                ),
            );
            check_named_type(model, parameter.type_name(), parameter.location(), ctx);
        }
        if let Some(return_type) = operation.return_type_name() {
            check_named_type(model, return_type, operation.location(), ctx);
        }
    }
}

pub(crate) fn check_terms(model: &Arc<Model>, ctx: &mut ValidationContext<'_>) {
    for term in &model.terms {
        check_named_type(model, term.type_name(), term.location(), ctx);
    }
}

/// Resolve a declared type name that has no memo cell of its own and report
/// when it resolves nowhere or to a collision.
fn check_named_type(
    model: &Arc<Model>,
    name: &str,
    location: &Location,
    ctx: &mut ValidationContext<'_>,
) {
    match model.resolve_type_name(name) {
        None => ctx.push(model.unresolved_error(name, location, ErrorCode::UnresolvedType)),
        Some(StoredTypeRef::Bad(bad)) => {
            for error in bad.errors() {
                ctx.push(error.clone());
            }
        }
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::diag::{ErrorCode, Location};
    use crate::model::ModelBuilder;

    fn loc(line: u32) -> Location {
        Location::new(line, 1)
    }

    #[test]
    fn test_three_duplicates_yield_two_errors() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "Thing", loc(1));
        b.entity_type("NS", "Thing", loc(2));
        b.entity_type("NS", "Thing", loc(3));
        b.property(a, "Id", "Edm.Int32", loc(4));
        b.declare_key(a, ["Id"]);
        let model = b.freeze();

        let report = model.validate();
        let duplicates = report
            .iter()
            .filter(|e| e.code == ErrorCode::DuplicateSchemaElement)
            .count();
        assert_eq!(duplicates, 2);
        // The binding table contributes exactly one collision error on top.
        let ambiguous = report
            .iter()
            .filter(|e| e.code == ErrorCode::AmbiguousBinding)
            .count();
        assert_eq!(ambiguous, 1);
    }

    #[test]
    fn test_direct_containment_cycle_is_reported() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "A", loc(1));
        b.property(a, "Id", "Edm.Int32", loc(2));
        b.declare_key(a, ["Id"]);
        let c = b.entity_type("NS", "B", loc(3));
        b.property(c, "Id", "Edm.Int32", loc(4));
        b.declare_key(c, ["Id"]);
        b.navigation(a, "OwnsB", "NS.B", true, loc(5));
        b.navigation(c, "OwnsA", "NS.A", true, loc(6));
        let model = b.freeze();

        let report = model.validate();
        let cycles: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::ContainmentCycle)
            .collect();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].location, loc(5));
        assert_eq!(cycles[1].location, loc(6));
    }

    #[test]
    fn test_self_containment_is_a_cycle() {
        let mut b = ModelBuilder::new();
        let folder = b.entity_type("NS", "Folder", loc(1));
        b.property(folder, "Id", "Edm.Int32", loc(2));
        b.declare_key(folder, ["Id"]);
        b.navigation(folder, "Children", "NS.Folder", true, loc(3));
        let model = b.freeze();

        let report = model.validate();
        assert!(report.iter().any(|e| e.code == ErrorCode::ContainmentCycle));
    }

    #[test]
    fn test_non_containment_navigation_cycle_is_fine() {
        let mut b = ModelBuilder::new();
        let a = b.entity_type("NS", "A", loc(1));
        b.property(a, "Id", "Edm.Int32", loc(2));
        b.declare_key(a, ["Id"]);
        let c = b.entity_type("NS", "B", loc(3));
        b.property(c, "Id", "Edm.Int32", loc(4));
        b.declare_key(c, ["Id"]);
        b.navigation(a, "RelatedB", "NS.B", false, loc(5));
        b.navigation(c, "RelatedA", "NS.A", false, loc(6));
        let model = b.freeze();

        let report = model.validate();
        assert!(report.is_empty(), "unexpected errors: {:?}", report);
    }

    #[test]
    fn test_missing_key_on_concrete_entity() {
        let mut b = ModelBuilder::new();
        let keyless = b.entity_type("NS", "Keyless", loc(1));
        b.property(keyless, "Name", "Edm.String", loc(2));
        let abstract_base = b.entity_type("NS", "Base", loc(3));
        b.set_abstract(abstract_base, true);
        let model = b.freeze();

        let report = model.validate();
        let missing: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::EntityKeyMissing)
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].location, loc(1));
    }

    #[test]
    fn test_key_redeclaration_mismatch() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        b.declare_key(person, ["Id"]);
        let customer = b.entity_type("NS", "Customer", loc(3));
        b.set_base_type(customer, "NS.Person");
        b.property(customer, "Email", "Edm.String", loc(4));
        b.declare_key(customer, ["Email"]);
        let matching = b.entity_type("NS", "Employee", loc(5));
        b.set_base_type(matching, "NS.Person");
        b.declare_key(matching, ["Id"]);
        let model = b.freeze();

        let report = model.validate();
        let mismatches: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::KeyRedeclarationMismatch)
            .collect();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].location, loc(3));
    }

    #[test]
    fn test_key_naming_missing_member() {
        let mut b = ModelBuilder::new();
        let order = b.entity_type("NS", "Order", loc(1));
        b.property(order, "Id", "Edm.Int32", loc(2));
        b.declare_key(order, ["OrderId"]);
        let model = b.freeze();

        let report = model.validate();
        assert!(report
            .iter()
            .any(|e| e.code == ErrorCode::UnresolvedKeyProperty));
    }

    #[test]
    fn test_key_naming_navigation_property() {
        let mut b = ModelBuilder::new();
        let target = b.entity_type("NS", "Target", loc(1));
        b.property(target, "Id", "Edm.Int32", loc(2));
        b.declare_key(target, ["Id"]);
        let order = b.entity_type("NS", "Order", loc(3));
        b.navigation(order, "Ref", "NS.Target", false, loc(4));
        b.declare_key(order, ["Ref"]);
        let model = b.freeze();

        let report = model.validate();
        assert!(report.iter().any(
            |e| e.code == ErrorCode::UnresolvedKeyProperty
                && e.message.contains("not a structural property")
        ));
    }

    #[test]
    fn test_self_derivation_reported_once() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        b.declare_key(person, ["Id"]);
        let customer = b.entity_type("NS", "Customer", loc(3));
        b.set_base_type(customer, "NS.Customer");
        let model = b.freeze();
        let _ = customer;

        // Self-derivation: one critical cycle poison, reported once even
        // though base, key, and member computations all touch it.
        let report = model.validate();
        let cyclic: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::CyclicBaseType)
            .collect();
        assert_eq!(cyclic.len(), 1);
    }

    #[test]
    fn test_duplicate_members_and_shadowing() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        b.property(person, "Name", "Edm.String", loc(3));
        b.declare_key(person, ["Id"]);
        let customer = b.entity_type("NS", "Customer", loc(4));
        b.set_base_type(customer, "NS.Person");
        b.property(customer, "Name", "Edm.String", loc(5));
        let model = b.freeze();

        let report = model.validate();
        // The redeclared 'Name' is flagged at the derived declaration.
        let duplicates: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::DuplicateMember)
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].location, loc(5));
        // And the member table records the collision once.
        assert_eq!(
            report
                .iter()
                .filter(|e| e.code == ErrorCode::AmbiguousBinding)
                .count(),
            1
        );
    }

    #[test]
    fn test_entity_set_must_hold_entities() {
        let mut b = ModelBuilder::new();
        let address = b.complex_type("NS", "Address", loc(1));
        b.property(address, "City", "Edm.String", loc(2));
        let main = b.container("NS", "Main", loc(3));
        b.entity_set(main, "Addresses", "NS.Address", loc(4));
        b.entity_set(main, "Strings", "Edm.String", loc(5));
        b.entity_set(main, "Missing", "NS.Nowhere", loc(6));
        let model = b.freeze();

        let report = model.validate();
        assert_eq!(
            report
                .iter()
                .filter(|e| e.code == ErrorCode::EntitySetTypeMustBeEntity)
                .count(),
            2
        );
        assert!(report
            .iter()
            .any(|e| e.code == ErrorCode::UnresolvedEntitySetType));
    }

    #[test]
    fn test_property_cannot_be_entity_typed() {
        let mut b = ModelBuilder::new();
        let person = b.entity_type("NS", "Person", loc(1));
        b.property(person, "Id", "Edm.Int32", loc(2));
        b.declare_key(person, ["Id"]);
        let order = b.entity_type("NS", "Order", loc(3));
        b.property(order, "Id", "Edm.Int32", loc(4));
        b.declare_key(order, ["Id"]);
        b.property(order, "Buyer", "NS.Person", loc(5));
        let model = b.freeze();

        let report = model.validate();
        let invalid: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::InvalidPropertyType)
            .collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].location, loc(5));
    }

    #[test]
    fn test_base_kind_mismatch() {
        let mut b = ModelBuilder::new();
        let address = b.complex_type("NS", "Address", loc(1));
        let place = b.entity_type("NS", "Place", loc(2));
        b.set_base_type(place, "NS.Address");
        b.property(place, "Id", "Edm.Int32", loc(3));
        b.declare_key(place, ["Id"]);
        let model = b.freeze();
        let _ = address;

        let report = model.validate();
        assert!(report
            .iter()
            .any(|e| e.code == ErrorCode::BaseTypeKindMismatch));
    }

    #[test]
    fn test_empty_name_is_interface_critical() {
        let mut b = ModelBuilder::new();
        let nameless = b.entity_type("NS", "", loc(1));
        b.property(nameless, "Id", "Edm.Int32", loc(2));
        b.declare_key(nameless, ["Id"]);
        let model = b.freeze();

        let report = model.validate();
        let empty: Vec<_> = report
            .iter()
            .filter(|e| e.code == ErrorCode::EmptyElementName)
            .collect();
        assert_eq!(empty.len(), 1);
        assert!(empty[0].is_interface_critical());
    }

    #[test]
    fn test_invalid_identifier_reported() {
        let mut b = ModelBuilder::new();
        let odd = b.entity_type("NS", "Why-Not", loc(1));
        b.property(odd, "Id", "Edm.Int32", loc(2));
        b.declare_key(odd, ["Id"]);
        let model = b.freeze();

        let report = model.validate();
        assert!(report.iter().any(|e| e.code == ErrorCode::InvalidName));
    }

    #[test]
    fn test_clean_model_validates_clean() {
        let mut b = ModelBuilder::new();
        let customer = b.entity_type("NS", "Customer", loc(1));
        b.property(customer, "Id", "Edm.Int32", loc(2));
        b.property(customer, "Name", "Edm.String", loc(3));
        b.declare_key(customer, ["Id"]);
        let order = b.entity_type("NS", "Order", loc(4));
        b.property(order, "Id", "Edm.Int32", loc(5));
        b.declare_key(order, ["Id"]);
        b.navigation(order, "Lines", "NS.OrderLine", true, loc(6));
        b.navigation(order, "Customer", "NS.Customer", false, loc(7));
        let line = b.entity_type("NS", "OrderLine", loc(8));
        b.property(line, "Id", "Edm.Int32", loc(9));
        b.declare_key(line, ["Id"]);
        let main = b.container("NS", "Main", loc(10));
        b.entity_set(main, "Customers", "NS.Customer", loc(11));
        b.entity_set(main, "Orders", "NS.Order", loc(12));
        let op = b.operation("NS", "TopCustomer", false, loc(13));
        b.set_return_type(op, "NS.Customer");
        b.term("NS", "Description", "Edm.String", loc(14));
        let model = b.freeze();

        let report = model.validate();
        assert!(report.is_empty(), "unexpected errors: {:?}", report);
    }
}
