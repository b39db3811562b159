//! Cross-model redeclaration checks
//!
//! A model must not redeclare schema-level names that its referenced models
//! already define. Types, terms, and containers clash by qualified name;
//! operations overload, so a local operation clashes only with a referenced
//! operation of identical signature, while a local non-operation clashes
//! with any referenced operation of the same name.

use std::sync::Arc;

use crate::binding::Lookup;
use crate::diag::{ErrorCode, Location};
use crate::model::{Model, Operation};

use super::ValidationContext;

pub(crate) fn check_references(model: &Arc<Model>, ctx: &mut ValidationContext<'_>) {
    if model.references().is_empty() {
        return;
    }

    for ty in &model.types {
        let full = format!("{}.{}", ty.namespace(), ty.name());
        // A locally collided name is already in the report; the local
        // collision is the problem, not the shadowing.
        if matches!(model.types_by_full.get(&full), Lookup::Ambiguous(_)) {
            continue;
        }
        if shadows_referenced_declaration(model, &full, None) {
            report(ctx, ty.location(), ty.kind().as_str(), &full);
        }
    }
    for term in &model.terms {
        let full = format!("{}.{}", term.namespace(), term.name());
        if matches!(model.terms_by_full.get(&full), Lookup::Ambiguous(_)) {
            continue;
        }
        if shadows_referenced_declaration(model, &full, None) {
            report(ctx, term.location(), "term", &full);
        }
    }
    for container in &model.containers {
        let full = format!("{}.{}", container.namespace(), container.name());
        if matches!(model.containers_by_full.get(&full), Lookup::Ambiguous(_)) {
            continue;
        }
        if shadows_referenced_declaration(model, &full, None) {
            report(ctx, container.location(), "entity container", &full);
        }
    }
    for (index, operation) in model.operations.iter().enumerate() {
        let full = format!("{}.{}", operation.namespace(), operation.name());
        if has_equivalent_local_sibling(model, index, operation) {
            continue;
        }
        if shadows_referenced_declaration(model, &full, Some(operation)) {
            report(ctx, operation.location(), "operation", &full);
        }
    }
}

fn report(ctx: &mut ValidationContext<'_>, location: &Location, noun: &str, full: &str) {
    ctx.error(
        location.clone(),
        ErrorCode::AlreadyDefined,
        format!("The {} '{}' is already defined in a referenced model", noun, full),
    );
}

fn has_equivalent_local_sibling(model: &Model, index: usize, operation: &Operation) -> bool {
    model.operations.iter().enumerate().any(|(other, candidate)| {
        other != index
            && candidate.namespace() == operation.namespace()
            && candidate.name() == operation.name()
            && candidate.signature_matches(operation)
    })
}

/// Whether any referenced model declares `full`, under the overloading rule
/// when the local declaration is an operation.
fn shadows_referenced_declaration(
    model: &Model,
    full: &str,
    local_operation: Option<&Operation>,
) -> bool {
    for referenced in model.references() {
        if referenced.types_by_full.contains(full)
            || referenced.terms_by_full.contains(full)
            || referenced.containers_by_full.contains(full)
        {
            return true;
        }
        if let Some(overloads) = referenced.operations_by_full.get(full) {
            match local_operation {
                None => return true,
                Some(operation) => {
                    if overloads
                        .iter()
                        .any(|id| referenced.operation_at(*id).signature_matches(operation))
                    {
                        return true;
                    }
                }
            }
        }
    }
    false
}
