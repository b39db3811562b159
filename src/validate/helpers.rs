//! Shared validation helpers
//!
//! The seen-set duplicate reporter, member-identity set tests, and the
//! inheritance/containment walks. Every walk is bounded: base chains stop at
//! poison values and the containment search carries an explicit visited set.

use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use crate::binding::Lookup;
use crate::diag::{ErrorCode, Location};
use crate::model::{MemberIdentity, Model, NavigationHandle, TypeHandle, TypeRef};

use super::ValidationContext;

pub(crate) fn identifier_is_valid(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
        .is_match(name)
}

/// Insert `key` into a scope's seen set; report one error at `location` for
/// every duplicate occurrence, unless the context suppresses duplicate
/// reporting. Returns whether the key was newly inserted.
pub(crate) fn add_member_name_to_set(
    key: &str,
    location: &Location,
    seen: &mut HashSet<String>,
    ctx: &mut ValidationContext<'_>,
    code: ErrorCode,
    message: impl Into<String>,
) -> bool {
    if seen.insert(key.to_string()) {
        return true;
    }
    if !ctx.suppress_duplicate_error {
        ctx.error(location.clone(), code, message);
    }
    false
}

/// Equal length and pairwise identical in declared order.
pub(crate) fn property_sets_equivalent(a: &[MemberIdentity], b: &[MemberIdentity]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Every member of `subset` present, by identity, in `superset`.
pub(crate) fn property_set_is_subset(
    subset: &[MemberIdentity],
    superset: &[MemberIdentity],
) -> bool {
    subset.iter().all(|m| superset.contains(m))
}

/// Whether `source` is `target` or derives from it, directly or transitively.
/// A poisoned base chain ends the walk.
pub(crate) fn is_or_inherits_from(source: &TypeHandle, target: &TypeHandle) -> bool {
    let mut current = source.clone();
    loop {
        if current == *target {
            return true;
        }
        match current.base_type() {
            Some(TypeRef::Declared(base)) => current = base,
            _ => return false,
        }
    }
}

/// The inheritance chain of `ty`, root-most type first, `ty` itself last.
pub(crate) fn inheritance_chain_root_first(ty: &TypeHandle) -> Vec<TypeHandle> {
    let mut chain = vec![ty.clone()];
    let mut current = ty.clone();
    while let Some(TypeRef::Declared(base)) = current.base_type() {
        chain.push(base.clone());
        current = base;
    }
    chain.reverse();
    chain
}

/// Navigation properties of `ty`, own first, then inherited up the chain.
pub(crate) fn navigations_including_inherited(ty: &TypeHandle) -> Vec<NavigationHandle> {
    let mut out = Vec::new();
    let mut current = ty.clone();
    loop {
        out.extend(current.navigations());
        match current.base_type() {
            Some(TypeRef::Declared(base)) => current = base,
            _ => break,
        }
    }
    out
}

/// Whether anything stored as `source` can, through containment navigation
/// properties, directly or transitively hold an instance of `target`.
///
/// Follows two edge kinds at once: containment navigation targets (own and
/// inherited) and types derived from the current one, with
/// [`is_or_inherits_from`] as the hit test. The visited set is what makes
/// the search terminate on input that really does cycle.
pub(crate) fn type_indirectly_contains_target(
    model: &Arc<Model>,
    source: &TypeHandle,
    target: &TypeHandle,
    visited: &mut HashSet<TypeHandle>,
) -> bool {
    if !visited.insert(source.clone()) {
        return false;
    }
    if is_or_inherits_from(source, target) {
        return true;
    }
    for nav in navigations_including_inherited(source) {
        if !nav.contains_target() {
            continue;
        }
        if let TypeRef::Declared(next) = nav.target() {
            if type_indirectly_contains_target(model, &next, target, visited) {
                return true;
            }
        }
    }
    for derived in model.find_directly_derived_types(source) {
        if type_indirectly_contains_target(model, &derived, target, visited) {
            return true;
        }
    }
    false
}

/// Resolve member names to identities on `ty`'s member table. `None` when a
/// name is missing or ambiguous; those cases carry their own reports.
pub(crate) fn resolve_member_identities(
    ty: &TypeHandle,
    names: &[Arc<str>],
) -> Option<Vec<MemberIdentity>> {
    let table = ty.model().members_table(ty.id());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        match table.get(name) {
            Lookup::Found(member) => out.push(member.identity(ty.model())),
            _ => return None,
        }
    }
    Some(out)
}
