//! Operations and value terms

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::diag::Location;

use super::element::{OperationId, TermId};
use super::Model;

// =============================================================================
// Operations
// =============================================================================

/// A function or action declaration.
///
/// Operations may overload: several declarations can share a name as long as
/// their signatures differ.
#[derive(Debug)]
pub struct Operation {
    pub(crate) name: String,
    pub(crate) namespace: String,
    /// Bound operations dispatch on their first parameter.
    pub(crate) is_bound: bool,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) return_type_name: Option<String>,
    pub(crate) location: Location,
}

impl Operation {
    pub(crate) fn new(namespace: String, name: String, is_bound: bool, location: Location) -> Self {
        Self {
            name,
            namespace,
            is_bound,
            parameters: Vec::new(),
            return_type_name: None,
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_bound(&self) -> bool {
        self.is_bound
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn return_type_name(&self) -> Option<&str> {
        self.return_type_name.as_deref()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Signature equivalence: same binding form, same parameter count, and
    /// pairwise identical declared parameter types. Parameter names and the
    /// return type do not participate.
    pub fn signature_matches(&self, other: &Operation) -> bool {
        self.is_bound == other.is_bound
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.type_name == b.type_name)
    }
}

/// An operation parameter declaration.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) location: Location,
}

impl Parameter {
    pub(crate) fn new(name: String, type_name: String, location: Location) -> Self {
        Self {
            name,
            type_name,
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter type name as declared, unresolved.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// An operation paired with its declaring model.
#[derive(Clone)]
pub struct OperationHandle {
    pub(crate) model: Arc<Model>,
    pub(crate) id: OperationId,
}

impl OperationHandle {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn name(&self) -> &str {
        self.model.operation_at(self.id).name()
    }

    pub fn namespace(&self) -> &str {
        self.model.operation_at(self.id).namespace()
    }

    pub fn full_name(&self) -> String {
        let op = self.model.operation_at(self.id);
        format!("{}.{}", op.namespace(), op.name())
    }

    pub fn is_bound(&self) -> bool {
        self.model.operation_at(self.id).is_bound()
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.model.operation_at(self.id).parameters()
    }

    pub fn return_type_name(&self) -> Option<&str> {
        self.model.operation_at(self.id).return_type_name()
    }

    pub fn location(&self) -> &Location {
        self.model.operation_at(self.id).location()
    }

    pub fn signature_matches(&self, other: &OperationHandle) -> bool {
        self.model
            .operation_at(self.id)
            .signature_matches(other.model.operation_at(other.id))
    }
}

impl PartialEq for OperationHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.id == other.id
    }
}

impl Eq for OperationHandle {}

impl Hash for OperationHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.model) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperationHandle({})", self.full_name())
    }
}

// =============================================================================
// Value Terms
// =============================================================================

/// A named, typed annotation term.
#[derive(Debug)]
pub struct ValueTerm {
    pub(crate) name: String,
    pub(crate) namespace: String,
    pub(crate) type_name: String,
    pub(crate) location: Location,
}

impl ValueTerm {
    pub(crate) fn new(
        namespace: String,
        name: String,
        type_name: String,
        location: Location,
    ) -> Self {
        Self {
            name,
            namespace,
            type_name,
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The term type name as declared, unresolved.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

/// A value term paired with its declaring model.
#[derive(Clone)]
pub struct TermHandle {
    pub(crate) model: Arc<Model>,
    pub(crate) id: TermId,
}

impl TermHandle {
    pub fn id(&self) -> TermId {
        self.id
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn name(&self) -> &str {
        self.model.term_at(self.id).name()
    }

    pub fn namespace(&self) -> &str {
        self.model.term_at(self.id).namespace()
    }

    pub fn full_name(&self) -> String {
        let term = self.model.term_at(self.id);
        format!("{}.{}", term.namespace(), term.name())
    }

    pub fn declared_type_name(&self) -> &str {
        self.model.term_at(self.id).type_name()
    }

    pub fn location(&self) -> &Location {
        self.model.term_at(self.id).location()
    }
}

impl PartialEq for TermHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.id == other.id
    }
}

impl Eq for TermHandle {}

impl Hash for TermHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.model) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for TermHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermHandle({})", self.full_name())
    }
}
