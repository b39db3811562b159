//! Structural error reporting
//!
//! Name binding, lazy resolution, and validation report problems as located,
//! coded errors. Errors are data: nothing in this crate aborts on a malformed
//! model, and a full report is always produced in one pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Locations
// =============================================================================

/// Source position of a declaration, as supplied by the producing parser.
///
/// Line and column are 1-based; `(0, 0)` means the position is unknown
/// (synthesized elements, programmatic construction).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Line in the source document, 0 when unknown.
    pub line: u32,
    /// Column in the source document, 0 when unknown.
    pub column: u32,
    /// Label of the source document, if the parser supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Arc<str>>,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            source: None,
        }
    }

    pub fn in_source(line: u32, column: u32, source: impl Into<Arc<str>>) -> Self {
        Self {
            line,
            column,
            source: Some(source.into()),
        }
    }

    /// Position for elements that have no source document.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.line != 0 || self.column != 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.is_known()) {
            (Some(src), true) => write!(f, "{}:{}:{}", src, self.line, self.column),
            (Some(src), false) => write!(f, "{}", src),
            (None, true) => write!(f, "{}:{}", self.line, self.column),
            (None, false) => write!(f, "<unknown>"),
        }
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Stable numeric code categorizing a structural error.
///
/// The band `500..=599` is reserved for interface-critical codes: a model
/// carrying one of those cannot be trusted even for best-effort reads.
/// Everything below the band is a defect in a model that is still navigable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    // === Name binding ===
    /// Element name is not a valid simple identifier
    InvalidName = 100,
    /// Two or more elements bound to the same name in one scope
    AmbiguousBinding = 110,
    /// Schema-level element name declared more than once
    DuplicateSchemaElement = 120,
    /// Entity set name declared more than once in a container
    DuplicateEntitySet = 121,
    /// Property or navigation property name declared more than once on a type
    DuplicateMember = 122,
    /// Operation redeclared with an equivalent signature
    DuplicateOperation = 123,
    /// Local name already defined by a referenced model
    AlreadyDefined = 130,

    // === Reference resolution ===
    /// Property type name did not resolve
    UnresolvedType = 200,
    /// Base type name did not resolve
    UnresolvedBaseType = 201,
    /// Navigation property target did not resolve
    UnresolvedNavigationTarget = 202,
    /// Entity set element type did not resolve
    UnresolvedEntitySetType = 203,
    /// Declared key names a property the type does not have
    UnresolvedKeyProperty = 204,

    // === Structural rules ===
    /// Base type is not the same kind as the deriving type
    BaseTypeKindMismatch = 300,
    /// Entity set element type resolved to a non-entity type
    EntitySetTypeMustBeEntity = 301,
    /// Navigation property target resolved to a non-entity type
    NavigationTargetMustBeEntity = 302,
    /// Structural property type resolved to an entity type
    InvalidPropertyType = 303,
    /// Non-abstract entity type has no key, own or inherited
    EntityKeyMissing = 310,
    /// Redeclared key does not match the base type's key
    KeyRedeclarationMismatch = 311,
    /// Containment navigation closes a cycle back to its declaring type
    ContainmentCycle = 320,

    // === Interface critical ===
    /// Base type chain cycles back to the declaring type
    CyclicBaseType = 500,
    /// Element declared with an empty name
    EmptyElementName = 501,
}

impl ErrorCode {
    const INTERFACE_CRITICAL: std::ops::RangeInclusive<u32> = 500..=599;

    /// Stable numeric value of this code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Whether this code invalidates the model for interface purposes.
    pub fn is_interface_critical(self) -> bool {
        Self::INTERFACE_CRITICAL.contains(&self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EDM{}", self.code())
    }
}

// =============================================================================
// Structural Errors
// =============================================================================

/// A single located, coded problem found while binding or validating a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralError {
    /// Position of the declaration that caused the problem
    pub location: Location,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl StructuralError {
    pub fn new(location: Location, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            location,
            code,
            message: message.into(),
        }
    }

    pub fn is_interface_critical(&self) -> bool {
        self.code.is_interface_critical()
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.location, self.code, self.message)
    }
}

// =============================================================================
// Error Collector
// =============================================================================

/// Accumulates structural errors during a validation pass.
///
/// Each `validate` call owns its own collector; passes only append, so one
/// traversal yields the complete report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorCollector {
    errors: Vec<StructuralError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a structural error
    pub fn push(&mut self, error: StructuralError) {
        self.errors.push(error);
    }

    /// Add a structural error from its parts
    pub fn error(&mut self, location: Location, code: ErrorCode, message: impl Into<String>) {
        self.push(StructuralError::new(location, code, message));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check for errors in the interface-critical band
    pub fn has_interface_critical(&self) -> bool {
        self.errors.iter().any(StructuralError::is_interface_critical)
    }

    /// Get all errors in the interface-critical band
    pub fn interface_critical(&self) -> impl Iterator<Item = &StructuralError> {
        self.errors.iter().filter(|e| e.is_interface_critical())
    }

    /// Get all errors, in the order they were reported
    pub fn all(&self) -> &[StructuralError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Merge another collector into this one
    pub fn merge(&mut self, other: ErrorCollector) {
        self.errors.extend(other.errors);
    }

    /// Consume the collector, yielding the ordered report
    pub fn into_errors(self) -> Vec<StructuralError> {
        self.errors
    }

    /// Format the whole report for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for error in &self.errors {
            output.push_str(&format!("{}\n", error));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} interface-critical\n",
                self.len(),
                self.interface_critical().count()
            ));
        }

        output
    }
}

impl fmt::Display for ErrorCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for ErrorCollector {
    type Item = StructuralError;
    type IntoIter = std::vec::IntoIter<StructuralError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorCollector {
    type Item = &'a StructuralError;
    type IntoIter = std::slice::Iter<'a, StructuralError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
