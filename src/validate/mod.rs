//! Structural validation
//!
//! A read-only walk over a frozen model producing the complete located,
//! coded report in one pass. Validation never mutates the graph and never
//! stops at the first problem; poisoned inputs skip dependent rules instead
//! of cascading.

mod helpers;
mod references;
mod rules;

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::diag::{ErrorCode, ErrorCollector, Location, StructuralError};
use crate::model::Model;

/// State threaded explicitly through every validation pass.
pub(crate) struct ValidationContext<'a> {
    collector: &'a mut ErrorCollector,
    /// Set while walking occurrences whose collisions are already reported
    /// elsewhere (a base type's own members, names flagged by another pass).
    pub(crate) suppress_duplicate_error: bool,
}

impl<'a> ValidationContext<'a> {
    fn new(collector: &'a mut ErrorCollector) -> Self {
        Self {
            collector,
            suppress_duplicate_error: false,
        }
    }

    pub(crate) fn error(&mut self, location: Location, code: ErrorCode, message: impl Into<String>) {
        self.collector.error(location, code, message);
    }

    pub(crate) fn push(&mut self, error: StructuralError) {
        self.collector.push(error);
    }
}

impl Model {
    /// Validate the whole graph, producing the complete ordered report.
    ///
    /// Errors in the interface-critical band mean the model must not be
    /// used; everything else leaves it navigable, with neutral values at
    /// the poisoned spots.
    pub fn validate(self: &Arc<Self>) -> Vec<StructuralError> {
        let mut collector = ErrorCollector::new();
        let mut ctx = ValidationContext::new(&mut collector);
        rules::check_schema_scope(self, &mut ctx);
        rules::check_types(self, &mut ctx);
        rules::check_containers(self, &mut ctx);
        rules::check_operations(self, &mut ctx);
        rules::check_terms(self, &mut ctx);
        references::check_references(self, &mut ctx);
        let report = dedup(collector.into_errors());
        debug!(errors = report.len(), "validation finished");
        report
    }
}

/// Drop exact repeats (same position, code, and message), keeping the first
/// occurrence of each in report order. Derived types clone their base's
/// member table, collision errors included, so harvesting every table
/// re-reports the base's entries verbatim.
fn dedup(errors: Vec<StructuralError>) -> Vec<StructuralError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(errors.len());
    for error in errors {
        let key = (error.location.clone(), error.code, error.message.clone());
        if seen.insert(key) {
            out.push(error);
        }
    }
    out
}
