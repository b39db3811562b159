//! EDM Graph
//!
//! An in-memory entity data model: structured types, entity containers,
//! operations, and value terms, frozen into immutable shareable models that
//! resolve their cross-references lazily and tolerate every malformed input
//! by poisoning instead of failing.
//!
//! ## Features
//!
//! - **Lazy Resolution**: base types, keys, and member tables are computed on
//!   first use and memoized; cyclic derivations resolve to poison values
//!   through a two-pass protocol instead of hanging or crashing
//! - **Poison Semantics**: unresolvable or ambiguous references become `Bad`
//!   elements carrying their diagnosis; every accessor still answers
//! - **Ambiguity Tracking**: name tables keep all colliding candidates and
//!   report each collision exactly once
//! - **Structural Validation**: one pass collects every rule violation with
//!   stable error codes and source positions
//! - **Cross-Model References**: models reference frozen models; lookups and
//!   inherited members flow across the boundary
//!
//! ## Architecture
//!
//! ```text
//! ModelBuilder ──freeze──▶ Arc<Model>
//!                           ├── types / terms / containers / operations
//!                           ├── binding tables (name -> id, collisions kept)
//!                           ├── memo cells (base, key, members, set types)
//!                           └── references: Vec<Arc<Model>>
//!
//! model.validate() ──▶ Vec<StructuralError>      (diag::ErrorCode)
//! ReferenceGraph::project(&model) ──▶ SCCs, DOT  (analysis)
//! import::from_path("model.json") ──▶ Arc<Model> (serde document)
//! ```

pub mod analysis;
pub mod binding;
pub mod cache;
pub mod diag;
pub mod error;
pub mod import;
pub mod model;
pub mod validate;

pub use analysis::{ReferenceGraph, SccGroup};
pub use binding::{Ambiguity, BindingTable, Lookup};
pub use cache::{CycleGroup, MemoCell};
pub use diag::{ErrorCode, ErrorCollector, Location, StructuralError};
pub use error::{ModelError, Result};
pub use model::{Model, ModelBuilder, PrimitiveKind, TypeHandle, TypeKind, TypeRef};
