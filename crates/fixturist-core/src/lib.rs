//! Core contracts for Fixturist.
//!
//! This crate defines the canonical datamodel types consumed by the seeding
//! engine, the precomputed relation index, and schema validation helpers.

pub mod error;
pub mod relations;
pub mod schema;
pub mod validation;

pub use error::{CoreError, Result};
pub use relations::{FieldRef, RelationIndex, RelationPair};
pub use schema::{Datamodel, EnumType, Field, FieldKind, Model, ScalarType};
pub use validation::validate_datamodel;
