//! Seed plan contracts, loading, and validation.
//!
//! A seed plan is the declarative form of a seeding request: per-model
//! amounts, field factories, and relation connection bounds.

pub mod errors;
pub mod load;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
pub use load::load_plan;
pub use model::{
    BuiltinGenerator, FieldPlan, GeneratorPlan, ModelPlan, OutputMode, PlanOptions, RelationPlan,
    SeedPlan, WILDCARD,
};
pub use schema::plan_json_schema;
pub use validate::{ValidatedPlan, validate_plan, validate_plan_against_datamodel, validate_plan_json};

/// Current contract version for seed plan documents.
pub const PLAN_VERSION: &str = "0.1";
