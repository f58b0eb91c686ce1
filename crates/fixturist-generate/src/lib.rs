//! Relation-aware seeding engine for fixturist.
//!
//! Classifies every relation of a datamodel, orders models so required
//! parents exist before their children, and persists mock records through a
//! [`Client`], wiring foreign references through an identifier pool.

pub mod client;
pub mod engine;
pub mod errors;
pub mod faker;
pub mod logging;
pub mod materialize;
pub mod model;
pub mod order;
pub mod pool;
pub mod relation;
pub mod scalars;
pub mod scheduler;
pub mod seed_models;
pub mod task;

pub use client::{
    Client, CreateArgs, CreateCall, Include, IncludeEntry, MemoryClient, ModelDelegate, Record,
};
pub use engine::SeedEngine;
pub use errors::{ClientError, SeedError};
pub use faker::Faker;
pub use logging::{LogFormat, LoggingOptions, init_logging};
pub use materialize::{Fixture, Materialized, Materializer};
pub use model::{
    ModelReport, PoolReport, SeedOptions, SeedOutput, SeedReport, SeedResult, SeedSchedule,
};
pub use order::{Order, build_orders};
pub use pool::{IdentifierPool, PoolStats, RecordId};
pub use relation::{Direction, Relation, RelationAction, RelationKind, Role, classify};
pub use scheduler::{Step, schedule};
pub use seed_models::{
    DEFAULT_AMOUNT, FactoryEntry, RelationConstraint, SeedKit, SeedModel, SeedModels,
};
pub use task::{Task, expand};
