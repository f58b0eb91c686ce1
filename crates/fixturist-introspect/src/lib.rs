//! Schema providers that hand a datamodel snapshot to the seeding engine.

pub mod json;
pub mod provider;

pub use json::{JsonFileProvider, StaticProvider};
pub use provider::SchemaProvider;

pub use fixturist_core::Datamodel;
