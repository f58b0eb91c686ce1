use async_trait::async_trait;

use fixturist_core::{Datamodel, Result};

/// Trait implemented by sources that can describe a datamodel.
#[async_trait]
pub trait SchemaProvider {
    /// Returns a short source identifier (e.g. `json`).
    fn source(&self) -> &'static str;

    /// Load the datamodel. Implementations validate before returning.
    async fn datamodel(&self) -> Result<Datamodel>;
}
