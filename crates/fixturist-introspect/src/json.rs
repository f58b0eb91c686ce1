use std::path::PathBuf;

use async_trait::async_trait;

use fixturist_core::{CoreError, Datamodel, Result, validate_datamodel};

use crate::provider::SchemaProvider;

/// Reads a `datamodel.json` document from disk.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchemaProvider for JsonFileProvider {
    fn source(&self) -> &'static str {
        "json"
    }

    async fn datamodel(&self) -> Result<Datamodel> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            CoreError::Other(format!("failed to read {}: {err}", self.path.display()))
        })?;
        let datamodel = parse_datamodel(&raw)?;
        validate_datamodel(&datamodel)?;
        Ok(datamodel)
    }
}

/// Serves a datamodel that is already in memory.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    datamodel: Datamodel,
}

impl StaticProvider {
    pub fn new(datamodel: Datamodel) -> Self {
        Self { datamodel }
    }
}

#[async_trait]
impl SchemaProvider for StaticProvider {
    fn source(&self) -> &'static str {
        "static"
    }

    async fn datamodel(&self) -> Result<Datamodel> {
        validate_datamodel(&self.datamodel)?;
        Ok(self.datamodel.clone())
    }
}

pub(crate) fn parse_datamodel(raw: &str) -> Result<Datamodel> {
    serde_json::from_str(raw)
        .map_err(|err| CoreError::InvalidSchema(format!("datamodel json: {err}")))
}
