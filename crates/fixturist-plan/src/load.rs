use std::path::Path;

use crate::errors::{PlanError, Result};
use crate::model::SeedPlan;

impl SeedPlan {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Load a seed plan from disk, picking the format from the file extension.
pub fn load_plan(path: impl AsRef<Path>) -> Result<SeedPlan> {
    let path = path.as_ref();
    let parse: fn(&str) -> Result<SeedPlan> = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => SeedPlan::from_json_str,
        Some("toml") => SeedPlan::from_toml_str,
        other => {
            return Err(PlanError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            ));
        }
    };
    let raw = std::fs::read_to_string(path)?;
    parse(&raw)
}
