use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fixturist_plan::OutputMode;

use crate::client::Record;
use crate::materialize::Fixture;
use crate::scheduler::Step;
use crate::task::Task;

/// Options for the seeding engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedOptions {
    /// Seed of the random source; identical inputs yield identical payloads.
    pub seed: u64,
    /// Shape of the returned records.
    pub output: OutputMode,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            output: OutputMode::Grouped,
        }
    }
}

/// Creation plan computed without touching a client.
#[derive(Debug, Clone)]
pub struct SeedSchedule {
    pub steps: Vec<Step>,
    pub tasks: Vec<Task>,
}

/// Records returned by a run.
#[derive(Debug, Clone)]
pub enum SeedOutput {
    /// Every fixture in creation order.
    Fixtures(Vec<Fixture>),
    /// Persisted records per model, in creation order.
    Grouped(BTreeMap<String, Vec<Record>>),
}

impl SeedOutput {
    pub fn from_fixtures(fixtures: Vec<Fixture>, mode: OutputMode) -> Self {
        match mode {
            OutputMode::Fixtures => SeedOutput::Fixtures(fixtures),
            OutputMode::Grouped => {
                let mut grouped: BTreeMap<String, Vec<Record>> = BTreeMap::new();
                for fixture in fixtures {
                    grouped.entry(fixture.model).or_default().push(fixture.seed);
                }
                SeedOutput::Grouped(grouped)
            }
        }
    }

    pub fn fixtures(&self) -> Option<&[Fixture]> {
        match self {
            SeedOutput::Fixtures(fixtures) => Some(fixtures),
            SeedOutput::Grouped(_) => None,
        }
    }

    pub fn grouped(&self) -> Option<&BTreeMap<String, Vec<Record>>> {
        match self {
            SeedOutput::Grouped(grouped) => Some(grouped),
            SeedOutput::Fixtures(_) => None,
        }
    }
}

/// Summary of one scheduled model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model: String,
    /// Position in the creation sequence.
    pub order: usize,
    pub requested: u64,
    pub created: u64,
}

/// Identifiers left in the pool for one producer/consumer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReport {
    pub parent: String,
    pub child: String,
    pub inserted: u64,
    pub consumed: u64,
    pub remaining: u64,
}

/// Report for a seeding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReport {
    pub run_id: String,
    pub schema_fingerprint: String,
    pub seed: u64,
    pub models: Vec<ModelReport>,
    pub pool_remaining: Vec<PoolReport>,
    pub duration_ms: u64,
}

impl SeedReport {
    pub fn created_total(&self) -> u64 {
        self.models.iter().map(|model| model.created).sum()
    }
}

/// Result of a seeding run.
#[derive(Debug, Clone)]
pub struct SeedResult {
    pub output: SeedOutput,
    pub report: SeedReport,
}
