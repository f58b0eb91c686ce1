use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{info, warn};

use fixturist_core::{Datamodel, validate_datamodel};
use fixturist_plan::{OutputMode, SeedPlan, validate_plan_against_datamodel};

use crate::client::Client;
use crate::errors::SeedError;
use crate::faker::Faker;
use crate::materialize::Materializer;
use crate::model::{
    ModelReport, PoolReport, SeedOptions, SeedOutput, SeedReport, SeedResult, SeedSchedule,
};
use crate::order::build_orders;
use crate::relation::Role;
use crate::scheduler::{Step, schedule};
use crate::seed_models::{SeedKit, SeedModels};
use crate::task::expand;

/// Entry point for seeding a client from a datamodel and a seed request.
#[derive(Debug, Clone, Default)]
pub struct SeedEngine {
    options: SeedOptions,
}

impl SeedEngine {
    pub fn new(options: SeedOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SeedOptions {
        &self.options
    }

    /// Classify, order, schedule and expand without touching a client.
    pub fn plan(
        &self,
        datamodel: &Datamodel,
        seed_models: &SeedModels,
    ) -> Result<SeedSchedule, SeedError> {
        let index = validate_datamodel(datamodel)?;
        let orders = build_orders(datamodel, &index, seed_models)?;
        let steps = schedule(orders)?;
        let tasks = expand(&steps);
        Ok(SeedSchedule { steps, tasks })
    }

    /// Seed using a request built at runtime. The closure receives the
    /// run's faker so custom generators stay on the same seeded stream.
    pub async fn run<F>(
        &self,
        client: &dyn Client,
        datamodel: &Datamodel,
        build: F,
    ) -> Result<SeedResult, SeedError>
    where
        F: FnOnce(&mut SeedKit<'_>) -> SeedModels,
    {
        let mut faker = Faker::new(self.options.seed);
        let seed_models = build(&mut SeedKit { faker: &mut faker });
        self.execute(
            client,
            datamodel,
            &seed_models,
            faker,
            self.options.seed,
            self.options.output,
        )
        .await
    }

    /// Seed from a declarative plan. The plan's seed and output mode take
    /// precedence over the engine options.
    pub async fn run_plan(
        &self,
        client: &dyn Client,
        datamodel: &Datamodel,
        plan: &SeedPlan,
    ) -> Result<SeedResult, SeedError> {
        let report = validate_plan_against_datamodel(plan, datamodel);
        for issue in &report.warnings {
            warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
        }
        if !report.is_ok() {
            let issues = report
                .errors
                .iter()
                .map(|issue| format!("{} at {}: {}", issue.code, issue.path, issue.message))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(errors = report.errors.len(), "seed plan rejected");
            return Err(SeedError::InvalidPlan(issues));
        }

        let seed = plan.seed.unwrap_or(self.options.seed);
        let output = plan.output().unwrap_or(self.options.output);
        let seed_models = SeedModels::from_plan(plan);
        let faker = Faker::new(seed);
        self.execute(client, datamodel, &seed_models, faker, seed, output)
            .await
    }

    async fn execute(
        &self,
        client: &dyn Client,
        datamodel: &Datamodel,
        seed_models: &SeedModels,
        mut faker: Faker,
        seed: u64,
        output: OutputMode,
    ) -> Result<SeedResult, SeedError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        let schedule = self
            .plan(datamodel, seed_models)
            .and_then(|schedule| {
                check_delegates(client, datamodel, &schedule.steps)?;
                Ok(schedule)
            })
            .inspect_err(|err| warn!(run_id = %run_id, error = %err, "seeding rejected"))?;
        let schema_fingerprint = datamodel.fingerprint()?;

        info!(
            run_id = %run_id,
            models = schedule.steps.len(),
            tasks = schedule.tasks.len(),
            seed,
            "seeding started"
        );

        let materialized = Materializer::new(client, datamodel, seed_models, &mut faker)
            .run(schedule.tasks)
            .await
            .inspect_err(|err| warn!(run_id = %run_id, error = %err, "seeding aborted"))?;

        let mut created: BTreeMap<&str, u64> = BTreeMap::new();
        for fixture in &materialized.fixtures {
            *created.entry(fixture.model.as_str()).or_default() += 1;
        }
        let models: Vec<ModelReport> = schedule
            .steps
            .iter()
            .map(|step| {
                let created = created.get(step.model.as_str()).copied().unwrap_or(0);
                info!(model = %step.model, requested = step.amount, created, "model seeded");
                ModelReport {
                    model: step.model.clone(),
                    order: step.order,
                    requested: step.amount,
                    created,
                }
            })
            .collect();

        let pool_remaining = materialized
            .pool
            .stats()
            .map(|(parent, child, stats)| PoolReport {
                parent: parent.to_string(),
                child: child.to_string(),
                inserted: stats.inserted,
                consumed: stats.consumed,
                remaining: materialized.pool.remaining(parent, child),
            })
            .collect();

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            records = materialized.fixtures.len(),
            duration_ms,
            "seeding completed"
        );

        Ok(SeedResult {
            output: SeedOutput::from_fixtures(materialized.fixtures, output),
            report: SeedReport {
                run_id,
                schema_fingerprint,
                seed,
                models,
                pool_remaining,
                duration_ms,
            },
        })
    }
}

/// Every model with top-level creates needs a delegate. Models only ever
/// created inline by a compound producer are exempt.
fn check_delegates(
    client: &dyn Client,
    datamodel: &Datamodel,
    steps: &[Step],
) -> Result<(), SeedError> {
    for step in steps.iter().filter(|step| step.amount > 0) {
        let nested_only = step
            .relations
            .values()
            .any(|relation| relation.is_compound_create() && relation.role() == Role::Consumer);
        if nested_only {
            continue;
        }
        let model = datamodel
            .model(&step.model)
            .ok_or_else(|| SeedError::UnknownModel(step.model.clone()))?;
        let delegate = model.delegate_name();
        if client.delegate(&delegate).is_none() {
            return Err(SeedError::MissingMapping {
                model: model.name.clone(),
                delegate,
            });
        }
    }
    Ok(())
}
