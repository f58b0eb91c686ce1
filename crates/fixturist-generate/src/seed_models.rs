use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use fixturist_plan::{FieldPlan, SeedPlan, WILDCARD};

use crate::faker::Faker;

/// Amount used for models that neither the user nor the wildcard cover.
pub const DEFAULT_AMOUNT: u64 = 5;

/// User generator invoked once per record with the run's faker.
pub type GeneratorFn = Arc<dyn Fn(&mut Faker) -> Value + Send + Sync>;

/// Explicit connection-count bounds for a relation field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationConstraint {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl RelationConstraint {
    pub fn between(min: u64, max: u64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_most(max: u64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn at_least(min: u64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

/// Factory override for one field.
#[derive(Clone)]
pub enum FactoryEntry {
    Constant(Value),
    Generator(GeneratorFn),
    Relation(RelationConstraint),
}

impl FactoryEntry {
    pub fn constant(value: impl Into<Value>) -> Self {
        FactoryEntry::Constant(value.into())
    }

    pub fn generator(f: impl Fn(&mut Faker) -> Value + Send + Sync + 'static) -> Self {
        FactoryEntry::Generator(Arc::new(f))
    }

    /// Produce a value for one record; relation constraints yield nothing.
    pub fn value(&self, faker: &mut Faker) -> Option<Value> {
        match self {
            FactoryEntry::Constant(value) => Some(value.clone()),
            FactoryEntry::Generator(generator) => Some(generator(faker)),
            FactoryEntry::Relation(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FactoryEntry::Constant(_) => "constant",
            FactoryEntry::Generator(_) => "generator",
            FactoryEntry::Relation(_) => "relation constraint",
        }
    }
}

impl fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryEntry::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            FactoryEntry::Generator(_) => f.write_str("Generator(..)"),
            FactoryEntry::Relation(constraint) => {
                f.debug_tuple("Relation").field(constraint).finish()
            }
        }
    }
}

/// Request for one model.
#[derive(Debug, Clone, Default)]
pub struct SeedModel {
    pub amount: Option<u64>,
    pub factory: BTreeMap<String, FactoryEntry>,
}

impl SeedModel {
    pub fn amount(amount: u64) -> Self {
        Self {
            amount: Some(amount),
            factory: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, entry: FactoryEntry) -> Self {
        self.factory.insert(field.into(), entry);
        self
    }
}

/// The full user request: per-model entries plus the `*` wildcard.
#[derive(Debug, Clone)]
pub struct SeedModels {
    models: BTreeMap<String, SeedModel>,
}

impl Default for SeedModels {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(WILDCARD.to_string(), SeedModel::amount(DEFAULT_AMOUNT));
        Self { models }
    }
}

impl SeedModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, model: impl Into<String>, seed_model: SeedModel) -> Self {
        self.models.insert(model.into(), seed_model);
        self
    }

    /// Amount for `model`, falling back to the wildcard amount.
    pub fn amount_for(&self, model: &str) -> u64 {
        self.models
            .get(model)
            .and_then(|entry| entry.amount)
            .or_else(|| self.models.get(WILDCARD).and_then(|entry| entry.amount))
            .unwrap_or(DEFAULT_AMOUNT)
    }

    pub fn factory(&self, model: &str, field: &str) -> Option<&FactoryEntry> {
        self.models.get(model)?.factory.get(field)
    }

    /// Entries keyed by concrete model names and the wildcard.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SeedModel)> {
        self.models.iter().map(|(name, model)| (name.as_str(), model))
    }

    /// Runtime form of a declarative plan.
    pub fn from_plan(plan: &SeedPlan) -> Self {
        let mut seed_models = SeedModels::default();
        for (name, model_plan) in &plan.models {
            let factory = model_plan
                .factory
                .iter()
                .map(|(field, entry)| (field.clone(), factory_entry(entry)))
                .collect();
            let amount = match name.as_str() {
                WILDCARD => model_plan.amount.or(Some(DEFAULT_AMOUNT)),
                _ => model_plan.amount,
            };
            seed_models
                .models
                .insert(name.clone(), SeedModel { amount, factory });
        }
        seed_models
    }
}

fn factory_entry(entry: &FieldPlan) -> FactoryEntry {
    match entry {
        FieldPlan::Relation(bounds) => FactoryEntry::Relation(RelationConstraint {
            min: bounds.min,
            max: bounds.max,
        }),
        FieldPlan::Generator(plan) => {
            let generator = plan.generator;
            FactoryEntry::generator(move |faker| faker.builtin(generator))
        }
        FieldPlan::Constant(value) => FactoryEntry::Constant(value.clone()),
    }
}

/// Handed to the closure that builds the seed request.
pub struct SeedKit<'a> {
    pub faker: &'a mut Faker,
}
