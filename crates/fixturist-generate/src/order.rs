use std::collections::BTreeMap;

use fixturist_core::{Datamodel, Model, RelationIndex};
use fixturist_plan::WILDCARD;

use crate::errors::SeedError;
use crate::relation::Relation;
use crate::seed_models::{FactoryEntry, SeedModels};

/// Resolved creation requirement for one model, before sequencing.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub model: String,
    pub amount: u64,
    /// Relations keyed by the declaring field name.
    pub relations: BTreeMap<String, Relation>,
}

/// Build one order per model, collecting every validation failure.
pub fn build_orders(
    datamodel: &Datamodel,
    index: &RelationIndex,
    seed_models: &SeedModels,
) -> Result<Vec<Order>, SeedError> {
    let mut errors = validate_seed_models(datamodel, seed_models);

    let mut orders = Vec::with_capacity(datamodel.models.len());
    for model in &datamodel.models {
        match build_order(datamodel, index, seed_models, model) {
            Ok(order) => orders.push(order),
            Err(mut model_errors) => errors.append(&mut model_errors),
        }
    }

    match SeedError::aggregate(errors) {
        Some(err) => Err(err),
        None => Ok(orders),
    }
}

fn build_order(
    datamodel: &Datamodel,
    index: &RelationIndex,
    seed_models: &SeedModels,
    model: &Model,
) -> Result<Order, Vec<SeedError>> {
    let amount = seed_models.amount_for(&model.name);
    let mut relations = BTreeMap::new();
    let mut errors = Vec::new();

    for field in model.relation_fields() {
        let Some(back_field) = index.back_field(datamodel, &model.name, &field.name) else {
            errors.push(SeedError::InvalidPlan(format!(
                "relation {}.{} has no back-reference",
                model.name, field.name
            )));
            continue;
        };
        let constraint = match seed_models.factory(&model.name, &field.name) {
            Some(FactoryEntry::Relation(constraint)) => *constraint,
            _ => Default::default(),
        };
        let target_amount = seed_models.amount_for(&field.field_type);

        match Relation::new(
            &model.name,
            field,
            back_field,
            constraint,
            amount,
            target_amount,
        ) {
            Ok(relation) => {
                relations.insert(field.name.clone(), relation);
            }
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(Order {
            model: model.name.clone(),
            amount,
            relations,
        })
    } else {
        Err(errors)
    }
}

fn validate_seed_models(datamodel: &Datamodel, seed_models: &SeedModels) -> Vec<SeedError> {
    let mut errors = Vec::new();

    for (name, seed_model) in seed_models.entries() {
        if name == WILDCARD {
            if let Some(field) = seed_model.factory.keys().next() {
                errors.push(SeedError::InvalidFactory {
                    model: WILDCARD.to_string(),
                    field: field.clone(),
                    reason: "the wildcard entry only accepts an amount".to_string(),
                });
            }
            continue;
        }

        let Some(model) = datamodel.model(name) else {
            errors.push(SeedError::UnknownModel(name.to_string()));
            continue;
        };

        for (field_name, entry) in &seed_model.factory {
            let invalid = |reason: String| SeedError::InvalidFactory {
                model: model.name.clone(),
                field: field_name.clone(),
                reason,
            };
            let Some(field) = model.field(field_name) else {
                errors.push(invalid("unknown field".to_string()));
                continue;
            };
            match (field.is_relation(), entry) {
                (true, FactoryEntry::Relation(_)) | (false, FactoryEntry::Constant(_)) => {}
                (false, FactoryEntry::Generator(_)) => {}
                (true, other) => errors.push(invalid(format!(
                    "relation fields only accept {{min, max}} bounds, got a {}",
                    other.kind()
                ))),
                (false, other) => errors.push(invalid(format!(
                    "{} only applies to relation fields",
                    other.kind()
                ))),
            }
        }
    }

    errors
}
