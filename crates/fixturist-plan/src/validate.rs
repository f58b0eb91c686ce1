use fixturist_core::{Datamodel, Model};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::PLAN_VERSION;
use crate::errors::{PlanError, ValidationIssue, ValidationReport};
use crate::model::{FieldPlan, ModelPlan, SeedPlan, WILDCARD};

/// Validated plan with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: SeedPlan,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a plan JSON document against the plan JSON Schema.
pub fn validate_plan_json(
    plan_json: &Value,
    plan_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Validate a parsed plan against a datamodel snapshot.
pub fn validate_plan_against_datamodel(plan: &SeedPlan, datamodel: &Datamodel) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.plan_version != PLAN_VERSION {
        report.push(ValidationIssue::error(
            "plan_version_mismatch",
            "/plan_version",
            format!(
                "plan_version '{}' is not supported (expected '{PLAN_VERSION}')",
                plan.plan_version
            ),
            Some("set plan_version to the current contract version"),
        ));
    }

    if plan.models.is_empty() {
        report.push(ValidationIssue::warning(
            "models_empty",
            "/models",
            "plan has no model entries; the default amount applies to every model",
            None,
        ));
    }

    for (name, model_plan) in &plan.models {
        let base_path = format!("/models/{}", escape_pointer(name));

        if model_plan.amount == Some(0) {
            report.push(ValidationIssue::warning(
                "amount_zero",
                format!("{base_path}/amount"),
                format!("model '{name}' requests no records"),
                None,
            ));
        }

        if name == WILDCARD {
            if !model_plan.factory.is_empty() {
                report.push(ValidationIssue::error(
                    "wildcard_factory",
                    format!("{base_path}/factory"),
                    "the wildcard entry only accepts an amount",
                    Some("move factory entries under a concrete model name"),
                ));
            }
            continue;
        }

        let Some(model) = datamodel.model(name) else {
            report.push(ValidationIssue::error(
                "unknown_model",
                base_path,
                format!("model '{name}' not found in datamodel"),
                Some("use a model name from datamodel.json"),
            ));
            continue;
        };

        validate_factory(model, model_plan, &base_path, &mut report);
    }

    report
}

/// Validate the plan end-to-end, returning structured issues on failure.
pub fn validate_plan(
    plan_json: &Value,
    plan_schema: &Value,
    datamodel: &Datamodel,
) -> Result<ValidatedPlan, ValidationReport> {
    let structural = match validate_plan_json(plan_json, plan_schema) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let plan: SeedPlan = match serde_json::from_value(plan_json.clone()) {
        Ok(plan) => plan,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error("invalid_plan_json", "/", err.to_string(), None));
            return Err(report);
        }
    };

    let semantic = validate_plan_against_datamodel(&plan, datamodel);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedPlan {
        plan,
        warnings: semantic.warnings,
    })
}

fn validate_factory(
    model: &Model,
    model_plan: &ModelPlan,
    base_path: &str,
    report: &mut ValidationReport,
) {
    for (field_name, entry) in &model_plan.factory {
        let path = format!("{base_path}/factory/{}", escape_pointer(field_name));
        let Some(field) = model.field(field_name) else {
            report.push(ValidationIssue::error(
                "unknown_field",
                path,
                format!("field '{}.{field_name}' not found in datamodel", model.name),
                None,
            ));
            continue;
        };

        match entry {
            FieldPlan::Relation(bounds) => {
                if !field.is_relation() {
                    report.push(ValidationIssue::error(
                        "relation_constraint_on_scalar",
                        path,
                        format!(
                            "'{}.{field_name}' is not a relation; min/max only apply to relations",
                            model.name
                        ),
                        Some("use a constant or a generator for scalar fields"),
                    ));
                    continue;
                }
                if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
                    if min > max {
                        report.push(ValidationIssue::error(
                            "invalid_relation_range",
                            path,
                            format!("min {min} is greater than max {max}"),
                            None,
                        ));
                    }
                }
            }
            FieldPlan::Generator(_) | FieldPlan::Constant(_) if field.is_relation() => {
                report.push(ValidationIssue::error(
                    "value_on_relation",
                    path,
                    format!(
                        "'{}.{field_name}' is a relation; only {{min, max}} bounds are accepted",
                        model.name
                    ),
                    None,
                ));
            }
            FieldPlan::Generator(plan) => {
                if let Some(scalar) = field.scalar_type() {
                    if !plan.generator.produces(&scalar) {
                        report.push(ValidationIssue::warning(
                            "generator_type_mismatch",
                            path,
                            format!(
                                "generator '{}' does not produce {scalar} values",
                                plan.generator.as_str()
                            ),
                            None,
                        ));
                    }
                }
            }
            FieldPlan::Constant(_) => {}
        }
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturist_core::Field;

    fn datamodel() -> Datamodel {
        Datamodel {
            models: vec![
                Model::new(
                    "User",
                    vec![
                        Field::scalar("id", "Int").id(),
                        Field::scalar("age", "Int"),
                        Field::relation("house", "House", "HouseToUser").optional(),
                    ],
                ),
                Model::new(
                    "House",
                    vec![
                        Field::scalar("id", "Int").id(),
                        Field::relation("residents", "User", "HouseToUser").list(),
                    ],
                ),
            ],
            enums: Vec::new(),
        }
    }

    fn plan(raw: &str) -> SeedPlan {
        SeedPlan::from_json_str(raw).expect("plan json")
    }

    #[test]
    fn reports_semantic_issues() {
        let plan = plan(
            r#"{
              "plan_version": "0.1",
              "models": {
                "*": { "amount": 2, "factory": { "id": 1 } },
                "Ghost": { "amount": 1 },
                "User": {
                  "factory": {
                    "age": { "min": 1 },
                    "house": "somewhere",
                    "nickname": "x"
                  }
                },
                "House": { "factory": { "residents": { "min": 5, "max": 2 } } }
              }
            }"#,
        );

        let report = validate_plan_against_datamodel(&plan, &datamodel());
        let mut codes = report.error_codes();
        codes.sort_unstable();
        assert_eq!(
            codes,
            [
                "invalid_relation_range",
                "relation_constraint_on_scalar",
                "unknown_field",
                "unknown_model",
                "value_on_relation",
                "wildcard_factory",
            ]
        );
    }

    #[test]
    fn warns_on_generator_mismatch() {
        let plan = plan(
            r#"{
              "plan_version": "0.1",
              "models": { "User": { "amount": 0, "factory": { "age": { "generator": "email" } } } }
            }"#,
        );
        let report = validate_plan_against_datamodel(&plan, &datamodel());
        assert!(report.is_ok());
        let codes: Vec<&str> = report.warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(codes, ["amount_zero", "generator_type_mismatch"]);
    }

    #[test]
    fn rejects_unknown_plan_version() {
        let plan = plan(r#"{ "plan_version": "9", "models": { "*": { "amount": 1 } } }"#);
        let report = validate_plan_against_datamodel(&plan, &datamodel());
        assert_eq!(report.error_codes(), ["plan_version_mismatch"]);
    }
}
