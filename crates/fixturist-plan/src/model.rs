use std::collections::BTreeMap;

use fixturist_core::ScalarType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Model key that applies to every model without an explicit entry.
pub const WILDCARD: &str = "*";

/// Canonical seed plan definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SeedPlan {
    /// Contract version for the plan format.
    pub plan_version: String,
    /// Seed for reproducibility; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Per-model requests keyed by model name or `*`.
    #[serde(default)]
    pub models: BTreeMap<String, ModelPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PlanOptions>,
}

impl SeedPlan {
    pub fn wildcard(&self) -> Option<&ModelPlan> {
        self.models.get(WILDCARD)
    }

    pub fn output(&self) -> Option<OutputMode> {
        self.options.as_ref().and_then(|options| options.output)
    }
}

/// Amount and factory overrides for one model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ModelPlan {
    /// Number of records to create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    /// Field overrides keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub factory: BTreeMap<String, FieldPlan>,
}

/// Factory entry for a single field.
///
/// Objects made only of `min`/`max` are relation constraints, objects with a
/// single `generator` key select a built-in generator, and anything else is
/// a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldPlan {
    Relation(RelationPlan),
    Generator(GeneratorPlan),
    Constant(serde_json::Value),
}

/// Connection-count bounds for a relation field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RelationPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GeneratorPlan {
    pub generator: BuiltinGenerator,
}

/// Built-in value generators selectable from a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinGenerator {
    Word,
    Sentence,
    Paragraph,
    Name,
    FirstName,
    LastName,
    Email,
    Username,
    Company,
    City,
    Country,
    Phone,
    Guid,
    Integer,
    Floating,
    Bool,
    Date,
}

impl BuiltinGenerator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinGenerator::Word => "word",
            BuiltinGenerator::Sentence => "sentence",
            BuiltinGenerator::Paragraph => "paragraph",
            BuiltinGenerator::Name => "name",
            BuiltinGenerator::FirstName => "first_name",
            BuiltinGenerator::LastName => "last_name",
            BuiltinGenerator::Email => "email",
            BuiltinGenerator::Username => "username",
            BuiltinGenerator::Company => "company",
            BuiltinGenerator::City => "city",
            BuiltinGenerator::Country => "country",
            BuiltinGenerator::Phone => "phone",
            BuiltinGenerator::Guid => "guid",
            BuiltinGenerator::Integer => "integer",
            BuiltinGenerator::Floating => "floating",
            BuiltinGenerator::Bool => "bool",
            BuiltinGenerator::Date => "date",
        }
    }

    /// Whether values of this generator fit a field of `scalar` type.
    pub fn produces(&self, scalar: &ScalarType) -> bool {
        match self {
            BuiltinGenerator::Integer => matches!(scalar, ScalarType::Int | ScalarType::Float),
            BuiltinGenerator::Floating => matches!(scalar, ScalarType::Float),
            BuiltinGenerator::Bool => matches!(scalar, ScalarType::Boolean),
            BuiltinGenerator::Date => matches!(scalar, ScalarType::DateTime | ScalarType::String),
            _ => matches!(scalar, ScalarType::String),
        }
    }
}

/// Optional plan-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputMode>,
}

/// Shape of the seeding result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Flat list of fixtures in creation order.
    Fixtures,
    /// Persisted records grouped by model name.
    #[default]
    Grouped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_plan_shapes_are_disambiguated() {
        let relation: FieldPlan = serde_json::from_value(json!({ "max": 2 })).expect("relation");
        assert_eq!(
            relation,
            FieldPlan::Relation(RelationPlan {
                min: None,
                max: Some(2)
            })
        );

        let generator: FieldPlan =
            serde_json::from_value(json!({ "generator": "first_name" })).expect("generator");
        assert_eq!(
            generator,
            FieldPlan::Generator(GeneratorPlan {
                generator: BuiltinGenerator::FirstName
            })
        );

        let constant: FieldPlan = serde_json::from_value(json!("Dog")).expect("constant");
        assert_eq!(constant, FieldPlan::Constant(json!("Dog")));

        let object: FieldPlan =
            serde_json::from_value(json!({ "max": 2, "label": "x" })).expect("object constant");
        assert!(matches!(object, FieldPlan::Constant(_)));
    }

    #[test]
    fn generator_type_compatibility() {
        assert!(BuiltinGenerator::Integer.produces(&ScalarType::Int));
        assert!(!BuiltinGenerator::Email.produces(&ScalarType::Int));
        assert!(BuiltinGenerator::Date.produces(&ScalarType::DateTime));
    }
}
