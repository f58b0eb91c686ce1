use std::collections::BTreeSet;

use crate::error::{CoreError, Result};
use crate::relations::RelationIndex;
use crate::schema::{Datamodel, FieldKind};

/// Validate internal consistency of a datamodel.
///
/// This checks:
/// - duplicate models/fields/enums
/// - every model has an identifier and compound id fields exist
/// - enum fields reference a declared, non-empty enum
/// - relation fields pair up with a back-reference
pub fn validate_datamodel(datamodel: &Datamodel) -> Result<RelationIndex> {
    let mut enums = BTreeSet::new();
    for enum_type in &datamodel.enums {
        if !enums.insert(enum_type.name.as_str()) {
            return Err(CoreError::InvalidSchema(format!(
                "duplicate enum name: {}",
                enum_type.name
            )));
        }
        if enum_type.values.is_empty() {
            return Err(CoreError::InvalidSchema(format!(
                "enum has no values: {}",
                enum_type.name
            )));
        }
    }

    let mut models = BTreeSet::new();
    for model in &datamodel.models {
        if !models.insert(model.name.as_str()) {
            return Err(CoreError::InvalidSchema(format!(
                "duplicate model name: {}",
                model.name
            )));
        }

        let mut fields = BTreeSet::new();
        for field in &model.fields {
            if !fields.insert(field.name.as_str()) {
                return Err(CoreError::InvalidSchema(format!(
                    "duplicate field name: {}.{}",
                    model.name, field.name
                )));
            }
            if field.kind == FieldKind::Enum && !enums.contains(field.field_type.as_str()) {
                return Err(CoreError::InvalidSchema(format!(
                    "enum not found: {} (field {}.{})",
                    field.field_type, model.name, field.name
                )));
            }
        }

        for id_field in &model.id_fields {
            if !fields.contains(id_field.as_str()) {
                return Err(CoreError::InvalidSchema(format!(
                    "id field not found: {}.{}",
                    model.name, id_field
                )));
            }
        }

        if model.identifier_fields().next().is_none() {
            return Err(CoreError::InvalidSchema(format!(
                "model has no identifier: {}",
                model.name
            )));
        }
    }

    RelationIndex::build(datamodel)
}
