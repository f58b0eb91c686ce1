use chrono::SecondsFormat;
use serde_json::{Value, json};

use fixturist_core::{EnumType, Field, ScalarType};

use crate::errors::SeedError;
use crate::faker::{Faker, date_range};

/// Items generated for list scalars.
pub const LIST_SAMPLE_SIZE: usize = 3;

/// Seeded value for a scalar type, or `None` when no generator exists.
pub fn mock_scalar(faker: &mut Faker, scalar: &ScalarType) -> Option<Value> {
    let value = match scalar {
        ScalarType::String => json!(faker.word()),
        ScalarType::Int => json!(faker.integer(-2000, 2000)),
        ScalarType::Float => json!(faker.floating(-1000.0, 1000.0, 2)),
        ScalarType::DateTime => {
            let (start, end) = date_range();
            json!(
                faker
                    .date(start, end)
                    .to_rfc3339_opts(SecondsFormat::Millis, true)
            )
        }
        ScalarType::Boolean => json!(faker.bool()),
        ScalarType::Json => json!({ "name": faker.word() }),
        ScalarType::Other(_) => return None,
    };
    Some(value)
}

/// Value for a non-identifier scalar field; lists are wrapped in `{set}`.
pub fn mock_scalar_field(
    faker: &mut Faker,
    model: &str,
    field: &Field,
) -> Result<Value, SeedError> {
    let scalar = ScalarType::parse(&field.field_type);
    let mut next = || {
        mock_scalar(faker, &scalar).ok_or_else(|| SeedError::UnsupportedFieldType {
            model: model.to_string(),
            field: field.name.clone(),
            field_type: field.field_type.clone(),
        })
    };

    if field.is_list {
        let items = (0..LIST_SAMPLE_SIZE)
            .map(|_| next())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(set(Value::Array(items)))
    } else {
        next()
    }
}

/// Uniform pick from the enum's declared values.
pub fn mock_enum_field(faker: &mut Faker, field: &Field, enum_type: &EnumType) -> Option<Value> {
    if field.is_list {
        let items = (0..LIST_SAMPLE_SIZE)
            .map(|_| faker.pick_one(&enum_type.values).map(|value| json!(value)))
            .collect::<Option<Vec<_>>>()?;
        Some(set(Value::Array(items)))
    } else {
        faker.pick_one(&enum_type.values).map(|value| json!(value))
    }
}

/// String ids get a seeded GUID, integer ids the task's global order.
pub fn mock_identifier(
    faker: &mut Faker,
    model: &str,
    field: &Field,
    order: u64,
) -> Result<Value, SeedError> {
    match ScalarType::parse(&field.field_type) {
        ScalarType::String => Ok(json!(faker.guid())),
        ScalarType::Int => Ok(json!(order)),
        _ => Err(SeedError::UnsupportedFieldType {
            model: model.to_string(),
            field: field.name.clone(),
            field_type: field.field_type.clone(),
        }),
    }
}

pub fn set(items: Value) -> Value {
    json!({ "set": items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_scalars_are_wrapped() {
        let mut faker = Faker::new(42);
        let field = Field::scalar("tags", "String").list();
        let value = mock_scalar_field(&mut faker, "Post", &field).expect("tags");
        let items = value["set"].as_array().expect("set array");
        assert_eq!(items.len(), LIST_SAMPLE_SIZE);
        assert!(items.iter().all(Value::is_string));
    }

    #[test]
    fn scalar_ranges_follow_defaults() {
        let mut faker = Faker::new(5);
        for _ in 0..50 {
            let int = mock_scalar(&mut faker, &ScalarType::Int).and_then(|v| v.as_i64());
            assert!(int.is_some_and(|v| (-2000..=2000).contains(&v)));
            let float = mock_scalar(&mut faker, &ScalarType::Float).and_then(|v| v.as_f64());
            assert!(float.is_some_and(|v| (-1000.0..=1000.0).contains(&v)));
        }
        let json = mock_scalar(&mut faker, &ScalarType::Json).expect("json");
        assert!(json["name"].is_string());
    }

    #[test]
    fn unsupported_types_are_reported() {
        let mut faker = Faker::new(5);
        let field = Field::scalar("blob", "Bytes");
        let err = mock_scalar_field(&mut faker, "File", &field).expect_err("bytes");
        assert!(matches!(err, SeedError::UnsupportedFieldType { ref field_type, .. } if field_type == "Bytes"));

        let id = Field::scalar("id", "Float").id();
        assert!(mock_identifier(&mut faker, "File", &id, 0).is_err());
        let id = Field::scalar("id", "Int").id();
        assert_eq!(mock_identifier(&mut faker, "File", &id, 7).expect("int id"), json!(7));
    }

    #[test]
    fn enum_values_come_from_declaration() {
        let mut faker = Faker::new(5);
        let species = EnumType {
            name: "Species".to_string(),
            values: vec!["Dog".to_string(), "Cat".to_string()],
        };
        let field = Field::enumeration("species", "Species");
        for _ in 0..20 {
            let value = mock_enum_field(&mut faker, &field, &species).expect("value");
            assert!(value == "Dog" || value == "Cat");
        }
    }
}
