use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Top-level datamodel snapshot returned by a schema provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Datamodel {
    /// Models in declaration order.
    pub models: Vec<Model>,
    /// Enum declarations referenced by enum fields.
    #[serde(default)]
    pub enums: Vec<EnumType>,
}

impl Datamodel {
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.name == name)
    }

    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        self.enums.iter().find(|enum_type| enum_type.name == name)
    }

    /// SHA-256 fingerprint of the canonical JSON encoding.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|err| CoreError::Other(format!("failed to encode datamodel: {err}")))?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// A named entity with ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Model {
    pub name: String,
    /// Name used by the persistence client when it differs from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<String>,
    pub fields: Vec<Field>,
    /// Compound identifier field names; single ids are usually flagged on the field.
    #[serde(default)]
    pub id_fields: Vec<String>,
}

impl Model {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            mapping: None,
            fields,
            id_fields: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn is_id_field(&self, field: &Field) -> bool {
        field.is_id || self.id_fields.iter().any(|name| name == &field.name)
    }

    /// Fields that together identify a persisted record.
    pub fn identifier_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| self.is_id_field(field))
    }

    pub fn relation_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.is_relation())
    }

    /// Key of the client operation that creates records of this model.
    pub fn delegate_name(&self) -> String {
        let mapping = self.mapping.as_deref().unwrap_or(&self.name);
        let mut chars = mapping.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Field metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    /// Scalar type name, enum name, or related model name.
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_id: bool,
    /// The persistence layer fills the value when it is omitted.
    #[serde(default)]
    pub has_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_name: Option<String>,
}

impl Field {
    pub fn scalar(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar,
            field_type: field_type.into(),
            is_list: false,
            is_required: true,
            is_id: false,
            has_default: false,
            relation_name: None,
        }
    }

    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Enum,
            ..Self::scalar(name, enum_name)
        }
    }

    pub fn relation(
        name: impl Into<String>,
        target: impl Into<String>,
        relation_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: FieldKind::Relation,
            relation_name: Some(relation_name.into()),
            ..Self::scalar(name, target)
        }
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_required = false;
        self
    }

    pub fn id(mut self) -> Self {
        self.is_id = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn is_relation(&self) -> bool {
        self.kind == FieldKind::Relation
    }

    /// Required and singular; list requiredness carries no meaning here.
    pub fn is_required_single(&self) -> bool {
        self.is_required && !self.is_list
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            FieldKind::Scalar => Some(ScalarType::parse(&self.field_type)),
            FieldKind::Enum | FieldKind::Relation => None,
        }
    }
}

/// Kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Enum,
    #[serde(alias = "object")]
    Relation,
}

/// Scalar types with built-in value generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Float,
    DateTime,
    Boolean,
    Json,
    Other(String),
}

impl ScalarType {
    pub fn parse(value: &str) -> Self {
        match value {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "DateTime" => Self::DateTime,
            "Boolean" => Self::Boolean,
            "Json" => Self::Json,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::DateTime => "DateTime",
            Self::Boolean => "Boolean",
            Self::Json => "Json",
            Self::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enum declaration with ordered values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}
