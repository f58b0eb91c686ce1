use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value, json};

use fixturist_core::{Datamodel, Field, Model, ScalarType};

use crate::errors::ClientError;

/// Persisted record as returned by a client.
pub type Record = Map<String, Value>;

/// Relations to return alongside the created record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Include(pub BTreeMap<String, IncludeEntry>);

impl Include {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&IncludeEntry> {
        self.0.get(field)
    }
}

/// Serializes to `true` or `{"include": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IncludeEntry {
    All(bool),
    Nested { include: Include },
}

impl IncludeEntry {
    pub fn nested(include: Include) -> Self {
        if include.is_empty() {
            IncludeEntry::All(true)
        } else {
            IncludeEntry::Nested { include }
        }
    }

    fn inner(&self) -> Option<&Include> {
        match self {
            IncludeEntry::All(_) => None,
            IncludeEntry::Nested { include } => Some(include),
        }
    }
}

/// Arguments of a create call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateArgs {
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Include>,
}

/// Per-model create operation.
#[async_trait]
pub trait ModelDelegate: Send + Sync {
    async fn create(&self, args: CreateArgs) -> Result<Record, ClientError>;
}

/// Persistence client exposing one delegate per model mapping.
pub trait Client: Send + Sync {
    /// Delegate keyed by the lower-first model mapping name.
    fn delegate(&self, name: &str) -> Option<&dyn ModelDelegate>;
}

/// Create call captured by [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateCall {
    pub model: String,
    pub args: CreateArgs,
}

/// In-memory client that enforces identifier and reference integrity.
#[derive(Debug, Clone)]
pub struct MemoryClient {
    store: Arc<Mutex<MemoryStore>>,
    delegates: BTreeMap<String, MemoryDelegate>,
}

impl MemoryClient {
    pub fn new(datamodel: &Datamodel) -> Self {
        let store = Arc::new(Mutex::new(MemoryStore {
            datamodel: datamodel.clone(),
            records: BTreeMap::new(),
            calls: Vec::new(),
            failing: BTreeSet::new(),
        }));
        let delegates = datamodel
            .models
            .iter()
            .map(|model| {
                (
                    model.delegate_name(),
                    MemoryDelegate {
                        model: model.name.clone(),
                        store: Arc::clone(&store),
                    },
                )
            })
            .collect();
        Self { store, delegates }
    }

    /// Make every create of `model` fail.
    pub fn fail_on(self, model: &str) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.failing.insert(model.to_string());
        }
        self
    }

    pub fn calls(&self) -> Vec<CreateCall> {
        self.store
            .lock()
            .map(|store| store.calls.clone())
            .unwrap_or_default()
    }

    pub fn records(&self, model: &str) -> Vec<Record> {
        self.store
            .lock()
            .ok()
            .and_then(|store| store.records.get(model).cloned())
            .unwrap_or_default()
    }
}

impl Client for MemoryClient {
    fn delegate(&self, name: &str) -> Option<&dyn ModelDelegate> {
        self.delegates
            .get(name)
            .map(|delegate| delegate as &dyn ModelDelegate)
    }
}

#[derive(Debug, Clone)]
struct MemoryDelegate {
    model: String,
    store: Arc<Mutex<MemoryStore>>,
}

#[async_trait]
impl ModelDelegate for MemoryDelegate {
    async fn create(&self, args: CreateArgs) -> Result<Record, ClientError> {
        let mut store = lock(&self.store)?;
        store.calls.push(CreateCall {
            model: self.model.clone(),
            args: args.clone(),
        });
        if store.failing.contains(&self.model) {
            return Err(ClientError::Rejected(format!(
                "{} is configured to fail",
                self.model
            )));
        }
        store.create(&self.model, args.data, args.include.as_ref(), None)
    }
}

fn lock(store: &Mutex<MemoryStore>) -> Result<MutexGuard<'_, MemoryStore>, ClientError> {
    store
        .lock()
        .map_err(|_| ClientError::Other("memory store lock poisoned".to_string()))
}

#[derive(Debug)]
struct MemoryStore {
    datamodel: Datamodel,
    records: BTreeMap<String, Vec<Record>>,
    calls: Vec<CreateCall>,
    failing: BTreeSet<String>,
}

impl MemoryStore {
    /// `linked_via` names the relation field satisfied by an enclosing
    /// nested create.
    fn create(
        &mut self,
        model_name: &str,
        mut data: Map<String, Value>,
        include: Option<&Include>,
        linked_via: Option<&str>,
    ) -> Result<Record, ClientError> {
        let model = self
            .datamodel
            .model(model_name)
            .cloned()
            .ok_or_else(|| ClientError::Rejected(format!("unknown model {model_name}")))?;

        if let Some(unknown) = data.keys().find(|key| model.field(key).is_none()) {
            return Err(ClientError::Rejected(format!(
                "unknown field {model_name}.{unknown}"
            )));
        }

        let mut record = Record::new();
        let mut related: BTreeMap<String, Value> = BTreeMap::new();

        for field in &model.fields {
            let value = data.remove(&field.name);
            if field.is_relation() {
                let satisfied = linked_via == Some(field.name.as_str());
                if let Some(value) = self.resolve_relation(&model, field, value, include, satisfied)? {
                    related.insert(field.name.clone(), value);
                }
                continue;
            }

            match value {
                Some(Value::Object(mut wrapper)) if field.is_list && wrapper.contains_key("set") => {
                    record.insert(field.name.clone(), wrapper.remove("set").unwrap_or(json!([])));
                }
                Some(value) => {
                    record.insert(field.name.clone(), value);
                }
                None if model.is_id_field(field) => {
                    let value = self.default_id(&model, field)?;
                    record.insert(field.name.clone(), value);
                }
                None => {}
            }
        }

        if self.find(&model, &identifier(&model, &record)).is_some() {
            return Err(ClientError::Rejected(format!(
                "duplicate identifier for {model_name}"
            )));
        }
        self.records
            .entry(model.name.clone())
            .or_default()
            .push(record.clone());

        let mut returned = record;
        returned.extend(related);
        Ok(returned)
    }

    fn resolve_relation(
        &mut self,
        model: &Model,
        field: &Field,
        value: Option<Value>,
        include: Option<&Include>,
        satisfied: bool,
    ) -> Result<Option<Value>, ClientError> {
        let target = field.field_type.clone();
        let entry = include.and_then(|include| include.get(&field.name));

        let Some(Value::Object(mut payload)) = value else {
            if field.is_required_single() && !satisfied {
                return Err(ClientError::Rejected(format!(
                    "missing required relation {}.{}",
                    model.name, field.name
                )));
            }
            return Ok(None);
        };

        if let Some(nested) = payload.remove("create") {
            let Value::Object(nested) = nested else {
                return Err(ClientError::Rejected(format!(
                    "nested create for {}.{} must be an object",
                    model.name, field.name
                )));
            };
            let back = self.back_field_name(model, field);
            let inner = entry.and_then(IncludeEntry::inner);
            let created = self.create(&target, nested, inner, back.as_deref())?;
            return Ok(entry.map(|_| Value::Object(created)));
        }

        let Some(connect) = payload.remove("connect") else {
            return Err(ClientError::Rejected(format!(
                "relation {}.{} needs a create or connect payload",
                model.name, field.name
            )));
        };
        let target_model = self
            .datamodel
            .model(&target)
            .cloned()
            .ok_or_else(|| ClientError::Rejected(format!("unknown model {target}")))?;
        let references = match connect {
            Value::Array(items) if field.is_list => items,
            Value::Object(item) if !field.is_list => vec![Value::Object(item)],
            _ => {
                return Err(ClientError::Rejected(format!(
                    "connect shape does not match {}.{}",
                    model.name, field.name
                )));
            }
        };

        let mut connected = Vec::with_capacity(references.len());
        for reference in references {
            let Value::Object(reference) = reference else {
                return Err(ClientError::UnknownReference(reference.to_string()));
            };
            let found = self
                .find(&target_model, &reference)
                .cloned()
                .ok_or_else(|| ClientError::UnknownReference(Value::Object(reference).to_string()))?;
            connected.push(Value::Object(found));
        }

        Ok(entry.map(|_| {
            if field.is_list {
                Value::Array(connected)
            } else {
                connected.pop().unwrap_or(Value::Null)
            }
        }))
    }

    fn back_field_name(&self, model: &Model, field: &Field) -> Option<String> {
        let target = self.datamodel.model(&field.field_type)?;
        target
            .relation_fields()
            .find(|candidate| {
                candidate.relation_name == field.relation_name && candidate.field_type == model.name
            })
            .map(|candidate| candidate.name.clone())
    }

    fn default_id(&self, model: &Model, field: &Field) -> Result<Value, ClientError> {
        match field.scalar_type() {
            Some(ScalarType::Int) => {
                let next = self
                    .records
                    .get(&model.name)
                    .into_iter()
                    .flatten()
                    .filter_map(|record| record.get(&field.name).and_then(Value::as_i64))
                    .max()
                    .map_or(1, |max| max + 1);
                Ok(json!(next))
            }
            Some(ScalarType::String) => Ok(json!(uuid::Uuid::new_v4().to_string())),
            _ => Err(ClientError::Rejected(format!(
                "cannot default identifier {}.{} of type {}",
                model.name, field.name, field.field_type
            ))),
        }
    }

    fn find(&self, model: &Model, reference: &Map<String, Value>) -> Option<&Record> {
        if reference.is_empty() {
            return None;
        }
        self.records.get(&model.name)?.iter().find(|record| {
            reference
                .iter()
                .all(|(key, value)| record.get(key) == Some(value))
        })
    }
}

fn identifier(model: &Model, record: &Record) -> Map<String, Value> {
    model
        .identifier_fields()
        .filter_map(|field| {
            record
                .get(&field.name)
                .map(|value| (field.name.clone(), value.clone()))
        })
        .collect()
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
                        Field::scalar("tags", "String").list(),
                        Field::relation("profile", "Profile", "ProfileToUser"),
                    ],
                ),
                Model::new(
                    "Profile",
                    vec![
                        Field::scalar("id", "String").id().with_default(),
                        Field::relation("user", "User", "ProfileToUser"),
                    ],
                ),
            ],
            enums: Vec::new(),
        }
    }

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn nested_create_returns_included_record() {
        let client = MemoryClient::new(&datamodel());
        let delegate = client.delegate("user").expect("user delegate");

        let mut include = Include::default();
        include.0.insert("profile".to_string(), IncludeEntry::All(true));
        let record = delegate
            .create(CreateArgs {
                data: data(json!({
                    "id": 0,
                    "tags": { "set": ["a", "b"] },
                    "profile": { "create": {} }
                })),
                include: Some(include),
            })
            .await
            .expect("create user");

        assert_eq!(record["tags"], json!(["a", "b"]));
        assert!(record["profile"]["id"].is_string());
        assert_eq!(client.records("Profile").len(), 1);
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn rejects_missing_required_relation_and_unknown_references() {
        let client = MemoryClient::new(&datamodel());
        let profile = client.delegate("profile").expect("profile delegate");

        let err = profile
            .create(CreateArgs::default())
            .await
            .expect_err("missing user");
        assert!(err.to_string().contains("missing required relation Profile.user"));

        let err = profile
            .create(CreateArgs {
                data: data(json!({ "user": { "connect": { "id": 99 } } })),
                include: None,
            })
            .await
            .expect_err("unknown user");
        assert!(matches!(err, ClientError::UnknownReference(_)));
    }

    #[test]
    fn include_serializes_like_query_arguments() {
        let mut inner = Include::default();
        inner.0.insert("pets".to_string(), IncludeEntry::All(true));
        let mut include = Include::default();
        include.0.insert("profile".to_string(), IncludeEntry::nested(inner));
        include
            .0
            .insert("house".to_string(), IncludeEntry::nested(Include::default()));

        let json = serde_json::to_value(&include).expect("serialize include");
        assert_eq!(
            json,
            json!({ "house": true, "profile": { "include": { "pets": true } } })
        );
    }
}
