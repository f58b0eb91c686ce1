use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::debug;

use fixturist_core::{Datamodel, FieldKind, Model};

use crate::client::{Client, CreateArgs, Include, IncludeEntry, Record};
use crate::errors::SeedError;
use crate::faker::Faker;
use crate::pool::{IdentifierPool, RecordId};
use crate::relation::{Relation, RelationAction};
use crate::scalars::{mock_enum_field, mock_identifier, mock_scalar_field, set};
use crate::seed_models::SeedModels;
use crate::task::Task;

/// Persisted result of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub model: String,
    /// Global creation index of the originating task.
    pub order: u64,
    /// Record returned by the client.
    pub seed: Record,
    pub relations: Arc<BTreeMap<String, Relation>>,
}

/// Outcome of walking every task.
#[derive(Debug)]
pub struct Materialized {
    pub fixtures: Vec<Fixture>,
    pub pool: IdentifierPool,
}

/// Payload under construction for one record.
#[derive(Debug, Default)]
struct Mock {
    data: Map<String, Value>,
    include: Include,
    nested: Vec<NestedMock>,
}

/// A task created inline through a parent's relation field.
#[derive(Debug)]
struct NestedMock {
    field: String,
    task: Task,
    nested: Vec<NestedMock>,
}

/// Walks tasks in creation order, threading the identifier pool.
pub struct Materializer<'a> {
    client: &'a dyn Client,
    datamodel: &'a Datamodel,
    seed_models: &'a SeedModels,
    faker: &'a mut Faker,
    pool: IdentifierPool,
    /// Records already wired per `(model, field)` consumer relation.
    served: BTreeMap<(String, String), u64>,
}

impl<'a> Materializer<'a> {
    pub fn new(
        client: &'a dyn Client,
        datamodel: &'a Datamodel,
        seed_models: &'a SeedModels,
        faker: &'a mut Faker,
    ) -> Self {
        Self {
            client,
            datamodel,
            seed_models,
            faker,
            pool: IdentifierPool::new(),
            served: BTreeMap::new(),
        }
    }

    pub async fn run(mut self, tasks: Vec<Task>) -> Result<Materialized, SeedError> {
        let mut queue: VecDeque<Task> = tasks.into();
        let mut fixtures = Vec::with_capacity(queue.len());
        let client = self.client;

        while let Some(task) = queue.pop_front() {
            let model = self.model(&task.model)?;
            let delegate_name = model.delegate_name();
            let delegate =
                client
                    .delegate(&delegate_name)
                    .ok_or_else(|| SeedError::MissingMapping {
                        model: model.name.clone(),
                        delegate: delegate_name.clone(),
                    })?;

            let mock = self.mock_task(&task, &mut queue)?;
            let include = (!mock.include.is_empty()).then_some(mock.include);
            let record = delegate
                .create(CreateArgs {
                    data: mock.data,
                    include,
                })
                .await
                .map_err(|source| SeedError::Client {
                    model: model.name.clone(),
                    source,
                })?;
            debug!(model = %task.model, order = task.order, "record created");

            self.record(task, record, mock.nested, &mut fixtures)?;
        }

        Ok(Materialized {
            fixtures,
            pool: self.pool,
        })
    }

    fn model(&self, name: &str) -> Result<&'a Model, SeedError> {
        self.datamodel
            .model(name)
            .ok_or_else(|| SeedError::UnknownModel(name.to_string()))
    }

    fn mock_task(&mut self, task: &Task, queue: &mut VecDeque<Task>) -> Result<Mock, SeedError> {
        let model = self.model(&task.model)?;
        let mut mock = Mock::default();

        for field in &model.fields {
            let is_id = model.is_id_field(field);
            if is_id && field.has_default {
                continue;
            }

            if !field.is_relation() {
                if let Some(entry) = self.seed_models.factory(&model.name, &field.name) {
                    if let Some(value) = entry.value(self.faker) {
                        let value = match value {
                            Value::Array(_) if field.is_list => set(value),
                            other if field.is_list => set(Value::Array(vec![other])),
                            other => other,
                        };
                        mock.data.insert(field.name.clone(), value);
                        continue;
                    }
                }
            }

            let value = match field.kind {
                FieldKind::Scalar if is_id => {
                    mock_identifier(self.faker, &model.name, field, task.order)?
                }
                FieldKind::Scalar => mock_scalar_field(self.faker, &model.name, field)?,
                FieldKind::Enum => self
                    .datamodel
                    .enum_type(&field.field_type)
                    .and_then(|enum_type| mock_enum_field(self.faker, field, enum_type))
                    .ok_or_else(|| SeedError::UnsupportedFieldType {
                        model: model.name.clone(),
                        field: field.name.clone(),
                        field_type: field.field_type.clone(),
                    })?,
                FieldKind::Relation => {
                    let relation = task.relations.get(&field.name).ok_or_else(|| {
                        SeedError::InvalidPlan(format!(
                            "no relation resolved for {}.{}",
                            model.name, field.name
                        ))
                    })?;
                    match self.mock_relation(relation, queue, &mut mock)? {
                        Some(value) => value,
                        None => continue,
                    }
                }
            };
            mock.data.insert(field.name.clone(), value);
        }

        Ok(mock)
    }

    fn mock_relation(
        &mut self,
        relation: &Relation,
        queue: &mut VecDeque<Task>,
        mock: &mut Mock,
    ) -> Result<Option<Value>, SeedError> {
        let field = &relation.field;
        match relation.action() {
            RelationAction::Skip | RelationAction::Provide { .. } => Ok(None),
            RelationAction::CreateNested => {
                let position = queue
                    .iter()
                    .position(|candidate| candidate.model == relation.target())
                    .ok_or_else(|| SeedError::InsufficientRelationInstances {
                        model: relation.model.clone(),
                        field: field.name.clone(),
                        target: relation.target().to_string(),
                        required: 1,
                        available: 0,
                        missing: 1,
                    })?;
                let Some(task) = queue.remove(position) else {
                    return Ok(None);
                };

                let nested = self.mock_task(&task, queue)?;
                mock.include
                    .0
                    .insert(field.name.clone(), IncludeEntry::nested(nested.include));
                mock.nested.push(NestedMock {
                    field: field.name.clone(),
                    task,
                    nested: nested.nested,
                });
                Ok(Some(json!({ "create": nested.data })))
            }
            RelationAction::Connect { min, max } => {
                let units = self.faker.count(min, max);
                let units = units.min(self.spare(relation, min)).max(min);
                let ids = self
                    .pool
                    .draw(relation.target(), &relation.model, units)?;
                Ok(connect(field.is_list, ids))
            }
            RelationAction::ConnectEarlier { max, .. } => {
                let units = self.faker.count(0, max);
                let units = units.min(self.pool.distinct(&relation.model, &relation.model));
                let ids = self.pool.draw(&relation.model, &relation.model, units)?;
                Ok(connect(field.is_list, ids))
            }
        }
    }

    /// Identifiers this record may take beyond its minimum while leaving
    /// every later record of the model its own minimum.
    fn spare(&mut self, relation: &Relation, min: u64) -> u64 {
        let served = self
            .served
            .entry((relation.model.clone(), relation.field.name.clone()))
            .or_default();
        let later = relation.amount.saturating_sub(*served + 1);
        *served += 1;

        let (parent, child) = (relation.target(), relation.model.as_str());
        let reserved = min * later;
        self.pool
            .distinct(parent, child)
            .min(self.pool.remaining(parent, child).saturating_sub(reserved))
    }

    /// Register a persisted record and the records it created inline.
    fn record(
        &mut self,
        task: Task,
        record: Record,
        nested: Vec<NestedMock>,
        fixtures: &mut Vec<Fixture>,
    ) -> Result<(), SeedError> {
        let model = self.model(&task.model)?;
        let id = record_id(model, &record)?;

        for relation in task.relations.values() {
            match relation.action() {
                RelationAction::Provide { copies } => {
                    self.pool.insert(&model.name, relation.target(), &id, copies);
                }
                RelationAction::ConnectEarlier { copies, .. } => {
                    self.pool.insert(&model.name, &model.name, &id, copies);
                }
                _ => {}
            }
        }

        let children: Vec<(NestedMock, Record)> = nested
            .into_iter()
            .map(|child| match record.get(&child.field) {
                Some(Value::Object(child_record)) => Ok((child, child_record.clone())),
                _ => Err(SeedError::MissingIdentifier {
                    model: child.task.model.clone(),
                    field: child.field.clone(),
                }),
            })
            .collect::<Result<_, _>>()?;

        fixtures.push(Fixture {
            model: task.model,
            order: task.order,
            seed: record,
            relations: task.relations,
        });

        for (child, child_record) in children {
            self.record(child.task, child_record, child.nested, fixtures)?;
        }
        Ok(())
    }
}

fn connect(is_list: bool, ids: Vec<RecordId>) -> Option<Value> {
    let payload = match (is_list, ids.len()) {
        (_, 0) => return None,
        (true, _) => Value::Array(ids.into_iter().map(RecordId::into_value).collect()),
        (false, _) => ids.into_iter().next().map(RecordId::into_value)?,
    };
    Some(json!({ "connect": payload }))
}

/// Identifier field values of a persisted record.
pub fn record_id(model: &Model, record: &Record) -> Result<RecordId, SeedError> {
    let mut id = Map::new();
    for field in model.identifier_fields() {
        let value = record
            .get(&field.name)
            .ok_or_else(|| SeedError::MissingIdentifier {
                model: model.name.clone(),
                field: field.name.clone(),
            })?;
        id.insert(field.name.clone(), value.clone());
    }
    Ok(RecordId(id))
}
