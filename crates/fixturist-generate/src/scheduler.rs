use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::errors::SeedError;
use crate::order::Order;
use crate::relation::{Relation, RelationAction, Role};

/// An order placed in the creation sequence, with every direction pinned.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub order: usize,
    pub model: String,
    pub amount: u64,
    pub relations: BTreeMap<String, Relation>,
}

/// Kahn-style sort over orders. Flexible directions are pinned when their
/// order is placed: towards the target if it is already scheduled, towards
/// the placed model otherwise.
///
/// A compound 1-1 producer also creates its partner inline, so it only
/// becomes ready once the partner's own fixed dependencies are scheduled.
/// Consumers are capped to what their producer step inserts.
pub fn schedule(orders: Vec<Order>) -> Result<Vec<Step>, SeedError> {
    let graph = Graph::new(&orders);
    let mut scheduled: BTreeSet<String> = BTreeSet::new();
    let (ready, mut waiting): (Vec<Order>, Vec<Order>) = orders
        .into_iter()
        .partition(|order| graph.is_ready(order, &scheduled));
    let mut queue: VecDeque<Order> = ready.into();
    let mut steps = Vec::with_capacity(queue.len() + waiting.len());

    while !queue.is_empty() {
        let pick = queue
            .iter()
            .position(|order| keeps_static_direction(order, &scheduled))
            .unwrap_or(0);
        let Some(mut order) = queue.remove(pick) else {
            break;
        };

        for relation in order.relations.values_mut() {
            if relation.direction.optional {
                let from = if scheduled.contains(relation.target()) {
                    relation.target().to_string()
                } else {
                    order.model.clone()
                };
                relation.pin(&from)?;
            }
            if let Some(supply) = supply(&steps, relation) {
                relation.limit_supply(supply)?;
            }
        }

        debug!(
            step = steps.len(),
            model = %order.model,
            amount = order.amount,
            "model scheduled"
        );
        scheduled.insert(order.model.clone());
        steps.push(Step {
            order: steps.len(),
            model: order.model,
            amount: order.amount,
            relations: order.relations,
        });

        let (ready, still_waiting): (Vec<Order>, Vec<Order>) = waiting
            .into_iter()
            .partition(|order| graph.is_ready(order, &scheduled));
        queue.extend(ready);
        waiting = still_waiting;
    }

    if !waiting.is_empty() {
        return Err(SeedError::CyclicRelation {
            models: waiting.into_iter().map(|order| order.model).collect(),
        });
    }

    Ok(steps)
}

/// Identifiers the already scheduled producer inserts for a consumer.
fn supply(steps: &[Step], relation: &Relation) -> Option<u64> {
    if relation.is_self_reference() || relation.role() != Role::Consumer {
        return None;
    }
    let producer = steps.iter().find(|step| step.model == relation.target())?;
    match producer.relations.get(&relation.back_field.name)?.action() {
        RelationAction::Provide { copies } => Some(producer.amount * copies),
        _ => None,
    }
}

/// Fixed dependencies and compound partners per model.
struct Graph {
    fixed: BTreeMap<String, BTreeSet<String>>,
    compound: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    fn new(orders: &[Order]) -> Self {
        let mut fixed: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut compound: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for order in orders {
            for relation in order.relations.values() {
                if relation.is_self_reference() {
                    continue;
                }
                if !relation.direction.optional && relation.direction.from != order.model {
                    fixed
                        .entry(order.model.clone())
                        .or_default()
                        .insert(relation.target().to_string());
                }
                if relation.direction.optional && relation.is_compound_create() {
                    compound
                        .entry(order.model.clone())
                        .or_default()
                        .insert(relation.target().to_string());
                }
            }
        }
        Self { fixed, compound }
    }

    fn is_ready(&self, order: &Order, scheduled: &BTreeSet<String>) -> bool {
        order.relations.values().all(|relation| {
            if relation.is_self_reference() || scheduled.contains(relation.target()) {
                return true;
            }
            if !relation.direction.optional {
                return relation.direction.from == order.model;
            }
            if !relation.is_compound_create() {
                return true;
            }
            let mut visited = BTreeSet::from([order.model.clone()]);
            self.inline_ready(relation.target(), scheduled, &mut visited)
        })
    }

    /// Whether `model` and every partner it creates inline in turn can be
    /// built right now.
    fn inline_ready(
        &self,
        model: &str,
        scheduled: &BTreeSet<String>,
        visited: &mut BTreeSet<String>,
    ) -> bool {
        if !visited.insert(model.to_string()) {
            return true;
        }
        let fixed_ready = self
            .fixed
            .get(model)
            .is_none_or(|targets| targets.iter().all(|target| scheduled.contains(target)));
        fixed_ready
            && self.compound.get(model).is_none_or(|partners| {
                partners
                    .iter()
                    .filter(|partner| !scheduled.contains(*partner))
                    .all(|partner| self.inline_ready(partner, scheduled, visited))
            })
    }
}

fn keeps_static_direction(order: &Order, scheduled: &BTreeSet<String>) -> bool {
    order
        .relations
        .values()
        .filter(|relation| relation.direction.optional && !relation.is_self_reference())
        .all(|relation| {
            relation.direction.from == order.model || scheduled.contains(relation.target())
        })
}
