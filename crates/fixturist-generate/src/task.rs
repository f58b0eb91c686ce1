use std::collections::BTreeMap;
use std::sync::Arc;

use crate::relation::Relation;
use crate::scheduler::Step;

/// One record to create.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Global creation index, starting at 0. Doubles as the surrogate
    /// value for integer identifier fields.
    pub order: u64,
    pub model: String,
    pub relations: Arc<BTreeMap<String, Relation>>,
}

/// Replicate every step `amount` times and number tasks globally.
pub fn expand(steps: &[Step]) -> Vec<Task> {
    let mut tasks = Vec::new();
    for step in steps {
        let relations = Arc::new(step.relations.clone());
        for _ in 0..step.amount {
            tasks.push(Task {
                order: tasks.len() as u64,
                model: step.model.clone(),
                relations: Arc::clone(&relations),
            });
        }
    }
    tasks
}
