use thiserror::Error;

use fixturist_core::CoreError;

/// Errors emitted by the seeding engine. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("invalid relation range on {model}.{field}: min {min} is greater than max {max}")]
    InvalidRelationRange {
        model: String,
        field: String,
        min: u64,
        max: u64,
    },
    #[error(
        "required 1-1 relation {model}.{field} needs equal amounts, got {model}={amount} and {target}={target_amount}"
    )]
    RelationAmountMismatch {
        model: String,
        field: String,
        target: String,
        amount: u64,
        target_amount: u64,
    },
    #[error(
        "insufficient {target} instances for {model}.{field}: required {required}, available {available} (missing {missing})"
    )]
    InsufficientRelationInstances {
        model: String,
        field: String,
        target: String,
        required: u64,
        available: u64,
        missing: u64,
    },
    #[error("cyclic relation between models: {}", .models.join(", "))]
    CyclicRelation { models: Vec<String> },
    #[error(
        "requested {requested} {parent} identifiers for {child} but only {available} unique remain"
    )]
    InsufficientPool {
        parent: String,
        child: String,
        requested: u64,
        available: u64,
    },
    #[error("no generator for {model}.{field} of type {field_type}")]
    UnsupportedFieldType {
        model: String,
        field: String,
        field_type: String,
    },
    #[error("client has no '{delegate}' operation for model {model}")]
    MissingMapping { model: String, delegate: String },
    #[error("invalid factory for {model}.{field}: {reason}")]
    InvalidFactory {
        model: String,
        field: String,
        reason: String,
    },
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("record of {model} is missing identifier data for {field}")]
    MissingIdentifier { model: String, field: String },
    #[error(transparent)]
    InvalidSchema(#[from] CoreError),
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("client failed to create {model}: {source}")]
    Client {
        model: String,
        #[source]
        source: ClientError,
    },
    #[error("{} validation errors: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<SeedError>),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl SeedError {
    /// Collapse collected errors; a single error is returned as itself.
    pub fn aggregate(mut errors: Vec<SeedError>) -> Option<SeedError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(SeedError::Aggregate(errors)),
        }
    }
}

fn join_errors(errors: &[SeedError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors reported by a persistence client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("rejected payload: {0}")]
    Rejected(String),
    #[error("unknown record reference: {0}")]
    UnknownReference(String),
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_keeps_single_error() {
        let single = SeedError::aggregate(vec![SeedError::UnknownModel("Ghost".to_string())]);
        assert!(matches!(single, Some(SeedError::UnknownModel(_))));

        let many = SeedError::aggregate(vec![
            SeedError::UnknownModel("A".to_string()),
            SeedError::UnknownModel("B".to_string()),
        ])
        .expect("aggregate");
        assert_eq!(
            many.to_string(),
            "2 validation errors: unknown model: A; unknown model: B"
        );
        assert!(SeedError::aggregate(Vec::new()).is_none());
    }

    #[test]
    fn cyclic_message_names_models() {
        let err = SeedError::CyclicRelation {
            models: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(err.to_string(), "cyclic relation between models: A, B");
    }
}
