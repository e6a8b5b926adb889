use thiserror::Error;
use uuid::Uuid;

use crate::models::MilestoneStatus;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("{0}")]
    Validation(String),

    #[error("milestone {0} not found")]
    NotFound(Uuid),

    #[error("invalid dependency: {0}")]
    InvalidDependency(String),

    #[error("cannot transition milestone from {from} to {to}")]
    InvalidTransition {
        from: MilestoneStatus,
        to: MilestoneStatus,
    },

    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("milestone {0} was modified concurrently")]
    StaleUpdate(Uuid),

    /// The stored dependency graph for a document is already inconsistent
    /// (cycle or dangling reference). Bad stored state, not bad input.
    #[error("dependency graph for document {0} is corrupted")]
    CorruptGraph(Uuid),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_both_statuses() {
        let err = TimelineError::InvalidTransition {
            from: MilestoneStatus::Completed,
            to: MilestoneStatus::Pending,
        };
        assert_eq!(
            err.to_string(),
            "cannot transition milestone from completed to pending"
        );
    }

    #[test]
    fn corrupt_graph_reads_differently_from_invalid_dependency() {
        let document = Uuid::nil();
        let corrupt = TimelineError::CorruptGraph(document).to_string();
        let invalid = TimelineError::InvalidDependency("cycle".to_string()).to_string();
        assert!(corrupt.contains("corrupted"));
        assert!(invalid.starts_with("invalid dependency"));
    }
}
