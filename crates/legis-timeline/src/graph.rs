//! Dependency graph checks over a single document's milestone snapshot.
//!
//! Each milestone carries at most one outgoing `dependency_id` edge, so the
//! per-document graph is a forest as long as it stays acyclic. Validation
//! walks the chain of dependency pointers; the walk is bounded by the size of
//! the snapshot so a cycle already present in storage terminates as
//! `CorruptGraph` instead of looping.

use uuid::Uuid;

use legis_core::{Milestone, MilestoneStatus, TimelineError};

/// Checks that `target_id` is a legal dependency for `milestone_id`.
///
/// The snapshot must hold every milestone of the document. A target outside
/// the snapshot is a cross-document (or unknown) reference; a chain that
/// leads back to `milestone_id` would close a cycle. Both reject with
/// `InvalidDependency` and leave the caller's state untouched.
pub fn validate_dependency(
    milestones: &[Milestone],
    milestone_id: Uuid,
    target_id: Uuid,
) -> Result<(), TimelineError> {
    let Some(target) = find(milestones, target_id) else {
        return Err(TimelineError::InvalidDependency(format!(
            "milestone {target_id} does not belong to the same document"
        )));
    };

    let mut current = target;
    let mut hops = 0usize;
    loop {
        if current.id == milestone_id {
            return Err(TimelineError::InvalidDependency(format!(
                "depending on milestone {target_id} would create a cycle"
            )));
        }

        hops += 1;
        if hops > milestones.len() {
            return Err(TimelineError::CorruptGraph(current.document.id));
        }

        match current.dependency_id {
            None => return Ok(()),
            Some(next) => {
                current = find(milestones, next)
                    .ok_or(TimelineError::CorruptGraph(current.document.id))?;
            }
        }
    }
}

/// Milestones that directly name `id` as their dependency. One level only.
pub fn dependents_of(milestones: &[Milestone], id: Uuid) -> Vec<Uuid> {
    milestones
        .iter()
        .filter(|milestone| milestone.dependency_id == Some(id))
        .map(|milestone| milestone.id)
        .collect()
}

/// A milestone is ready when it has no dependency or its dependency is
/// completed. Advisory only; transitions are never gated on it.
pub fn is_ready(milestones: &[Milestone], id: Uuid) -> Result<bool, TimelineError> {
    let milestone = find(milestones, id).ok_or(TimelineError::NotFound(id))?;
    match milestone.dependency_id {
        None => Ok(true),
        Some(dependency_id) => {
            let dependency = find(milestones, dependency_id)
                .ok_or(TimelineError::CorruptGraph(milestone.document.id))?;
            Ok(dependency.status == MilestoneStatus::Completed)
        }
    }
}

fn find(milestones: &[Milestone], id: Uuid) -> Option<&Milestone> {
    milestones.iter().find(|milestone| milestone.id == id)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use legis_core::{DocumentRef, DocumentType, Priority};

    use super::*;

    fn milestone(id: u128, dependency: Option<u128>, status: MilestoneStatus) -> Milestone {
        let created = Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap();
        Milestone {
            id: Uuid::from_u128(id),
            document: DocumentRef {
                id: Uuid::from_u128(900),
                doc_type: DocumentType::Ordinance,
            },
            name: format!("milestone-{id}"),
            description: None,
            status,
            priority: Priority::Medium,
            start_date: None,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            completed_date: None,
            assigned_to: None,
            dependency_id: dependency.map(Uuid::from_u128),
            notes: None,
            actual_duration_days: None,
            version: 1,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn accepts_dependency_on_unrelated_milestone() {
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, None, MilestoneStatus::Pending),
        ];
        validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(2)).unwrap();
    }

    #[test]
    fn rejects_target_outside_document() {
        let set = vec![milestone(1, None, MilestoneStatus::Pending)];
        let err = validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(77)).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidDependency(_)));
    }

    #[test]
    fn rejects_self_reference() {
        let set = vec![milestone(1, None, MilestoneStatus::Pending)];
        let err = validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(1)).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidDependency(_)));
    }

    #[test]
    fn rejects_two_cycle() {
        // M2 already depends on M1; M1 -> M2 would close the loop.
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(1), MilestoneStatus::Pending),
        ];
        let err = validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(2)).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidDependency(_)));
    }

    #[test]
    fn rejects_long_cycle() {
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(1), MilestoneStatus::Pending),
            milestone(3, Some(2), MilestoneStatus::Pending),
        ];
        let err = validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(3)).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidDependency(_)));
    }

    #[test]
    fn walks_clean_chain_to_its_root() {
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(1), MilestoneStatus::Pending),
            milestone(3, None, MilestoneStatus::Pending),
        ];
        validate_dependency(&set, Uuid::from_u128(3), Uuid::from_u128(2)).unwrap();
    }

    #[test]
    fn pre_existing_cycle_surfaces_as_corruption() {
        // 2 -> 3 -> 2 is already stored; validating an edge for 1 that lands
        // on the loop must not spin and must not read as bad input.
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(3), MilestoneStatus::Pending),
            milestone(3, Some(2), MilestoneStatus::Pending),
        ];
        let err = validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(2)).unwrap_err();
        assert!(matches!(err, TimelineError::CorruptGraph(_)));
    }

    #[test]
    fn dangling_stored_reference_surfaces_as_corruption() {
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(55), MilestoneStatus::Pending),
        ];
        let err = validate_dependency(&set, Uuid::from_u128(1), Uuid::from_u128(2)).unwrap_err();
        assert!(matches!(err, TimelineError::CorruptGraph(_)));
    }

    #[test]
    fn dependents_are_one_level_only() {
        let set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(1), MilestoneStatus::Pending),
            milestone(3, Some(2), MilestoneStatus::Pending),
            milestone(4, Some(1), MilestoneStatus::Pending),
        ];
        let mut dependents = dependents_of(&set, Uuid::from_u128(1));
        dependents.sort();
        assert_eq!(dependents, vec![Uuid::from_u128(2), Uuid::from_u128(4)]);
    }

    #[test]
    fn readiness_follows_dependency_completion() {
        let mut set = vec![
            milestone(1, None, MilestoneStatus::Pending),
            milestone(2, Some(1), MilestoneStatus::Pending),
        ];
        assert!(is_ready(&set, Uuid::from_u128(1)).unwrap());
        assert!(!is_ready(&set, Uuid::from_u128(2)).unwrap());

        set[0].status = MilestoneStatus::Completed;
        assert!(is_ready(&set, Uuid::from_u128(2)).unwrap());
    }
}
