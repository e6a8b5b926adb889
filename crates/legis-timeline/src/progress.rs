//! Derived progress and overdue figures for a document's milestone set.
//!
//! Everything here is recomputed from the snapshot on every query; nothing is
//! cached, so the portal's periodic refresh always sees current numbers.

use chrono::NaiveDate;

use legis_core::{Milestone, MilestoneStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub delayed: usize,
    pub cancelled: usize,
}

pub fn status_counts(milestones: &[Milestone]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for milestone in milestones {
        match milestone.status {
            MilestoneStatus::Pending => counts.pending += 1,
            MilestoneStatus::InProgress => counts.in_progress += 1,
            MilestoneStatus::Completed => counts.completed += 1,
            MilestoneStatus::Delayed => counts.delayed += 1,
            MilestoneStatus::Cancelled => counts.cancelled += 1,
        }
    }
    counts
}

/// Completed share of all milestones, rounded to the nearest whole percent.
/// An empty set reads as 0.
pub fn completion_percent(milestones: &[Milestone]) -> u8 {
    if milestones.is_empty() {
        return 0;
    }
    let completed = milestones
        .iter()
        .filter(|milestone| milestone.status == MilestoneStatus::Completed)
        .count();
    (100.0 * completed as f64 / milestones.len() as f64).round() as u8
}

pub fn is_overdue(milestone: &Milestone, today: NaiveDate) -> bool {
    milestone.due_date < today && !milestone.status.is_terminal()
}

pub fn overdue_count(milestones: &[Milestone], today: NaiveDate) -> usize {
    milestones
        .iter()
        .filter(|milestone| is_overdue(milestone, today))
        .count()
}

/// Earliest due date among milestones not yet completed; none when nothing
/// remains.
pub fn next_due(milestones: &[Milestone]) -> Option<NaiveDate> {
    milestones
        .iter()
        .filter(|milestone| milestone.status != MilestoneStatus::Completed)
        .map(|milestone| milestone.due_date)
        .min()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use legis_core::{DocumentRef, DocumentType, Priority};
    use uuid::Uuid;

    use super::*;

    fn milestone(id: u128, status: MilestoneStatus, due: (i32, u32, u32)) -> Milestone {
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
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            completed_date: None,
            assigned_to: None,
            dependency_id: None,
            notes: None,
            actual_duration_days: None,
            version: 1,
            created_at: created,
            updated_at: created,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn empty_set_is_zero_percent() {
        assert_eq!(completion_percent(&[]), 0);
    }

    #[test]
    fn percent_rounds_to_nearest() {
        let set = vec![
            milestone(1, MilestoneStatus::Completed, (2025, 2, 1)),
            milestone(2, MilestoneStatus::Pending, (2025, 2, 1)),
            milestone(3, MilestoneStatus::Pending, (2025, 2, 1)),
        ];
        // 1 of 3 -> 33.33 -> 33
        assert_eq!(completion_percent(&set), 33);

        let set = vec![
            milestone(1, MilestoneStatus::Completed, (2025, 2, 1)),
            milestone(2, MilestoneStatus::Completed, (2025, 2, 1)),
            milestone(3, MilestoneStatus::Pending, (2025, 2, 1)),
        ];
        // 2 of 3 -> 66.67 -> 67
        assert_eq!(completion_percent(&set), 67);
    }

    #[test]
    fn half_completed_document_reads_fifty() {
        let set = vec![
            milestone(1, MilestoneStatus::Completed, (2025, 1, 5)),
            milestone(2, MilestoneStatus::Completed, (2025, 1, 8)),
            milestone(3, MilestoneStatus::Delayed, (2025, 1, 10)),
            milestone(4, MilestoneStatus::Pending, (2025, 2, 1)),
        ];
        assert_eq!(completion_percent(&set), 50);
        let counts = status_counts(&set);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.delayed, 1);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.in_progress, 0);
        // delayed milestone due 2025-01-10 is past today (2025-01-15)
        assert_eq!(overdue_count(&set, today()), 1);
    }

    #[test]
    fn overdue_requires_past_due_and_open_status() {
        let past_open = milestone(1, MilestoneStatus::InProgress, (2025, 1, 10));
        let past_completed = milestone(2, MilestoneStatus::Completed, (2025, 1, 10));
        let past_cancelled = milestone(3, MilestoneStatus::Cancelled, (2025, 1, 10));
        let due_today = milestone(4, MilestoneStatus::Pending, (2025, 1, 15));
        let future = milestone(5, MilestoneStatus::Pending, (2025, 1, 20));

        assert!(is_overdue(&past_open, today()));
        assert!(!is_overdue(&past_completed, today()));
        assert!(!is_overdue(&past_cancelled, today()));
        assert!(!is_overdue(&due_today, today()));
        assert!(!is_overdue(&future, today()));
    }

    #[test]
    fn completing_an_overdue_milestone_clears_overdue() {
        let mut m = milestone(1, MilestoneStatus::InProgress, (2025, 1, 10));
        assert!(is_overdue(&m, today()));
        m.status = MilestoneStatus::Completed;
        assert!(!is_overdue(&m, today()));
    }

    #[test]
    fn next_due_skips_completed_only() {
        let set = vec![
            milestone(1, MilestoneStatus::Completed, (2025, 1, 5)),
            milestone(2, MilestoneStatus::Pending, (2025, 2, 10)),
            milestone(3, MilestoneStatus::Delayed, (2025, 1, 25)),
        ];
        assert_eq!(next_due(&set), NaiveDate::from_ymd_opt(2025, 1, 25));
    }

    #[test]
    fn next_due_empty_when_everything_completed() {
        let set = vec![milestone(1, MilestoneStatus::Completed, (2025, 1, 5))];
        assert_eq!(next_due(&set), None);
        assert_eq!(next_due(&[]), None);
    }
}
