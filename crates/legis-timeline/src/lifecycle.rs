//! Milestone status state machine.

use chrono::{DateTime, Utc};

use legis_core::{Milestone, MilestoneStatus, TimelineError};

/// Legal edges. Completed and cancelled are terminal; delayed work can be
/// resumed; anything non-terminal can be cancelled.
pub fn can_transition(from: MilestoneStatus, to: MilestoneStatus) -> bool {
    use MilestoneStatus::*;
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Cancelled)
            | (InProgress, Completed)
            | (InProgress, Delayed)
            | (InProgress, Cancelled)
            | (Delayed, InProgress)
            | (Delayed, Cancelled)
    )
}

/// Applies `to` in place with its side effects, or rejects with
/// `InvalidTransition` leaving the milestone untouched.
pub fn apply_transition(
    milestone: &mut Milestone,
    to: MilestoneStatus,
    note: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), TimelineError> {
    if !can_transition(milestone.status, to) {
        return Err(TimelineError::InvalidTransition {
            from: milestone.status,
            to,
        });
    }

    milestone.status = to;
    if to == MilestoneStatus::Completed {
        let completed = now.date_naive();
        milestone.completed_date = Some(completed);
        if let Some(start) = milestone.start_date {
            milestone.actual_duration_days = Some((completed - start).num_days());
        }
    }
    if let Some(note) = note {
        append_note(milestone, note);
    }
    milestone.updated_at = now;

    Ok(())
}

/// Appends to the notes log, separated by a line break. Never overwrites.
pub fn append_note(milestone: &mut Milestone, note: &str) {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        return;
    }
    milestone.notes = Some(match milestone.notes.take() {
        Some(existing) => format!("{existing}\n{trimmed}"),
        None => trimmed.to_string(),
    });
}
