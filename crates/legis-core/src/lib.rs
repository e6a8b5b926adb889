pub mod errors;
pub mod events;
pub mod models;
pub mod storage;

pub use errors::TimelineError;
pub use events::{TimelineEvent, TimelineEventKind};
pub use models::{
    Comment, DocumentRef, DocumentType, Milestone, MilestoneStatus, Notification,
    NotificationKind, Priority,
};
pub use storage::{CommentStore, MilestoneStore, NotificationStore};
