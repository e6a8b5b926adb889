pub mod graph;
pub mod lifecycle;
pub mod notify;
pub mod progress;
pub mod service;

pub use notify::NotificationDispatcher;
pub use progress::StatusCounts;
pub use service::{
    DocumentProgress, MilestoneDetail, MilestonePatch, NewMilestone, TimelineService,
};
