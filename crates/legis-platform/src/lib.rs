pub mod bus;
pub mod config;
pub mod contracts;
pub mod db;

pub use bus::EventBus;
pub use config::ServiceConfig;
pub use contracts::{
    AddCommentRequest, CommentView, CreateMilestoneRequest, DocumentProgressView,
    ListNotificationsQuery, MilestoneDetailView, MilestoneView, NotificationView,
    SetDependencyRequest, TimelineResponse, TransitionRequest, UpdateMilestoneRequest,
};
pub use db::connect_database;
