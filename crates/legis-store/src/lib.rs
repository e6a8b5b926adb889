pub mod memory;
pub mod postgres;

pub use memory::{MemoryCommentStore, MemoryMilestoneStore, MemoryNotificationStore};
pub use postgres::{PgCommentStore, PgMilestoneStore, PgNotificationStore};
