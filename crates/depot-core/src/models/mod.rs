//! Data models for Depot

mod failed_sync;
mod notification;
mod record;
mod sync_time;
mod table;
mod user_type;

pub use failed_sync::FailedSyncEntry;
pub use notification::{DataRef, NotificationData, NotificationPayload, NotificationTarget};
pub use record::Record;
pub(crate) use record::value_as_i64;
pub use sync_time::SyncTimeEntry;
pub use table::TableId;
pub use user_type::{RoleSet, UserType};
