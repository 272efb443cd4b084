pub mod activity_service;
pub mod attendance_service;
pub mod freeze_service;
pub mod ledger;
pub mod notification_service;
pub mod schedule_service;
pub mod sinks;

pub use activity_service::*;
pub use attendance_service::*;
pub use freeze_service::*;
pub use notification_service::*;
pub use schedule_service::*;
pub use sinks::*;
