pub mod attendance;
pub mod common;
pub mod schedule;
pub mod subscription;

pub use attendance::*;
pub use common::*;
pub use schedule::*;
pub use subscription::*;
