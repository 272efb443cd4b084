pub mod recurrence;
pub mod time;

pub use recurrence::{Frequency, Recurrence};
pub use time::*;
