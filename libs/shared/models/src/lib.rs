pub mod error;
pub mod time;

pub use error::TimeError;
pub use time::{overlaps, TimeOfDay, MINUTES_PER_DAY};
