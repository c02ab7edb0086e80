//! Bounded Retention Buffer
//!
//! Provides a capacity- and age-bounded ring buffer for time-ordered records
//! (telemetry readings, health-score samples, analytics points).

mod buffer;

pub use buffer::{RetentionPolicy, RingBuffer, DEFAULT_CAPACITY};

use chrono::{DateTime, Utc};

/// Records that carry the instant they describe
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}
