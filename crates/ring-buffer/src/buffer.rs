//! Ring Buffer Implementation

use crate::Timestamped;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default buffer capacity (one day of samples at one per minute)
pub const DEFAULT_CAPACITY: usize = 1440;

/// How much history a buffer keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Maximum number of records kept
    pub capacity: usize,
    /// Maximum age of the oldest record relative to the newest one (seconds)
    pub max_age_secs: Option<u64>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_age_secs: None,
        }
    }
}

/// Ring buffer of time-ordered records
///
/// Records are appended in time order. When the buffer is full the oldest
/// record is overwritten; when a maximum age is configured, records older than
/// `newest - max_age` are pruned on every push. Age is measured against the
/// newest record rather than the wall clock so retention is deterministic.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    storage: VecDeque<T>,
    capacity: usize,
    max_age: Option<Duration>,
}

impl<T: Timestamped + Clone> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            max_age: None,
        }
    }

    /// Create a buffer from a retention policy
    pub fn with_policy(policy: RetentionPolicy) -> Self {
        let mut buffer = Self::new(policy.capacity);
        buffer.max_age = policy
            .max_age_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds);
        buffer
    }

    /// Push a record into the buffer (overwrites oldest if full)
    pub fn push(&mut self, item: T) {
        let newest = item.timestamp();
        while self.storage.len() >= self.capacity {
            self.storage.pop_front();
        }
        self.storage.push_back(item);
        self.evict_older_than(newest);
    }

    fn evict_older_than(&mut self, newest: DateTime<Utc>) {
        let Some(max_age) = self.max_age else {
            return;
        };
        let Some(cutoff) = newest.checked_sub_signed(max_age) else {
            return;
        };
        while let Some(front) = self.storage.front() {
            if front.timestamp() < cutoff {
                self.storage.pop_front();
            } else {
                break;
            }
        }
    }

    /// Get the number of records currently in the buffer
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Read the last N records in time order (oldest first)
    pub fn tail(&self, count: usize) -> Vec<T> {
        let skip = self.storage.len().saturating_sub(count);
        self.storage.iter().skip(skip).cloned().collect()
    }

    /// Read records at or after `since` in time order
    pub fn read_since(&self, since: DateTime<Utc>) -> Vec<T> {
        self.storage
            .iter()
            .filter(|r| r.timestamp() >= since)
            .cloned()
            .collect()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.storage.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        at: DateTime<Utc>,
        value: f64,
    }

    impl Timestamped for Point {
        fn timestamp(&self) -> DateTime<Utc> {
            self.at
        }
    }

    fn point(secs: i64, value: f64) -> Point {
        Point {
            at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn test_push_and_read() {
        let mut buffer = RingBuffer::new(10);

        for i in 0..5 {
            buffer.push(point(i, i as f64 * 100.0));
        }

        assert_eq!(buffer.len(), 5);

        assert_eq!(buffer.tail(10).len(), 5);
        let tail = buffer.tail(2);
        assert_eq!(tail[0].value, 300.0);
        assert_eq!(tail[1].value, 400.0);
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut buffer = RingBuffer::new(5);

        for i in 0..10 {
            buffer.push(point(i, i as f64));
        }

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.iter().next().map(|p| p.value), Some(5.0));
        assert_eq!(buffer.tail(1)[0].value, 9.0);
    }

    #[test]
    fn test_age_eviction_relative_to_newest() {
        let mut buffer = RingBuffer::with_policy(RetentionPolicy {
            capacity: 100,
            max_age_secs: Some(60),
        });

        buffer.push(point(0, 1.0));
        buffer.push(point(30, 2.0));
        buffer.push(point(61, 3.0));

        // The first point is now 61s older than the newest
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.iter().next().map(|p| p.value), Some(2.0));
    }

    #[test]
    fn test_read_since() {
        let mut buffer = RingBuffer::new(10);
        for i in 0..5 {
            buffer.push(point(i * 10, i as f64));
        }

        let since = buffer.read_since(point(20, 0.0).at);
        assert_eq!(since.len(), 3);
        assert_eq!(since[0].value, 2.0);
    }

    proptest::proptest! {
        #[test]
        fn prop_never_exceeds_capacity(capacity in 1usize..32, pushes in 0usize..128) {
            let mut buffer = RingBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(point(i as i64, i as f64));
            }
            proptest::prop_assert!(buffer.len() <= capacity);
            proptest::prop_assert_eq!(buffer.len(), pushes.min(capacity));
        }
    }
}
