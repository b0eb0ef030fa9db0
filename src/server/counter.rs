//! Connection counting
//!
//! Process-wide connection counter shared with the engine's session hooks.
//! The in-memory value is authoritative for a live process; the JSON record
//! on disk is advisory, written best-effort on every mutation and read once
//! at construction for crash-recovery display.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Durable form of the counter: last written count and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    pub count: u64,
    pub timestamp: u64,
}

pub struct ConnectionCounter {
    count: Mutex<u64>,
    path: Option<PathBuf>,
    recovered: Option<CounterRecord>,
}

impl ConnectionCounter {
    /// Counter without persistence.
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            path: None,
            recovered: None,
        }
    }

    /// Counter backed by a JSON record at `path`. An existing record is
    /// kept only for display via `last_persisted`; the live count always
    /// starts at zero.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let recovered = match fs::read_to_string(&path) {
            Ok(body) => match serde_json::from_str(&body) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "ignoring malformed counter record {}: {}",
                        path.display(),
                        e
                    );
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            count: Mutex::new(0),
            path: Some(path),
            recovered,
        }
    }

    pub fn increment(&self) {
        let mut count = self.lock();
        *count += 1;
        self.persist(*count);
    }

    /// Floored at zero: a disconnect callback racing ahead of its connect
    /// must not drive the count negative.
    pub fn decrement(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        self.persist(*count);
    }

    pub fn count(&self) -> u64 {
        *self.lock()
    }

    pub fn reset(&self) {
        let mut count = self.lock();
        *count = 0;
        self.persist(*count);
    }

    /// Record recovered from disk at construction, if any.
    pub fn last_persisted(&self) -> Option<CounterRecord> {
        self.recovered
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.count.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Called with the count mutex held, so records never hit the disk out
    /// of order. Failures are logged and swallowed; durability here is
    /// advisory.
    fn persist(&self, count: u64) {
        let Some(path) = &self.path else {
            return;
        };
        let record = CounterRecord {
            count,
            timestamp: unix_now(),
        };
        match serde_json::to_string(&record) {
            Ok(body) => {
                if let Err(e) = fs::write(path, body) {
                    warn!(
                        "failed to persist connection count to {}: {}",
                        path.display(),
                        e
                    );
                }
            }
            Err(e) => warn!("failed to encode connection count record: {}", e),
        }
    }
}

impl Default for ConnectionCounter {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_mutations_balance_out() {
        let counter = Arc::new(ConnectionCounter::new());
        for _ in 0..300 {
            counter.increment();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    counter.increment();
                }
            }));
        }
        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    counter.decrement();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 300 + 200 increments, 200 decrements.
        assert_eq!(counter.count(), 300);
    }

    #[test]
    fn decrement_floors_at_zero() {
        let counter = ConnectionCounter::new();
        counter.decrement();
        counter.decrement();
        assert_eq!(counter.count(), 0);
        counter.increment();
        counter.decrement();
        counter.decrement();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn reset_clears_the_count() {
        let counter = ConnectionCounter::new();
        counter.increment();
        counter.increment();
        counter.reset();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn mutations_write_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connection_count.json");
        let counter = ConnectionCounter::with_persistence(&path);
        counter.increment();
        counter.increment();

        let record: CounterRecord =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(record.count, 2);
        assert!(record.timestamp > 0);
    }

    #[test]
    fn existing_record_is_display_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connection_count.json");
        fs::write(&path, r#"{"count":7,"timestamp":1700000000}"#).unwrap();

        let counter = ConnectionCounter::with_persistence(&path);
        // Recovered for display, never resumed into the live count.
        assert_eq!(counter.last_persisted().map(|r| r.count), Some(7));
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn malformed_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connection_count.json");
        fs::write(&path, "not json").unwrap();

        let counter = ConnectionCounter::with_persistence(&path);
        assert_eq!(counter.last_persisted(), None);
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn persistence_failure_leaves_the_count_intact() {
        let counter = ConnectionCounter::with_persistence("/nonexistent/dir/count.json");
        counter.increment();
        counter.increment();
        counter.decrement();
        assert_eq!(counter.count(), 1);
    }
}
