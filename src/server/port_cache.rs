//! Port availability cache
//!
//! Wraps a `Probe` with a TTL-bounded cache keyed by `(host, port)`, so a
//! front end polling the same control port and passive range while the
//! operator edits settings does not turn into bind/unbind churn — one full
//! range scan per TTL window. Expiry is enforced on read; `evict_expired`
//! only bounds memory.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::server::probe::{Probe, TcpProbe};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    available: bool,
    observed_at: Instant,
}

pub struct PortCache {
    probe: Box<dyn Probe>,
    ttl: Duration,
    entries: Mutex<HashMap<(IpAddr, u16), CacheEntry>>,
}

impl PortCache {
    pub fn new() -> Self {
        Self::with_probe(Box::new(TcpProbe), DEFAULT_TTL)
    }

    pub fn with_probe(probe: Box<dyn Probe>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached availability of a single port. Fresh entries are served
    /// as-is; stale or missing entries trigger a probe, performed outside
    /// the lock.
    pub fn available(&self, host: IpAddr, port: u16) -> bool {
        let key = (host, port);
        {
            let mut entries = self.lock();
            if let Some(entry) = entries.get(&key) {
                if entry.observed_at.elapsed() < self.ttl {
                    return entry.available;
                }
                entries.remove(&key);
            }
        }

        let available = self.probe.available(host, port);
        self.lock().insert(
            key,
            CacheEntry {
                available,
                observed_at: Instant::now(),
            },
        );
        available
    }

    /// True iff every port in `[start, end]` inclusive is available.
    /// Short-circuits on the first busy port.
    pub fn available_range(&self, host: IpAddr, start: u16, end: u16) -> bool {
        for port in start..=end {
            if !self.available(host, port) {
                return false;
            }
        }
        true
    }

    /// Drops every entry. Called whenever real occupancy has just changed
    /// (a listener bound or released) and cached results would mislead the
    /// next check.
    pub fn invalidate(&self) {
        self.lock().clear();
    }

    /// Housekeeping pass removing stale entries. Optional: expiry is
    /// already checked on read.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        self.lock()
            .retain(|_, entry| entry.observed_at.elapsed() < ttl);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(IpAddr, u16), CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl Default for PortCache {
    fn default() -> Self {
        Self::new()
    }
}
