//! # Time Source
//!
//! Owns the clock's idea of "now" in UTC. Reading the time is cheap: the
//! last authoritative instant is cached together with the monotonic tick at
//! which it was taken, and every read extrapolates from there. The network
//! is only consulted when the resync interval has run out.
//!
//! ## Sync Schedule
//!
//! - **Not due**: cached instant + whole seconds elapsed since it was set
//! - **Due, connected**: one [`TimeServer::fetch_utc`] round-trip
//!   - success replaces the cache and restarts the interval
//!   - failure keeps the cache *and* the old schedule, so the very next
//!     read retries instead of waiting out another full interval
//! - **Disconnected**: extrapolate only, never touch the network
//!
//! Before the first successful sync the cache holds the Unix epoch, taken
//! when the source was created.

use crate::ntp::TimeServer;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Monotonic millisecond counter, independent of wall-clock time.
pub trait TickClock {
    fn now_ms(&self) -> u64;
}

/// [`TickClock`] backed by `std::time::Instant`.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Whether the cached time can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeStatus {
    /// Never synced
    NotSet,
    /// Last sync attempt succeeded
    Set,
    /// Synced before, but the latest attempt failed
    NeedsSync,
}

/// When the next network refresh is due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncSchedule {
    pub interval_secs: u64,
    /// Tick of the last successful sync
    pub last_sync_ms: Option<u64>,
}

impl SyncSchedule {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval_secs,
            last_sync_ms: None,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_sync_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_secs.saturating_mul(1000),
        }
    }
}

pub struct TimeSource<S, C> {
    server: S,
    ticks: C,
    schedule: SyncSchedule,
    cached_utc: i64,
    cached_at_ms: u64,
    status: TimeStatus,
}

impl<S: TimeServer, C: TickClock> TimeSource<S, C> {
    pub fn new(server: S, ticks: C, interval_secs: u64) -> Self {
        let cached_at_ms = ticks.now_ms();
        Self {
            server,
            ticks,
            schedule: SyncSchedule::new(interval_secs),
            cached_utc: 0,
            cached_at_ms,
            status: TimeStatus::NotSet,
        }
    }

    pub fn status(&self) -> TimeStatus {
        self.status
    }

    pub fn schedule(&self) -> &SyncSchedule {
        &self.schedule
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Current UTC seconds, syncing first if due and `connected`.
    pub fn now(&mut self, connected: bool) -> i64 {
        let now_ms = self.ticks.now_ms();

        if connected && self.schedule.is_due(now_ms) {
            self.sync(now_ms);
        }

        self.extrapolate(self.ticks.now_ms())
    }

    fn sync(&mut self, now_ms: u64) {
        match self.server.fetch_utc() {
            Ok(utc) => {
                // Stamp with the tick after the round-trip so its latency
                // doesn't push the clock backwards
                let stamped_ms = self.ticks.now_ms();
                info!(
                    utc,
                    drift = utc - self.extrapolate(stamped_ms),
                    "time synced"
                );
                self.cached_utc = utc;
                self.cached_at_ms = stamped_ms;
                self.schedule.last_sync_ms = Some(stamped_ms);
                self.status = TimeStatus::Set;
            }
            Err(error) => {
                warn!(%error, "time sync failed, keeping cached time");
                if self.status == TimeStatus::Set {
                    self.status = TimeStatus::NeedsSync;
                }
                debug!(now_ms, last_sync_ms = ?self.schedule.last_sync_ms, "schedule left as is");
            }
        }
    }

    fn extrapolate(&self, now_ms: u64) -> i64 {
        let elapsed_secs = now_ms.saturating_sub(self.cached_at_ms) / 1000;
        self.cached_utc.saturating_add(elapsed_secs as i64)
    }
}
