//! Per-user command cooldowns.
//!
//! Each user has at most one timestamp: the last invocation that was let
//! through. Checking and recording happen under one lock, so two messages
//! from the same user racing each other cannot both pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

/// Default upper bound on tracked users.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Source of monotonic milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created.
///
/// Backed by [`Instant`], so wall-clock adjustments never move it backwards.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Tracks the last allowed invocation of every user.
#[derive(Debug)]
pub struct CooldownTracker {
    /// User id to timestamp (ms) of the last allowed invocation.
    last_allowed: Mutex<HashMap<u64, u64>>,

    /// Entries kept before stale ones are swept or the oldest is evicted.
    max_entries: usize,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl CooldownTracker {
    /// Creates a tracker holding at most `max_entries` users.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            last_allowed: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Decides whether `user_id` may invoke a command at `now`.
    ///
    /// Allowed calls record `now` as the user's new timestamp. Rejected calls
    /// leave the stored timestamp untouched. A cooldown of zero allows
    /// everything.
    pub fn check_and_record(&self, user_id: u64, now: u64, cooldown_ms: u64) -> bool {
        let mut last_allowed = self.last_allowed.lock();

        if let Some(&last) = last_allowed.get(&user_id) {
            if now.saturating_sub(last) < cooldown_ms {
                return false;
            }
        } else if last_allowed.len() >= self.max_entries {
            make_room(&mut last_allowed, self.max_entries, now, cooldown_ms);
        }

        last_allowed.insert(user_id, now);
        true
    }

    /// Time left before `user_id` may invoke again, `None` if not cooling down.
    pub fn remaining(&self, user_id: u64, now: u64, cooldown_ms: u64) -> Option<Duration> {
        let last = *self.last_allowed.lock().get(&user_id)?;
        let elapsed = now.saturating_sub(last);
        (elapsed < cooldown_ms).then(|| Duration::from_millis(cooldown_ms - elapsed))
    }

    /// Drops every user whose cooldown has fully elapsed at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: u64, cooldown_ms: u64) -> usize {
        let mut last_allowed = self.last_allowed.lock();
        let before = last_allowed.len();
        last_allowed.retain(|_, &mut last| now.saturating_sub(last) < cooldown_ms);
        let removed = before - last_allowed.len();

        if removed > 0 {
            debug!("Cooldown sweep removed {} stale entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.last_allowed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_allowed.lock().is_empty()
    }

    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }
}

/// Frees one slot: sweep stale users first, else evict the oldest.
fn make_room(map: &mut HashMap<u64, u64>, max_entries: usize, now: u64, cooldown_ms: u64) {
    map.retain(|_, &mut last| now.saturating_sub(last) < cooldown_ms);

    if map.len() >= max_entries
        && let Some(oldest) = map.iter().min_by_key(|&(_, &last)| last).map(|(&id, _)| id)
    {
        debug!("Cooldown table full, evicting user {}", oldest);
        map.remove(&oldest);
    }
}
