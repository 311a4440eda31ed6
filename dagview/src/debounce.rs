//! Restart-on-event single-shot timer.
//!
//! The routing engine is noisy while a network bootstraps: routes appear and
//! vanish within seconds. Each change re-arms the timer, and subscribers hear
//! about the topology only once it has been quiet for a full interval.
//!
//! ```text
//!  event   event      event                        fire
//!    |       |          |<-------- interval -------->|
//!  IDLE -> ARMED ----> ARMED ------------------------> IDLE
//! ```

use crate::time::{Duration, Timestamp};

/// Timer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DebounceState {
    #[default]
    Idle,
    Armed { fire_at: Timestamp },
}

/// Single-shot timer that coalesces bursts of change events.
#[derive(Clone, Debug)]
pub struct DebounceTimer {
    interval: Duration,
    state: DebounceState,
    /// Events absorbed since the timer last fired.
    coalesced: u32,
}

impl DebounceTimer {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: DebounceState::Idle,
            coalesced: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, DebounceState::Armed { .. })
    }

    /// When the timer will fire, if armed.
    pub fn deadline(&self) -> Option<Timestamp> {
        match self.state {
            DebounceState::Idle => None,
            DebounceState::Armed { fire_at } => Some(fire_at),
        }
    }

    /// Record a change event at `now`, replacing any pending deadline.
    ///
    /// Returns the new deadline.
    pub fn arm(&mut self, now: Timestamp) -> Timestamp {
        let fire_at = now + self.interval;
        self.state = DebounceState::Armed { fire_at };
        self.coalesced = self.coalesced.saturating_add(1);
        fire_at
    }

    /// Fire if the deadline has passed.
    ///
    /// Returns the number of change events the firing covers, or `None` if
    /// the timer is idle or not yet due. Exactly one `Some` is returned per
    /// quiet period.
    pub fn poll(&mut self, now: Timestamp) -> Option<u32> {
        match self.state {
            DebounceState::Armed { fire_at } if now >= fire_at => {
                self.state = DebounceState::Idle;
                Some(core::mem::take(&mut self.coalesced))
            }
            _ => None,
        }
    }
}
