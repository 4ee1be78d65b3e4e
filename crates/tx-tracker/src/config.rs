//! Poller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How often to ask the assets service, and for how long.
///
/// Build one with [`Default::default`] and adjust it with the `with_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Time between two lookups.
    pub interval: Duration,

    /// Lookups after which the poller gives up. `None` polls until a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    /// Events a spawned poller buffers for its subscriber. Lookup errors are dropped once the
    /// buffer is down to the slots kept for state changes.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

/// The default time between two lookups.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// The default number of buffered events.
pub const DEFAULT_EVENT_BUFFER: usize = 32;

const fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl PollerConfig {
    /// Sets the time between two lookups.
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bounds the number of lookups.
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets the number of buffered events.
    pub const fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }
}
