use std::time::Duration;

/// Default time [`Session::connect_with_timeout`][crate::Session::connect_with_timeout] waits for a usable session
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of [`SessionEvent`][crate::SessionEvent]s buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Tunables of a [`Session`][crate::Session]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// How long the connect watchdog waits for the session to become active
    pub connect_timeout: Duration,
    /// Events buffered per subscriber before the oldest are dropped
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Sets [`connect_timeout`][Self::connect_timeout]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets [`event_capacity`][Self::event_capacity]. A capacity of zero is raised to one.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
