//! Client configuration.
//!
//! This type contains no transport-specific concepts. Connection settings
//! (URL, credentials, keep-alive) belong to the transport that is handed to
//! the client.

use std::time::Duration;

/// Default time to wait for a response before failing with `Timeout`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity of the inbound message broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default capacity of the diagnostics broadcast channel.
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 64;

/// Dispatch and correlation settings for a [`MuxClient`](crate::MuxClient).
///
/// # Example
///
/// ```
/// use muxwire::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("bot-1")
///     .with_throw_on_unknown_command(false)
///     .with_request_timeout(Duration::from_secs(10));
///
/// assert!(!config.throw_on_unknown_command);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // ---
    /// Identifier used in log lines.
    pub client_id: String,

    /// Fail on commands with no registered serializer instead of using the
    /// structural fallback.
    ///
    /// Governs both outbound sends and inbound routing. Default: `true`.
    pub throw_on_unknown_command: bool,

    /// How long a request waits for its response.
    ///
    /// `None` waits until the response, a cancel, or connection teardown.
    /// Default: 30 seconds
    pub request_timeout: Option<Duration>,

    /// Capacity of the inbound message broadcast channel.
    ///
    /// Subscribers that fall further behind than this observe a lag error
    /// and skip ahead.
    pub event_capacity: usize,

    /// Capacity of the diagnostics broadcast channel.
    pub diagnostics_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

impl ClientConfig {
    /// Create a config with defaults and the given client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            throw_on_unknown_command: true,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the unknown-command policy.
    pub fn with_throw_on_unknown_command(mut self, throw: bool) -> Self {
        self.throw_on_unknown_command = throw;
        self
    }

    /// Set the per-request response timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Wait for responses without a deadline.
    pub fn without_request_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_defaults() {
        // ---
        let config = ClientConfig::default();

        assert!(config.throw_on_unknown_command);
        assert_eq!(config.request_timeout, Some(DEFAULT_REQUEST_TIMEOUT));
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.client_id.len(), 36); // Standard UUID format
    }

    #[test]
    fn test_setters() {
        // ---
        let config = ClientConfig::new("bot")
            .with_throw_on_unknown_command(false)
            .without_request_timeout()
            .with_event_capacity(8);

        assert_eq!(config.client_id, "bot");
        assert!(!config.throw_on_unknown_command);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.event_capacity, 8);
    }
}
