//! Client builder.
//!
//! Provides a fluent builder API for configuring a [`MuxClient`] with its
//! unknown-command policy, request timeout and serializer bindings.

use std::time::Duration;

use crate::{ClientConfig, CommandToken, MuxClient, Result, SerializerPtr, SerializerRegistry, TransportPtr};

/// Builder for creating client instances.
///
/// # Example
///
/// ```no_run
/// use muxwire::{ClientBuilder, JsonMessageSerializer};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[derive(Debug, serde::Serialize, serde::Deserialize)]
/// # struct Welcome { ip: String }
/// # muxwire::impl_message!(Welcome, "welcome");
/// # async fn example() -> muxwire::Result<()> {
/// let (transport, _peer) = muxwire::create_memory_transport("bot").await?;
///
/// let client = ClientBuilder::new(transport)
///     .client_id("bot")
///     .throw_on_unknown_command(false)
///     .request_timeout(Duration::from_secs(5))
///     .serializer("welcome", Arc::new(JsonMessageSerializer::<Welcome>::new()))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    // ---
    transport: TransportPtr,
    client_id: Option<String>,
    throw_on_unknown_command: Option<bool>,

    // Outer None: keep the default. Inner None: no deadline.
    request_timeout: Option<Option<Duration>>,
    event_capacity: Option<usize>,
    diagnostics_capacity: Option<usize>,

    fallback: Option<SerializerPtr>,
    serializers: Vec<(CommandToken, SerializerPtr)>,
}

impl ClientBuilder {
    /// Create a new client builder over `transport`.
    pub fn new(transport: TransportPtr) -> Self {
        // ---
        Self {
            transport,
            client_id: None,
            throw_on_unknown_command: None,
            request_timeout: None,
            event_capacity: None,
            diagnostics_capacity: None,
            fallback: None,
            serializers: Vec::new(),
        }
    }

    /// Set the client id used in log lines.
    ///
    /// Default: the transport id.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the unknown-command policy.
    ///
    /// Default: `true` (unknown commands fail).
    pub fn throw_on_unknown_command(mut self, throw: bool) -> Self {
        self.throw_on_unknown_command = Some(throw);
        self
    }

    /// Set the per-request response timeout.
    ///
    /// Default: 30s.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(Some(timeout));
        self
    }

    /// Wait for responses without a deadline.
    pub fn no_request_timeout(mut self) -> Self {
        self.request_timeout = Some(None);
        self
    }

    /// Set the inbound message broadcast capacity.
    ///
    /// Default: 256.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Set the diagnostics broadcast capacity.
    ///
    /// Default: 64.
    pub fn diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.diagnostics_capacity = Some(capacity);
        self
    }

    /// Bind a serializer to a command. Later bindings for the same command win.
    pub fn serializer(mut self, token: impl Into<CommandToken>, strategy: SerializerPtr) -> Self {
        self.serializers.push((token.into(), strategy));
        self
    }

    /// Replace the structural fallback used for unbound commands.
    pub fn fallback_serializer(mut self, strategy: SerializerPtr) -> Self {
        self.fallback = Some(strategy);
        self
    }

    /// Build the client (consumes self).
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses the subscription.
    pub async fn build(self) -> Result<MuxClient> {
        // ---
        let client_id = self
            .client_id
            .unwrap_or_else(|| self.transport.transport_id().to_string());

        let mut config = ClientConfig::new(client_id);
        if let Some(throw) = self.throw_on_unknown_command {
            config.throw_on_unknown_command = throw;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        if let Some(capacity) = self.event_capacity {
            config.event_capacity = capacity;
        }
        if let Some(capacity) = self.diagnostics_capacity {
            config.diagnostics_capacity = capacity;
        }

        let registry = match self.fallback {
            Some(fallback) => SerializerRegistry::with_fallback(fallback),
            None => SerializerRegistry::new(),
        };
        for (token, strategy) in self.serializers {
            registry.register(token, strategy);
        }

        MuxClient::with_registry(self.transport, config, registry).await
    }
}
