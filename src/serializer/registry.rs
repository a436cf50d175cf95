// src/serializer/registry.rs

//! Command token to serializer bindings.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{CommandToken, Result, RpcError};

use super::{SerializerPtr, StructuralSerializer};

/// Registry of serializer strategies keyed by command token.
///
/// Lookups are case-insensitive. Registration is expected to be rare and to
/// happen mostly before traffic starts; reads during steady state only take
/// the shared side of the lock.
pub struct SerializerRegistry {
    // ---
    bindings: RwLock<HashMap<CommandToken, SerializerPtr>>,
    fallback: SerializerPtr,
}

// A poisoned lock only means a writer panicked mid-insert; the map itself
// is still a valid map.
fn read_ignore_poison<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_ignore_poison<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl SerializerRegistry {
    // ---

    /// Create an empty registry using [`StructuralSerializer`] as fallback.
    pub fn new() -> Self {
        // ---
        Self::with_fallback(Arc::new(StructuralSerializer))
    }

    /// Create an empty registry with a custom fallback strategy.
    pub fn with_fallback(fallback: SerializerPtr) -> Self {
        // ---
        Self {
            bindings: RwLock::new(HashMap::new()),
            fallback,
        }
    }

    /// Bind `strategy` to `token`, replacing any previous binding.
    ///
    /// Returns the replaced strategy, if there was one.
    pub fn register(
        &self,
        token: impl Into<CommandToken>,
        strategy: SerializerPtr,
    ) -> Option<SerializerPtr> {
        // ---
        write_ignore_poison(&self.bindings).insert(token.into(), strategy)
    }

    /// Look up the strategy bound to `token`.
    pub fn resolve(&self, token: &str) -> Option<SerializerPtr> {
        // ---
        let key = CommandToken::from(token);
        read_ignore_poison(&self.bindings).get(&key).cloned()
    }

    /// Look up `token`, falling back to the generic strategy when allowed.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnknownCommand`] if `token` is unbound and
    /// `throw_if_missing` is set.
    pub fn resolve_or_fallback(&self, token: &str, throw_if_missing: bool) -> Result<SerializerPtr> {
        // ---
        if let Some(strategy) = self.resolve(token) {
            return Ok(strategy);
        }

        if throw_if_missing {
            return Err(RpcError::UnknownCommand(token.to_string()));
        }

        crate::log_debug!("no serializer for command `{token}`, using fallback");
        Ok(self.fallback.clone())
    }

    /// The strategy used for unbound commands.
    pub fn fallback(&self) -> SerializerPtr {
        self.fallback.clone()
    }

    pub fn contains(&self, token: &str) -> bool {
        // ---
        read_ignore_poison(&self.bindings).contains_key(&CommandToken::from(token))
    }

    /// Number of bound commands.
    pub fn len(&self) -> usize {
        read_ignore_poison(&self.bindings).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{GenericMessage, JsonMessageSerializer, Message, MessageSerializer, WireEnvelope};
    use serde_json::json;

    fn structural() -> SerializerPtr {
        Arc::new(StructuralSerializer)
    }

    #[test]
    fn test_register_then_resolve() {
        // ---
        let registry = SerializerRegistry::new();
        let strategy = structural();

        assert!(registry.register("chat", strategy.clone()).is_none());

        let resolved = registry.resolve("chat").unwrap();
        assert!(Arc::ptr_eq(&resolved, &strategy));
    }

    #[test]
    fn test_resolve_case_insensitive() {
        // ---
        let registry = SerializerRegistry::new();
        let strategy = structural();
        registry.register("Message Send", strategy.clone());

        let resolved = registry.resolve("MESSAGE SEND").unwrap();
        assert!(Arc::ptr_eq(&resolved, &strategy));
        assert!(registry.contains("message send"));
    }

    #[test]
    fn test_reregister_replaces() {
        // ---
        let registry = SerializerRegistry::new();
        let first = structural();
        let second: SerializerPtr = Arc::new(JsonMessageSerializer::<GenericMessageProbe>::new());

        registry.register("chat", first.clone());
        let replaced = registry.register("CHAT", second.clone()).unwrap();

        assert!(Arc::ptr_eq(&replaced, &first));
        assert!(Arc::ptr_eq(&registry.resolve("chat").unwrap(), &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_or_fallback() {
        // ---
        let registry = SerializerRegistry::new();

        let fallback = registry.resolve_or_fallback("nobody", false).unwrap();
        assert!(Arc::ptr_eq(&fallback, &registry.fallback()));

        match registry.resolve_or_fallback("nobody", true) {
            Err(RpcError::UnknownCommand(token)) => assert_eq!(token, "nobody"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected UnknownCommand"),
        }
    }

    #[test]
    fn test_fallback_serializes_unbound_message() {
        // ---
        let registry = SerializerRegistry::new();
        let message = GenericMessage::new("group profile", json!({ "id": 18 }));

        let envelope = registry
            .resolve_or_fallback(message.command(), false)
            .unwrap()
            .serialize(&message)
            .unwrap();

        assert_eq!(envelope, WireEnvelope::json(json!({ "id": 18 })));
    }

    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct GenericMessageProbe {
        id: u32,
    }

    crate::impl_message!(GenericMessageProbe, "probe");
}
