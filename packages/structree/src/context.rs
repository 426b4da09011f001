//! Shared build context
//!
//! A context carrier is a key/value store threaded by reference through every
//! section and override of one tree. The same handle (an `Arc`) is cloned into
//! each node, so a write made through any node is visible through all of them.
//!
//! A build that is given no carrier installs a fresh [`MapContext`] so context
//! accessors are always usable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_yaml_ng::Value;

/// Pluggable key/value store shared across one tree.
///
/// Implementations decide their own storage and locking. The default
/// [`MapContext`] serializes access with a mutex, which also covers the case
/// of one carrier deliberately shared between concurrent builds.
pub trait ContextStore: Send + Sync + std::fmt::Debug {
    /// Look up a value; absence is `None`, never an error.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value under a key, replacing any previous value.
    fn set(&self, key: &str, value: Value);
}

/// Shared handle to a context store. Cloning shares identity, never content.
pub type SharedContext = Arc<dyn ContextStore>;

/// Default in-memory context store.
#[derive(Debug, Default)]
pub struct MapContext {
    inner: Mutex<HashMap<String, Value>>,
}

impl MapContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MapContext {
    fn get(&self, key: &str) -> Option<Value> {
        match self.inner.lock() {
            Ok(guard) => guard.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn set(&self, key: &str, value: Value) {
        match self.inner.lock() {
            Ok(mut guard) => {
                guard.insert(key.to_string(), value);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(key.to_string(), value);
            }
        }
    }
}

/// Create the default shared context used when a build supplies none.
pub(crate) fn default_context() -> SharedContext {
    Arc::new(MapContext::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let ctx = MapContext::new();
        assert_eq!(ctx.get("k1"), None);
        ctx.set("k1", Value::from("v1"));
        assert_eq!(ctx.get("k1"), Some(Value::from("v1")));
        ctx.set("k1", Value::from(2));
        assert_eq!(ctx.get("k1"), Some(Value::from(2)));
    }

    #[test]
    fn test_shared_identity() {
        let a: SharedContext = Arc::new(MapContext::new());
        let b = Arc::clone(&a);
        b.set("seen", Value::from(true));
        assert_eq!(a.get("seen"), Some(Value::from(true)));
    }
}
