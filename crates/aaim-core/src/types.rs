use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::CoreError;

/// Future returned by a service method call
pub type ServiceFuture = BoxFuture<'static, Result<Value, CoreError>>;

/// Future returned by the behavior seam of the interpreter
pub type BehaviorFuture<T> = BoxFuture<'static, Result<T, CoreError>>;

/// The shared key-value store threaded through all behavior resolution
///
/// Cloning a `DataContext` yields another handle onto the same store. The
/// context is written by services and the situation factory as a side
/// channel; it assumes a single writer at a time and gives no ordering
/// guarantee between behavior chains that overlap.
#[derive(Debug, Clone, Default)]
pub struct DataContext {
    entries: Arc<DashMap<String, Value>>,
}

impl DataContext {
    /// Create an empty data context
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the value stored under `key`
    #[inline]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store a value, returning the previous one
    #[inline]
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Remove a value
    #[inline]
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Check whether a key is present
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored entries
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the current contents into a plain map
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Whether two handles share the same store
    #[inline]
    pub fn same_store(&self, other: &DataContext) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clones_share_the_store() {
        let context = DataContext::new();
        let handle = context.clone();

        handle.set("name", json!("Towel"));

        assert_eq!(context.get("name"), Some(json!("Towel")));
        assert!(context.same_store(&handle));
        assert!(!context.same_store(&DataContext::new()));
    }

    #[test]
    fn test_set_replaces_and_remove() {
        let context = DataContext::new();
        assert!(context.is_empty());

        assert_eq!(context.set("answer", json!(41)), None);
        assert_eq!(context.set("answer", json!(42)), Some(json!(41)));
        assert_eq!(context.len(), 1);
        assert!(context.contains_key("answer"));

        assert_eq!(context.remove("answer"), Some(json!(42)));
        assert_eq!(context.get("answer"), None);
    }

    #[test]
    fn test_snapshot() {
        let context = DataContext::new();
        context.set("a", json!(1));
        context.set("b", json!([1, 2]));

        let snapshot = context.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["b"], json!([1, 2]));
    }
}
