//! Ambient and persistent key-value context
//!
//! This module provides:
//! - `LogContext`: thread-scoped ambient fields consulted by filters
//! - `ContextGuard`: RAII guard for a scoped ambient field
//! - `LoggerContext`: persistent fields merged into every record of a logger

use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Key-value fields attached to records or to the ambient scope
pub type ContextFields = HashMap<String, String>;

thread_local! {
    static AMBIENT: RefCell<ContextFields> = RefCell::new(HashMap::new());
}

/// Thread-scoped ambient context (per-request fields and the like)
///
/// Values set here are visible to filters evaluated on the same thread.
/// The async logger snapshots them at the call site so filters running on
/// the worker thread see the producer's context.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::LogContext;
///
/// {
///     let _guard = LogContext::scoped("request_id", "abc-123");
///     assert_eq!(LogContext::get("request_id").as_deref(), Some("abc-123"));
/// }
/// assert_eq!(LogContext::get("request_id"), None);
/// ```
pub struct LogContext;

impl LogContext {
    /// Set an ambient field for the current thread
    pub fn set(key: impl Into<String>, value: impl Into<String>) {
        AMBIENT.with(|ctx| {
            ctx.borrow_mut().insert(key.into(), value.into());
        });
    }

    pub fn get(key: &str) -> Option<String> {
        AMBIENT.with(|ctx| ctx.borrow().get(key).cloned())
    }

    pub fn remove(key: &str) -> Option<String> {
        AMBIENT.with(|ctx| ctx.borrow_mut().remove(key))
    }

    pub fn clear() {
        AMBIENT.with(|ctx| ctx.borrow_mut().clear());
    }

    /// Copy of every ambient field of the current thread
    pub fn get_all() -> ContextFields {
        AMBIENT.with(|ctx| ctx.borrow().clone())
    }

    pub fn is_empty() -> bool {
        AMBIENT.with(|ctx| ctx.borrow().is_empty())
    }

    /// Set a field for the lifetime of the returned guard
    ///
    /// The previous value (if any) is restored when the guard drops, so
    /// nested scopes behave like a stack.
    #[must_use = "the field is removed as soon as the guard is dropped"]
    pub fn scoped(key: impl Into<String>, value: impl Into<String>) -> ContextGuard {
        let key = key.into();
        let previous = AMBIENT.with(|ctx| ctx.borrow_mut().insert(key.clone(), value.into()));
        ContextGuard {
            key,
            previous,
            _not_send: PhantomData,
        }
    }
}

/// RAII guard for a scoped ambient field
///
/// Bound to the thread that created it.
pub struct ContextGuard {
    key: String,
    previous: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let key = std::mem::take(&mut self.key);
        let previous = self.previous.take();
        // try_with: the thread-local may already be gone during thread teardown
        let _ = AMBIENT.try_with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            match previous {
                Some(value) => {
                    ctx.insert(key, value);
                }
                None => {
                    ctx.remove(&key);
                }
            }
        });
    }
}

/// Logger-level persistent context
///
/// `LoggerContext` stores fields that are merged into every record the
/// owning logger builds (service name, version, environment...).
/// Per-call fields take priority over these.
///
/// Thread-safe: Can be safely shared across threads.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::LoggerContext;
///
/// let ctx = LoggerContext::new();
/// ctx.set("service", "api-gateway");
/// ctx.set("version", "1.2.3");
/// assert_eq!(ctx.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerContext {
    fields: Arc<RwLock<ContextFields>>,
}

impl LoggerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field in the context, overwriting any previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.fields.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) {
        self.fields.write().remove(key);
    }

    pub fn clear(&self) {
        self.fields.write().clear();
    }

    /// Get a clone of all fields
    pub fn get_fields(&self) -> ContextFields {
        self.fields.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.read().is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.read().len()
    }

    /// Merge context fields into `fields`; existing keys win
    pub fn merge_into(&self, fields: &mut ContextFields) {
        let persistent = self.fields.read();
        for (key, value) in persistent.iter() {
            if !fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_set_get_remove() {
        LogContext::clear();
        LogContext::set("user", "alice");
        assert_eq!(LogContext::get("user").as_deref(), Some("alice"));
        assert_eq!(LogContext::remove("user").as_deref(), Some("alice"));
        assert!(LogContext::is_empty());
    }

    #[test]
    fn test_scoped_restores_previous_value() {
        LogContext::clear();
        LogContext::set("tenant", "outer");
        {
            let _inner = LogContext::scoped("tenant", "inner");
            assert_eq!(LogContext::get("tenant").as_deref(), Some("inner"));
        }
        assert_eq!(LogContext::get("tenant").as_deref(), Some("outer"));
        LogContext::clear();
    }

    #[test]
    fn test_ambient_is_thread_local() {
        LogContext::clear();
        let _guard = LogContext::scoped("request_id", "r-1");
        let seen = std::thread::spawn(|| LogContext::get("request_id"))
            .join()
            .unwrap();
        assert_eq!(seen, None);
    }

    #[test]
    fn test_logger_context_merge_priority() {
        let logger_ctx = LoggerContext::new();
        logger_ctx.set("key", "logger_value");
        logger_ctx.set("service", "api");

        let mut fields = ContextFields::new();
        fields.insert("key".to_string(), "entry_value".to_string());

        logger_ctx.merge_into(&mut fields);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["key"], "entry_value");
        assert_eq!(fields["service"], "api");
    }

    #[test]
    fn test_logger_context_remove_and_clear() {
        let ctx = LoggerContext::new();
        ctx.set("key1", "value1");
        ctx.set("key2", "value2");

        ctx.remove("key1");
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get("key1"), None);

        ctx.clear();
        assert!(ctx.is_empty());
    }
}
