//! Type-name -> handler mapping with per-type deserialization.
//!
//! Generalizes the teacher's `StreamProcessor<J: StreamJob>`/`StreamDef`
//! pair, which binds one processor to one stream type at the type level,
//! into a runtime registry keyed by a task-type string: the scheduler must
//! support registering arbitrarily many handlers against one running
//! instance rather than one processor per compiled stream type.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Error returned by a handler. Distinct from [`crate::error::SchedulerError`]
/// because handler authors should not need to know the scheduler's own
/// error taxonomy; the worker wraps this into `SchedulerError::Handler`.
#[derive(Debug, Clone)]
pub struct HandlerError(pub String);

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HandlerError {}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Type-erased, object-safe handler invoked with the raw payload bytes.
/// Implementations own their own deserialization.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> HandlerResult;
}

/// Process-wide store keyed by task-type name.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: Arc<std::sync::RwLock<HashMap<String, Arc<dyn TaskHandler>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that deserializes its payload as JSON into `T`.
    /// Registering the same type name twice is an error.
    pub fn register_typed<T, F, Fut>(&self, task_type: impl Into<String>, func: F) -> Result<(), String>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        struct Wrapper<T, F>(F, std::marker::PhantomData<fn(T)>);

        #[async_trait]
        impl<T, F, Fut> TaskHandler for Wrapper<T, F>
        where
            T: DeserializeOwned + Send + 'static,
            F: Fn(T) -> Fut + Send + Sync,
            Fut: Future<Output = HandlerResult> + Send,
        {
            async fn handle(&self, payload: &[u8]) -> HandlerResult {
                let value: T = serde_json::from_slice(payload)
                    .map_err(|e| HandlerError(format!("payload deserialization failed: {e}")))?;
                (self.0)(value).await
            }
        }

        let handler: Arc<dyn TaskHandler> = Arc::new(Wrapper(func, std::marker::PhantomData));
        self.register(task_type, handler)
    }

    /// Register a handler that owns its own deserialization (substitute an
    /// arbitrary codec in place of the default JSON adapter).
    pub fn register(&self, task_type: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Result<(), String> {
        let task_type = task_type.into();
        let mut handlers = self.handlers.write().expect("registry lock poisoned");
        if handlers.contains_key(&task_type) {
            return Err(format!("handler already registered for task type '{task_type}'"));
        }
        handlers.insert(task_type, handler);
        Ok(())
    }

    /// Look up the handler bound to `task_type`, if any.
    pub fn resolve(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers
            .read()
            .expect("registry lock poisoned")
            .get(task_type)
            .cloned()
    }

    pub fn is_registered(&self, task_type: &str) -> bool {
        self.handlers
            .read()
            .expect("registry lock poisoned")
            .contains_key(task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct EchoPayload {
        message: String,
    }

    #[tokio::test]
    async fn test_register_and_resolve_typed() {
        let registry = Registry::new();
        registry
            .register_typed("echo", |payload: EchoPayload| async move {
                if payload.message.is_empty() {
                    return Err(HandlerError::from("empty message"));
                }
                Ok(())
            })
            .unwrap();

        assert!(registry.is_registered("echo"));
        let handler = registry.resolve("echo").unwrap();
        let result = handler.handle(br#"{"message":"hi"}"#).await;
        assert!(result.is_ok());

        let result = handler.handle(br#"{"message":""}"#).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = Registry::new();
        registry
            .register_typed("echo", |_: EchoPayload| async move { Ok(()) })
            .unwrap();

        let err = registry
            .register_typed("echo", |_: EchoPayload| async move { Ok(()) })
            .unwrap_err();
        assert!(err.contains("already registered"));
    }

    #[test]
    fn test_resolve_missing_returns_none() {
        let registry = Registry::new();
        assert!(registry.resolve("nonexistent").is_none());
        assert!(!registry.is_registered("nonexistent"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_handler_error() {
        let registry = Registry::new();
        registry
            .register_typed("echo", |_: EchoPayload| async move { Ok(()) })
            .unwrap();
        let handler = registry.resolve("echo").unwrap();
        let result = handler.handle(b"not json").await;
        assert!(result.is_err());
    }
}
