//! Method registry and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use podium_core::{EventEnvelope, Identity};
use serde_json::Value;
use tracing::{error, warn};

use super::context::RpcContext;
use super::errors::RpcError;
use super::types::RpcRequest;
use super::validation::sanitize_error_message;

/// Trait implemented by every method handler.
///
/// `Ok(None)` means the outcome reaches the caller through the group
/// broadcast; `Ok(Some(_))` is a unicast reply.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Execute the handler for `caller`.
    async fn handle(
        &self,
        params: Option<Value>,
        ctx: &RpcContext,
        caller: &Identity,
    ) -> Result<Option<EventEnvelope>, RpcError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
    timeout: Duration,
}

impl MethodRegistry {
    /// Default upper bound for one handler.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    const SLOW_REQUEST: Duration = Duration::from_secs(2);

    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Override the handler timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a handler for a method name.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    /// Dispatch a request and produce the unicast reply, if any.
    ///
    /// Failures become a `commandError` envelope echoing the request ID.
    pub async fn dispatch(
        &self,
        request: RpcRequest,
        ctx: &RpcContext,
        caller: &Identity,
    ) -> Option<EventEnvelope> {
        let RpcRequest { id, method, params } = request;
        counter!("rpc_requests_total", "method" => method.clone()).increment(1);

        let Some(handler) = self.handlers.get(&method) else {
            counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "method_not_found").increment(1);
            let err = RpcError::MethodNotFound { method };
            return Some(error_envelope(&err, id));
        };

        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, handler.handle(params, ctx, caller)).await;

        let reply = match result {
            Ok(Ok(reply)) => reply.map(|env| env.with_request_id(id)),
            Ok(Err(err)) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => err.code()).increment(1);
                Some(error_envelope(&err, id))
            }
            Err(_elapsed) => {
                counter!("rpc_errors_total", "method" => method.clone(), "error_type" => "timeout").increment(1);
                error!(method, timeout = ?self.timeout, "handler timed out");
                let err = RpcError::Internal {
                    message: format!("handler for '{method}' timed out"),
                };
                Some(error_envelope(&err, id))
            }
        };

        let duration = start.elapsed();
        histogram!("rpc_request_duration_seconds", "method" => method.clone())
            .record(duration.as_secs_f64());
        if duration >= Self::SLOW_REQUEST {
            warn!(method, duration_secs = duration.as_secs_f64(), "slow request");
        }

        reply
    }

    /// Registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a method is registered.
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `commandError` envelope for a failed request.
pub fn error_envelope(err: &RpcError, request_id: Option<String>) -> EventEnvelope {
    EventEnvelope::command_error(err.code(), &sanitize_error_message(err)).with_request_id(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_live::{CommandProcessor, InMemoryCatalog, LiveSessionStore, NullPublisher};
    use serde_json::json;

    fn ctx() -> RpcContext {
        let processor = CommandProcessor::new(
            Arc::new(LiveSessionStore::new()),
            Arc::new(InMemoryCatalog::new()),
            Arc::new(NullPublisher),
        );
        RpcContext::new(Arc::new(processor))
    }

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(
            &self,
            params: Option<Value>,
            _ctx: &RpcContext,
            caller: &Identity,
        ) -> Result<Option<EventEnvelope>, RpcError> {
            Ok(Some(EventEnvelope::new(
                "echo",
                Some(json!({"params": params, "user": caller.user_id})),
            )))
        }
    }

    struct SilentHandler;

    #[async_trait]
    impl MethodHandler for SilentHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &RpcContext,
            _caller: &Identity,
        ) -> Result<Option<EventEnvelope>, RpcError> {
            Ok(None)
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl MethodHandler for FailingHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &RpcContext,
            _caller: &Identity,
        ) -> Result<Option<EventEnvelope>, RpcError> {
            Err(RpcError::Internal {
                message: "secret path /etc/podium".into(),
            })
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl MethodHandler for SlowHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            _ctx: &RpcContext,
            _caller: &Identity,
        ) -> Result<Option<EventEnvelope>, RpcError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    fn registry() -> MethodRegistry {
        let mut reg = MethodRegistry::new();
        reg.register("echo", EchoHandler);
        reg.register("silent", SilentHandler);
        reg.register("fail", FailingHandler);
        reg.register("slow", SlowHandler);
        reg
    }

    #[tokio::test]
    async fn reply_echoes_request_id() {
        let req = RpcRequest::new("echo", Some(json!({"a": 1}))).with_id("r1");
        let env = registry()
            .dispatch(req, &ctx(), &Identity::musician("m1"))
            .await
            .unwrap();
        assert_eq!(env.event_type, "echo");
        assert_eq!(env.request_id.as_deref(), Some("r1"));
        let data = env.data.unwrap();
        assert_eq!(data["params"]["a"], 1);
        assert_eq!(data["user"], "m1");
    }

    #[tokio::test]
    async fn silent_handler_has_no_reply() {
        let req = RpcRequest::new("silent", None).with_id("r2");
        assert!(
            registry()
                .dispatch(req, &ctx(), &Identity::admin("a"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn unknown_method_yields_command_error() {
        let req = RpcRequest::new("dance", None).with_id("r3");
        let env = registry()
            .dispatch(req, &ctx(), &Identity::admin("a"))
            .await
            .unwrap();
        assert_eq!(env.event_type, "commandError");
        assert_eq!(env.request_id.as_deref(), Some("r3"));
        assert_eq!(env.data.unwrap()["code"], "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn internal_error_is_sanitized() {
        let req = RpcRequest::new("fail", None);
        let env = registry()
            .dispatch(req, &ctx(), &Identity::admin("a"))
            .await
            .unwrap();
        let data = env.data.unwrap();
        assert_eq!(data["code"], "INTERNAL_ERROR");
        assert_eq!(data["message"], "Internal error");
        assert!(env.request_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_internal_error() {
        let reg = registry().with_timeout(Duration::from_millis(50));
        let env = reg
            .dispatch(RpcRequest::new("slow", None), &ctx(), &Identity::admin("a"))
            .await
            .unwrap();
        assert_eq!(env.data.unwrap()["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn methods_sorted() {
        let reg = registry();
        assert_eq!(reg.methods(), vec!["echo", "fail", "silent", "slow"]);
        assert!(reg.has_method("echo"));
        assert!(!reg.has_method("dance"));
    }
}
