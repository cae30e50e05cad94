//! The Compute Invoker Contract (spec §4.13): an abstract port every
//! fan-out worker, queue poller, URL front, and stream dispatcher calls
//! through. Concrete execution backends (container runtimes, etc.) are
//! external collaborators and out of scope here.

use ldk_core::provider::BoxFuture;
use serde_json::Value;
use uuid::Uuid;

use crate::context::InvocationContext;

#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub payload: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub request_id: String,
}

impl InvocationResult {
    pub fn ok(payload: Value, duration_ms: u64, request_id: impl Into<String>) -> Self {
        InvocationResult {
            payload: Some(payload),
            error: None,
            duration_ms,
            request_id: request_id.into(),
        }
    }

    pub fn failed(error: impl Into<String>, duration_ms: u64, request_id: impl Into<String>) -> Self {
        InvocationResult {
            payload: None,
            error: Some(error.into()),
            duration_ms,
            request_id: request_id.into(),
        }
    }
}

/// Abstract invocation port: `invoke(event, context) -> InvocationResult`.
pub trait ComputeInvoker: Send + Sync {
    fn invoke<'a>(&'a self, event: Value, context: InvocationContext) -> BoxFuture<'a, InvocationResult>;
}

/// Invoker with no backing function runtime. Useful before a real compute
/// backend is wired up, or for functions that were declared but never
/// deployed.
pub struct NullInvoker;

impl ComputeInvoker for NullInvoker {
    fn invoke<'a>(&'a self, _event: Value, context: InvocationContext) -> BoxFuture<'a, InvocationResult> {
        Box::pin(async move {
            InvocationResult::failed(
                format!("function '{}' has no registered compute backend", context.function_name),
                0,
                Uuid::new_v4().to_string(),
            )
        })
    }
}

/// Invoker that hands events to a channel for an out-of-process backend to
/// consume and respond to over a oneshot reply channel. This is the seam
/// a container-backed function runtime plugs into.
pub struct ChannelInvoker {
    tx: tokio::sync::mpsc::Sender<InvocationRequest>,
}

pub struct InvocationRequest {
    pub event: Value,
    pub context: InvocationContext,
    pub reply: tokio::sync::oneshot::Sender<InvocationResult>,
}

impl ChannelInvoker {
    pub fn new(capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<InvocationRequest>) {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        (ChannelInvoker { tx }, rx)
    }
}

impl ComputeInvoker for ChannelInvoker {
    fn invoke<'a>(&'a self, event: Value, context: InvocationContext) -> BoxFuture<'a, InvocationResult> {
        Box::pin(async move {
            let request_id = context.request_id.clone();
            let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
            if self
                .tx
                .send(InvocationRequest { event, context, reply: reply_tx })
                .await
                .is_err()
            {
                return InvocationResult::failed("compute backend channel closed", 0, request_id);
            }
            reply_rx
                .await
                .unwrap_or_else(|_| InvocationResult::failed("compute backend dropped the reply channel", 0, request_id))
        })
    }
}
