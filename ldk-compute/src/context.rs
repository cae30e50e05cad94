//! Invocation context (spec §4.13): metadata passed alongside an event,
//! mirroring the fields AWS exposes on the Lambda context object.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub function_name: String,
    pub memory_limit_mb: u32,
    pub timeout_seconds: u64,
    pub request_id: String,
    pub invoked_function_arn: String,
    start: Instant,
}

impl InvocationContext {
    pub fn new(
        function_name: impl Into<String>,
        memory_limit_mb: u32,
        timeout_seconds: u64,
        request_id: impl Into<String>,
        invoked_function_arn: impl Into<String>,
    ) -> Self {
        InvocationContext {
            function_name: function_name.into(),
            memory_limit_mb,
            timeout_seconds,
            request_id: request_id.into(),
            invoked_function_arn: invoked_function_arn.into(),
            start: Instant::now(),
        }
    }

    /// `max(0, timeout - elapsed)`, in milliseconds.
    pub fn remaining_time_ms(&self) -> u64 {
        let timeout_ms = self.timeout_seconds * 1000;
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        timeout_ms.saturating_sub(elapsed_ms)
    }
}
