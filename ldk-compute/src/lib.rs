//! Compute Invoker Contract (spec §4.13): the abstract port every
//! fan-out worker, queue poller, URL front, and stream dispatcher calls
//! through to invoke a function.

pub mod context;
pub mod invoker;

pub mod prelude {
    pub use crate::context::InvocationContext;
    pub use crate::invoker::{ChannelInvoker, ComputeInvoker, InvocationRequest, InvocationResult, NullInvoker};
}
