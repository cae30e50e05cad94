//! Queue + DLQ (spec §4.11): SQS-shaped standard/FIFO queues with
//! visibility timeouts, receipt handles, and dead-letter routing.

pub mod message;
pub mod queue;
pub mod registry;

pub mod prelude {
    pub use crate::message::{Message, ReceivedMessage};
    pub use crate::queue::{Queue, QueueConfig};
    pub use crate::registry::QueueRegistry;
}
