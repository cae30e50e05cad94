//! Event Fan-out (spec §4.10): topic/subscription filter-policy matching
//! and bounded, retrying per-subscription dispatch.

pub mod envelope;
pub mod filter;
pub mod topic;

pub mod prelude {
    pub use crate::envelope::{sns_to_lambda_envelope, sns_to_sqs_envelope};
    pub use crate::filter::{FilterMatcher, FilterPolicy};
    pub use crate::topic::{SubscriptionProtocol, Topic, TopicRegistry};
}
