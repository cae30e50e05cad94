//! Mock Rule Registry (spec §4.3): ordered per-service canned responses
//! returned verbatim when a rule matches, short-circuiting the handler.

pub mod operators;
pub mod registry;
pub mod rule;

pub mod prelude {
    pub use crate::operators::{MatchOperator, Matcher};
    pub use crate::registry::MockRegistry;
    pub use crate::rule::{MockResponse, MockRule};
}
