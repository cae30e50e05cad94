//! Chaos Config Registry (spec §4.2) and the ordered fault-injection rolls
//! the Middleware Pipeline (C4) applies on every request.

pub mod config;
pub mod registry;
pub mod sample;

pub mod prelude {
    pub use crate::config::{ChaosConfig, ChaosPatch, ErrorSpec};
    pub use crate::registry::ChaosRegistry;
    pub use crate::sample::{roll, ChaosOutcome};
}
