//! Command implementations for the `ldk` CLI. Each submodule is a thin
//! HTTP client against a running fleet's management plane (spec §4.14) —
//! the CLI never brings up providers itself.

pub mod chaos;
pub mod client;
pub mod iam_auth;
pub mod reset;
pub mod status;
