//! # ldk-cli
//!
//! Command-line client for a running ldk fleet's management plane
//! (spec §4.14). It never constructs an `Orchestrator` itself — it is a
//! thin HTTP client, the external contract named in spec §1's
//! out-of-scope list.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ldk status` | fleet and per-service health |
//! | `ldk chaos get\|set` | inspect/mutate per-service fault injection |
//! | `ldk iam-auth get\|set` | inspect/mutate runtime IAM enforcement |
//! | `ldk reset` | drop every provider's in-memory data |

pub mod commands;
