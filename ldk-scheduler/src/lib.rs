//! Scheduler (spec §4.12): `rate()`/`cron()` rule parsing and a single
//! background task dispatching scheduled-event envelopes off a min-heap.

pub mod expr;
pub mod registry;

pub mod prelude {
    pub use crate::expr::{next_fire_after, parse_schedule, CronExpr, ScheduleExpr};
    pub use crate::registry::{spawn_tick_task, PublishFn, Rule, SchedulerRegistry};
}
