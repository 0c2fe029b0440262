// Cooperative task scheduler core
//
// Single thread, no preemption, no allocation. A fixed table of tasks
// takes turns; each body runs until it stores a resume marker and
// returns. The host calls Scheduler::tick once per loop iteration with
// the current millisecond time.
//
//   time      clock sources, wrap-safe comparisons
//   signal    event flags and group suspension bits
//   task      resume markers, TCB, per-invocation Context
//   table     slot arena and generation-checked handles
//   watchdog  reset of tasks that stopped making progress
//   scheduler the tick loop

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod signal;
pub mod snapshot;
pub mod table;
pub mod task;
pub mod time;
pub mod watchdog;

pub use config::SchedulerConfig;
pub use error::SchedError;
pub use scheduler::{MAX_TASKS, Notice, Scheduler, Stats, TickReport};
pub use signal::{EventId, GroupId, Signals};
pub use snapshot::TaskSnapshot;
pub use table::TaskHandle;
pub use task::{Context, Resume, TaskControlBlock, TaskFn};
pub use time::{Clock, TickClock};
pub use watchdog::Recovery;
