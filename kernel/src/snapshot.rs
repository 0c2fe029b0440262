// Read-only view of scheduler state for dumps and debug consoles.

use core::fmt;

use crate::scheduler::Scheduler;
use crate::signal::GroupId;
use crate::table::TaskHandle;
use crate::task::Resume;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub handle: TaskHandle,
    pub id: u8,
    pub priority: u8,
    pub group: GroupId,
    pub suspended: bool,
    pub group_suspended: bool,
    pub wake_time: Option<u32>,
    pub resume: Resume,
    pub watchdog: Option<u32>,
    pub watchdog_deadline: u32,
    pub last_run: u32,
    pub runs: u32,
    pub recoveries: u32,
}

impl TaskSnapshot {
    /// Would be skipped by the dispatcher regardless of wake time.
    pub fn is_blocked(&self) -> bool {
        self.suspended || self.group_suspended
    }
}

impl fmt::Display for TaskSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " - Task {} | Prio {} | Group {}{} | Susp {} | WT: ",
            self.id,
            self.priority,
            self.group,
            if self.group_suspended { "*" } else { "" },
            u8::from(self.suspended),
        )?;
        match self.wake_time {
            Some(t) => write!(f, "{}", t)?,
            None => write!(f, "-")?,
        }
        write!(f, " | At {} | Runs {}", self.resume, self.runs)?;
        match self.watchdog {
            Some(ms) => write!(
                f,
                " | WDT {}ms due {} ({} resets)",
                ms, self.watchdog_deadline, self.recoveries
            ),
            None => write!(f, " | WDT off"),
        }
    }
}

impl<U, const N: usize> Scheduler<U, N> {
    /// One entry per active task, in slot order.
    pub fn snapshot(&self) -> impl Iterator<Item = TaskSnapshot> + '_ {
        let signals = self.signals();
        self.tasks().iter().map(move |(handle, tcb)| TaskSnapshot {
            handle,
            id: tcb.id(),
            priority: tcb.priority(),
            group: tcb.group(),
            suspended: tcb.is_suspended(),
            group_suspended: signals.group_suspended(tcb.group()),
            wake_time: tcb.wake_time(),
            resume: tcb.resume(),
            watchdog: tcb.watchdog_timeout(),
            watchdog_deadline: tcb.watchdog_deadline(),
            last_run: tcb.last_run(),
            runs: tcb.runs(),
            recoveries: tcb.recoveries(),
        })
    }
}
