// Tick-driven cooperative dispatcher
//
// One tick:
//   1. order active tasks by priority (high first, ties by registration)
//   2. invoke each task that is not suspended, not in a suspended group,
//      and whose wake time has been reached; free it if it finished;
//      apply any control commands it queued
//   3. watchdog sweep
//
// Nothing preempts a task. A body that never returns hangs the loop;
// the watchdog can only reset it once control comes back.

use core::fmt;

use log::{debug, info};

use crate::SchedError;
use crate::config::SchedulerConfig;
use crate::queue::{Command, CommandQueue};
use crate::signal::{EventId, GroupId, Signals};
use crate::table::{Spawn, TaskHandle, TaskTable};
use crate::task::{Context, TaskControlBlock, TaskFn};
use crate::time::Clock;
use crate::watchdog::{self, Recovery};

/// Default task table capacity.
pub const MAX_TASKS: usize = 8;

/// Lifecycle transitions, handed to the observer hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Registered {
        handle: TaskHandle,
        id: u8,
        priority: u8,
        group: GroupId,
    },
    Completed {
        handle: TaskHandle,
        id: u8,
    },
    Removed {
        handle: TaskHandle,
        id: u8,
    },
    Restarted {
        handle: TaskHandle,
        id: u8,
    },
    WatchdogReset(Recovery),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Registered {
                id,
                priority,
                group,
                ..
            } => write!(f, "task {} registered (prio={}, group={})", id, priority, group),
            Notice::Completed { id, .. } => write!(f, "task {} completed", id),
            Notice::Removed { id, .. } => write!(f, "task {} removed", id),
            Notice::Restarted { id, .. } => write!(f, "task {} restarted", id),
            Notice::WatchdogReset(r) => {
                write!(f, "task {} watchdog reset ({}ms overdue)", r.id, r.overdue_ms)
            }
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub ran: u16,
    pub completed: u16,
    pub recovered: u16,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.ran == 0 && self.recovered == 0
    }
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub ticks: u32,
    pub invocations: u32,
    pub completions: u32,
    pub removals: u32,
    pub watchdog_resets: u32,
}

pub struct Scheduler<U, const N: usize = MAX_TASKS> {
    table: TaskTable<U, N>,
    signals: Signals,
    commands: CommandQueue,
    config: SchedulerConfig,
    // epoch, then the timestamp of the latest tick
    now: u32,
    stats: Stats,
    observer: Option<fn(&Notice)>,
}

impl<U, const N: usize> Scheduler<U, N> {
    pub fn new(config: SchedulerConfig, now: u32) -> Self {
        Self {
            table: TaskTable::new(),
            signals: Signals::new(config.events, config.groups),
            commands: CommandQueue::new(),
            config,
            now,
            stats: Stats::default(),
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: fn(&Notice)) {
        self.observer = Some(observer);
    }

    fn notify(&self, notice: Notice) {
        if let Some(observer) = self.observer {
            observer(&notice);
        }
    }

    // ── registration ────────────────────────────────────────────────

    /// Put a task in the first free slot. It is eligible from the next tick on.
    /// Ids are not checked for uniqueness.
    pub fn register(
        &mut self,
        body: TaskFn<U>,
        id: u8,
        priority: u8,
        group: GroupId,
        user: U,
    ) -> Result<TaskHandle, SchedError> {
        let spawn = Spawn {
            id,
            priority,
            group,
            watchdog: self.config.default_watchdog(),
        };
        let handle = self.table.insert(body, spawn, user, self.now)?;
        let notice = Notice::Registered {
            handle,
            id,
            priority,
            group,
        };
        info!("{}", notice);
        self.notify(notice);
        Ok(handle)
    }

    /// Free the slot. The user context is dropped.
    pub fn remove(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        let task = self.table.free(handle)?;
        self.stats.removals = self.stats.removals.wrapping_add(1);
        let notice = Notice::Removed {
            handle,
            id: task.tcb.id,
        };
        info!("{}", notice);
        self.notify(notice);
        Ok(())
    }

    /// Back to the entry point: marker, wake time, rate limiter, body, watchdog.
    pub fn restart(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.table.restart(handle, self.now)?;
        let id = self.table.tcb(handle).map_or(0, |t| t.id);
        let notice = Notice::Restarted { handle, id };
        info!("{}", notice);
        self.notify(notice);
        Ok(())
    }

    pub fn suspend(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.set_suspended(handle, true)
    }

    pub fn resume(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.set_suspended(handle, false)
    }

    fn set_suspended(&mut self, handle: TaskHandle, suspended: bool) -> Result<(), SchedError> {
        let task = self
            .table
            .entry_mut(handle)
            .ok_or(SchedError::InvalidHandle)?;
        task.tcb.suspended = suspended;
        Ok(())
    }

    /// `Some(timeout)` arms the watchdog from now; `None` turns it off.
    pub fn set_watchdog(
        &mut self,
        handle: TaskHandle,
        timeout_ms: Option<u32>,
    ) -> Result<(), SchedError> {
        let now = self.now;
        let task = self
            .table
            .entry_mut(handle)
            .ok_or(SchedError::InvalidHandle)?;
        task.tcb.watchdog = timeout_ms;
        task.tcb.arm_watchdog(now);
        Ok(())
    }

    // ── events and groups ───────────────────────────────────────────

    pub fn event_set(&mut self, id: EventId) {
        self.signals.event_set(id);
    }

    pub fn event_clear(&mut self, id: EventId) {
        self.signals.event_clear(id);
    }

    pub fn event_check(&self, id: EventId) -> bool {
        self.signals.event_check(id)
    }

    pub fn group_suspend(&mut self, group: GroupId) {
        self.signals.group_suspend(group);
    }

    pub fn group_resume(&mut self, group: GroupId) {
        self.signals.group_resume(group);
    }

    pub fn group_suspended(&self, group: GroupId) -> bool {
        self.signals.group_suspended(group)
    }

    // ── dispatch ────────────────────────────────────────────────────

    pub fn run_once(&mut self, clock: &impl Clock) -> TickReport {
        self.tick(clock.now_ms())
    }

    pub fn tick(&mut self, now: u32) -> TickReport {
        self.now = now;
        self.stats.ticks = self.stats.ticks.wrapping_add(1);
        let mut report = TickReport::default();

        let (order, n) = self.table.dispatch_order();
        for &slot in &order[..n] {
            // freed or suspended by a task earlier in this tick
            let Some((handle, task)) = self.table.slot_mut(slot) else {
                continue;
            };
            if task.tcb.suspended
                || self.signals.group_suspended(task.tcb.group)
                || !task.tcb.is_due(now)
            {
                continue;
            }

            let body = task.body;
            let mut cx = Context {
                tcb: &mut task.tcb,
                body: &mut task.body,
                signals: &mut self.signals,
                commands: &mut self.commands,
                handle,
                now,
                stalled: false,
            };
            body(&mut cx);
            let stalled = cx.stalled;

            let tcb = &mut task.tcb;
            tcb.last_run = now;
            tcb.runs = tcb.runs.wrapping_add(1);
            if !stalled {
                tcb.arm_watchdog(now);
            }
            report.ran += 1;
            self.stats.invocations = self.stats.invocations.wrapping_add(1);

            if tcb.resume.is_finished() {
                let id = tcb.id;
                if self.table.free(handle).is_ok() {
                    report.completed += 1;
                    self.stats.completions = self.stats.completions.wrapping_add(1);
                    let notice = Notice::Completed { handle, id };
                    info!("{}", notice);
                    self.notify(notice);
                }
            }

            self.apply_commands();
        }

        let observer = self.observer;
        report.recovered = watchdog::sweep(&mut self.table, now, |r| {
            if let Some(observer) = observer {
                observer(&Notice::WatchdogReset(r));
            }
        });
        self.stats.watchdog_resets = self
            .stats
            .watchdog_resets
            .wrapping_add(u32::from(report.recovered));

        report
    }

    fn apply_commands(&mut self) {
        while let Some(cmd) = self.commands.pop() {
            let result = match cmd {
                Command::Remove(h) => self.remove(h),
                Command::Restart(h) => self.restart(h),
                Command::Suspend(h) => self.suspend(h),
                Command::Resume(h) => self.resume(h),
            };
            if let Err(e) = result {
                debug!("ignored {}: {}", cmd, e);
            }
        }
    }

    // ── introspection ───────────────────────────────────────────────

    pub fn now(&self) -> u32 {
        self.now
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn tasks(&self) -> &TaskTable<U, N> {
        &self.table
    }

    pub fn tcb(&self, handle: TaskHandle) -> Option<&TaskControlBlock<U>> {
        self.table.tcb(handle)
    }

    pub fn find(&self, id: u8) -> Option<TaskHandle> {
        self.table.find(id)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Resume;

    type Sched = Scheduler<u32, 4>;

    fn sched() -> Sched {
        Scheduler::new(SchedulerConfig::new().with_watchdog_timeout(1000), 0)
    }

    fn bump(cx: &mut Context<'_, u32>) {
        *cx.user_mut() += 1;
    }

    fn once(cx: &mut Context<'_, u32>) {
        *cx.user_mut() += 1;
        cx.finish();
    }

    fn suicide(cx: &mut Context<'_, u32>) {
        *cx.user_mut() += 1;
        let me = cx.handle();
        cx.remove(me).unwrap();
        // the rest of this frame still runs
        *cx.user_mut() += 10;
    }

    fn stepper(cx: &mut Context<'_, u32>) {
        match cx.marker() {
            Resume::START => cx.yield_at(Resume::at(1)),
            _ => {
                *cx.user_mut() += 1;
                cx.rebind(bump);
                cx.yield_at(Resume::at(2));
            }
        }
    }

    #[test]
    fn suspended_task_is_skipped() {
        let mut s = sched();
        let h = s.register(bump, 1, 0, 0, 0).unwrap();
        s.suspend(h).unwrap();
        assert!(s.tick(10).is_idle());
        assert_eq!(s.tcb(h).unwrap().user(), &0);

        s.resume(h).unwrap();
        let r = s.tick(20);
        assert_eq!(r.ran, 1);
        assert!(!r.is_idle());
        assert_eq!(s.tcb(h).unwrap().user(), &1);
    }

    #[test]
    fn finished_task_frees_slot() {
        let mut s = sched();
        let h = s.register(once, 1, 0, 0, 0).unwrap();
        let r = s.tick(1);
        assert_eq!(r, TickReport { ran: 1, completed: 1, recovered: 0 });
        assert!(s.tcb(h).is_none());
        assert!(s.is_empty());

        s.tick(2);
        assert_eq!(s.stats().invocations, 1);
        assert_eq!(s.stats().completions, 1);
    }

    #[test]
    fn self_removal_finishes_current_frame() {
        let mut s = sched();
        let h = s.register(suicide, 1, 0, 0, 0).unwrap();
        let other = s.register(bump, 2, 0, 0, 0).unwrap();
        s.tick(1);

        assert!(s.tcb(h).is_none());
        assert_eq!(s.stats().removals, 1);
        assert_eq!(s.tcb(other).unwrap().user(), &1);
        assert_eq!(s.remove(h), Err(SchedError::InvalidHandle));
    }

    #[test]
    fn restart_undoes_rebind() {
        let mut s = sched();
        let h = s.register(stepper, 1, 0, 0, 0).unwrap();
        s.tick(1); // START -> @1
        s.tick(2); // @1: +1, rebind to bump
        s.tick(3); // bump: +1
        assert_eq!(s.tcb(h).unwrap().user(), &2);

        s.restart(h).unwrap();
        assert_eq!(s.tcb(h).unwrap().resume(), Resume::START);
        s.tick(4); // stepper again: START -> @1, no increment
        assert_eq!(s.tcb(h).unwrap().user(), &2);
        assert_eq!(s.tcb(h).unwrap().resume(), Resume::at(1));
    }

    #[test]
    fn invocation_rearms_watchdog() {
        let mut s = sched();
        let h = s.register(bump, 1, 0, 0, 0).unwrap();
        assert_eq!(s.tcb(h).unwrap().watchdog_deadline(), 1000);
        s.tick(900);
        assert_eq!(s.tcb(h).unwrap().watchdog_deadline(), 1900);
        assert_eq!(s.tcb(h).unwrap().last_run(), 900);
    }

    #[test]
    fn set_watchdog_off_prevents_reset() {
        let mut s = sched();
        let h = s.register(bump, 1, 0, 1, 0).unwrap();
        s.set_watchdog(h, None).unwrap();
        s.group_suspend(1);
        let r = s.tick(50_000);
        assert_eq!(r.recovered, 0);
        assert!(!s.tcb(h).unwrap().watchdog_enabled());
    }

    #[test]
    fn observer_sees_lifecycle() {
        use core::sync::atomic::{AtomicU32, Ordering};
        static SEEN: AtomicU32 = AtomicU32::new(0);

        fn observe(n: &Notice) {
            let bit = match n {
                Notice::Registered { .. } => 1,
                Notice::Completed { .. } => 2,
                Notice::Removed { .. } => 4,
                Notice::Restarted { .. } => 8,
                Notice::WatchdogReset(_) => 16,
            };
            SEEN.fetch_or(bit, Ordering::Relaxed);
        }

        let mut s = sched();
        s.set_observer(observe);
        let a = s.register(once, 1, 0, 0, 0).unwrap();
        let b = s.register(bump, 2, 0, 3, 0).unwrap();
        s.restart(b).unwrap();
        s.tick(1);
        s.group_suspend(3);
        s.tick(2000);
        s.remove(b).unwrap();

        assert!(s.tcb(a).is_none());
        assert_eq!(SEEN.load(Ordering::Relaxed), 31);
    }
}
