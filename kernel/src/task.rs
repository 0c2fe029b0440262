// Resumable tasks
//
// A task body is a plain fn called once per dispatch. It keeps no
// continuation of its own: where to pick up next time lives in the
// TCB's resume marker, and the body matches on it at entry. Each body
// names its suspension points as Resume constants:
//
//     const WAIT: Resume = Resume::at(1);
//
//     fn alarm(cx: &mut Context<'_, u8>) {
//         match cx.marker() {
//             Resume::START => {
//                 let ready = cx.event_check(*cx.user());
//                 if !cx.wait_until(WAIT, ready) { return; }
//                 cx.finish();
//             }
//             WAIT => { /* same check again */ }
//             _ => cx.finish(),
//         }
//     }
//
// Suspending is "store a marker, return". The primitives on Context
// only ever write the TCB; returning is the body's job.

use core::fmt;

use crate::SchedError;
use crate::queue::{Command, CommandQueue};
use crate::signal::{EventId, GroupId, Signals};
use crate::table::TaskHandle;
use crate::time::{elapsed, reached};

/// Task body. Called repeatedly; must return (suspend) eventually.
pub type TaskFn<U> = fn(&mut Context<'_, U>);

/// Where a task continues on its next invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resume(u16);

impl Resume {
    pub const START: Resume = Resume(0);
    /// Terminal; the dispatcher frees the slot and never calls the body again
    pub const FINISHED: Resume = Resume(u16::MAX);

    /// Suspension point `point`. `u16::MAX` is reserved for [`Resume::FINISHED`].
    pub const fn at(point: u16) -> Resume {
        debug_assert!(point != u16::MAX);
        Resume(point)
    }

    pub const fn point(self) -> u16 {
        self.0
    }

    pub const fn is_start(self) -> bool {
        self.0 == Self::START.0
    }

    pub const fn is_finished(self) -> bool {
        self.0 == Self::FINISHED.0
    }
}

impl Default for Resume {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Resume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Resume::START => write!(f, "start"),
            Resume::FINISHED => write!(f, "finished"),
            Resume(p) => write!(f, "@{}", p),
        }
    }
}

/// Per-task scheduling state.
pub struct TaskControlBlock<U> {
    pub(crate) id: u8,
    pub(crate) resume: Resume,
    // None: ready now
    pub(crate) wake_time: Option<u32>,
    pub(crate) priority: u8,
    pub(crate) group: GroupId,
    pub(crate) suspended: bool,
    // timeout in ms; None disables the watchdog for this task
    pub(crate) watchdog: Option<u32>,
    pub(crate) watchdog_deadline: u32,
    pub(crate) last_run: u32,
    // rate limiter anchor for Context::every
    pub(crate) every_last: Option<u32>,
    pub(crate) runs: u32,
    pub(crate) recoveries: u32,
    pub(crate) user: U,
}

impl<U> TaskControlBlock<U> {
    pub(crate) fn new(
        id: u8,
        priority: u8,
        group: GroupId,
        watchdog: Option<u32>,
        user: U,
        now: u32,
    ) -> Self {
        let mut tcb = Self {
            id,
            resume: Resume::START,
            wake_time: None,
            priority,
            group,
            suspended: false,
            watchdog,
            watchdog_deadline: now,
            last_run: now,
            every_last: None,
            runs: 0,
            recoveries: 0,
            user,
        };
        tcb.arm_watchdog(now);
        tcb
    }

    pub(crate) fn arm_watchdog(&mut self, now: u32) {
        if let Some(timeout) = self.watchdog {
            self.watchdog_deadline = now.wrapping_add(timeout);
        }
    }

    /// Back to the entry point. Metadata and user context are kept.
    pub(crate) fn reset(&mut self, now: u32) {
        self.resume = Resume::START;
        self.wake_time = None;
        self.every_last = None;
        self.last_run = now;
        self.arm_watchdog(now);
    }

    pub(crate) fn is_due(&self, now: u32) -> bool {
        self.wake_time.is_none_or(|t| reached(now, t))
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn resume(&self) -> Resume {
        self.resume
    }

    pub fn wake_time(&self) -> Option<u32> {
        self.wake_time
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn watchdog_enabled(&self) -> bool {
        self.watchdog.is_some()
    }

    pub fn watchdog_timeout(&self) -> Option<u32> {
        self.watchdog
    }

    pub fn watchdog_deadline(&self) -> u32 {
        self.watchdog_deadline
    }

    pub fn last_run(&self) -> u32 {
        self.last_run
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    pub fn user(&self) -> &U {
        &self.user
    }
}

/// What a task body sees during one invocation.
pub struct Context<'a, U> {
    pub(crate) tcb: &'a mut TaskControlBlock<U>,
    pub(crate) body: &'a mut TaskFn<U>,
    pub(crate) signals: &'a mut Signals,
    pub(crate) commands: &'a mut CommandQueue,
    pub(crate) handle: TaskHandle,
    pub(crate) now: u32,
    // last primitive was a failed check; the dispatcher skips the watchdog re-arm
    pub(crate) stalled: bool,
}

impl<'a, U> Context<'a, U> {
    #[inline]
    pub fn now(&self) -> u32 {
        self.now
    }

    #[inline]
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.tcb.id
    }

    #[inline]
    pub fn marker(&self) -> Resume {
        self.tcb.resume
    }

    pub fn tcb(&self) -> &TaskControlBlock<U> {
        &*self.tcb
    }

    pub fn user(&self) -> &U {
        &self.tcb.user
    }

    pub fn user_mut(&mut self) -> &mut U {
        &mut self.tcb.user
    }

    // ── suspension primitives ───────────────────────────────────────

    /// Continue at `at` on the very next invocation.
    pub fn yield_at(&mut self, at: Resume) {
        self.tcb.resume = at;
        self.stalled = false;
    }

    /// Sleep `ms`, then continue at `at`. The body at `at` should open
    /// with [`Context::delay_done`].
    pub fn delay(&mut self, at: Resume, ms: u32) {
        self.tcb.wake_time = Some(self.now.wrapping_add(ms));
        self.tcb.resume = at;
        self.stalled = false;
    }

    /// True once the pending delay has elapsed. While false the marker
    /// is untouched, so returning re-suspends at the same point.
    pub fn delay_done(&mut self) -> bool {
        match self.tcb.wake_time {
            Some(t) if !reached(self.now, t) => {
                self.stalled = true;
                false
            }
            _ => {
                self.tcb.wake_time = None;
                self.stalled = false;
                true
            }
        }
    }

    /// Park at `at` until `ready` holds. No timeout; the body re-evaluates
    /// its condition on every tick and passes it in.
    pub fn wait_until(&mut self, at: Resume, ready: bool) -> bool {
        self.tcb.resume = at;
        self.stalled = !ready;
        ready
    }

    /// Rate limiter: true at most once per `interval_ms`. Unlike
    /// [`Context::delay`] the task is still dispatched every tick, and
    /// a short-circuited tick still counts as progress for the watchdog.
    /// The anchor is cleared by restart, so the first check after a
    /// (re)start always passes.
    pub fn every(&mut self, interval_ms: u32) -> bool {
        let due = self
            .tcb
            .every_last
            .is_none_or(|last| elapsed(self.now, last) >= interval_ms);
        if due {
            self.tcb.every_last = Some(self.now);
        }
        self.stalled = false;
        due
    }

    pub fn finish(&mut self) {
        self.tcb.resume = Resume::FINISHED;
        self.stalled = false;
    }

    /// Swap the body for later invocations. Undone by restart.
    pub fn rebind(&mut self, body: TaskFn<U>) {
        *self.body = body;
    }

    // ── registry ────────────────────────────────────────────────────

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

    // ── table control, applied when this invocation returns ─────────

    pub fn remove(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.command(Command::Remove(handle))
    }

    pub fn restart(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.command(Command::Restart(handle))
    }

    pub fn suspend(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.command(Command::Suspend(handle))
    }

    pub fn resume(&mut self, handle: TaskHandle) -> Result<(), SchedError> {
        self.command(Command::Resume(handle))
    }

    fn command(&mut self, cmd: Command) -> Result<(), SchedError> {
        self.commands
            .push(cmd)
            .map_err(|_| SchedError::CommandQueueFull)
    }
}
