// Watchdog monitor
//
// Runs once per tick, after dispatch, so a task re-armed during this
// tick's dispatch cannot trip in the same tick. Any active task with
// the watchdog on whose deadline has passed is put back at its entry
// point, exactly like restart.
//
// It cannot tell a hung task from one legitimately parked in
// wait_until or a long delay. Tasks that wait longer than their
// timeout on purpose must raise the timeout or turn the watchdog off.

use log::warn;

use crate::table::{TaskHandle, TaskTable};
use crate::time::{elapsed, expired};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recovery {
    pub handle: TaskHandle,
    pub id: u8,
    pub overdue_ms: u32,
}

/// Reset every overdue task. Returns how many were reset.
pub(crate) fn sweep<U, const N: usize>(
    table: &mut TaskTable<U, N>,
    now: u32,
    mut on_reset: impl FnMut(Recovery),
) -> u16 {
    let mut recovered = 0;
    for slot in 0..N {
        let Some((handle, task)) = table.slot_mut(slot) else {
            continue;
        };
        if task.tcb.watchdog.is_none() || !expired(now, task.tcb.watchdog_deadline) {
            continue;
        }

        let overdue_ms = elapsed(now, task.tcb.watchdog_deadline);
        warn!(
            "[wdt] task {} overdue by {}ms at {}, restarting",
            task.tcb.id,
            overdue_ms,
            task.tcb.resume
        );
        task.restart(now);
        task.tcb.recoveries = task.tcb.recoveries.wrapping_add(1);
        recovered += 1;

        on_reset(Recovery {
            handle,
            id: task.tcb.id,
            overdue_ms,
        });
    }
    recovered
}
