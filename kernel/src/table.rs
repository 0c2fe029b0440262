// Fixed-capacity task table
//
// Slots are never resized or moved. A handle is (slot, generation);
// the generation bumps every time a slot is freed, so a handle kept
// past remove/completion is rejected instead of reaching whoever
// took the slot next.
//
// Slot state machine:
//   Free   -> Active   insert (first free slot, linear scan)
//   Active -> Free     free (remove or completion)
//   Active -> Active   restart (execution reset, slot and metadata kept)

use core::cmp::Reverse;
use core::fmt;

use crate::SchedError;
use crate::signal::GroupId;
use crate::task::{TaskControlBlock, TaskFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    slot: u16,
    generation: u16,
}

impl TaskHandle {
    pub(crate) const fn new(slot: u16, generation: u16) -> Self {
        Self { slot, generation }
    }

    pub const fn slot(&self) -> usize {
        self.slot as usize
    }

    pub const fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.slot, self.generation)
    }
}

pub(crate) struct TaskEntry<U> {
    pub(crate) tcb: TaskControlBlock<U>,
    pub(crate) body: TaskFn<U>,
    // body as registered; restart rebinds to this
    pub(crate) entry: TaskFn<U>,
    // registration order, breaks priority ties
    pub(crate) seq: u32,
}

impl<U> TaskEntry<U> {
    pub(crate) fn restart(&mut self, now: u32) {
        self.tcb.reset(now);
        self.body = self.entry;
    }
}

struct Slot<U> {
    generation: u16,
    task: Option<TaskEntry<U>>,
}

/// Registration parameters, minus the body and user context.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Spawn {
    pub(crate) id: u8,
    pub(crate) priority: u8,
    pub(crate) group: GroupId,
    pub(crate) watchdog: Option<u32>,
}

pub struct TaskTable<U, const N: usize> {
    slots: [Slot<U>; N],
    next_seq: u32,
}

impl<U, const N: usize> TaskTable<U, N> {
    pub fn new() -> Self {
        // slot indices are stored in a u16
        const { assert!(N <= u16::MAX as usize + 1, "task table too large") };
        Self {
            slots: core::array::from_fn(|_| Slot {
                generation: 0,
                task: None,
            }),
            next_seq: 0,
        }
    }

    pub(crate) fn insert(
        &mut self,
        body: TaskFn<U>,
        spawn: Spawn,
        user: U,
        now: u32,
    ) -> Result<TaskHandle, SchedError> {
        let Some(slot) = self.slots.iter().position(|s| s.task.is_none()) else {
            return Err(SchedError::TableFull);
        };

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let s = &mut self.slots[slot];
        s.task = Some(TaskEntry {
            tcb: TaskControlBlock::new(
                spawn.id,
                spawn.priority,
                spawn.group,
                spawn.watchdog,
                user,
                now,
            ),
            body,
            entry: body,
            seq,
        });
        Ok(TaskHandle::new(slot as u16, s.generation))
    }

    /// Deactivate and hand back the occupant.
    pub(crate) fn free(&mut self, handle: TaskHandle) -> Result<TaskEntry<U>, SchedError> {
        self.check(handle)?;
        let s = &mut self.slots[handle.slot()];
        s.generation = s.generation.wrapping_add(1);
        s.task.take().ok_or(SchedError::InvalidHandle)
    }

    pub(crate) fn restart(&mut self, handle: TaskHandle, now: u32) -> Result<(), SchedError> {
        let task = self.entry_mut(handle).ok_or(SchedError::InvalidHandle)?;
        task.restart(now);
        Ok(())
    }

    fn check(&self, handle: TaskHandle) -> Result<(), SchedError> {
        match self.slots.get(handle.slot()) {
            Some(s) if s.generation == handle.generation && s.task.is_some() => Ok(()),
            _ => Err(SchedError::InvalidHandle),
        }
    }

    pub(crate) fn entry(&self, handle: TaskHandle) -> Option<&TaskEntry<U>> {
        self.check(handle).ok()?;
        self.slots[handle.slot()].task.as_ref()
    }

    pub(crate) fn entry_mut(&mut self, handle: TaskHandle) -> Option<&mut TaskEntry<U>> {
        self.check(handle).ok()?;
        self.slots[handle.slot()].task.as_mut()
    }

    /// Occupant of `slot` with its current handle.
    pub(crate) fn slot_mut(&mut self, slot: usize) -> Option<(TaskHandle, &mut TaskEntry<U>)> {
        let s = self.slots.get_mut(slot)?;
        let handle = TaskHandle::new(slot as u16, s.generation);
        s.task.as_mut().map(|t| (handle, t))
    }

    pub fn tcb(&self, handle: TaskHandle) -> Option<&TaskControlBlock<U>> {
        self.entry(handle).map(|t| &t.tcb)
    }

    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.check(handle).is_ok()
    }

    /// First active task registered under `id`, in slot order.
    pub fn find(&self, id: u8) -> Option<TaskHandle> {
        self.iter().find(|(_, tcb)| tcb.id == id).map(|(h, _)| h)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TaskHandle, &TaskControlBlock<U>)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.task
                .as_ref()
                .map(|t| (TaskHandle::new(i as u16, s.generation), &t.tcb))
        })
    }

    /// Active slots, highest priority first, ties in registration order.
    /// Returns the index buffer and how many entries are valid.
    pub(crate) fn dispatch_order(&self) -> ([usize; N], usize) {
        let mut order = [0usize; N];
        let mut n = 0;
        for (i, s) in self.slots.iter().enumerate() {
            if s.task.is_some() {
                order[n] = i;
                n += 1;
            }
        }
        // seq is unique per occupant, so the unstable sort is deterministic
        order[..n].sort_unstable_by_key(|&i| match &self.slots[i].task {
            Some(t) => (Reverse(t.tcb.priority), t.seq),
            None => (Reverse(0), u32::MAX),
        });
        (order, n)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.task.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.task.is_some())
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<U, const N: usize> Default for TaskTable<U, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Context, Resume};

    fn idle(_: &mut Context<'_, u32>) {}

    fn spawn(id: u8, priority: u8) -> Spawn {
        Spawn {
            id,
            priority,
            group: 0,
            watchdog: Some(1000),
        }
    }

    #[test]
    fn full_table_rejects_then_reuses_freed_slot() {
        let mut t: TaskTable<u32, 3> = TaskTable::new();
        let a = t.insert(idle, spawn(1, 0), 0, 0).unwrap();
        let b = t.insert(idle, spawn(2, 0), 0, 0).unwrap();
        let _c = t.insert(idle, spawn(3, 0), 0, 0).unwrap();
        assert!(t.is_full());
        assert_eq!(t.insert(idle, spawn(4, 0), 0, 0), Err(SchedError::TableFull));

        assert!(t.free(b).is_ok());
        let d = t.insert(idle, spawn(4, 0), 0, 0).unwrap();
        assert_eq!(d.slot(), b.slot());
        assert_ne!(d, b);
        assert!(t.contains(a));
    }

    #[test]
    fn stale_handle_is_rejected_after_reuse() {
        let mut t: TaskTable<u32, 2> = TaskTable::new();
        let old = t.insert(idle, spawn(1, 0), 0, 0).unwrap();
        assert!(t.free(old).is_ok());
        let new = t.insert(idle, spawn(9, 0), 0, 0).unwrap();

        assert!(t.free(old).is_err());
        assert_eq!(t.restart(old, 0), Err(SchedError::InvalidHandle));
        assert_eq!(t.tcb(new).map(|tcb| tcb.id()), Some(9));

        let bogus = TaskHandle::new(40, 0);
        assert!(!t.contains(bogus));
    }

    #[test]
    fn order_is_priority_then_registration() {
        let mut t: TaskTable<u32, 5> = TaskTable::new();
        let lo = t.insert(idle, spawn(0, 1), 0, 0).unwrap();
        t.insert(idle, spawn(1, 5), 0, 0).unwrap();
        t.insert(idle, spawn(2, 3), 0, 0).unwrap();
        t.insert(idle, spawn(3, 5), 0, 0).unwrap();

        // slot 0 reused by a later registration with the same priority as id 2
        assert!(t.free(lo).is_ok());
        t.insert(idle, spawn(4, 3), 0, 0).unwrap();

        let (order, n) = t.dispatch_order();
        let ids: [u8; 4] =
            core::array::from_fn(|k| t.slots[order[k]].task.as_ref().map_or(u8::MAX, |e| e.tcb.id));
        assert_eq!(n, 4);
        assert_eq!(ids, [1, 3, 2, 4]);
    }

    #[test]
    fn restart_restores_entry_body() {
        fn other(_: &mut Context<'_, u32>) {}

        let mut t: TaskTable<u32, 1> = TaskTable::new();
        let h = t.insert(idle, spawn(1, 0), 7, 0).unwrap();
        {
            let e = t.entry_mut(h).unwrap();
            e.body = other;
            e.tcb.resume = Resume::at(3);
            e.tcb.wake_time = Some(50);
        }
        t.restart(h, 200).unwrap();

        let e = t.entry(h).unwrap();
        assert_eq!(e.body as usize, idle as usize);
        assert_eq!(e.tcb.resume, Resume::START);
        assert_eq!(e.tcb.wake_time, None);
        assert_eq!(e.tcb.watchdog_deadline, 1200);
        assert_eq!(e.tcb.user, 7);
    }

    #[test]
    fn wide_table_keeps_slot_indices() {
        let mut t: TaskTable<u32, 300> = TaskTable::new();
        let mut last = None;
        for i in 0..300u32 {
            last = Some(t.insert(idle, spawn((i % 256) as u8, 0), i, 0).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.slot(), 299);
        assert_eq!(t.tcb(last).map(|tcb| *tcb.user()), Some(299));
        assert!(t.is_full());
    }

    #[test]
    fn find_returns_first_matching_id() {
        let mut t: TaskTable<u32, 3> = TaskTable::new();
        let first = t.insert(idle, spawn(5, 0), 0, 0).unwrap();
        t.insert(idle, spawn(5, 0), 0, 0).unwrap();
        assert_eq!(t.find(5), Some(first));
        assert_eq!(t.find(6), None);
    }
}
