// Event flags and group suspension bits
//
// Both are bounded bitsets owned by the scheduler. Dispatch is single
// threaded, so there is no locking: a write is visible to every task
// invoked after it in the same tick and to all later ticks. A reader
// that runs earlier in priority order than the writer only sees the
// write on the next tick.
//
// Out-of-range ids are ignored (reads return false). A misconfigured
// task keeps running instead of taking the scheduler down.

use core::fmt;

pub type EventId = u8;
pub type GroupId = u8;

/// Most flags a single set can hold.
pub const MAX_FLAGS: u8 = 32;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlagSet {
    bits: u32,
    len: u8,
}

impl FlagSet {
    /// `len` is clamped to [`MAX_FLAGS`].
    pub const fn new(len: u8) -> Self {
        Self {
            bits: 0,
            len: if len > MAX_FLAGS { MAX_FLAGS } else { len },
        }
    }

    #[inline]
    fn mask(&self, id: u8) -> Option<u32> {
        (id < self.len).then(|| 1u32 << id)
    }

    pub fn set(&mut self, id: u8) {
        if let Some(m) = self.mask(id) {
            self.bits |= m;
        }
    }

    pub fn clear(&mut self, id: u8) {
        if let Some(m) = self.mask(id) {
            self.bits &= !m;
        }
    }

    pub fn get(&self, id: u8) -> bool {
        self.mask(id).is_some_and(|m| self.bits & m != 0)
    }

    pub const fn len(&self) -> u8 {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Ids of the flags currently set, ascending.
    pub fn iter_set(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).filter(move |&id| self.bits & (1 << id) != 0)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_set()).finish()
    }
}

/// Event/group registry shared by every task of one scheduler.
#[derive(Debug, Clone, Copy)]
pub struct Signals {
    events: FlagSet,
    groups: FlagSet,
}

impl Signals {
    pub const fn new(events: u8, groups: u8) -> Self {
        Self {
            events: FlagSet::new(events),
            groups: FlagSet::new(groups),
        }
    }

    #[inline]
    pub fn event_set(&mut self, id: EventId) {
        self.events.set(id);
    }

    #[inline]
    pub fn event_clear(&mut self, id: EventId) {
        self.events.clear(id);
    }

    #[inline]
    pub fn event_check(&self, id: EventId) -> bool {
        self.events.get(id)
    }

    #[inline]
    pub fn group_suspend(&mut self, group: GroupId) {
        self.groups.set(group);
    }

    #[inline]
    pub fn group_resume(&mut self, group: GroupId) {
        self.groups.clear(group);
    }

    #[inline]
    pub fn group_suspended(&self, group: GroupId) -> bool {
        self.groups.get(group)
    }

    pub fn events(&self) -> &FlagSet {
        &self.events
    }

    pub fn groups(&self) -> &FlagSet {
        &self.groups
    }
}
