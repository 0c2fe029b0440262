// Table commands raised from inside a task body
//
// A running task holds a borrow of its own slot, so it cannot edit the
// table directly. It records what it wants here instead, and the
// dispatcher drains the ring in FIFO order as soon as that body
// returns. Fixed capacity; when full, push gives the command back.

use core::fmt;

use crate::table::TaskHandle;

pub const COMMAND_QUEUE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Remove(TaskHandle),
    Restart(TaskHandle),
    Suspend(TaskHandle),
    Resume(TaskHandle),
}

impl Command {
    pub const fn handle(&self) -> TaskHandle {
        match *self {
            Command::Remove(h) | Command::Restart(h) | Command::Suspend(h) | Command::Resume(h) => h,
        }
    }

    const fn verb(&self) -> &'static str {
        match self {
            Command::Remove(_) => "remove",
            Command::Restart(_) => "restart",
            Command::Suspend(_) => "suspend",
            Command::Resume(_) => "resume",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.handle())
    }
}

pub struct CommandQueue<const N: usize = COMMAND_QUEUE_LEN> {
    ring: [Option<Command>; N],
    // oldest pending entry
    first: usize,
    pending: usize,
}

impl<const N: usize> CommandQueue<N> {
    pub const fn new() -> Self {
        Self {
            ring: [None; N],
            first: 0,
            pending: 0,
        }
    }

    pub fn push(&mut self, cmd: Command) -> Result<(), Command> {
        if self.pending == N {
            return Err(cmd);
        }
        let at = (self.first + self.pending) % N;
        self.ring[at] = Some(cmd);
        self.pending += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Command> {
        if self.pending == 0 {
            return None;
        }
        let cmd = self.ring[self.first].take();
        self.first = (self.first + 1) % N;
        self.pending -= 1;
        cmd
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    pub fn len(&self) -> usize {
        self.pending
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
