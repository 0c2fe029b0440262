use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Every slot holds an active task
    TableFull,
    /// Handle is out of range, or its slot was freed or reused since
    InvalidHandle,
    /// A running task queued more control commands than fit before it returned
    CommandQueueFull,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::TableFull => write!(f, "task table full"),
            SchedError::InvalidHandle => write!(f, "stale or invalid task handle"),
            SchedError::CommandQueueFull => write!(f, "task command queue full"),
        }
    }
}

impl core::error::Error for SchedError {}
