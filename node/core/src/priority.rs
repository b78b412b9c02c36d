//! Task priority levels

use core::fmt;
use crate::{NodeError, NodeResult};

/// Number of distinct priority levels
pub const PRIORITY_LEVELS: usize = 3;

/// Raw script-facing value of [`TaskPriority::Low`]
pub const LOW_PRIORITY: u8 = 0;
/// Raw script-facing value of [`TaskPriority::Medium`]
pub const MEDIUM_PRIORITY: u8 = 1;
/// Raw script-facing value of [`TaskPriority::High`]
pub const HIGH_PRIORITY: u8 = 2;

/// Dispatch precedence class of a posted task.
///
/// Ordering follows dispatch precedence: `High > Medium > Low`. While any
/// higher level holds a task, no lower level is drained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Low = LOW_PRIORITY as isize,
    #[default]
    Medium = MEDIUM_PRIORITY as isize,
    High = HIGH_PRIORITY as isize,
}

impl TaskPriority {
    /// All levels, highest first (dispatch order)
    pub const DESCENDING: [TaskPriority; PRIORITY_LEVELS] =
        [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    /// Convert a raw script-facing value
    pub fn from_raw(raw: u8) -> NodeResult<Self> {
        match raw {
            LOW_PRIORITY => Ok(TaskPriority::Low),
            MEDIUM_PRIORITY => Ok(TaskPriority::Medium),
            HIGH_PRIORITY => Ok(TaskPriority::High),
            _ => Err(NodeError::InvalidPriority),
        }
    }

    /// Get the raw value
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Index into per-level storage
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for TaskPriority {
    type Error = NodeError;

    fn try_from(raw: u8) -> NodeResult<Self> {
        Self::from_raw(raw)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "LOW"),
            TaskPriority::Medium => write!(f, "MEDIUM"),
            TaskPriority::High => write!(f, "HIGH"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskPriority {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TaskPriority::Low => defmt::write!(fmt, "LOW"),
            TaskPriority::Medium => defmt::write!(fmt, "MEDIUM"),
            TaskPriority::High => defmt::write!(fmt, "HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_raw() {
        assert_eq!(TaskPriority::from_raw(0), Ok(TaskPriority::Low));
        assert_eq!(TaskPriority::from_raw(1), Ok(TaskPriority::Medium));
        assert_eq!(TaskPriority::from_raw(2), Ok(TaskPriority::High));
        assert_eq!(TaskPriority::from_raw(3), Err(NodeError::InvalidPriority));
    }

    #[test]
    fn test_descending_is_dispatch_order() {
        let levels = TaskPriority::DESCENDING;
        assert!(levels.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(levels.len(), PRIORITY_LEVELS);
    }
}
