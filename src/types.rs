//! Newtype wrappers and type aliases for domain concepts.

use std::fmt;

/// Simulated thread identifier, assigned at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated time, counted in whole ticks.
pub type Ticks = u32;

/// Priority level. Higher numbers get the better service level.
pub type Priority = u8;

pub const MIN_PRIORITY: Priority = 0;
pub const MAX_PRIORITY: Priority = 4;

/// Number of distinct priority levels.
pub const PRIORITY_LEVELS: usize = (MAX_PRIORITY - MIN_PRIORITY) as usize + 1;
