//! Hardware queue classes.

use std::fmt;

use super::ResourceState;

/// The hardware queue a pass is submitted to.
///
/// Passes on the same queue are ordered by command-list order. Work on
/// different queues runs concurrently and is only ordered by fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueueType {
    /// Direct queue: rendering, compute and copy commands.
    Graphics,
    /// Asynchronous compute queue.
    Compute,
    /// Transfer-only queue.
    Copy,
}

impl QueueType {
    /// Number of queue classes.
    pub const COUNT: usize = 3;

    /// All queue classes, in index order.
    pub const ALL: [QueueType; Self::COUNT] = [Self::Graphics, Self::Compute, Self::Copy];

    /// Dense index usable for per-queue tables.
    pub fn index(self) -> usize {
        match self {
            Self::Graphics => 0,
            Self::Compute => 1,
            Self::Copy => 2,
        }
    }

    /// Human readable queue name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Graphics => "Graphics",
            Self::Compute => "Compute",
            Self::Copy => "Copy",
        }
    }

    /// Whether resource state transitions may be recorded on this queue.
    ///
    /// The copy queue never records transitions; resources it touches are
    /// tracked as a pass-through.
    pub fn supports_transitions(self) -> bool {
        !matches!(self, Self::Copy)
    }

    /// Whether a transition on this queue may name `state` as before or after.
    pub fn supports_state(self, state: ResourceState) -> bool {
        match self {
            Self::Graphics => true,
            Self::Compute => !state.intersects(ResourceState::GRAPHICS_ONLY),
            Self::Copy => false,
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
