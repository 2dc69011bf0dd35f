//! Index handles into the frame graph's arenas.
//!
//! Handles are `Copy` and cheap to pass around. They are only valid within
//! the [`FrameGraph`](super::FrameGraph) that created them, and only until its
//! next [`reset`](super::FrameGraph::reset).

use std::fmt;

macro_rules! graph_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Index into the owning arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

graph_handle!(
    /// Handle to a resource in the frame graph.
    ResourceHandle,
    "r"
);
graph_handle!(
    /// Handle to a pass in the frame graph.
    PassHandle,
    "p"
);
graph_handle!(
    /// Handle to a command list of a compiled schedule.
    CommandListHandle,
    "cl"
);
graph_handle!(
    /// Handle to a fence of a compiled schedule.
    FenceHandle,
    "f"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_index() {
        let handle = ResourceHandle::new(7);
        assert_eq!(handle.index(), 7);
        assert_eq!(handle.to_string(), "r7");
        assert_eq!(PassHandle::new(0).to_string(), "p0");
    }
}
