//! # RedLilium Frame Graph
//!
//! Frame graph compiler and scheduler for explicit graphics APIs.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameGraph`] - Declarative passes and resources, compiled once and replayed every frame
//! - [`Schedule`] - The compiled event stream: barriers, command lists and cross-queue fences
//! - [`Device`] / [`ViewAllocator`] - Traits a graphics backend implements
//! - [`DummyDevice`] - A recording backend for tests (feature `dummy`)
//!
//! Compilation culls passes that cannot reach a side effect, infers which
//! views every resource needs, allocates live graph-owned resources and turns
//! the pass list into a linear schedule of resource state transitions and
//! queue synchronization.
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_framegraph::{FrameGraph, FrameGraphConfig, Usage};
//!
//! let mut graph = FrameGraph::with_device(device, FrameGraphConfig::default());
//! let swap = graph.import_with_final("swap", info, Usage::ColorTarget, Usage::Present, image);
//! let mut pass = graph.graphics("draw");
//! pass.write(swap, "swap", Usage::ColorTarget);
//! pass.bind(|ctx| record_draw(ctx));
//! graph.compile()?;
//! graph.execute()?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod graph;
pub mod profiling;
pub mod types;

// Re-export main types for convenience
pub use backend::{Device, DeviceError, NativeResource, ViewAllocator, ViewIndex};
#[cfg(feature = "dummy")]
pub use backend::DummyDevice;
pub use config::FrameGraphConfig;
pub use error::FrameGraphError;
pub use graph::{
    Barrier, FrameGraph, PassHandle, RenderContext, ResourceHandle, Schedule, ScheduleEvent,
};
pub use types::{Format, QueueType, ResourceInfo, ResourceState, Usage, ViewKind};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the frame graph subsystem.
pub fn init() {
    log::info!("RedLilium Frame Graph v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_frame_graph_creation() {
        let graph =
            FrameGraph::with_device(Arc::new(DummyDevice::new()), FrameGraphConfig::default());
        assert!(graph.passes().is_empty());
        assert!(graph.schedule().is_none());
        assert_eq!(graph.device().name(), "Dummy");
    }
}
