//! Core value types shared by the frame graph and the device layer.

mod format;
mod queue;
mod resource;
mod usage;

pub use format::Format;
pub use queue::QueueType;
pub use resource::{Clear, ResourceInfo, ResourceSize};
pub use usage::{
    BarrierAccess, BarrierHints, BarrierLayout, BarrierSync, ResourceState, Usage, ViewDesc,
    ViewKind, ViewUsage,
};
