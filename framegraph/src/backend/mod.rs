//! Device abstraction consumed by the frame graph.
//!
//! The frame graph does not talk to a graphics API directly. Everything it
//! needs from the GPU goes through two capabilities:
//!
//! - [`Device`] - command lists, queue submission, resources and fences
//! - [`ViewAllocator`] - descriptor views on resources
//!
//! Both are object safe and take `&self`; implementations use interior
//! mutability and must be `Send + Sync`.
//!
//! Native objects cross the boundary as opaque 64-bit handles
//! ([`NativeResource`], [`NativeCommandList`], [`NativeFence`], [`ViewIndex`]).
//! The frame graph never interprets them.
//!
//! # Backends
//!
//! | Backend | Type | Feature |
//! |---------|------|---------|
//! | Dummy | [`DummyDevice`] | `dummy` (default) |

#[cfg(feature = "dummy")]
mod dummy;
mod error;

#[cfg(feature = "dummy")]
pub use dummy::{DeviceCommand, DummyDevice};
pub use error::DeviceError;

use crate::types::{
    BarrierHints, QueueType, ResourceInfo, ResourceState, ViewDesc, ViewKind, ViewUsage,
};

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw device handle.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw device handle.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

native_handle!(
    /// Opaque device resource.
    NativeResource
);
native_handle!(
    /// Opaque device command list.
    NativeCommandList
);
native_handle!(
    /// Opaque device fence.
    NativeFence
);
native_handle!(
    /// Index of a view in the device's descriptor heap.
    ViewIndex
);

/// Everything the device needs to create a resource.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDesc<'a> {
    /// Debug name.
    pub name: &'a str,
    /// Shape, format and clear value.
    pub info: &'a ResourceInfo,
    /// Views the resource must support.
    pub usage: ViewUsage,
    /// State the resource is created in.
    pub initial_state: ResourceState,
}

/// A barrier resolved against native resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeBarrier {
    /// State transition.
    Transition {
        resource: NativeResource,
        before: ResourceState,
        after: ResourceState,
        hints: BarrierHints,
    },
    /// Unordered-access hazard barrier.
    Unordered { resource: NativeResource },
}

/// Command lists, queues, resources and fences.
pub trait Device: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &'static str;

    /// Allocate a command list for `queue`.
    fn create_command_list(&self, queue: QueueType) -> Result<NativeCommandList, DeviceError>;

    /// Reset a command list and begin recording.
    fn reset_command_list(&self, list: NativeCommandList) -> Result<(), DeviceError>;

    /// Record a batch of barriers.
    fn resource_barrier(&self, list: NativeCommandList, barriers: &[NativeBarrier]);

    /// Close a command list and submit it to `queue`.
    fn submit(&self, queue: QueueType, list: NativeCommandList) -> Result<(), DeviceError>;

    /// Release a command list.
    fn destroy_command_list(&self, list: NativeCommandList);

    /// Create a resource.
    fn create_resource(&self, desc: &ResourceDesc<'_>) -> Result<NativeResource, DeviceError>;

    /// Release a resource.
    fn destroy_resource(&self, resource: NativeResource);

    /// Create a fence with value 0.
    fn create_fence(&self) -> Result<NativeFence, DeviceError>;

    /// Make `queue` set `fence` to `value` once its submitted work completes.
    fn signal(&self, queue: QueueType, fence: NativeFence, value: u64) -> Result<(), DeviceError>;

    /// Make `queue` wait until `fence` reaches `value`.
    fn wait(&self, queue: QueueType, fence: NativeFence, value: u64) -> Result<(), DeviceError>;

    /// Block the calling thread until `fence` reaches `value`.
    fn wait_cpu(&self, fence: NativeFence, value: u64) -> Result<(), DeviceError>;

    /// Release a fence.
    fn destroy_fence(&self, fence: NativeFence);
}

/// Descriptor view allocation.
///
/// Passed to the frame graph at construction; there is no global descriptor heap.
pub trait ViewAllocator: Send + Sync {
    /// Create a view of `kind` on `resource`.
    fn create_view(
        &self,
        resource: NativeResource,
        kind: ViewKind,
        desc: &ViewDesc,
    ) -> Result<ViewIndex, DeviceError>;

    /// Release a view.
    fn free_view(&self, kind: ViewKind, view: ViewIndex);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_handle_raw() {
        let resource = NativeResource::from_raw(42);
        assert_eq!(resource.raw(), 42);
        assert_ne!(resource, NativeResource::from_raw(43));
    }
}
