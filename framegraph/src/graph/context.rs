//! Execution context handed to pass callbacks.

use crate::backend::{Device, NativeCommandList, NativeResource, ViewIndex};
use crate::types::{QueueType, ResourceInfo, ViewKind};

use super::resource::ResourceTable;
use super::{PassHandle, ResourceHandle};

/// What a pass callback sees while it records.
///
/// Resource and view lookups resolve against the current frame index, so
/// buffered resources return this frame's copy.
pub struct RenderContext<'a> {
    pub(crate) device: &'a dyn Device,
    pub(crate) resources: &'a ResourceTable,
    pub(crate) list: NativeCommandList,
    pub(crate) queue: QueueType,
    pub(crate) pass: PassHandle,
    pub(crate) pass_name: &'a str,
    pub(crate) frame_index: usize,
}

impl<'a> RenderContext<'a> {
    /// The device.
    pub fn device(&self) -> &'a dyn Device {
        self.device
    }

    /// The open command list of this pass's queue.
    pub fn command_list(&self) -> NativeCommandList {
        self.list
    }

    /// Queue the pass runs on.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// The pass being recorded.
    pub fn pass(&self) -> PassHandle {
        self.pass
    }

    /// Name of the pass being recorded.
    pub fn pass_name(&self) -> &'a str {
        self.pass_name
    }

    /// Frame index used for buffered resources.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Description of a resource.
    pub fn info(&self, handle: ResourceHandle) -> &'a ResourceInfo {
        &self.resources.get(handle).info
    }

    /// Native resource behind `handle`.
    pub fn resource(&self, handle: ResourceHandle) -> Option<NativeResource> {
        self.resources.get(handle).native(self.frame_index)
    }

    /// View of `kind` on `handle`.
    pub fn view(&self, handle: ResourceHandle, kind: ViewKind) -> Option<ViewIndex> {
        self.resources.get(handle).view(self.frame_index, kind)
    }

    /// Shader-read view.
    pub fn srv(&self, handle: ResourceHandle) -> Option<ViewIndex> {
        self.view(handle, ViewKind::ShaderRead)
    }

    /// Unordered-access view.
    pub fn uav(&self, handle: ResourceHandle) -> Option<ViewIndex> {
        self.view(handle, ViewKind::UnorderedAccess)
    }

    /// Colour-target view.
    pub fn rtv(&self, handle: ResourceHandle) -> Option<ViewIndex> {
        self.view(handle, ViewKind::ColorTarget)
    }

    /// Depth-target view.
    pub fn dsv(&self, handle: ResourceHandle) -> Option<ViewIndex> {
        self.view(handle, ViewKind::DepthTarget)
    }
}
