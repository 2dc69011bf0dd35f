//! Declaration builders.
//!
//! [`FrameGraph::pass`](super::FrameGraph::pass) returns a [`PassBuilder`]
//! that records the pass's resource accesses. Every access method returns an
//! [`AccessBuilder`] for per-access overrides:
//!
//! ```ignore
//! let mut pass = graph.graphics("tonemap");
//! pass.read(hdr, "hdr", Usage::PixelShaderRead)
//!     .override_view(ViewKind::ShaderRead, ViewDesc::new().with_format(Format::Rgba16Float));
//! let wrote_output = pass
//!     .write(backbuffer, "output", Usage::ColorTarget)
//!     .with_final_usage(Usage::Present)
//!     .marked_side_effects();
//! assert!(wrote_output);
//! pass.bind(|ctx| {
//!     let rtv = ctx.rtv(backbuffer);
//!     // record draws...
//! });
//! ```

use crate::types::{
    BarrierAccess, BarrierLayout, BarrierSync, QueueType, ResourceInfo, ResourceState, Usage,
    ViewDesc, ViewKind,
};

use super::pass::{AccessList, PassGraph, ResourceAccess};
use super::resource::{ResourceEntry, ResourceKind, ResourceTable};
use super::{PassHandle, RenderContext, ResourceHandle};

/// Records the resource accesses of one pass.
pub struct PassBuilder<'g> {
    passes: &'g mut PassGraph,
    resources: &'g mut ResourceTable,
    pass: PassHandle,
}

impl<'g> PassBuilder<'g> {
    pub(crate) fn new(
        passes: &'g mut PassGraph,
        resources: &'g mut ResourceTable,
        pass: PassHandle,
    ) -> Self {
        Self {
            passes,
            resources,
            pass,
        }
    }

    /// Handle of the pass being declared.
    pub fn handle(&self) -> PassHandle {
        self.pass
    }

    /// Queue of the pass being declared.
    pub fn queue(&self) -> QueueType {
        self.passes.get(self.pass).queue
    }

    /// Read `handle` with `usage`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not a resource of this graph.
    pub fn read(&mut self, handle: ResourceHandle, name: &str, usage: Usage) -> AccessBuilder<'_> {
        self.resources.get_mut(handle).last_consumer = Some(self.pass);
        self.push(AccessList::Reads, ResourceAccess::new(name, handle, usage), false)
    }

    /// Read `handle` with the usage it was declared with.
    pub fn read_default(&mut self, handle: ResourceHandle, name: &str) -> AccessBuilder<'_> {
        let usage = self.resources.get(handle).usage;
        self.read(handle, name, usage)
    }

    /// Write `handle` with `usage`.
    ///
    /// Writing an imported resource makes the pass side-effecting; the
    /// returned builder reports it through
    /// [`AccessBuilder::marked_side_effects`].
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not a resource of this graph.
    pub fn write(&mut self, handle: ResourceHandle, name: &str, usage: Usage) -> AccessBuilder<'_> {
        let entry = self.resources.get_mut(handle);
        entry.producer = Some(self.pass);
        let imported = entry.kind == ResourceKind::Imported;
        if imported {
            self.passes.get_mut(self.pass).has_side_effects = true;
        }
        self.push(
            AccessList::Writes,
            ResourceAccess::new(name, handle, usage),
            imported,
        )
    }

    /// Create a transient resource and write it with `usage`.
    ///
    /// The resource is materialized in the state of `usage`.
    pub fn create(&mut self, info: ResourceInfo, name: &str, usage: Usage) -> AccessBuilder<'_> {
        let mut entry = ResourceEntry::new(name, ResourceKind::Transient, info, usage);
        entry.creator_queue = Some(self.queue());
        entry.producer = Some(self.pass);
        let handle = self.resources.insert(entry);
        self.push(AccessList::Creates, ResourceAccess::new(name, handle, usage), false)
    }

    /// Force the pass to survive culling.
    pub fn side_effects(&mut self, has_side_effects: bool) -> &mut Self {
        self.passes.get_mut(self.pass).has_side_effects = has_side_effects;
        self
    }

    /// Bind the recording callback and finish the declaration.
    pub fn bind<F>(self, callback: F) -> PassHandle
    where
        F: FnMut(&mut RenderContext<'_>) + Send + 'static,
    {
        self.passes.get_mut(self.pass).callback = Some(Box::new(callback));
        self.pass
    }

    fn push(
        &mut self,
        list: AccessList,
        access: ResourceAccess,
        marked_side_effects: bool,
    ) -> AccessBuilder<'_> {
        let pass = self.passes.get_mut(self.pass);
        let entries = pass.list_mut(list);
        entries.push(access);
        let index = entries.len() - 1;
        AccessBuilder {
            passes: &mut *self.passes,
            resources: &mut *self.resources,
            pass: self.pass,
            list,
            index,
            marked_side_effects,
        }
    }
}

/// Per-access overrides, returned by every [`PassBuilder`] access method.
pub struct AccessBuilder<'b> {
    passes: &'b mut PassGraph,
    resources: &'b mut ResourceTable,
    pass: PassHandle,
    list: AccessList,
    index: usize,
    marked_side_effects: bool,
}

impl AccessBuilder<'_> {
    /// The accessed resource.
    pub fn handle(&self) -> ResourceHandle {
        self.access().handle
    }

    /// True if this access made the pass side-effecting, i.e. it writes an
    /// imported resource.
    pub fn marked_side_effects(&self) -> bool {
        self.marked_side_effects
    }

    /// Require additional states on top of the usage state.
    pub fn with_states(mut self, states: ResourceState) -> Self {
        self.access_mut().extra_states |= states;
        self
    }

    /// Forward an explicit texture layout to the device.
    pub fn with_layout(mut self, layout: BarrierLayout) -> Self {
        self.access_mut().hints.layout = Some(layout);
        self
    }

    /// Forward an explicit access scope to the device.
    pub fn with_access(mut self, access: BarrierAccess) -> Self {
        self.access_mut().hints.access = Some(access);
        self
    }

    /// Forward an explicit synchronization scope to the device.
    pub fn with_sync(mut self, sync: BarrierSync) -> Self {
        self.access_mut().hints.sync = Some(sync);
        self
    }

    /// Use `desc` instead of the derived description for views of `kind`.
    pub fn override_view(self, kind: ViewKind, desc: ViewDesc) -> Self {
        let handle = self.handle();
        self.resources.get_mut(handle).view_overrides[kind.index()] = Some(desc);
        self
    }

    /// Leave the resource in `usage` when the frame ends.
    pub fn with_final_usage(self, usage: Usage) -> Self {
        let handle = self.handle();
        self.resources.get_mut(handle).final_usage = Some(usage);
        self
    }

    fn access(&self) -> &ResourceAccess {
        &self.passes.get(self.pass).list(self.list)[self.index]
    }

    fn access_mut(&mut self) -> &mut ResourceAccess {
        &mut self.passes.get_mut(self.pass).list_mut(self.list)[self.index]
    }
}
