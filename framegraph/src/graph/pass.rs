//! Pass graph: declared passes and their resource accesses.

use std::fmt;

use crate::types::{BarrierHints, QueueType, ResourceState, Usage};

use super::{PassHandle, RenderContext, ResourceHandle};

/// Recording callback of a pass, invoked once per frame while the pass is live.
pub type PassCallback = Box<dyn FnMut(&mut RenderContext<'_>) + Send>;

/// Which access list of a pass an access belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessList {
    Reads,
    Writes,
    Creates,
}

/// One resource access of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAccess {
    /// Name the pass uses for the resource.
    pub name: String,
    /// Accessed resource.
    pub handle: ResourceHandle,
    /// Usage intent.
    pub usage: Usage,
    /// Extra states OR'd into the usage state.
    pub extra_states: ResourceState,
    /// Explicit barrier hints.
    pub hints: BarrierHints,
}

impl ResourceAccess {
    pub(crate) fn new(name: &str, handle: ResourceHandle, usage: Usage) -> Self {
        Self {
            name: name.to_string(),
            handle,
            usage,
            extra_states: ResourceState::empty(),
            hints: BarrierHints::default(),
        }
    }

    /// State the resource must be in for this access.
    pub fn state(&self) -> ResourceState {
        self.usage.state() | self.extra_states
    }
}

/// A declared pass.
pub struct RenderPass {
    pub(crate) name: String,
    pub(crate) queue: QueueType,
    pub(crate) reads: Vec<ResourceAccess>,
    pub(crate) writes: Vec<ResourceAccess>,
    pub(crate) creates: Vec<ResourceAccess>,
    pub(crate) has_side_effects: bool,
    pub(crate) refcount: u32,
    pub(crate) callback: Option<PassCallback>,
}

impl RenderPass {
    pub(crate) fn new(name: &str, queue: QueueType) -> Self {
        Self {
            name: name.to_string(),
            queue,
            reads: Vec::new(),
            writes: Vec::new(),
            creates: Vec::new(),
            has_side_effects: false,
            refcount: 0,
            callback: None,
        }
    }

    /// Pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue the pass is submitted to.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Read accesses.
    pub fn reads(&self) -> &[ResourceAccess] {
        &self.reads
    }

    /// Write accesses, excluding creations.
    pub fn writes(&self) -> &[ResourceAccess] {
        &self.writes
    }

    /// Resources created by this pass.
    pub fn creates(&self) -> &[ResourceAccess] {
        &self.creates
    }

    /// Whether the pass has externally observable effects.
    pub fn has_side_effects(&self) -> bool {
        self.has_side_effects
    }

    /// Remaining write count after culling.
    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// Whether the pass survived culling.
    pub fn is_used(&self) -> bool {
        self.refcount > 0 || self.has_side_effects
    }

    /// Whether a recording callback is bound.
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn list(&self, list: AccessList) -> &[ResourceAccess] {
        match list {
            AccessList::Reads => &self.reads,
            AccessList::Writes => &self.writes,
            AccessList::Creates => &self.creates,
        }
    }

    pub(crate) fn list_mut(&mut self, list: AccessList) -> &mut Vec<ResourceAccess> {
        match list {
            AccessList::Reads => &mut self.reads,
            AccessList::Writes => &mut self.writes,
            AccessList::Creates => &mut self.creates,
        }
    }

    /// All accesses: creations first, then reads, then writes.
    pub fn accesses(&self) -> impl Iterator<Item = &ResourceAccess> {
        self.creates
            .iter()
            .chain(self.reads.iter())
            .chain(self.writes.iter())
    }

    /// Write and create accesses.
    pub fn outputs(&self) -> impl Iterator<Item = &ResourceAccess> {
        self.creates.iter().chain(self.writes.iter())
    }

    /// Whether this pass creates `handle`.
    pub fn creates_resource(&self, handle: ResourceHandle) -> bool {
        self.creates.iter().any(|access| access.handle == handle)
    }
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("creates", &self.creates)
            .field("has_side_effects", &self.has_side_effects)
            .field("refcount", &self.refcount)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Arena of declared passes, in declaration order.
#[derive(Debug, Default)]
pub struct PassGraph {
    passes: Vec<RenderPass>,
}

impl PassGraph {
    /// Create an empty pass graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, pass: RenderPass) -> PassHandle {
        let handle = PassHandle::new(self.passes.len());
        self.passes.push(pass);
        handle
    }

    /// Look up a pass.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not created by this graph.
    pub fn get(&self, handle: PassHandle) -> &RenderPass {
        assert!(
            handle.index() < self.passes.len(),
            "Invalid pass handle {handle}"
        );
        &self.passes[handle.index()]
    }

    pub(crate) fn get_mut(&mut self, handle: PassHandle) -> &mut RenderPass {
        assert!(
            handle.index() < self.passes.len(),
            "Invalid pass handle {handle}"
        );
        &mut self.passes[handle.index()]
    }

    /// Iterate passes with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (PassHandle, &RenderPass)> {
        self.passes
            .iter()
            .enumerate()
            .map(|(i, pass)| (PassHandle::new(i), pass))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (PassHandle, &mut RenderPass)> {
        self.passes
            .iter_mut()
            .enumerate()
            .map(|(i, pass)| (PassHandle::new(i), pass))
    }

    /// Surviving passes in declaration order.
    pub fn live(&self) -> impl Iterator<Item = (PassHandle, &RenderPass)> {
        self.iter().filter(|(_, pass)| pass.is_used())
    }

    /// Number of declared passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Returns true if no pass was declared.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.passes.clear();
    }
}
