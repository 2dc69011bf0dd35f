//! Resource table.
//!
//! Every resource the graph knows about lives in one [`ResourceTable`] row,
//! addressed by [`ResourceHandle`]. A row carries the declaration (name, kind,
//! description, declared usage), the culling bookkeeping (refcount, producer
//! and last consumer) and, once compiled, the materialized native resources
//! and views.
//!
//! | Kind | Owner | Materialized | Restored at frame end |
//! |------|-------|--------------|-----------------------|
//! | [`Transient`](ResourceKind::Transient) | graph, one topology | if live | if created outside the copy queue |
//! | [`Managed`](ResourceKind::Managed) | graph, persistent | if live | always |
//! | [`Imported`](ResourceKind::Imported) | caller | never | always |

use crate::backend::{NativeResource, ViewIndex};
use crate::types::{
    QueueType, ResourceInfo, ResourceState, Usage, ViewDesc, ViewKind, ViewUsage,
};

use super::{PassHandle, ResourceHandle};

/// Who owns a resource and how long it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Created by a pass and owned by the graph.
    Transient,
    /// Owned by the caller; the graph only tracks its state.
    Imported,
    /// Declared up front and owned by the graph; contents persist across frames.
    Managed,
}

/// Views of one native copy of a resource, indexed by [`ViewKind::index`].
pub(crate) type ViewSet = [Option<ViewIndex>; ViewKind::COUNT];

/// One row of the [`ResourceTable`].
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub(crate) name: String,
    pub(crate) kind: ResourceKind,
    pub(crate) info: ResourceInfo,
    pub(crate) usage: Usage,
    pub(crate) initial_state: ResourceState,
    pub(crate) final_usage: Option<Usage>,
    pub(crate) creator_queue: Option<QueueType>,
    pub(crate) producer: Option<PassHandle>,
    pub(crate) last_consumer: Option<PassHandle>,
    pub(crate) refcount: u32,
    pub(crate) live: bool,
    pub(crate) view_usage: ViewUsage,
    pub(crate) view_overrides: [Option<ViewDesc>; ViewKind::COUNT],
    pub(crate) natives: Vec<NativeResource>,
    pub(crate) views: Vec<ViewSet>,
}

impl ResourceEntry {
    pub(crate) fn new(name: &str, kind: ResourceKind, info: ResourceInfo, usage: Usage) -> Self {
        Self {
            name: name.to_string(),
            kind,
            info,
            usage,
            initial_state: usage.state(),
            final_usage: None,
            creator_queue: None,
            producer: None,
            last_consumer: None,
            refcount: 0,
            live: false,
            view_usage: ViewUsage::empty(),
            view_overrides: [None; ViewKind::COUNT],
            natives: Vec::new(),
            views: Vec::new(),
        }
    }

    /// Debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ownership class.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Shape and format.
    pub fn info(&self) -> &ResourceInfo {
        &self.info
    }

    /// Usage declared when the resource entered the graph.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// State the resource is in when a frame starts.
    pub fn initial_state(&self) -> ResourceState {
        self.initial_state
    }

    /// Caller-declared final usage, if any.
    pub fn final_usage(&self) -> Option<Usage> {
        self.final_usage
    }

    /// State the resource must be left in when a frame ends, if any.
    pub fn restore_state(&self) -> Option<ResourceState> {
        if let Some(usage) = self.final_usage {
            return Some(usage.state());
        }
        match self.kind {
            ResourceKind::Imported | ResourceKind::Managed => Some(self.initial_state),
            ResourceKind::Transient => self
                .creator_queue
                .filter(|queue| queue.supports_transitions())
                .map(|_| self.initial_state),
        }
    }

    /// Last pass declared to write this resource.
    pub fn producer(&self) -> Option<PassHandle> {
        self.producer
    }

    /// Last pass declared to read this resource.
    pub fn last_consumer(&self) -> Option<PassHandle> {
        self.last_consumer
    }

    /// Remaining reader count after culling.
    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// Whether a surviving pass accesses this resource.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Views requested by surviving passes.
    pub fn view_usage(&self) -> ViewUsage {
        self.view_usage
    }

    /// Explicit description for views of `kind`, if overridden.
    pub fn view_override(&self, kind: ViewKind) -> Option<&ViewDesc> {
        self.view_overrides[kind.index()].as_ref()
    }

    /// Whether native resources are bound.
    pub fn is_materialized(&self) -> bool {
        !self.natives.is_empty()
    }

    /// Native resource for `frame_index`.
    ///
    /// Buffered resources hold one copy per frame in flight; others hold one.
    pub fn native(&self, frame_index: usize) -> Option<NativeResource> {
        if self.natives.is_empty() {
            return None;
        }
        self.natives.get(frame_index % self.natives.len()).copied()
    }

    /// View of `kind` for `frame_index`.
    pub fn view(&self, frame_index: usize, kind: ViewKind) -> Option<ViewIndex> {
        if self.views.is_empty() {
            return None;
        }
        self.views[frame_index % self.views.len()][kind.index()]
    }
}

/// Arena of resource rows.
#[derive(Debug, Default)]
pub struct ResourceTable {
    entries: Vec<ResourceEntry>,
}

impl ResourceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, entry: ResourceEntry) -> ResourceHandle {
        let handle = ResourceHandle::new(self.entries.len());
        self.entries.push(entry);
        handle
    }

    /// Look up a row.
    ///
    /// # Panics
    ///
    /// Panics if the handle was not created by this table.
    pub fn get(&self, handle: ResourceHandle) -> &ResourceEntry {
        assert!(
            handle.index() < self.entries.len(),
            "Invalid resource handle {handle}"
        );
        &self.entries[handle.index()]
    }

    pub(crate) fn get_mut(&mut self, handle: ResourceHandle) -> &mut ResourceEntry {
        assert!(
            handle.index() < self.entries.len(),
            "Invalid resource handle {handle}"
        );
        &mut self.entries[handle.index()]
    }

    /// Look up a row without panicking.
    pub fn try_get(&self, handle: ResourceHandle) -> Option<&ResourceEntry> {
        self.entries.get(handle.index())
    }

    /// Iterate rows with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceHandle, &ResourceEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (ResourceHandle::new(i), entry))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ResourceHandle, &mut ResourceEntry)> {
        self.entries
            .iter_mut()
            .enumerate()
            .map(|(i, entry)| (ResourceHandle::new(i), entry))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
