//! Frame graph declaration, compilation and execution.
//!
//! A [`FrameGraph`] is declared once per topology, compiled once, and then
//! executed every frame until the topology changes (e.g. a swapchain resize),
//! at which point it is [`reset`](FrameGraph::reset) and declared again.
//!
//! # Pipeline
//!
//! | Stage | Type | Purpose |
//! |-------|------|---------|
//! | Declare | [`PassBuilder`], [`AccessBuilder`] | Passes, accesses and resources |
//! | Cull | [`GraphOptimizer`] | Drop passes that cannot reach a side effect |
//! | Infer | [`UsageTracker`] | Decide which views each resource needs |
//! | Allocate | [`ResourceMaterializer`] | Create live graph-owned resources |
//! | Schedule | [`BarrierScheduler`] | Barriers, queue switches and fences |
//! | Replay | [`ScheduleExecutor`] | Issue the schedule every frame |
//!
//! # Example
//!
//! ```ignore
//! use redlilium_framegraph::{FrameGraph, FrameGraphConfig, QueueType, ResourceInfo, Format, Usage};
//!
//! let mut graph = FrameGraph::new(device.clone(), device.clone(), FrameGraphConfig::default());
//! let backbuffer = graph.import_with_final(
//!     "backbuffer", info, Usage::ColorTarget, Usage::Present, swapchain_image,
//! );
//!
//! let mut upload = graph.copy("upload");
//! let mesh = upload.create(ResourceInfo::array(32, 1024), "mesh", Usage::CopyDest).handle();
//! upload.bind(|ctx| { /* copy commands */ });
//!
//! let mut draw = graph.graphics("draw");
//! draw.read(mesh, "mesh", Usage::VertexInput);
//! draw.write(backbuffer, "backbuffer", Usage::ColorTarget);
//! draw.bind(move |ctx| { /* draw commands */ });
//!
//! graph.compile()?;
//! loop {
//!     graph.update(backbuffer, next_swapchain_image());
//!     graph.execute()?;
//! }
//! ```

mod builder;
mod context;
mod executor;
mod handle;
mod materialize;
mod optimizer;
mod pass;
mod resource;
mod schedule;
mod scheduler;
mod usage;

pub use builder::{AccessBuilder, PassBuilder};
pub use context::RenderContext;
pub use executor::ScheduleExecutor;
pub use handle::{CommandListHandle, FenceHandle, PassHandle, ResourceHandle};
pub use materialize::ResourceMaterializer;
pub use optimizer::{CullStats, GraphOptimizer};
pub use pass::{PassCallback, PassGraph, RenderPass, ResourceAccess};
pub use resource::{ResourceEntry, ResourceKind, ResourceTable};
pub use schedule::{Barrier, Schedule, ScheduleEvent, Transition};
pub use scheduler::BarrierScheduler;
pub use usage::UsageTracker;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{Device, DeviceError, NativeResource, ViewAllocator, ViewIndex};
use crate::config::FrameGraphConfig;
use crate::error::FrameGraphError;
use crate::profile_function;
use crate::types::{QueueType, ResourceInfo, ResourceState, Usage, ViewKind};

/// Declarative description of a frame's GPU work, and its compiled schedule.
pub struct FrameGraph {
    device: Arc<dyn Device>,
    views: Arc<dyn ViewAllocator>,
    config: FrameGraphConfig,
    passes: PassGraph,
    resources: ResourceTable,
    schedule: Option<Schedule>,
    executor: Option<ScheduleExecutor>,
    /// Declarations changed since the last compile.
    dirty: bool,
    executed: bool,
    frame_index: usize,
    device_data: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl FrameGraph {
    /// Create an empty frame graph.
    pub fn new(
        device: Arc<dyn Device>,
        views: Arc<dyn ViewAllocator>,
        config: FrameGraphConfig,
    ) -> Self {
        log::debug!(
            "Creating frame graph on {} device ({} frames in flight)",
            device.name(),
            config.frame_count
        );
        Self {
            device,
            views,
            config,
            passes: PassGraph::new(),
            resources: ResourceTable::new(),
            schedule: None,
            executor: None,
            dirty: false,
            executed: false,
            frame_index: 0,
            device_data: HashMap::new(),
        }
    }

    /// Create a frame graph on a device that also allocates views.
    pub fn with_device<D>(device: Arc<D>, config: FrameGraphConfig) -> Self
    where
        D: Device + ViewAllocator + 'static,
    {
        let views: Arc<dyn ViewAllocator> = device.clone();
        Self::new(device, views, config)
    }

    /// The configuration.
    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// The device.
    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Declared passes.
    pub fn passes(&self) -> &PassGraph {
        &self.passes
    }

    /// Declared resources.
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Declare a pass on `queue`.
    pub fn pass(&mut self, name: &str, queue: QueueType) -> PassBuilder<'_> {
        self.dirty = true;
        let handle = self.passes.push(RenderPass::new(name, queue));
        PassBuilder::new(&mut self.passes, &mut self.resources, handle)
    }

    /// Declare a graphics pass.
    pub fn graphics(&mut self, name: &str) -> PassBuilder<'_> {
        self.pass(name, QueueType::Graphics)
    }

    /// Declare a compute pass.
    pub fn compute(&mut self, name: &str) -> PassBuilder<'_> {
        self.pass(name, QueueType::Compute)
    }

    /// Declare a copy pass.
    pub fn copy(&mut self, name: &str) -> PassBuilder<'_> {
        self.pass(name, QueueType::Copy)
    }

    /// Import a caller-owned resource currently in the state of `usage`.
    ///
    /// The resource is left in that state again at the end of every frame.
    /// `native` must outlive the graph, or be replaced through
    /// [`update`](Self::update).
    pub fn import(
        &mut self,
        name: &str,
        info: ResourceInfo,
        usage: Usage,
        native: NativeResource,
    ) -> ResourceHandle {
        self.dirty = true;
        let mut entry = ResourceEntry::new(name, ResourceKind::Imported, info, usage);
        entry.natives.push(native);
        entry.views.push([None; ViewKind::COUNT]);
        self.resources.insert(entry)
    }

    /// Import a caller-owned resource that must end every frame in `final_usage`.
    pub fn import_with_final(
        &mut self,
        name: &str,
        info: ResourceInfo,
        usage: Usage,
        final_usage: Usage,
        native: NativeResource,
    ) -> ResourceHandle {
        let handle = self.import(name, info, usage, native);
        self.resources.get_mut(handle).final_usage = Some(final_usage);
        handle
    }

    /// Declare a graph-owned resource whose contents persist across frames.
    ///
    /// It is created in the state of `usage` and returned to it at the end of
    /// every frame.
    pub fn managed(&mut self, name: &str, info: ResourceInfo, usage: Usage) -> ResourceHandle {
        self.dirty = true;
        self.resources.insert(ResourceEntry::new(
            name,
            ResourceKind::Managed,
            info,
            usage,
        ))
    }

    /// Bind a new native resource to an imported handle, e.g. the next
    /// swapchain image. Views bound through [`update_view`](Self::update_view)
    /// are cleared.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not an imported resource.
    pub fn update(&mut self, handle: ResourceHandle, native: NativeResource) {
        let entry = self.imported_mut(handle);
        entry.natives.clear();
        entry.natives.push(native);
        entry.views.clear();
        entry.views.push([None; ViewKind::COUNT]);
    }

    /// Bind a caller-owned view to an imported handle.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is not an imported resource.
    pub fn update_view(&mut self, handle: ResourceHandle, kind: ViewKind, view: ViewIndex) {
        let entry = self.imported_mut(handle);
        if entry.views.is_empty() {
            entry.views.push([None; ViewKind::COUNT]);
        }
        entry.views[0][kind.index()] = Some(view);
    }

    fn imported_mut(&mut self, handle: ResourceHandle) -> &mut ResourceEntry {
        let entry = self.resources.get_mut(handle);
        assert!(
            entry.kind == ResourceKind::Imported,
            "Resource {:?} is not imported",
            entry.name
        );
        entry
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Native resource behind `handle` for the current frame index.
    pub fn resource(&self, handle: ResourceHandle) -> Option<NativeResource> {
        self.resources.get(handle).native(self.frame_index)
    }

    /// View of `kind` on `handle` for the current frame index.
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

    /// Select which copy of buffered resources this frame uses.
    pub fn set_frame_index(&mut self, frame_index: usize) {
        self.frame_index = frame_index % self.config.frame_count.max(1);
    }

    /// The current frame index.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Change the number of frames in flight.
    ///
    /// Drains and releases every materialized resource; the graph must be
    /// compiled again before the next [`execute`](Self::execute).
    pub fn set_frame_count(&mut self, frame_count: usize) -> Result<(), DeviceError> {
        self.release()?;
        self.config.frame_count = frame_count.max(1);
        self.frame_index %= self.config.frame_count;
        self.dirty = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Compilation and execution
    // ------------------------------------------------------------------

    /// Cull, materialize and schedule the declared passes.
    ///
    /// Recompiling releases the previous compilation first. On error nothing
    /// allocated by this call stays alive and no schedule is kept.
    pub fn compile(&mut self) -> Result<&Schedule, FrameGraphError> {
        profile_function!();
        self.release()?;

        let stats = GraphOptimizer::optimize(&mut self.passes, &mut self.resources);
        UsageTracker::scan(&self.passes, &self.resources).apply(&mut self.resources);

        let materializer = ResourceMaterializer::new(
            self.device.as_ref(),
            self.views.as_ref(),
            self.config.frame_count,
        );
        let created = materializer.materialize(&mut self.resources)?;

        let compiled = BarrierScheduler::new(&self.passes, &self.resources)
            .with_merge_graphics_reads(self.config.merge_graphics_reads)
            .compile()
            .and_then(|schedule| {
                let executor = ScheduleExecutor::new(
                    self.device.as_ref(),
                    &schedule,
                    self.config.frame_count,
                )?;
                Ok((schedule, executor))
            });
        let (schedule, executor) = match compiled {
            Ok(compiled) => compiled,
            Err(err) => {
                materializer.release(&mut self.resources, &created);
                return Err(err);
            }
        };

        log::debug!(
            "Compiled frame graph: {} live / {} culled passes, {} resources materialized, {} events",
            stats.live_passes,
            stats.culled_passes,
            created.len(),
            schedule.len()
        );
        if self.config.trace_schedule {
            log::debug!("Frame graph schedule:\n{schedule}");
        }

        self.executor = Some(executor);
        self.dirty = false;
        Ok(self.schedule.insert(schedule))
    }

    /// Replay the compiled schedule for one frame.
    pub fn execute(&mut self) -> Result<(), FrameGraphError> {
        profile_function!();
        if self.dirty {
            return Err(FrameGraphError::NotCompiled);
        }
        let (Some(schedule), Some(executor)) = (self.schedule.as_ref(), self.executor.as_mut())
        else {
            return Err(FrameGraphError::NotCompiled);
        };
        executor.execute(
            self.device.as_ref(),
            schedule,
            &mut self.passes,
            &self.resources,
            self.frame_index,
        )?;
        self.executed = true;
        Ok(())
    }

    /// The compiled schedule, if any.
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Whether a schedule matching the current declarations exists.
    pub fn is_compiled(&self) -> bool {
        self.schedule.is_some() && !self.dirty
    }

    /// Whether `pass` survived the last culling.
    pub fn is_pass_live(&self, pass: PassHandle) -> bool {
        self.passes.get(pass).is_used()
    }

    /// Whether a surviving pass accesses `handle`.
    pub fn is_resource_live(&self, handle: ResourceHandle) -> bool {
        self.resources.get(handle).is_live()
    }

    /// Resources that currently own native resources.
    pub fn materialized_resources(&self) -> Vec<ResourceHandle> {
        self.resources
            .iter()
            .filter(|(_, entry)| entry.kind != ResourceKind::Imported && entry.is_materialized())
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Tracked state of `handle`.
    ///
    /// Before the first [`execute`](Self::execute) this is the declared
    /// initial state; afterwards it is the state the last frame left the
    /// resource in. `None` for transient resources outside a frame.
    pub fn current_state(&self, handle: ResourceHandle) -> Option<ResourceState> {
        if self.executed {
            if let Some(schedule) = &self.schedule {
                return schedule.final_state(handle);
            }
        }
        let entry = self.resources.try_get(handle)?;
        match entry.kind {
            ResourceKind::Transient => None,
            ResourceKind::Imported | ResourceKind::Managed => Some(entry.initial_state),
        }
    }

    /// Block until all submitted frames have finished on the GPU.
    pub fn drain(&self) -> Result<(), DeviceError> {
        match &self.executor {
            Some(executor) => executor.drain(self.device.as_ref()),
            None => Ok(()),
        }
    }

    /// Drain, free everything the graph allocated and forget all declarations.
    ///
    /// Handles from before the reset are invalid afterwards. Per-device data
    /// survives; see [`reset_device_data`](Self::reset_device_data).
    pub fn reset(&mut self) -> Result<(), DeviceError> {
        self.release()?;
        self.passes.clear();
        self.resources.clear();
        self.dirty = false;
        self.frame_index = 0;
        log::debug!("Frame graph reset");
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.drain()?;
        if let Some(executor) = self.executor.take() {
            executor.destroy(self.device.as_ref());
        }
        ResourceMaterializer::new(
            self.device.as_ref(),
            self.views.as_ref(),
            self.config.frame_count,
        )
        .release_all(&mut self.resources);
        self.schedule = None;
        self.executed = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Per-device data
    // ------------------------------------------------------------------

    /// Per-device value of type `T`, built by `setup` on first use.
    ///
    /// Useful for pipelines and root signatures shared by pass callbacks. The
    /// value survives [`reset`](Self::reset).
    pub fn device_data<T, F>(&mut self, setup: F) -> &mut T
    where
        T: Any + Send,
        F: FnOnce(&dyn Device) -> T,
    {
        let device = self.device.as_ref();
        self.device_data
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(setup(device)))
            .downcast_mut::<T>()
            .expect("device data is keyed by its own TypeId")
    }

    /// Drop all per-device values.
    pub fn reset_device_data(&mut self) {
        self.device_data.clear();
    }
}

impl Drop for FrameGraph {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::warn!("Failed to release frame graph resources: {err}");
        }
    }
}

static_assertions::assert_impl_all!(FrameGraph: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyDevice;
    use crate::types::Format;

    fn graph() -> (Arc<DummyDevice>, FrameGraph) {
        let device = Arc::new(DummyDevice::new());
        let graph = FrameGraph::with_device(device.clone(), FrameGraphConfig::default());
        (device, graph)
    }

    fn info() -> ResourceInfo {
        ResourceInfo::tex2d(16, 16, Format::Bgra8Unorm)
    }

    #[test]
    fn test_execute_requires_compile() {
        let (_, mut graph) = graph();
        assert_eq!(graph.execute(), Err(FrameGraphError::NotCompiled));

        let swap = graph.import("swap", info(), Usage::Present, NativeResource::from_raw(1000));
        graph.graphics("draw").write(swap, "swap", Usage::ColorTarget);
        graph.compile().unwrap();
        graph.execute().unwrap();

        graph.graphics("late").write(swap, "swap", Usage::ColorTarget);
        assert!(!graph.is_compiled());
        assert_eq!(graph.execute(), Err(FrameGraphError::NotCompiled));
    }

    #[test]
    fn test_update_imported() {
        let (_, mut graph) = graph();
        let swap = graph.import("swap", info(), Usage::Present, NativeResource::from_raw(1));
        graph.update_view(swap, ViewKind::ColorTarget, ViewIndex::from_raw(7));
        assert_eq!(graph.rtv(swap), Some(ViewIndex::from_raw(7)));

        graph.update(swap, NativeResource::from_raw(2));
        assert_eq!(graph.resource(swap), Some(NativeResource::from_raw(2)));
        assert_eq!(graph.rtv(swap), None);
    }

    #[test]
    #[should_panic(expected = "is not imported")]
    fn test_update_managed_panics() {
        let (_, mut graph) = graph();
        let history = graph.managed("history", info(), Usage::ShaderRead);
        graph.update(history, NativeResource::from_raw(1));
    }

    #[test]
    fn test_frame_index_wraps() {
        let (_, mut graph) = graph();
        graph.set_frame_index(5);
        assert_eq!(graph.frame_index(), 1);
        graph.set_frame_count(3).unwrap();
        graph.set_frame_index(5);
        assert_eq!(graph.frame_index(), 2);
    }

    #[test]
    fn test_device_data_is_cached() {
        struct Pipeline(u32);

        let (_, mut graph) = graph();
        let mut builds = 0;
        graph.device_data(|_| {
            builds += 1;
            Pipeline(1)
        });
        let pipeline = graph.device_data(|_| {
            builds += 1;
            Pipeline(2)
        });
        assert_eq!(pipeline.0, 1);
        assert_eq!(builds, 1);

        graph.reset().unwrap();
        assert_eq!(graph.device_data(|_| Pipeline(3)).0, 1);

        graph.reset_device_data();
        assert_eq!(graph.device_data(|_| Pipeline(4)).0, 4);
    }

    #[test]
    fn test_drop_releases_resources() {
        let (device, mut graph) = graph();
        let swap = graph.import("swap", info(), Usage::Present, NativeResource::from_raw(1000));
        let mut pass = graph.graphics("draw");
        let scratch = pass.create(info(), "scratch", Usage::ColorTarget).handle();
        pass.write(swap, "swap", Usage::ColorTarget);
        let mut pass = graph.graphics("blit");
        pass.read(scratch, "scratch", Usage::ShaderRead);
        pass.write(swap, "swap", Usage::ColorTarget);

        graph.compile().unwrap();
        graph.execute().unwrap();
        assert_eq!(device.live_resources(), 1);
        assert!(device.live_fences() > 0);

        drop(graph);
        assert_eq!(device.live_resources(), 0);
        assert_eq!(device.live_views(), 0);
        assert_eq!(device.live_fences(), 0);
    }
}
