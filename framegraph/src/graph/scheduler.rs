//! Barrier and queue synchronization scheduling.
//!
//! The scheduler walks the surviving passes in declaration order and tracks,
//! per resource, its current state, the last writing pass, the readers since
//! that write and whether an unordered-access write is still unsynchronized.
//! For every pass it emits, in order:
//!
//! 1. `SubmitCommands`/`OpenCommands` when the pass changes queues
//! 2. one `DeviceSync` per other queue holding unsynchronized work this pass
//!    depends on (read-after-write, write-after-write and write-after-read)
//! 3. one batched `ResourceBarrier` with every transition and UAV barrier
//! 4. `RecordCommands`
//!
//! Copy queue passes never get barriers; their accesses only update the
//! tracked state. After the last pass, resources with a frame-end state are
//! transitioned back in one final batch before the last submit, so the
//! schedule can be replayed every frame from the same starting states.

use crate::error::FrameGraphError;
use crate::profile_function;
use crate::types::{QueueType, ResourceState};

use super::pass::{PassGraph, RenderPass, ResourceAccess};
use super::resource::{ResourceKind, ResourceTable};
use super::schedule::{Barrier, Schedule, ScheduleEvent, Transition};
use super::{CommandListHandle, FenceHandle, PassHandle, ResourceHandle};

const QUEUES: usize = QueueType::COUNT;

/// Compiles culled passes into a [`Schedule`].
pub struct BarrierScheduler<'a> {
    passes: &'a PassGraph,
    resources: &'a ResourceTable,
    merge_graphics_reads: bool,
}

/// A surviving pass, by position in the replay order.
#[derive(Debug, Clone, Copy)]
struct PassRef {
    ordinal: usize,
    queue: QueueType,
}

/// One future access of a resource, for read merging.
#[derive(Debug, Clone, Copy)]
struct Use {
    ordinal: usize,
    queue: QueueType,
    state: ResourceState,
    write: bool,
}

impl<'a> BarrierScheduler<'a> {
    /// Create a scheduler over culled passes and their resources.
    pub fn new(passes: &'a PassGraph, resources: &'a ResourceTable) -> Self {
        Self {
            passes,
            resources,
            merge_graphics_reads: true,
        }
    }

    /// Enable or disable merging consecutive graphics-queue read states.
    pub fn with_merge_graphics_reads(mut self, merge: bool) -> Self {
        self.merge_graphics_reads = merge;
        self
    }

    /// Compile the schedule.
    ///
    /// Fails with [`FrameGraphError::AllPassesCulled`] if nothing survived
    /// culling and with [`FrameGraphError::ReadBeforeCreate`] if a pass uses a
    /// transient resource before its creating pass.
    pub fn compile(&self) -> Result<Schedule, FrameGraphError> {
        profile_function!();

        let live: Vec<(PassHandle, &RenderPass)> = self.passes.live().collect();
        if live.is_empty() {
            log::error!("Every pass of the frame graph was culled");
            return Err(FrameGraphError::AllPassesCulled);
        }

        let mut builder = ScheduleBuilder::new(self, &live);
        for (ordinal, &(handle, pass)) in live.iter().enumerate() {
            builder.record_pass(ordinal, handle, pass)?;
        }
        builder.finish(live.len())
    }
}

struct ScheduleBuilder<'s, 'a> {
    scheduler: &'s BarrierScheduler<'a>,
    events: Vec<ScheduleEvent>,
    lists: Vec<QueueType>,
    fences: Vec<QueueType>,
    fence_of_queue: [Option<FenceHandle>; QUEUES],
    current: Option<(QueueType, CommandListHandle)>,
    states: Vec<Option<ResourceState>>,
    pending_uav: Vec<Option<QueueType>>,
    last_write: Vec<Option<PassRef>>,
    readers: Vec<Vec<PassRef>>,
    uses: Vec<Vec<Use>>,
    /// `synced[src][dst]`: last ordinal on `src` that `dst` has waited for.
    synced: [[Option<usize>; QUEUES]; QUEUES],
    last_on_queue: [Option<usize>; QUEUES],
}

impl<'s, 'a> ScheduleBuilder<'s, 'a> {
    fn new(scheduler: &'s BarrierScheduler<'a>, live: &[(PassHandle, &RenderPass)]) -> Self {
        let resources = scheduler.resources;
        let count = resources.len();

        let states = resources
            .iter()
            .map(|(_, entry)| match entry.kind {
                ResourceKind::Imported => Some(entry.initial_state),
                ResourceKind::Managed if entry.live => Some(entry.initial_state),
                _ => None,
            })
            .collect();

        let mut uses = vec![Vec::new(); count];
        for (ordinal, (_, pass)) in live.iter().enumerate() {
            let outputs = pass.outputs().map(|access| (access, true));
            for (access, write) in pass.reads.iter().map(|access| (access, false)).chain(outputs) {
                uses[access.handle.index()].push(Use {
                    ordinal,
                    queue: pass.queue,
                    state: access.state(),
                    write,
                });
            }
        }

        Self {
            scheduler,
            events: Vec::new(),
            lists: Vec::new(),
            fences: Vec::new(),
            fence_of_queue: [None; QUEUES],
            current: None,
            states,
            pending_uav: vec![None; count],
            last_write: vec![None; count],
            readers: vec![Vec::new(); count],
            uses,
            synced: [[None; QUEUES]; QUEUES],
            last_on_queue: [None; QUEUES],
        }
    }

    fn record_pass(
        &mut self,
        ordinal: usize,
        handle: PassHandle,
        pass: &RenderPass,
    ) -> Result<(), FrameGraphError> {
        let queue = pass.queue;
        let list = self.enter_queue(queue);
        log::trace!("Scheduling pass {:?} on {queue}", pass.name);

        let reads = pass.reads.iter().map(|access| (access.handle, false));
        let outputs = pass.outputs().map(|access| (access.handle, true));
        self.sync_dependencies(queue, reads.chain(outputs));

        let mut batch = Vec::new();
        for access in &pass.creates {
            let resource = access.handle.index();
            self.states[resource] = Some(access.state());
            self.pending_uav[resource] = access.usage.is_unordered_write().then_some(queue);
        }
        for access in &pass.reads {
            self.access(ordinal, pass, access, false, &mut batch)?;
        }
        for access in &pass.writes {
            self.access(ordinal, pass, access, true, &mut batch)?;
        }
        if !batch.is_empty() {
            self.events.push(ScheduleEvent::ResourceBarrier {
                list,
                barriers: batch,
            });
        }
        self.events.push(ScheduleEvent::RecordCommands { list, pass: handle });

        let this = PassRef { ordinal, queue };
        for access in &pass.reads {
            self.readers[access.handle.index()].push(this);
        }
        for access in pass.outputs() {
            let resource = access.handle.index();
            self.last_write[resource] = Some(this);
            self.readers[resource].clear();
        }
        self.last_on_queue[queue.index()] = Some(ordinal);
        Ok(())
    }

    fn access(
        &mut self,
        ordinal: usize,
        pass: &RenderPass,
        access: &ResourceAccess,
        write: bool,
        batch: &mut Vec<Barrier>,
    ) -> Result<(), FrameGraphError> {
        let queue = pass.queue;
        let resource = access.handle.index();
        let Some(current) = self.states[resource] else {
            return Err(FrameGraphError::ReadBeforeCreate {
                pass: pass.name.clone(),
                resource: self.scheduler.resources.get(access.handle).name.clone(),
            });
        };
        let required = access.state();
        let unordered_write = write && access.usage.is_unordered_write();

        if !queue.supports_transitions() {
            self.states[resource] = Some(required);
            self.pending_uav[resource] = unordered_write.then_some(queue);
            return Ok(());
        }

        // Writes from another queue are ordered by the queue sync.
        if self.pending_uav[resource].is_some_and(|pending| pending != queue) {
            self.pending_uav[resource] = None;
        }

        let satisfied = current == required
            || (required.is_read_only() && current.is_read_only() && current.contains(required));

        if !satisfied {
            let merged = batch.iter_mut().find_map(|barrier| match barrier {
                Barrier::Transition(t)
                    if t.resource == access.handle
                        && t.after.is_read_only()
                        && required.is_read_only() =>
                {
                    Some(t)
                }
                _ => None,
            });
            let after = if let Some(transition) = merged {
                transition.after |= required;
                transition.after
            } else {
                let after = self.merged_read_state(ordinal, access, required, queue, write);
                batch.push(Barrier::Transition(Transition {
                    resource: access.handle,
                    before: current,
                    after,
                    hints: access.hints,
                }));
                after
            };
            self.states[resource] = Some(after);
            self.pending_uav[resource] = None;
        } else if self.pending_uav[resource].is_some() {
            batch.push(Barrier::Unordered(access.handle));
            self.pending_uav[resource] = None;
        }

        if unordered_write {
            self.pending_uav[resource] = Some(queue);
        }
        Ok(())
    }

    /// State to transition a graphics read into: the union with the next use
    /// when that is also a graphics read, so the next pass needs no barrier.
    fn merged_read_state(
        &self,
        ordinal: usize,
        access: &ResourceAccess,
        required: ResourceState,
        queue: QueueType,
        write: bool,
    ) -> ResourceState {
        if write
            || queue != QueueType::Graphics
            || !self.scheduler.merge_graphics_reads
            || !required.is_read_only()
        {
            return required;
        }
        let uses = &self.uses[access.handle.index()];
        let next = uses.partition_point(|u| u.ordinal <= ordinal);
        match uses.get(next) {
            Some(u)
                if u.queue == QueueType::Graphics && !u.write && u.state.is_read_only() =>
            {
                required | u.state
            }
            _ => required,
        }
    }

    fn enter_queue(&mut self, queue: QueueType) -> CommandListHandle {
        if let Some((open, list)) = self.current {
            if open == queue {
                return list;
            }
            self.events.push(ScheduleEvent::SubmitCommands { list });
        }
        // A submitted list may still be executing, so reopening a queue
        // always records into a new list.
        let list = CommandListHandle::new(self.lists.len());
        self.lists.push(queue);
        self.events.push(ScheduleEvent::OpenCommands { queue, list });
        self.current = Some((queue, list));
        list
    }

    fn fence_for(&mut self, queue: QueueType) -> FenceHandle {
        match self.fence_of_queue[queue.index()] {
            Some(fence) => fence,
            None => {
                let fence = FenceHandle::new(self.fences.len());
                self.fences.push(queue);
                self.fence_of_queue[queue.index()] = Some(fence);
                fence
            }
        }
    }

    /// Emit one `DeviceSync` per other queue with work `queue` must wait for.
    fn sync_dependencies(
        &mut self,
        queue: QueueType,
        accesses: impl Iterator<Item = (ResourceHandle, bool)>,
    ) {
        let dst = queue.index();
        // Latest ordinal per source queue this access set depends on.
        let mut needed: [Option<usize>; QUEUES] = [None; QUEUES];
        let mut need = |dep: &PassRef| {
            let src = dep.queue.index();
            if src != dst {
                needed[src] = needed[src].max(Some(dep.ordinal));
            }
        };

        for (handle, write) in accesses {
            let resource = handle.index();
            if let Some(writer) = &self.last_write[resource] {
                need(writer);
            }
            if write {
                for reader in &self.readers[resource] {
                    need(reader);
                }
            }
        }

        for signal in QueueType::ALL {
            let src = signal.index();
            let covered = match (needed[src], self.synced[src][dst]) {
                (None, _) => true,
                (Some(dep), Some(done)) => dep <= done,
                (Some(_), None) => false,
            };
            if covered {
                continue;
            }
            let fence = self.fence_for(signal);
            self.events.push(ScheduleEvent::DeviceSync {
                signal,
                wait: queue,
                fence,
            });
            self.synced[src][dst] = self.last_on_queue[src];
            // Whatever `signal` had already waited for is now ordered too.
            for other in 0..QUEUES {
                if other != dst {
                    self.synced[other][dst] = self.synced[other][dst].max(self.synced[other][src]);
                }
            }
        }
    }

    fn finish(mut self, pass_count: usize) -> Result<Schedule, FrameGraphError> {
        let resources = self.scheduler.resources;
        let mut restore = Vec::new();
        for (handle, entry) in resources.iter() {
            if !entry.live {
                continue;
            }
            let (Some(target), Some(current)) = (entry.restore_state(), self.states[handle.index()])
            else {
                continue;
            };
            if current != target {
                restore.push(Transition {
                    resource: handle,
                    before: current,
                    after: target,
                    hints: Default::default(),
                });
            }
        }

        if !restore.is_empty() {
            let queue = match self.current {
                Some((queue, _))
                    if restore
                        .iter()
                        .all(|t| queue.supports_state(t.before) && queue.supports_state(t.after)) =>
                {
                    queue
                }
                _ => QueueType::Graphics,
            };
            let list = self.enter_queue(queue);
            let touched: Vec<_> = restore.iter().map(|t| (t.resource, true)).collect();
            self.sync_dependencies(queue, touched.into_iter());
            for transition in &restore {
                self.states[transition.resource.index()] = Some(transition.after);
            }
            log::trace!("Restoring {} resource(s) on {queue}", restore.len());
            self.events.push(ScheduleEvent::ResourceBarrier {
                list,
                barriers: restore.into_iter().map(Barrier::Transition).collect(),
            });
        }

        if let Some((_, list)) = self.current {
            self.events.push(ScheduleEvent::SubmitCommands { list });
        }

        log::debug!(
            "Scheduled {pass_count} passes into {} events on {} command list(s) with {} fence(s)",
            self.events.len(),
            self.lists.len(),
            self.fences.len()
        );
        Ok(Schedule {
            events: self.events,
            lists: self.lists,
            fences: self.fences,
            final_states: self.states,
        })
    }
}
