//! Schedule replay.

use crate::backend::{Device, DeviceError, NativeBarrier, NativeCommandList, NativeFence};
use crate::error::FrameGraphError;
use crate::profile_function;
use crate::types::QueueType;

use super::pass::PassGraph;
use super::resource::ResourceTable;
use super::schedule::{Barrier, Schedule, ScheduleEvent};
use super::{CommandListHandle, FenceHandle, RenderContext};

/// A fence and the last value scheduled on it.
#[derive(Debug, Clone, Copy)]
struct FenceSlot {
    native: NativeFence,
    queue: QueueType,
    value: u64,
}

impl FenceSlot {
    fn next(&mut self) -> u64 {
        self.value += 1;
        self.value
    }
}

/// Replays a [`Schedule`] against a [`Device`].
///
/// Owns the command lists and fences the schedule refers to. Command lists
/// come in one set per frame in flight; before a set is reset the CPU waits
/// for the frame that last recorded into it. Fence values only ever grow,
/// across frames too. After each frame every fence is signalled once more and
/// waited for by the graphics queue, then a frame fence is signalled on the
/// graphics queue, so the CPU can wait for the whole frame with
/// [`drain`](Self::drain).
#[derive(Debug)]
pub struct ScheduleExecutor {
    /// `lists[slot][list]`.
    lists: Vec<Vec<NativeCommandList>>,
    /// Frame fence value each slot was last submitted with.
    slot_values: Vec<u64>,
    fences: Vec<FenceSlot>,
    frame_fence: FenceSlot,
    frames: u64,
}

impl ScheduleExecutor {
    /// Create the command lists and fences `schedule` needs, with
    /// `frame_count` sets of command lists.
    pub fn new(
        device: &dyn Device,
        schedule: &Schedule,
        frame_count: usize,
    ) -> Result<Self, DeviceError> {
        let slots = frame_count.max(1);
        let mut lists: Vec<Vec<NativeCommandList>> = Vec::with_capacity(slots);
        let mut fences = Vec::with_capacity(schedule.fences().len());

        let result = (|| {
            for _ in 0..slots {
                let mut set = Vec::with_capacity(schedule.command_lists().len());
                for &queue in schedule.command_lists() {
                    match device.create_command_list(queue) {
                        Ok(list) => set.push(list),
                        Err(err) => {
                            lists.push(set);
                            return Err(err);
                        }
                    }
                }
                lists.push(set);
            }
            for &queue in schedule.fences() {
                fences.push(FenceSlot {
                    native: device.create_fence()?,
                    queue,
                    value: 0,
                });
            }
            device.create_fence()
        })();

        match result {
            Ok(frame_fence) => Ok(Self {
                lists,
                slot_values: vec![0; slots],
                fences,
                frame_fence: FenceSlot {
                    native: frame_fence,
                    queue: QueueType::Graphics,
                    value: 0,
                },
                frames: 0,
            }),
            Err(err) => {
                for list in lists.into_iter().flatten() {
                    device.destroy_command_list(list);
                }
                for fence in fences {
                    device.destroy_fence(fence.native);
                }
                Err(err)
            }
        }
    }

    /// Native command list behind `list` in the set of frame `slot`.
    pub fn command_list(&self, slot: usize, list: CommandListHandle) -> NativeCommandList {
        self.lists[slot][list.index()]
    }

    /// Number of command list sets.
    pub fn slots(&self) -> usize {
        self.lists.len()
    }

    /// Native fence behind `fence` and its last scheduled value.
    pub fn fence(&self, fence: FenceHandle) -> (NativeFence, u64) {
        let slot = &self.fences[fence.index()];
        (slot.native, slot.value)
    }

    /// Number of frames replayed.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Replay one frame.
    pub fn execute(
        &mut self,
        device: &dyn Device,
        schedule: &Schedule,
        passes: &mut PassGraph,
        resources: &ResourceTable,
        frame_index: usize,
    ) -> Result<(), FrameGraphError> {
        profile_function!();

        let frame_slot = (self.frames % self.lists.len() as u64) as usize;
        if self.slot_values[frame_slot] > 0 {
            device.wait_cpu(self.frame_fence.native, self.slot_values[frame_slot])?;
        }
        let lists = &self.lists[frame_slot];

        let mut natives = Vec::new();
        for event in schedule.events() {
            match event {
                ScheduleEvent::OpenCommands { list, .. } => {
                    device.reset_command_list(lists[list.index()])?;
                }
                ScheduleEvent::ResourceBarrier { list, barriers } => {
                    natives.clear();
                    for barrier in barriers {
                        natives.push(Self::resolve(barrier, resources, frame_index)?);
                    }
                    device.resource_barrier(lists[list.index()], &natives);
                }
                ScheduleEvent::RecordCommands { list, pass: handle } => {
                    let pass = passes.get_mut(*handle);
                    if let Some(callback) = pass.callback.as_mut() {
                        let mut context = RenderContext {
                            device,
                            resources,
                            list: lists[list.index()],
                            queue: pass.queue,
                            pass: *handle,
                            pass_name: &pass.name,
                            frame_index,
                        };
                        callback(&mut context);
                    }
                }
                ScheduleEvent::SubmitCommands { list } => {
                    device.submit(schedule.list_queue(*list), lists[list.index()])?;
                }
                ScheduleEvent::DeviceSync {
                    signal,
                    wait,
                    fence,
                } => {
                    let slot = &mut self.fences[fence.index()];
                    let value = slot.next();
                    device.signal(*signal, slot.native, value)?;
                    device.wait(*wait, slot.native, value)?;
                }
            }
        }

        for slot in &mut self.fences {
            let value = slot.next();
            device.signal(slot.queue, slot.native, value)?;
            device.wait(QueueType::Graphics, slot.native, value)?;
        }
        let value = self.frame_fence.next();
        device.signal(self.frame_fence.queue, self.frame_fence.native, value)?;
        self.slot_values[frame_slot] = value;

        self.frames += 1;
        Ok(())
    }

    /// Block until every signalled fence value has been reached.
    pub fn drain(&self, device: &dyn Device) -> Result<(), DeviceError> {
        for slot in self.fences.iter().chain(std::iter::once(&self.frame_fence)) {
            if slot.value > 0 {
                device.wait_cpu(slot.native, slot.value)?;
            }
        }
        Ok(())
    }

    /// Release the command lists and fences. Call [`drain`](Self::drain) first.
    pub fn destroy(self, device: &dyn Device) {
        for list in self.lists.into_iter().flatten() {
            device.destroy_command_list(list);
        }
        for slot in self.fences {
            device.destroy_fence(slot.native);
        }
        device.destroy_fence(self.frame_fence.native);
    }

    fn resolve(
        barrier: &Barrier,
        resources: &ResourceTable,
        frame_index: usize,
    ) -> Result<NativeBarrier, FrameGraphError> {
        let entry = resources.get(barrier.resource());
        let resource = entry
            .native(frame_index)
            .ok_or_else(|| FrameGraphError::Unbound {
                resource: entry.name.clone(),
            })?;
        Ok(match barrier {
            Barrier::Transition(t) => NativeBarrier::Transition {
                resource,
                before: t.before,
                after: t.after,
                hints: t.hints,
            },
            Barrier::Unordered(_) => NativeBarrier::Unordered { resource },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceCommand, DummyDevice, NativeResource};
    use crate::graph::builder::PassBuilder;
    use crate::graph::resource::{ResourceEntry, ResourceKind};
    use crate::graph::{BarrierScheduler, GraphOptimizer, RenderPass, ResourceMaterializer};
    use crate::types::{Format, ResourceInfo, Usage, ViewKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn info() -> ResourceInfo {
        ResourceInfo::tex2d(8, 8, Format::Rgba8Unorm)
    }

    /// Copy upload consumed by a graphics pass, compiled and materialized.
    fn upload_graph(
        device: &DummyDevice,
        calls: Arc<AtomicUsize>,
    ) -> (PassGraph, ResourceTable, Schedule) {
        let mut passes = PassGraph::new();
        let mut resources = ResourceTable::new();
        let mut swap = ResourceEntry::new("swap", ResourceKind::Imported, info(), Usage::Present);
        swap.natives.push(NativeResource::from_raw(9000));
        swap.views.push([None; ViewKind::COUNT]);
        let swap = resources.insert(swap);

        let handle = passes.push(RenderPass::new("upload", QueueType::Copy));
        let mut upload = PassBuilder::new(&mut passes, &mut resources, handle);
        let mesh = upload.create(info(), "mesh", Usage::CopyDest).handle();
        let counter = calls.clone();
        upload.bind(move |ctx| {
            assert_eq!(ctx.queue(), QueueType::Copy);
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let handle = passes.push(RenderPass::new("draw", QueueType::Graphics));
        let mut draw = PassBuilder::new(&mut passes, &mut resources, handle);
        draw.read(mesh, "mesh", Usage::ShaderRead);
        draw.write(swap, "swap", Usage::ColorTarget);
        draw.bind(move |ctx| {
            assert_eq!(ctx.pass_name(), "draw");
            calls.fetch_add(1, Ordering::Relaxed);
        });

        GraphOptimizer::optimize(&mut passes, &mut resources);
        crate::graph::UsageTracker::scan(&passes, &resources).apply(&mut resources);
        ResourceMaterializer::new(device, device, 1)
            .materialize(&mut resources)
            .unwrap();
        let schedule = BarrierScheduler::new(&passes, &resources).compile().unwrap();
        (passes, resources, schedule)
    }

    #[test]
    fn test_execute_invokes_callbacks_and_submits() {
        let device = DummyDevice::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (mut passes, resources, schedule) = upload_graph(&device, calls.clone());

        let mut executor = ScheduleExecutor::new(&device, &schedule, 2).unwrap();
        device.clear_commands();
        executor
            .execute(&device, &schedule, &mut passes, &resources, 0)
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 2);
        assert_eq!(executor.frames(), 1);
        let submits = device
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Submit { .. }))
            .count();
        assert_eq!(submits, 2);

        executor.drain(&device).unwrap();
        executor.destroy(&device);
        assert_eq!(device.live_fences(), 0);
    }

    #[test]
    fn test_fence_values_grow_across_frames() {
        let device = DummyDevice::new();
        let (mut passes, resources, schedule) =
            upload_graph(&device, Arc::new(AtomicUsize::new(0)));
        assert_eq!(schedule.fences(), &[QueueType::Copy]);

        let mut executor = ScheduleExecutor::new(&device, &schedule, 2).unwrap();
        let fence = FenceHandle::new(0);
        let mut last = 0;
        for frame in 0..3 {
            executor
                .execute(&device, &schedule, &mut passes, &resources, frame)
                .unwrap();
            let (native, value) = executor.fence(fence);
            assert!(value > last);
            assert_eq!(device.fence_value(native), Some(value));
            last = value;
        }
        executor.drain(&device).unwrap();
        executor.destroy(&device);
    }

    #[test]
    fn test_unbound_resource_is_reported() {
        let device = DummyDevice::new();
        let (mut passes, mut resources, schedule) =
            upload_graph(&device, Arc::new(AtomicUsize::new(0)));
        ResourceMaterializer::new(&device, &device, 1).release_all(&mut resources);

        let mut executor = ScheduleExecutor::new(&device, &schedule, 2).unwrap();
        let err = executor
            .execute(&device, &schedule, &mut passes, &resources, 0)
            .unwrap_err();
        assert!(matches!(err, FrameGraphError::Unbound { .. }));
        executor.destroy(&device);
    }

    #[test]
    fn test_list_sets_rotate_per_frame() {
        let device = DummyDevice::new();
        let (mut passes, resources, schedule) =
            upload_graph(&device, Arc::new(AtomicUsize::new(0)));
        let mut executor = ScheduleExecutor::new(&device, &schedule, 2).unwrap();
        assert_eq!(executor.slots(), 2);

        let mut resets = Vec::new();
        for frame in 0..3 {
            device.clear_commands();
            executor
                .execute(&device, &schedule, &mut passes, &resources, frame)
                .unwrap();
            let commands = device.commands();
            let waited = commands
                .iter()
                .any(|c| matches!(c, DeviceCommand::WaitCpu { .. }));
            assert_eq!(waited, frame == 2);
            resets.push(
                commands
                    .iter()
                    .filter_map(|c| match c {
                        DeviceCommand::ResetCommandList(list) => Some(*list),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
            );
        }

        assert_eq!(resets[0].len(), 2);
        assert_eq!(resets[0], resets[2]);
        assert!(resets[0].iter().all(|list| !resets[1].contains(list)));
        assert_eq!(
            resets[1][0],
            executor.command_list(1, CommandListHandle::new(0))
        );
        executor.destroy(&device);
    }
}

