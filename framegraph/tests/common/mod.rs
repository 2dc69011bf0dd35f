//! Common utilities for frame graph integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use redlilium_framegraph::backend::{DeviceCommand, NativeCommandList, NativeFence};
use redlilium_framegraph::{
    DummyDevice, Format, FrameGraph, FrameGraphConfig, NativeResource, QueueType, ResourceHandle,
    ResourceInfo, ScheduleEvent, Usage,
};

/// Install a test logger once. Honours `RUST_LOG`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A frame graph on a fresh [`DummyDevice`].
pub struct TestGraph {
    pub device: Arc<DummyDevice>,
    pub graph: FrameGraph,
}

impl TestGraph {
    pub fn new() -> Self {
        Self::with_config(FrameGraphConfig::default())
    }

    pub fn with_config(config: FrameGraphConfig) -> Self {
        init_logging();
        let device = Arc::new(DummyDevice::new());
        let graph = FrameGraph::with_device(device.clone(), config);
        Self { device, graph }
    }

    /// Import a swapchain image that must be presentable at frame end.
    pub fn swapchain(&mut self) -> ResourceHandle {
        self.graph.import_with_final(
            "swapchain",
            target_info(),
            Usage::ColorTarget,
            Usage::Present,
            next_native(),
        )
    }

    /// Device calls recorded so far, then forget them.
    pub fn take_commands(&self) -> Vec<DeviceCommand> {
        let commands = self.device.commands();
        self.device.clear_commands();
        commands
    }
}

/// A caller-owned native handle that never collides with dummy device ids.
pub fn next_native() -> NativeResource {
    static NEXT: AtomicU64 = AtomicU64::new(1 << 40);
    NativeResource::from_raw(NEXT.fetch_add(1, Ordering::Relaxed))
}

pub fn target_info() -> ResourceInfo {
    ResourceInfo::tex2d(128, 128, Format::Bgra8Unorm)
}

pub fn buffer_info() -> ResourceInfo {
    ResourceInfo::structured_buffer::<[f32; 4]>(256)
}

/// Compact event names for order assertions.
pub fn event_kinds(events: &[ScheduleEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            ScheduleEvent::OpenCommands { .. } => "open",
            ScheduleEvent::ResourceBarrier { .. } => "barrier",
            ScheduleEvent::RecordCommands { .. } => "record",
            ScheduleEvent::SubmitCommands { .. } => "submit",
            ScheduleEvent::DeviceSync { .. } => "sync",
        })
        .collect()
}

/// A submitted command list the CPU has not yet seen complete.
#[derive(Default)]
struct InFlight {
    /// Queues whose later signals imply this list has finished.
    queues: Vec<QueueType>,
    /// Fence values whose completion implies this list has finished.
    covers: Vec<(NativeFence, u64)>,
}

/// Panic if a command list is reset while the GPU may still execute it.
///
/// A list stays in flight from its submit until the CPU waits for a fence
/// value signalled after it, directly or through queue waits.
pub fn assert_no_reset_in_flight(commands: &[DeviceCommand]) {
    let mut in_flight: HashMap<NativeCommandList, InFlight> = HashMap::new();
    for command in commands {
        match command {
            DeviceCommand::Submit { queue, list } => {
                in_flight.insert(
                    *list,
                    InFlight {
                        queues: vec![*queue],
                        covers: Vec::new(),
                    },
                );
            }
            DeviceCommand::Signal {
                queue,
                fence,
                value,
            } => {
                for entry in in_flight.values_mut() {
                    if entry.queues.contains(queue) {
                        entry.covers.push((*fence, *value));
                    }
                }
            }
            DeviceCommand::Wait {
                queue,
                fence,
                value,
            } => {
                for entry in in_flight.values_mut() {
                    let reached = entry.covers.iter().any(|(f, v)| f == fence && v <= value);
                    if reached && !entry.queues.contains(queue) {
                        entry.queues.push(*queue);
                    }
                }
            }
            DeviceCommand::WaitCpu { fence, value } => {
                in_flight.retain(|_, entry| {
                    !entry.covers.iter().any(|(f, v)| f == fence && v <= value)
                });
            }
            DeviceCommand::ResetCommandList(list) => {
                assert!(
                    !in_flight.contains_key(list),
                    "command list {list:?} reset while still in flight"
                );
            }
            _ => {}
        }
    }
}
