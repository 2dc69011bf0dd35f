//! Dummy device for testing and development.
//!
//! This device doesn't perform any GPU work. Every call is logged at trace
//! level and appended to an in-memory command log, so tests can assert on the
//! exact device traffic a frame graph produces. Fences complete immediately on
//! signal.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::types::{QueueType, ResourceState, ViewDesc, ViewKind, ViewUsage};

use super::{
    Device, DeviceError, NativeBarrier, NativeCommandList, NativeFence, NativeResource,
    ResourceDesc, ViewAllocator, ViewIndex,
};

/// A call recorded by [`DummyDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    CreateCommandList {
        list: NativeCommandList,
        queue: QueueType,
    },
    ResetCommandList(NativeCommandList),
    Barrier {
        list: NativeCommandList,
        barriers: Vec<NativeBarrier>,
    },
    Submit {
        queue: QueueType,
        list: NativeCommandList,
    },
    DestroyCommandList(NativeCommandList),
    CreateResource {
        resource: NativeResource,
        name: String,
        usage: ViewUsage,
        initial_state: ResourceState,
    },
    DestroyResource(NativeResource),
    CreateView {
        resource: NativeResource,
        kind: ViewKind,
        view: ViewIndex,
    },
    FreeView {
        kind: ViewKind,
        view: ViewIndex,
    },
    CreateFence(NativeFence),
    Signal {
        queue: QueueType,
        fence: NativeFence,
        value: u64,
    },
    Wait {
        queue: QueueType,
        fence: NativeFence,
        value: u64,
    },
    WaitCpu {
        fence: NativeFence,
        value: u64,
    },
    DestroyFence(NativeFence),
}

/// Dummy device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    next_id: AtomicU64,
    fail_resources: AtomicBool,
    commands: Mutex<Vec<DeviceCommand>>,
    lists: Mutex<HashMap<NativeCommandList, QueueType>>,
    resources: Mutex<HashSet<NativeResource>>,
    views: Mutex<HashSet<(ViewKind, ViewIndex)>>,
    fences: Mutex<HashMap<NativeFence, u64>>,
}

impl DummyDevice {
    /// Create a new dummy device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following resource creation fail with
    /// [`DeviceError::OutOfMemory`].
    pub fn set_fail_resource_creation(&self, fail: bool) {
        self.fail_resources.store(fail, Ordering::Release);
    }

    /// Snapshot of the command log.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.lock().clone()
    }

    /// Clear the command log.
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// Number of resources created and not yet destroyed.
    pub fn live_resources(&self) -> usize {
        self.resources.lock().len()
    }

    /// Number of views created and not yet freed.
    pub fn live_views(&self) -> usize {
        self.views.lock().len()
    }

    /// Number of fences created and not yet destroyed.
    pub fn live_fences(&self) -> usize {
        self.fences.lock().len()
    }

    /// Last value signalled on `fence`.
    pub fn fence_value(&self, fence: NativeFence) -> Option<u64> {
        self.fences.lock().get(&fence).copied()
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, command: DeviceCommand) {
        self.commands.lock().push(command);
    }

    fn check_list(&self, list: NativeCommandList) -> Result<QueueType, DeviceError> {
        self.lists.lock().get(&list).copied().ok_or_else(|| {
            DeviceError::CommandListFailed(format!("unknown command list {}", list.raw()))
        })
    }
}

impl Device for DummyDevice {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_command_list(&self, queue: QueueType) -> Result<NativeCommandList, DeviceError> {
        let list = NativeCommandList::from_raw(self.next());
        log::trace!("DummyDevice: creating {queue} command list {}", list.raw());
        self.lists.lock().insert(list, queue);
        self.record(DeviceCommand::CreateCommandList { list, queue });
        Ok(list)
    }

    fn reset_command_list(&self, list: NativeCommandList) -> Result<(), DeviceError> {
        self.check_list(list)?;
        log::trace!("DummyDevice: resetting command list {}", list.raw());
        self.record(DeviceCommand::ResetCommandList(list));
        Ok(())
    }

    fn resource_barrier(&self, list: NativeCommandList, barriers: &[NativeBarrier]) {
        log::trace!(
            "DummyDevice: {} barrier(s) on command list {}",
            barriers.len(),
            list.raw()
        );
        self.record(DeviceCommand::Barrier {
            list,
            barriers: barriers.to_vec(),
        });
    }

    fn submit(&self, queue: QueueType, list: NativeCommandList) -> Result<(), DeviceError> {
        let owner = self.check_list(list)?;
        if owner != queue {
            return Err(DeviceError::CommandListFailed(format!(
                "{owner} command list {} submitted to {queue} queue",
                list.raw()
            )));
        }
        log::trace!("DummyDevice: submitting command list {} to {queue}", list.raw());
        self.record(DeviceCommand::Submit { queue, list });
        Ok(())
    }

    fn destroy_command_list(&self, list: NativeCommandList) {
        log::trace!("DummyDevice: destroying command list {}", list.raw());
        self.lists.lock().remove(&list);
        self.record(DeviceCommand::DestroyCommandList(list));
    }

    fn create_resource(&self, desc: &ResourceDesc<'_>) -> Result<NativeResource, DeviceError> {
        if self.fail_resources.load(Ordering::Acquire) {
            log::trace!("DummyDevice: failing creation of {:?}", desc.name);
            return Err(DeviceError::OutOfMemory);
        }
        let resource = NativeResource::from_raw(self.next());
        log::trace!(
            "DummyDevice: creating resource {:?} ({:?}, {} bytes, state {})",
            desc.name,
            desc.info.size,
            desc.info.byte_size(),
            desc.initial_state
        );
        self.resources.lock().insert(resource);
        self.record(DeviceCommand::CreateResource {
            resource,
            name: desc.name.to_string(),
            usage: desc.usage,
            initial_state: desc.initial_state,
        });
        Ok(resource)
    }

    fn destroy_resource(&self, resource: NativeResource) {
        log::trace!("DummyDevice: destroying resource {}", resource.raw());
        self.resources.lock().remove(&resource);
        self.record(DeviceCommand::DestroyResource(resource));
    }

    fn create_fence(&self) -> Result<NativeFence, DeviceError> {
        let fence = NativeFence::from_raw(self.next());
        log::trace!("DummyDevice: creating fence {}", fence.raw());
        self.fences.lock().insert(fence, 0);
        self.record(DeviceCommand::CreateFence(fence));
        Ok(fence)
    }

    fn signal(&self, queue: QueueType, fence: NativeFence, value: u64) -> Result<(), DeviceError> {
        let mut fences = self.fences.lock();
        let current = fences
            .get_mut(&fence)
            .ok_or_else(|| DeviceError::FenceFailed(format!("unknown fence {}", fence.raw())))?;
        if value <= *current {
            return Err(DeviceError::FenceFailed(format!(
                "fence {} signalled with {value}, already at {current}",
                fence.raw()
            )));
        }
        *current = value;
        drop(fences);
        log::trace!("DummyDevice: {queue} signals fence {} = {value}", fence.raw());
        self.record(DeviceCommand::Signal {
            queue,
            fence,
            value,
        });
        Ok(())
    }

    fn wait(&self, queue: QueueType, fence: NativeFence, value: u64) -> Result<(), DeviceError> {
        if !self.fences.lock().contains_key(&fence) {
            return Err(DeviceError::FenceFailed(format!(
                "unknown fence {}",
                fence.raw()
            )));
        }
        log::trace!("DummyDevice: {queue} waits on fence {} >= {value}", fence.raw());
        self.record(DeviceCommand::Wait {
            queue,
            fence,
            value,
        });
        Ok(())
    }

    fn wait_cpu(&self, fence: NativeFence, value: u64) -> Result<(), DeviceError> {
        let reached = self.fences.lock().get(&fence).copied();
        match reached {
            Some(current) if current >= value => {
                log::trace!("DummyDevice: CPU waited on fence {} >= {value}", fence.raw());
                self.record(DeviceCommand::WaitCpu { fence, value });
                Ok(())
            }
            Some(current) => Err(DeviceError::FenceFailed(format!(
                "fence {} is at {current} and will never reach {value}",
                fence.raw()
            ))),
            None => Err(DeviceError::FenceFailed(format!(
                "unknown fence {}",
                fence.raw()
            ))),
        }
    }

    fn destroy_fence(&self, fence: NativeFence) {
        log::trace!("DummyDevice: destroying fence {}", fence.raw());
        self.fences.lock().remove(&fence);
        self.record(DeviceCommand::DestroyFence(fence));
    }
}

impl ViewAllocator for DummyDevice {
    fn create_view(
        &self,
        resource: NativeResource,
        kind: ViewKind,
        desc: &ViewDesc,
    ) -> Result<ViewIndex, DeviceError> {
        if !self.resources.lock().contains(&resource) {
            return Err(DeviceError::ViewCreationFailed(format!(
                "unknown resource {}",
                resource.raw()
            )));
        }
        let view = ViewIndex::from_raw(self.next());
        log::trace!(
            "DummyDevice: creating {kind:?} view {} on resource {} ({desc:?})",
            view.raw(),
            resource.raw()
        );
        self.views.lock().insert((kind, view));
        self.record(DeviceCommand::CreateView {
            resource,
            kind,
            view,
        });
        Ok(view)
    }

    fn free_view(&self, kind: ViewKind, view: ViewIndex) {
        log::trace!("DummyDevice: freeing {kind:?} view {}", view.raw());
        self.views.lock().remove(&(kind, view));
        self.record(DeviceCommand::FreeView { kind, view });
    }
}

static_assertions::assert_impl_all!(DummyDevice: Send, Sync, Device, ViewAllocator);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Format, ResourceInfo};

    fn desc(info: &ResourceInfo) -> ResourceDesc<'_> {
        ResourceDesc {
            name: "test",
            info,
            usage: ViewUsage::SHADER_READ,
            initial_state: ResourceState::COPY_DEST,
        }
    }

    #[test]
    fn test_resource_lifetime() {
        let device = DummyDevice::new();
        let info = ResourceInfo::tex2d(4, 4, Format::Rgba8Unorm);
        let resource = device.create_resource(&desc(&info)).unwrap();
        assert_eq!(device.live_resources(), 1);

        let view = device
            .create_view(resource, ViewKind::ShaderRead, &ViewDesc::new())
            .unwrap();
        assert_eq!(device.live_views(), 1);

        device.free_view(ViewKind::ShaderRead, view);
        device.destroy_resource(resource);
        assert_eq!(device.live_resources(), 0);
        assert_eq!(device.live_views(), 0);
    }

    #[test]
    fn test_failing_resource_creation() {
        let device = DummyDevice::new();
        device.set_fail_resource_creation(true);
        let info = ResourceInfo::array(16, 16);
        assert_eq!(
            device.create_resource(&desc(&info)),
            Err(DeviceError::OutOfMemory)
        );
        assert_eq!(device.live_resources(), 0);
    }

    #[test]
    fn test_fence_values_are_monotonic() {
        let device = DummyDevice::new();
        let fence = device.create_fence().unwrap();
        device.signal(QueueType::Copy, fence, 1).unwrap();
        device.wait(QueueType::Graphics, fence, 1).unwrap();
        assert_eq!(device.fence_value(fence), Some(1));
        assert!(device.signal(QueueType::Copy, fence, 1).is_err());
        device.wait_cpu(fence, 1).unwrap();
        assert!(device.wait_cpu(fence, 2).is_err());
    }

    #[test]
    fn test_submit_to_wrong_queue() {
        let device = DummyDevice::new();
        let list = device.create_command_list(QueueType::Copy).unwrap();
        device.reset_command_list(list).unwrap();
        assert!(device.submit(QueueType::Graphics, list).is_err());
        device.submit(QueueType::Copy, list).unwrap();
        assert_eq!(
            device.commands().last(),
            Some(&DeviceCommand::Submit {
                queue: QueueType::Copy,
                list
            })
        );
    }
}
