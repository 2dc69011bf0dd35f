//! Resource and view allocation for surviving graph-owned resources.

use crate::backend::{Device, DeviceError, ResourceDesc, ViewAllocator};
use crate::profile_function;
use crate::types::{ViewDesc, ViewKind};

use super::resource::{ResourceEntry, ResourceKind, ResourceTable};
use super::ResourceHandle;

/// Allocates native resources and views for live transient and managed
/// resources.
///
/// Imported resources are never created or destroyed here. Each resource is
/// created in its initial state with exactly the views its
/// [`ViewUsage`](crate::types::ViewUsage) asks for. Buffered resources get one
/// copy, with its own views, per frame in flight.
pub struct ResourceMaterializer<'a> {
    device: &'a dyn Device,
    views: &'a dyn ViewAllocator,
    frame_count: usize,
}

impl<'a> ResourceMaterializer<'a> {
    /// Create a materializer.
    pub fn new(device: &'a dyn Device, views: &'a dyn ViewAllocator, frame_count: usize) -> Self {
        Self {
            device,
            views,
            frame_count: frame_count.max(1),
        }
    }

    /// Materialize every live, graph-owned resource that has no native yet.
    ///
    /// Returns the handles materialized by this call. On failure, everything
    /// created by this call is released again before the error is returned.
    pub fn materialize(
        &self,
        resources: &mut ResourceTable,
    ) -> Result<Vec<ResourceHandle>, DeviceError> {
        profile_function!();

        let mut created = Vec::new();
        let mut failure = None;
        for (handle, entry) in resources.iter_mut() {
            if !entry.live || entry.kind == ResourceKind::Imported || entry.is_materialized() {
                continue;
            }
            match self.create(entry) {
                Ok(()) => created.push(handle),
                Err(err) => {
                    log::error!("Failed to materialize {:?}: {err}", entry.name);
                    self.release_entry(entry);
                    failure = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = failure {
            self.release(resources, &created);
            return Err(err);
        }
        log::debug!("Materialized {} resources", created.len());
        Ok(created)
    }

    /// Release the natives and views of `handles`.
    pub fn release(&self, resources: &mut ResourceTable, handles: &[ResourceHandle]) {
        for &handle in handles {
            self.release_entry(resources.get_mut(handle));
        }
    }

    /// Release every graph-owned resource.
    pub fn release_all(&self, resources: &mut ResourceTable) {
        for (_, entry) in resources.iter_mut() {
            if entry.kind != ResourceKind::Imported {
                self.release_entry(entry);
            }
        }
    }

    fn create(&self, entry: &mut ResourceEntry) -> Result<(), DeviceError> {
        let copies = if entry.info.buffered {
            self.frame_count
        } else {
            1
        };
        let desc = ResourceDesc {
            name: &entry.name,
            info: &entry.info,
            usage: entry.view_usage,
            initial_state: entry.initial_state,
        };

        for _ in 0..copies {
            let native = self.device.create_resource(&desc)?;
            entry.natives.push(native);
            entry.views.push([None; ViewKind::COUNT]);
            for kind in entry.view_usage.kinds() {
                let view_desc = entry.view_overrides[kind.index()].unwrap_or_else(ViewDesc::new);
                let view = self.views.create_view(native, kind, &view_desc)?;
                if let Some(set) = entry.views.last_mut() {
                    set[kind.index()] = Some(view);
                }
            }
        }
        Ok(())
    }

    fn release_entry(&self, entry: &mut ResourceEntry) {
        for set in entry.views.drain(..) {
            for kind in ViewKind::ALL {
                if let Some(view) = set[kind.index()] {
                    self.views.free_view(kind, view);
                }
            }
        }
        for native in entry.natives.drain(..) {
            self.device.destroy_resource(native);
        }
    }
}
