//! View usage inference.

use crate::types::ViewUsage;

use super::pass::PassGraph;
use super::resource::ResourceTable;
use super::ResourceHandle;

/// Per-resource view requirements, accumulated over surviving passes.
///
/// A resource only gets a view of a given kind if some surviving pass
/// accesses it that way; culled passes contribute nothing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UsageTracker {
    usage: Vec<ViewUsage>,
}

impl UsageTracker {
    /// Scan every surviving pass.
    pub fn scan(passes: &PassGraph, resources: &ResourceTable) -> Self {
        let mut usage = vec![ViewUsage::empty(); resources.len()];
        for (_, pass) in passes.live() {
            for access in pass.accesses() {
                usage[access.handle.index()] |= access.usage.view_usage();
            }
        }
        Self { usage }
    }

    /// Views needed by `handle`.
    pub fn usage(&self, handle: ResourceHandle) -> ViewUsage {
        self.usage.get(handle.index()).copied().unwrap_or_default()
    }

    /// Store the flags on the resource rows.
    pub fn apply(&self, resources: &mut ResourceTable) {
        for (handle, entry) in resources.iter_mut() {
            entry.view_usage = self.usage(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::PassBuilder;
    use crate::graph::optimizer::GraphOptimizer;
    use crate::graph::resource::{ResourceEntry, ResourceKind};
    use crate::graph::RenderPass;
    use crate::types::{Format, QueueType, ResourceInfo, Usage};

    #[test]
    fn test_flags_from_surviving_passes_only() {
        let mut passes = PassGraph::new();
        let mut resources = ResourceTable::new();
        let info = ResourceInfo::tex2d(8, 8, Format::Rgba16Float);
        let swap = resources.insert(ResourceEntry::new(
            "swap",
            ResourceKind::Imported,
            info,
            Usage::ColorTarget,
        ));

        let p0 = passes.push(RenderPass::new("scene", QueueType::Graphics));
        let hdr = PassBuilder::new(&mut passes, &mut resources, p0)
            .create(info, "hdr", Usage::ColorTarget)
            .handle();

        let p1 = passes.push(RenderPass::new("debug", QueueType::Compute));
        let mut debug = PassBuilder::new(&mut passes, &mut resources, p1);
        debug.read(hdr, "hdr", Usage::UnorderedRead);
        debug.create(info, "debug", Usage::UnorderedWrite);

        let p2 = passes.push(RenderPass::new("tonemap", QueueType::Graphics));
        let mut tonemap = PassBuilder::new(&mut passes, &mut resources, p2);
        tonemap.read(hdr, "hdr", Usage::PixelShaderRead);
        tonemap.write(swap, "swap", Usage::ColorTarget);

        GraphOptimizer::optimize(&mut passes, &mut resources);
        let tracker = UsageTracker::scan(&passes, &resources);

        assert_eq!(
            tracker.usage(hdr),
            ViewUsage::COLOR_TARGET | ViewUsage::SHADER_READ
        );
        assert_eq!(tracker.usage(swap), ViewUsage::COLOR_TARGET);

        tracker.apply(&mut resources);
        assert!(!resources.get(hdr).view_usage().contains(ViewUsage::UNORDERED_ACCESS));
    }
}
