//! Dead pass elimination.
//!
//! Reverse reference counting over the bipartite pass/resource graph:
//!
//! 1. A pass starts with one reference per distinct resource it writes or
//!    creates; a resource starts with one reference per distinct pass reading it.
//! 2. Every unread resource goes on a work list. Passes that write nothing and
//!    have no side effects are dead from the start.
//! 3. Popping a resource drops one reference from each pass writing it. A pass
//!    losing its last reference is dead and drops one reference from every
//!    resource it reads; those reaching zero go on the work list.
//!
//! Side-effecting passes are never decremented, so everything they read stays
//! alive. A pass reading and writing the same resource (read-modify-write)
//! does not keep that resource alive on its own. Finally, culled passes that
//! create a resource a surviving pass writes are revived, together with the
//! writers of everything they read.

use std::collections::VecDeque;

use crate::profile_function;

use super::pass::PassGraph;
use super::resource::ResourceTable;
use super::{PassHandle, ResourceHandle};

/// Outcome of a culling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Passes that survived.
    pub live_passes: usize,
    /// Passes that were culled.
    pub culled_passes: usize,
    /// Resources accessed by a surviving pass.
    pub live_resources: usize,
}

/// Reference-counting dead code elimination over a [`PassGraph`].
pub struct GraphOptimizer;

impl GraphOptimizer {
    /// Cull passes and resources that cannot contribute to a side-effecting
    /// pass.
    ///
    /// Refcounts are recomputed from scratch, so this may run any number of
    /// times on the same declaration. Afterwards [`RenderPass::is_used`] and
    /// [`ResourceEntry::is_live`] reflect the result.
    ///
    /// [`RenderPass::is_used`]: super::RenderPass::is_used
    /// [`ResourceEntry::is_live`]: super::ResourceEntry::is_live
    pub fn optimize(passes: &mut PassGraph, resources: &mut ResourceTable) -> CullStats {
        profile_function!();

        let mut writers: Vec<Vec<PassHandle>> = vec![Vec::new(); resources.len()];
        let mut counted_reads: Vec<Vec<ResourceHandle>> = Vec::with_capacity(passes.len());

        for (_, entry) in resources.iter_mut() {
            entry.refcount = 0;
            entry.live = false;
        }

        for (handle, pass) in passes.iter_mut() {
            let mut outputs: Vec<ResourceHandle> =
                pass.outputs().map(|access| access.handle).collect();
            outputs.sort_unstable();
            outputs.dedup();

            let mut reads: Vec<ResourceHandle> = pass
                .reads
                .iter()
                .map(|access| access.handle)
                .filter(|read| outputs.binary_search(read).is_err())
                .collect();
            reads.sort_unstable();
            reads.dedup();

            pass.refcount = outputs.len() as u32;
            for output in &outputs {
                writers[output.index()].push(handle);
            }
            for read in &reads {
                resources.get_mut(*read).refcount += 1;
            }
            counted_reads.push(reads);
        }

        let mut unused: VecDeque<ResourceHandle> = resources
            .iter()
            .filter(|(_, entry)| entry.refcount == 0)
            .map(|(handle, _)| handle)
            .collect();

        let release = |pass: PassHandle,
                       resources: &mut ResourceTable,
                       unused: &mut VecDeque<ResourceHandle>| {
            for read in &counted_reads[pass.index()] {
                let entry = resources.get_mut(*read);
                entry.refcount = entry.refcount.saturating_sub(1);
                if entry.refcount == 0 {
                    unused.push_back(*read);
                }
            }
        };

        for (handle, pass) in passes.iter() {
            if pass.refcount == 0 && !pass.has_side_effects {
                log::warn!("Pass {:?} writes nothing and is culled", pass.name);
                release(handle, resources, &mut unused);
            }
        }

        while let Some(resource) = unused.pop_front() {
            for &writer in &writers[resource.index()] {
                let pass = passes.get_mut(writer);
                if pass.has_side_effects || pass.refcount == 0 {
                    continue;
                }
                pass.refcount -= 1;
                if pass.refcount == 0 {
                    log::trace!("Culling pass {:?}", pass.name);
                    release(writer, resources, &mut unused);
                }
            }
        }

        Self::revive_dependencies(passes, &writers);

        let mut stats = CullStats::default();
        for (_, pass) in passes.iter() {
            if !pass.is_used() {
                stats.culled_passes += 1;
                continue;
            }
            stats.live_passes += 1;
            for access in pass.accesses() {
                resources.get_mut(access.handle).live = true;
            }
        }
        stats.live_resources = resources.iter().filter(|(_, entry)| entry.live).count();

        log::debug!(
            "Culled {} of {} passes, {} live resources",
            stats.culled_passes,
            passes.len(),
            stats.live_resources
        );
        stats
    }

    /// Bring back culled passes a surviving pass still needs.
    ///
    /// A surviving pass that only writes a transient resource nobody reads
    /// still needs the pass creating it, and a revived pass needs whatever
    /// wrote the resources it reads.
    fn revive_dependencies(passes: &mut PassGraph, writers: &[Vec<PassHandle>]) {
        let mut work: Vec<PassHandle> = passes
            .iter()
            .filter(|(_, pass)| pass.is_used())
            .map(|(handle, _)| handle)
            .collect();

        while let Some(handle) = work.pop() {
            let pass = passes.get(handle);
            let mut needed: Vec<PassHandle> = Vec::new();
            for access in pass.writes.iter() {
                needed.extend(
                    writers[access.handle.index()]
                        .iter()
                        .filter(|&&writer| passes.get(writer).creates_resource(access.handle)),
                );
            }
            for access in pass.reads.iter() {
                needed.extend(writers[access.handle.index()].iter().copied());
            }

            for dependency in needed {
                if dependency.index() >= handle.index() || passes.get(dependency).is_used() {
                    continue;
                }
                log::trace!(
                    "Reviving pass {:?} for {:?}",
                    passes.get(dependency).name,
                    passes.get(handle).name
                );
                let dependency_pass = passes.get_mut(dependency);
                dependency_pass.refcount = dependency_pass.outputs().count().max(1) as u32;
                work.push(dependency);
            }
        }
    }
}
