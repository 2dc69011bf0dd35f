//! Compiled schedules.
//!
//! A [`Schedule`] is the immutable output of the
//! [`BarrierScheduler`](super::BarrierScheduler): a linear list of
//! [`ScheduleEvent`]s that the [`ScheduleExecutor`](super::ScheduleExecutor)
//! replays every frame until the graph is recompiled.

use std::fmt;

use crate::types::{BarrierHints, QueueType, ResourceState};

use super::{CommandListHandle, FenceHandle, PassHandle, ResourceHandle};

/// A resource state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub resource: ResourceHandle,
    pub before: ResourceState,
    pub after: ResourceState,
    pub hints: BarrierHints,
}

/// One entry of a barrier batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    /// State transition.
    Transition(Transition),
    /// Orders an unordered-access write before later accesses without a
    /// state change.
    Unordered(ResourceHandle),
}

impl Barrier {
    /// Resource the barrier applies to.
    pub fn resource(&self) -> ResourceHandle {
        match self {
            Self::Transition(transition) => transition.resource,
            Self::Unordered(resource) => *resource,
        }
    }
}

impl fmt::Display for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transition(t) => write!(f, "{}: {} -> {}", t.resource, t.before, t.after),
            Self::Unordered(resource) => write!(f, "{resource}: UAV"),
        }
    }
}

/// One step of a compiled schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleEvent {
    /// Reset and begin recording a command list.
    OpenCommands {
        queue: QueueType,
        list: CommandListHandle,
    },
    /// Record a batch of barriers.
    ResourceBarrier {
        list: CommandListHandle,
        barriers: Vec<Barrier>,
    },
    /// Run a pass callback.
    RecordCommands {
        list: CommandListHandle,
        pass: PassHandle,
    },
    /// Close and submit a command list.
    SubmitCommands { list: CommandListHandle },
    /// `signal` signals `fence`; `wait` waits for it.
    DeviceSync {
        signal: QueueType,
        wait: QueueType,
        fence: FenceHandle,
    },
}

impl fmt::Display for ScheduleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenCommands { queue, list } => write!(f, "OpenCommands({queue}, {list})"),
            Self::ResourceBarrier { list, barriers } => {
                write!(f, "ResourceBarrier({list}")?;
                for barrier in barriers {
                    write!(f, ", {barrier}")?;
                }
                f.write_str(")")
            }
            Self::RecordCommands { list, pass } => write!(f, "RecordCommands({list}, {pass})"),
            Self::SubmitCommands { list } => write!(f, "SubmitCommands({list})"),
            Self::DeviceSync {
                signal,
                wait,
                fence,
            } => write!(f, "DeviceSync({signal} -> {wait}, {fence})"),
        }
    }
}

/// Immutable, replayable result of compiling a frame graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    pub(crate) events: Vec<ScheduleEvent>,
    pub(crate) lists: Vec<QueueType>,
    pub(crate) fences: Vec<QueueType>,
    pub(crate) final_states: Vec<Option<ResourceState>>,
}

impl Schedule {
    /// Events in replay order.
    pub fn events(&self) -> &[ScheduleEvent] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if there are no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queue of every command list, indexed by [`CommandListHandle::index`].
    pub fn command_lists(&self) -> &[QueueType] {
        &self.lists
    }

    /// Queue a command list belongs to.
    pub fn list_queue(&self, list: CommandListHandle) -> QueueType {
        self.lists[list.index()]
    }

    /// Signalling queue of every fence, indexed by [`FenceHandle::index`].
    pub fn fences(&self) -> &[QueueType] {
        &self.fences
    }

    /// Recorded passes in replay order.
    pub fn recorded_passes(&self) -> impl Iterator<Item = PassHandle> + '_ {
        self.events.iter().filter_map(|event| match event {
            ScheduleEvent::RecordCommands { pass, .. } => Some(*pass),
            _ => None,
        })
    }

    /// All barriers in replay order.
    pub fn barriers(&self) -> impl Iterator<Item = &Barrier> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ScheduleEvent::ResourceBarrier { barriers, .. } => Some(barriers.iter()),
                _ => None,
            })
            .flatten()
    }

    /// Number of `DeviceSync` events.
    pub fn sync_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ScheduleEvent::DeviceSync { .. }))
            .count()
    }

    /// Whether any barrier references `resource`.
    pub fn mentions(&self, resource: ResourceHandle) -> bool {
        self.barriers().any(|barrier| barrier.resource() == resource)
    }

    /// Tracked state of `resource` after the whole schedule, if it is tracked.
    pub fn final_state(&self, resource: ResourceHandle) -> Option<ResourceState> {
        self.final_states.get(resource.index()).copied().flatten()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, event) in self.events.iter().enumerate() {
            writeln!(f, "{i:4}: {event}")?;
        }
        Ok(())
    }
}

static_assertions::assert_impl_all!(Schedule: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let list = CommandListHandle::new(0);
        let barrier = Barrier::Transition(Transition {
            resource: ResourceHandle::new(1),
            before: ResourceState::COPY_DEST,
            after: ResourceState::SHADER_RESOURCE,
            hints: BarrierHints::default(),
        });
        let event = ScheduleEvent::ResourceBarrier {
            list,
            barriers: vec![barrier, Barrier::Unordered(ResourceHandle::new(2))],
        };
        assert_eq!(
            event.to_string(),
            "ResourceBarrier(cl0, r1: COPY_DEST -> SHADER_RESOURCE, r2: UAV)"
        );
        let sync = ScheduleEvent::DeviceSync {
            signal: QueueType::Copy,
            wait: QueueType::Graphics,
            fence: FenceHandle::new(0),
        };
        assert_eq!(sync.to_string(), "DeviceSync(Copy -> Graphics, f0)");
    }

    #[test]
    fn test_queries() {
        let list = CommandListHandle::new(0);
        let schedule = Schedule {
            events: vec![
                ScheduleEvent::OpenCommands {
                    queue: QueueType::Graphics,
                    list,
                },
                ScheduleEvent::ResourceBarrier {
                    list,
                    barriers: vec![Barrier::Unordered(ResourceHandle::new(0))],
                },
                ScheduleEvent::RecordCommands {
                    list,
                    pass: PassHandle::new(3),
                },
                ScheduleEvent::SubmitCommands { list },
            ],
            lists: vec![QueueType::Graphics],
            fences: Vec::new(),
            final_states: vec![Some(ResourceState::UNORDERED_ACCESS), None],
        };
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule.list_queue(list), QueueType::Graphics);
        assert_eq!(
            schedule.recorded_passes().collect::<Vec<_>>(),
            vec![PassHandle::new(3)]
        );
        assert!(schedule.mentions(ResourceHandle::new(0)));
        assert!(!schedule.mentions(ResourceHandle::new(1)));
        assert_eq!(schedule.sync_count(), 0);
        assert_eq!(
            schedule.final_state(ResourceHandle::new(0)),
            Some(ResourceState::UNORDERED_ACCESS)
        );
        assert_eq!(schedule.final_state(ResourceHandle::new(1)), None);
        assert_eq!(schedule.final_state(ResourceHandle::new(9)), None);
    }
}
