//! Frame graph error types.

use thiserror::Error;

pub use crate::backend::DeviceError;

/// Errors returned by [`FrameGraph::compile`](crate::FrameGraph::compile) and
/// [`FrameGraph::execute`](crate::FrameGraph::execute).
///
/// Declaration mistakes (unknown handles, writing a resource created by another
/// graph) are programming errors and panic at declaration time instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameGraphError {
    /// Every declared pass was culled, so there is nothing to schedule.
    #[error("every pass was culled; the frame graph has no live output")]
    AllPassesCulled,

    /// A pass uses a graph-created resource before the pass that creates it.
    #[error("pass {pass:?} uses resource {resource:?} before it is created")]
    ReadBeforeCreate { pass: String, resource: String },

    /// A scheduled resource has no native resource bound for this frame.
    #[error("resource {resource:?} has no native resource bound")]
    Unbound { resource: String },

    /// `execute()` was called without a compiled schedule.
    #[error("the frame graph has not been compiled")]
    NotCompiled,

    /// The device layer failed.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_device_error() {
        let err: FrameGraphError = DeviceError::OutOfMemory.into();
        assert_eq!(err, FrameGraphError::Device(DeviceError::OutOfMemory));
        assert_eq!(err.to_string(), "out of GPU memory");
    }

    #[test]
    fn test_read_before_create_display() {
        let err = FrameGraphError::ReadBeforeCreate {
            pass: "lighting".into(),
            resource: "gbuffer".into(),
        };
        assert_eq!(
            err.to_string(),
            "pass \"lighting\" uses resource \"gbuffer\" before it is created"
        );
    }
}
