//! Device error types.

use thiserror::Error;

/// Errors reported by the device layer.
///
/// The frame graph never retries; these are propagated to the caller, who owns
/// device-loss recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    #[error("view creation failed: {0}")]
    ViewCreationFailed(String),
    #[error("command list operation failed: {0}")]
    CommandListFailed(String),
    #[error("fence operation failed: {0}")]
    FenceFailed(String),
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("GPU device lost")]
    DeviceLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DeviceError::ResourceCreationFailed("gbuffer".into());
        assert_eq!(err.to_string(), "resource creation failed: gbuffer");
        assert_eq!(DeviceError::DeviceLost.to_string(), "GPU device lost");
    }
}
