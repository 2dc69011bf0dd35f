//! Profiling support via Tracy.
//!
//! Profiling is enabled via the `profiling` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! redlilium-framegraph = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! When profiling is disabled (the default), the macros compile to no-ops.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, span};

/// Create a profiling span for the current scope.
///
/// # Example
///
/// ```ignore
/// fn compile(&mut self) {
///     {
///         profile_scope!("cull");
///         // ...
///     }
/// }
/// ```
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span for the entire function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}
