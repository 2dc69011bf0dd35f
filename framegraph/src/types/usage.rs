//! Usage intents, resource states and view kinds.
//!
//! A pass declares *what it wants to do* with a resource as a [`Usage`].
//! The scheduler maps every usage onto a [`ResourceState`] and synthesizes the
//! transitions between them. The [`UsageTracker`](crate::graph::UsageTracker)
//! folds all usages of a resource into a [`ViewUsage`] mask that decides which
//! views get created.
//!
//! | Usage | State | View |
//! |-------|-------|------|
//! | `Present` | `PRESENT` | - |
//! | `ColorTarget` | `RENDER_TARGET` | color target |
//! | `DepthRead` | `DEPTH_READ` | depth target |
//! | `DepthWrite` | `DEPTH_WRITE` | depth target |
//! | `ShaderRead` | `PIXEL_SHADER_RESOURCE \| NON_PIXEL_SHADER_RESOURCE` | shader read |
//! | `UnorderedRead`/`UnorderedWrite` | `UNORDERED_ACCESS` | unordered access |
//! | `CopySource` | `COPY_SOURCE` | - |
//! | `CopyDest` | `COPY_DEST` | - |

use std::fmt;

use bitflags::bitflags;

use super::Format;

/// How a pass accesses a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Usage {
    /// Handed to the presentation engine.
    Present,
    /// Bound as a colour render target.
    ColorTarget,
    /// Bound as a read-only depth target.
    DepthRead,
    /// Bound as a writable depth target.
    DepthWrite,
    /// Sampled from any shader stage.
    ShaderRead,
    /// Sampled from the pixel shader only.
    PixelShaderRead,
    /// Sampled from non-pixel shader stages only.
    NonPixelShaderRead,
    /// Read through an unordered-access view.
    UnorderedRead,
    /// Written through an unordered-access view.
    UnorderedWrite,
    /// Source of a copy.
    CopySource,
    /// Destination of a copy.
    CopyDest,
    /// Bound as a vertex or constant buffer.
    VertexInput,
    /// Bound as an index buffer.
    IndexInput,
    /// No particular access; the common state.
    #[default]
    Unknown,
}

impl Usage {
    /// The resource state this usage requires.
    pub fn state(self) -> ResourceState {
        match self {
            Self::Present => ResourceState::PRESENT,
            Self::ColorTarget => ResourceState::RENDER_TARGET,
            Self::DepthRead => ResourceState::DEPTH_READ,
            Self::DepthWrite => ResourceState::DEPTH_WRITE,
            Self::ShaderRead => ResourceState::SHADER_RESOURCE,
            Self::PixelShaderRead => ResourceState::PIXEL_SHADER_RESOURCE,
            Self::NonPixelShaderRead => ResourceState::NON_PIXEL_SHADER_RESOURCE,
            Self::UnorderedRead | Self::UnorderedWrite => ResourceState::UNORDERED_ACCESS,
            Self::CopySource => ResourceState::COPY_SOURCE,
            Self::CopyDest => ResourceState::COPY_DEST,
            Self::VertexInput => ResourceState::VERTEX_AND_CONSTANT_BUFFER,
            Self::IndexInput => ResourceState::INDEX_BUFFER,
            Self::Unknown => ResourceState::COMMON,
        }
    }

    /// Returns true if this usage modifies the resource.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::ColorTarget | Self::DepthWrite | Self::UnorderedWrite | Self::CopyDest
        )
    }

    /// Returns true for writes through an unordered-access view.
    pub fn is_unordered_write(self) -> bool {
        matches!(self, Self::UnorderedWrite)
    }

    /// The view this usage needs on the resource.
    pub fn view_usage(self) -> ViewUsage {
        match self {
            Self::ShaderRead | Self::PixelShaderRead | Self::NonPixelShaderRead => {
                ViewUsage::SHADER_READ
            }
            Self::UnorderedRead | Self::UnorderedWrite => ViewUsage::UNORDERED_ACCESS,
            Self::ColorTarget => ViewUsage::COLOR_TARGET,
            Self::DepthRead | Self::DepthWrite => ViewUsage::DEPTH_TARGET,
            _ => ViewUsage::empty(),
        }
    }
}

bitflags! {
    /// Tracked GPU state of a resource.
    ///
    /// The empty set is the common state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceState: u32 {
        /// Common state.
        const COMMON = 0;
        /// Presentable.
        const PRESENT = 1 << 0;
        /// Colour render target.
        const RENDER_TARGET = 1 << 1;
        /// Read-only depth.
        const DEPTH_READ = 1 << 2;
        /// Writable depth.
        const DEPTH_WRITE = 1 << 3;
        /// Shader resource for the pixel stage.
        const PIXEL_SHADER_RESOURCE = 1 << 4;
        /// Shader resource for non-pixel stages.
        const NON_PIXEL_SHADER_RESOURCE = 1 << 5;
        /// Unordered access.
        const UNORDERED_ACCESS = 1 << 6;
        /// Copy source.
        const COPY_SOURCE = 1 << 7;
        /// Copy destination.
        const COPY_DEST = 1 << 8;
        /// Vertex or constant buffer.
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 9;
        /// Index buffer.
        const INDEX_BUFFER = 1 << 10;

        /// Shader resource for every stage.
        const SHADER_RESOURCE = Self::PIXEL_SHADER_RESOURCE.bits() | Self::NON_PIXEL_SHADER_RESOURCE.bits();
        /// States that allow the resource to be modified.
        const WRITE_MASK = Self::RENDER_TARGET.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::UNORDERED_ACCESS.bits()
            | Self::COPY_DEST.bits();
        /// States only the graphics queue can transition into or out of.
        const GRAPHICS_ONLY = Self::PRESENT.bits()
            | Self::RENDER_TARGET.bits()
            | Self::DEPTH_READ.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDEX_BUFFER.bits();
    }
}

impl ResourceState {
    /// A non-common state that only allows reads.
    ///
    /// Read-only states can be combined into one state covering several readers.
    pub fn is_read_only(self) -> bool {
        !self.is_empty() && !self.intersects(Self::WRITE_MASK)
    }
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::COMMON
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("COMMON");
        }
        if *self == Self::SHADER_RESOURCE {
            return f.write_str("SHADER_RESOURCE");
        }
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

bitflags! {
    /// Views a resource needs, accumulated over all surviving passes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ViewUsage: u8 {
        /// Needs a shader-read view.
        const SHADER_READ = 1 << 0;
        /// Needs an unordered-access view.
        const UNORDERED_ACCESS = 1 << 1;
        /// Needs a colour-target view.
        const COLOR_TARGET = 1 << 2;
        /// Needs a depth-target view.
        const DEPTH_TARGET = 1 << 3;
    }
}

impl ViewUsage {
    /// View kinds set in this mask, in [`ViewKind::ALL`] order.
    pub fn kinds(self) -> impl Iterator<Item = ViewKind> {
        ViewKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.flag()))
    }
}

/// Kind of descriptor view on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Shader resource view.
    ShaderRead,
    /// Unordered access view.
    UnorderedAccess,
    /// Render target view.
    ColorTarget,
    /// Depth stencil view.
    DepthTarget,
}

impl ViewKind {
    /// Number of view kinds.
    pub const COUNT: usize = 4;

    /// All view kinds, in index order.
    pub const ALL: [ViewKind; Self::COUNT] = [
        Self::ShaderRead,
        Self::UnorderedAccess,
        Self::ColorTarget,
        Self::DepthTarget,
    ];

    /// Dense index usable for per-kind tables.
    pub fn index(self) -> usize {
        match self {
            Self::ShaderRead => 0,
            Self::UnorderedAccess => 1,
            Self::ColorTarget => 2,
            Self::DepthTarget => 3,
        }
    }

    /// The usage flag that requests this view.
    pub fn flag(self) -> ViewUsage {
        match self {
            Self::ShaderRead => ViewUsage::SHADER_READ,
            Self::UnorderedAccess => ViewUsage::UNORDERED_ACCESS,
            Self::ColorTarget => ViewUsage::COLOR_TARGET,
            Self::DepthTarget => ViewUsage::DEPTH_TARGET,
        }
    }
}

/// Explicit view description, overriding the one derived from the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ViewDesc {
    /// Reinterpret the resource with this format.
    pub format: Option<Format>,
    /// First buffer element (buffers) or mip level (textures).
    pub first: u32,
    /// Number of elements or mips; `None` for the remainder.
    pub count: Option<u32>,
}

impl ViewDesc {
    /// Create a view description with the resource defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the view format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Restrict the view to `count` elements starting at `first`.
    pub fn with_range(mut self, first: u32, count: u32) -> Self {
        self.first = first;
        self.count = Some(count);
        self
    }
}

/// Texture layout for enhanced barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierLayout {
    /// Contents may be discarded.
    Undefined,
    /// Common layout.
    Common,
    /// Presentable.
    Present,
    /// Render target.
    RenderTarget,
    /// Writable depth/stencil.
    DepthStencilWrite,
    /// Read-only depth/stencil.
    DepthStencilRead,
    /// Shader resource.
    ShaderResource,
    /// Unordered access.
    UnorderedAccess,
    /// Copy source.
    CopySource,
    /// Copy destination.
    CopyDest,
}

bitflags! {
    /// Memory access scope for enhanced barriers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BarrierAccess: u32 {
        const VERTEX_BUFFER = 1 << 0;
        const CONSTANT_BUFFER = 1 << 1;
        const INDEX_BUFFER = 1 << 2;
        const RENDER_TARGET = 1 << 3;
        const UNORDERED_ACCESS = 1 << 4;
        const DEPTH_STENCIL_WRITE = 1 << 5;
        const DEPTH_STENCIL_READ = 1 << 6;
        const SHADER_RESOURCE = 1 << 7;
        const COPY_DEST = 1 << 8;
        const COPY_SOURCE = 1 << 9;
        const NO_ACCESS = 1 << 31;
    }
}

bitflags! {
    /// Pipeline synchronization scope for enhanced barriers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BarrierSync: u32 {
        const ALL = 1 << 0;
        const DRAW = 1 << 1;
        const INDEX_INPUT = 1 << 2;
        const VERTEX_SHADING = 1 << 3;
        const PIXEL_SHADING = 1 << 4;
        const DEPTH_STENCIL = 1 << 5;
        const RENDER_TARGET = 1 << 6;
        const COMPUTE_SHADING = 1 << 7;
        const COPY = 1 << 8;
    }
}

/// Explicit barrier hints attached to an access.
///
/// Escape hatch for transitions the state machine cannot infer; the device
/// layer receives them unchanged alongside the inferred before/after states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BarrierHints {
    /// Required texture layout.
    pub layout: Option<BarrierLayout>,
    /// Required access scope.
    pub access: Option<BarrierAccess>,
    /// Required synchronization scope.
    pub sync: Option<BarrierSync>,
}

impl BarrierHints {
    /// Returns true if no hint is set.
    pub fn is_empty(&self) -> bool {
        self.layout.is_none() && self.access.is_none() && self.sync.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_states() {
        assert_eq!(Usage::ColorTarget.state(), ResourceState::RENDER_TARGET);
        assert_eq!(Usage::Present.state(), ResourceState::PRESENT);
        assert_eq!(Usage::Unknown.state(), ResourceState::COMMON);
        assert_eq!(
            Usage::UnorderedRead.state(),
            Usage::UnorderedWrite.state()
        );
        assert!(ResourceState::SHADER_RESOURCE.contains(Usage::PixelShaderRead.state()));
    }

    #[test]
    fn test_usage_writes() {
        assert!(Usage::ColorTarget.is_write());
        assert!(Usage::UnorderedWrite.is_write());
        assert!(Usage::CopyDest.is_write());
        assert!(!Usage::ShaderRead.is_write());
        assert!(!Usage::UnorderedRead.is_write());
        assert!(Usage::UnorderedWrite.is_unordered_write());
        assert!(!Usage::ColorTarget.is_unordered_write());
    }

    #[test]
    fn test_read_only_states() {
        assert!(ResourceState::SHADER_RESOURCE.is_read_only());
        assert!(ResourceState::COPY_SOURCE.is_read_only());
        assert!(!ResourceState::COMMON.is_read_only());
        assert!(!ResourceState::UNORDERED_ACCESS.is_read_only());
        assert!(!(ResourceState::DEPTH_READ | ResourceState::DEPTH_WRITE).is_read_only());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ResourceState::COMMON.to_string(), "COMMON");
        assert_eq!(ResourceState::COPY_DEST.to_string(), "COPY_DEST");
        assert_eq!(ResourceState::SHADER_RESOURCE.to_string(), "SHADER_RESOURCE");
        assert_eq!(
            (ResourceState::COPY_SOURCE | ResourceState::DEPTH_READ).to_string(),
            "DEPTH_READ | COPY_SOURCE"
        );
    }

    #[test]
    fn test_view_usage_kinds() {
        let usage = Usage::ShaderRead.view_usage() | Usage::ColorTarget.view_usage();
        let kinds: Vec<_> = usage.kinds().collect();
        assert_eq!(kinds, vec![ViewKind::ShaderRead, ViewKind::ColorTarget]);
        assert!(Usage::CopyDest.view_usage().is_empty());
        assert_eq!(Usage::DepthRead.view_usage(), ViewUsage::DEPTH_TARGET);
    }
}
