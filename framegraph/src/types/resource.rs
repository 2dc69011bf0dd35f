//! Resource descriptions.

use super::Format;

/// Clear value baked into a resource at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Clear {
    /// No optimized clear value.
    #[default]
    None,
    /// Colour clear value (RGBA).
    Colour([f32; 4]),
    /// Depth/stencil clear value.
    DepthStencil {
        /// Depth clear value.
        depth: f32,
        /// Stencil clear value.
        stencil: u8,
    },
}

/// Dimensions of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSize {
    /// A single-mip 2D texture.
    Tex2d {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// A structured buffer of `length` elements, `stride` bytes each.
    Array {
        /// Element size in bytes.
        stride: u32,
        /// Number of elements.
        length: u32,
    },
}

impl ResourceSize {
    /// Returns true for texture-shaped resources.
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Tex2d { .. })
    }

    /// Size of the resource in bytes for a given format.
    pub fn byte_size(&self, format: Format) -> u64 {
        match *self {
            Self::Tex2d { width, height } => {
                width as u64 * height as u64 * format.block_size() as u64
            }
            Self::Array { stride, length } => stride as u64 * length as u64,
        }
    }
}

/// Description of a graph resource: shape, format, clear value and buffering.
///
/// # Example
///
/// ```ignore
/// let hdr = ResourceInfo::tex2d(1920, 1080, Format::Rgba16Float)
///     .with_clear_colour([0.0, 0.0, 0.0, 1.0]);
/// let lights = ResourceInfo::structured_buffer::<GpuLight>(1024).buffered();
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceInfo {
    /// Resource dimensions.
    pub size: ResourceSize,
    /// Element format.
    pub format: Format,
    /// Optimized clear value.
    pub clear: Clear,
    /// One copy per frame in flight.
    pub buffered: bool,
}

impl ResourceInfo {
    /// Describe a 2D texture.
    ///
    /// Depth formats default to a `1.0` depth clear value.
    pub fn tex2d(width: u32, height: u32, format: Format) -> Self {
        let clear = if format.is_depth_stencil() {
            Clear::DepthStencil {
                depth: 1.0,
                stencil: 0,
            }
        } else {
            Clear::None
        };
        Self {
            size: ResourceSize::Tex2d { width, height },
            format,
            clear,
            buffered: false,
        }
    }

    /// Describe a buffer of `length` elements of `stride` bytes.
    pub fn array(stride: u32, length: u32) -> Self {
        Self {
            size: ResourceSize::Array { stride, length },
            format: Format::Unknown,
            clear: Clear::None,
            buffered: false,
        }
    }

    /// Describe a structured buffer of `length` values of type `T`.
    pub fn structured_buffer<T>(length: u32) -> Self {
        Self::array(std::mem::size_of::<T>() as u32, length)
    }

    /// Set a colour clear value.
    pub fn with_clear_colour(mut self, colour: [f32; 4]) -> Self {
        self.clear = Clear::Colour(colour);
        self
    }

    /// Set a depth/stencil clear value.
    pub fn with_clear_depth_stencil(mut self, depth: f32, stencil: u8) -> Self {
        self.clear = Clear::DepthStencil { depth, stencil };
        self
    }

    /// Allocate one copy of this resource per frame in flight.
    pub fn buffered(mut self) -> Self {
        self.buffered = true;
        self
    }

    /// Size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.size.byte_size(self.format)
    }
}
