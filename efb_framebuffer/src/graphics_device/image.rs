/// Image resource trait, image descriptor and image info

use std::any::Any;
use bitflags::bitflags;
use crate::graphics_device::SurfaceFormat;

bitflags! {
    /// How an image may be used by the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        /// Can be bound as a color render target
        const RENDER_TARGET = 1 << 0;
        /// Can be bound as a depth-stencil target
        const DEPTH_STENCIL = 1 << 1;
        /// Can be sampled by shaders
        const SHADER_RESOURCE = 1 << 2;
        /// Can be the source or destination of copies and resolves
        const TRANSFER = 1 << 3;
    }
}

/// Optimized clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Descriptor for creating a 2D (array) image
#[derive(Debug, Clone)]
pub struct ImageDesc {
    /// Debug name attached to the resource
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: SurfaceFormat,
    /// Multisample count (1 = single-sampled)
    pub samples: u32,
    /// Number of array layers (1 mono, 2 stereo)
    pub array_layers: u32,
    /// Usage flags
    pub usage: ImageUsage,
    /// Optimized clear value, if any
    pub clear_value: Option<ClearValue>,
}

/// Read-only properties of a created image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Debug name
    pub name: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: SurfaceFormat,
    /// Multisample count
    pub samples: u32,
    /// Number of array layers
    pub array_layers: u32,
    /// Usage flags
    pub usage: ImageUsage,
}

impl ImageInfo {
    /// Returns true if the image has more than one sample per pixel
    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }
}

impl From<&ImageDesc> for ImageInfo {
    fn from(desc: &ImageDesc) -> Self {
        Self {
            name: desc.name.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            samples: desc.samples.max(1),
            array_layers: desc.array_layers.max(1),
            usage: desc.usage,
        }
    }
}

/// Image resource trait
///
/// Implemented by backend-specific image types. The backend object is
/// destroyed when dropped; `RenderSurface` defers that drop until the GPU no
/// longer references it.
pub trait GpuImage: Send + Sync {
    /// Get the read-only properties of this image
    fn info(&self) -> &ImageInfo;

    /// Backend downcast hook
    fn as_any(&self) -> &dyn Any;
}
