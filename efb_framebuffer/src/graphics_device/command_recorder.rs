/// CommandRecorder trait - commands the framebuffer core appends to the GPU command stream

use crate::error::Result;
use crate::graphics_device::{GpuImage, ReadbackBuffer, ResourceState, SurfaceFormat};

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering a whole `width x height` target with the full depth range
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    /// Rectangle anchored at the origin
    pub fn sized(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Pixel shader used by a full-target quad copy
///
/// The vertex and geometry stages are implied: a simple full-target quad, with
/// the copy geometry shader fanning out to every layer of the bound target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyShader {
    /// Plain color copy (with gamma applied)
    ColorCopy { multisampled: bool },
    /// Depth copy selecting the minimum depth across samples
    DepthMinimum { multisampled: bool },
}

/// A full-target textured quad draw
pub struct QuadDraw<'a> {
    /// Texture sampled by the pixel shader
    pub source: &'a dyn GpuImage,
    /// Region of the source to sample
    pub source_rect: Rect2D,
    /// Width of the source texture
    pub source_width: u32,
    /// Height of the source texture
    pub source_height: u32,
    /// Pixel shader
    pub shader: CopyShader,
    /// Gamma applied by the copy shader (1.0 = none)
    pub gamma: f32,
    /// Format written to the bound render target
    pub output_format: SurfaceFormat,
}

/// Layout of a linear image-to-buffer copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFootprint {
    /// Texel format written into the buffer
    pub format: SurfaceFormat,
    /// Copied width in pixels
    pub width: u32,
    /// Copied height in pixels
    pub height: u32,
    /// Distance in bytes between the starts of two consecutive rows
    pub row_pitch: u32,
}

impl CopyFootprint {
    /// Number of buffer bytes the copy touches
    pub fn byte_size(&self) -> u64 {
        self.row_pitch as u64 * self.height as u64
    }
}

/// Command recorder - render target binder, draw-quad primitive and copy engine
///
/// Every method appends work to the single ordered command stream. Callers must
/// have transitioned each image into the state the command expects.
pub trait CommandRecorder {
    /// Record a state transition (barrier) of `image` from `from` to `to`
    fn transition(&mut self, image: &dyn GpuImage, from: ResourceState, to: ResourceState) -> Result<()>;

    /// Resolve one array layer of a multisampled image into a single-sampled image
    ///
    /// `source` must be in `ResolveSource`, `destination` in `ResolveDest`.
    fn resolve_layer(
        &mut self,
        source: &dyn GpuImage,
        destination: &dyn GpuImage,
        layer: u32,
        format: SurfaceFormat,
    ) -> Result<()>;

    /// Copy the top-left `footprint.width x footprint.height` region of layer 0
    /// of `source` (in `CopySource`) into `destination`, honoring the row pitch
    fn copy_image_to_buffer(
        &mut self,
        source: &dyn GpuImage,
        destination: &mut dyn ReadbackBuffer,
        footprint: &CopyFootprint,
    ) -> Result<()>;

    /// Bind `colors` (and optionally `depth`) as the active render targets
    fn bind_render_targets(&mut self, colors: &[&dyn GpuImage], depth: Option<&dyn GpuImage>) -> Result<()>;

    /// Set the active viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Select the point-sampling sampler used by copy shaders
    fn set_point_copy_sampler(&mut self) -> Result<()>;

    /// Draw a full-target textured quad into the bound render targets
    fn draw_quad(&mut self, draw: &QuadDraw<'_>) -> Result<()>;

    /// Restore the viewport/scissor state the external renderer had active
    fn restore_api_state(&mut self) -> Result<()>;
}
