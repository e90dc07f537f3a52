/// QuadRenderer - pipeline seam for the full-target copy quads
///
/// The framebuffer core only asks for "a quad with this copy shader". Shader
/// compilation and pipeline objects belong to the renderer embedding this
/// backend, which implements `QuadRenderer` and records the draw into the
/// command buffer handed over in `QuadPass`.

use ash::vk;
use efb_framebuffer::efb::device::{CopyShader, Rect2D};
use efb_framebuffer::efb::Result;

/// Everything needed to record one copy quad inside an active rendering scope
pub struct QuadPass<'a> {
    pub device: &'a ash::Device,
    /// Command buffer with dynamic rendering already begun on the bound targets
    pub command_buffer: vk::CommandBuffer,

    // Source texture (in SHADER_READ_ONLY_OPTIMAL)
    pub source_view: vk::ImageView,
    pub source_format: vk::Format,
    pub source_samples: vk::SampleCountFlags,
    pub source_rect: Rect2D,
    pub source_size: (u32, u32),
    pub sampler: vk::Sampler,

    // Bound targets
    pub color_formats: &'a [vk::Format],
    pub depth_format: Option<vk::Format>,
    pub target_samples: vk::SampleCountFlags,
    /// Layers of the bound targets; the quad must reach every one of them
    pub target_layers: u32,
    pub viewport: vk::Viewport,

    // Pixel stage
    pub shader: CopyShader,
    pub gamma: f32,
}

/// Records copy quads for the Vulkan graphics device
pub trait QuadRenderer: Send {
    /// Bind a pipeline for `pass.shader` and record the quad
    fn draw(&mut self, pass: &QuadPass<'_>) -> Result<()>;

    /// Release pipeline objects (called once, with the device idle)
    fn destroy(&mut self, _device: &ash::Device) {}
}
