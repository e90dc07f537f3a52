/*!
# EFB Framebuffer - Vulkan Backend

Vulkan implementation of the `efb_framebuffer` device traits.

The backend is headless (no window or swapchain): it creates a Vulkan 1.3
device with dynamic rendering, allocates images and readback buffers through
gpu-allocator, and records barriers, resolves, copies and copy quads into a
ring of fenced command batches.

Copy-quad pipelines are supplied by the embedding renderer through the
`QuadRenderer` trait.
*/

// Vulkan implementation modules
mod vulkan_config;
mod vulkan_context;
mod vulkan_format;
mod vulkan_state;
mod vulkan_image;
mod vulkan_readback_buffer;
mod vulkan_graphics_device;
mod quad_renderer;
#[cfg_attr(not(feature = "vulkan-validation"), allow(dead_code))]
mod debug;

// Main efb_vulkan namespace module
pub mod efb_vulkan {
    pub use crate::vulkan_config::VulkanConfig;
    pub use crate::vulkan_context::GpuContext;
    pub use crate::vulkan_graphics_device::VulkanGraphicsDevice;
    pub use crate::vulkan_image::VulkanImage;
    pub use crate::vulkan_readback_buffer::VulkanReadbackBuffer;
    pub use crate::quad_renderer::{QuadPass, QuadRenderer};

    // Validation statistics (populated only with the `vulkan-validation` feature)
    pub use crate::debug::{print_validation_stats_report, validation_stats, ValidationStats};
}
