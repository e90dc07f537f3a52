/// Conversions from framebuffer formats and usages to Vulkan

use ash::vk;
use efb_framebuffer::efb::device::{ImageUsage, SurfaceFormat};

/// Vulkan format of a surface format
pub fn surface_format_to_vk(format: SurfaceFormat) -> vk::Format {
    match format {
        SurfaceFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        SurfaceFormat::R32_FLOAT => vk::Format::R32_SFLOAT,
        SurfaceFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
    }
}

/// Image aspect addressed by barriers, views and copies
pub fn aspect_mask(format: SurfaceFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Vulkan sample count flag for `samples` (rounded down to a supported power of two)
pub fn sample_count_to_vk(samples: u32) -> vk::SampleCountFlags {
    match samples {
        0 | 1 => vk::SampleCountFlags::TYPE_1,
        2..=3 => vk::SampleCountFlags::TYPE_2,
        4..=7 => vk::SampleCountFlags::TYPE_4,
        8..=15 => vk::SampleCountFlags::TYPE_8,
        16..=31 => vk::SampleCountFlags::TYPE_16,
        32..=63 => vk::SampleCountFlags::TYPE_32,
        _ => vk::SampleCountFlags::TYPE_64,
    }
}

/// Vulkan usage flags for an image of `format` used as `usage`
pub fn image_usage_to_vk(usage: ImageUsage, format: SurfaceFormat) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsage::RENDER_TARGET) && !format.is_depth() {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::DEPTH_STENCIL) && format.is_depth() {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(ImageUsage::SHADER_RESOURCE) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::TRANSFER) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    }
    flags
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
