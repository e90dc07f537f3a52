/// Resource state -> image layout / access mask / pipeline stage table

use ash::vk;
use efb_framebuffer::efb::device::ResourceState;

/// What a resource state means to a Vulkan barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateAccess {
    pub layout: vk::ImageLayout,
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
}

/// Barrier half for `state`
pub fn state_access(state: ResourceState) -> StateAccess {
    match state {
        // Contents are undefined in the creation state
        ResourceState::Common => StateAccess {
            layout: vk::ImageLayout::UNDEFINED,
            access: vk::AccessFlags::empty(),
            stage: vk::PipelineStageFlags::TOP_OF_PIPE,
        },
        ResourceState::RenderTarget => StateAccess {
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            access: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        },
        ResourceState::DepthWrite => StateAccess {
            layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
            access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        },
        ResourceState::PixelShaderResource => StateAccess {
            layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            access: vk::AccessFlags::SHADER_READ,
            stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
        },
        ResourceState::ResolveSource | ResourceState::CopySource => StateAccess {
            layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            access: vk::AccessFlags::TRANSFER_READ,
            stage: vk::PipelineStageFlags::TRANSFER,
        },
        ResourceState::ResolveDest | ResourceState::CopyDest => StateAccess {
            layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            access: vk::AccessFlags::TRANSFER_WRITE,
            stage: vk::PipelineStageFlags::TRANSFER,
        },
    }
}

#[cfg(test)]
#[path = "vulkan_state_tests.rs"]
mod tests;
