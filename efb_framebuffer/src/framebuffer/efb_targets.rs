/// EfbTargets - the primary color/depth pair and the reinterpret temp surface

use crate::config::{FramebufferConfig, EFB_HEIGHT, EFB_WIDTH};
use crate::error::Result;
use crate::graphics_device::{
    ClearValue, GraphicsDevice, ImageDesc, ImageUsage, ResourceState, SurfaceFormat,
};
use crate::surface::RenderSurface;
use crate::efb_trace;

/// Primary EFB render targets at the internal render resolution
pub struct EfbTargets {
    color: RenderSurface,
    depth: RenderSurface,
    color_temp: RenderSurface,
    width: u32,
    height: u32,
    samples: u32,
    layers: u32,
}

impl EfbTargets {
    /// Create color, depth and temp-color surfaces for `config`
    pub fn create(device: &mut dyn GraphicsDevice, config: &FramebufferConfig) -> Result<Self> {
        let (width, height) = config.effective_target_size();
        let samples = config.sample_count();
        let layers = config.layers();

        let color_desc = |name: &str| ImageDesc {
            name: name.to_string(),
            width,
            height,
            format: SurfaceFormat::R8G8B8A8_UNORM,
            samples,
            array_layers: layers,
            usage: ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE | ImageUsage::TRANSFER,
            clear_value: Some(ClearValue::Color([0.0, 0.0, 0.0, 1.0])),
        };

        let color = RenderSurface::create(device, &color_desc("EFB color texture"))?;
        let color_temp = RenderSurface::create(device, &color_desc("EFB color temp texture"))?;
        let depth = RenderSurface::create(device, &ImageDesc {
            name: "EFB depth texture".to_string(),
            width,
            height,
            format: SurfaceFormat::D32_FLOAT,
            samples,
            array_layers: layers,
            usage: ImageUsage::DEPTH_STENCIL | ImageUsage::SHADER_RESOURCE | ImageUsage::TRANSFER,
            clear_value: Some(ClearValue::DepthStencil { depth: 0.0, stencil: 0 }),
        })?;

        Ok(Self { color, depth, color_temp, width, height, samples, layers })
    }

    pub fn color(&self) -> &RenderSurface {
        &self.color
    }

    pub fn depth(&self) -> &RenderSurface {
        &self.depth
    }

    pub fn color_temp(&self) -> &RenderSurface {
        &self.color_temp
    }

    pub fn color_mut(&mut self) -> &mut RenderSurface {
        &mut self.color
    }

    pub fn depth_mut(&mut self) -> &mut RenderSurface {
        &mut self.depth
    }

    pub fn color_temp_mut(&mut self) -> &mut RenderSurface {
        &mut self.color_temp
    }

    /// Internal render resolution
    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }

    /// Whether readback has to go through a native-resolution single-sampled copy
    pub fn needs_native_copy(&self) -> bool {
        self.is_multisampled() || (self.width, self.height) != (EFB_WIDTH, EFB_HEIGHT)
    }

    /// Put color/depth back into their drawing states and bind them
    pub fn restore_as_active(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.color.transition_to(device, ResourceState::RenderTarget)?;
        self.depth.transition_to(device, ResourceState::DepthWrite)?;
        device.bind_render_targets(&[self.color.image()], Some(self.depth.image()))
    }

    /// Exchange the primary and temp color surfaces (no copy, no allocation)
    pub fn swap_reinterpret(&mut self) {
        std::mem::swap(&mut self.color, &mut self.color_temp);
        efb_trace!("efb::FramebufferManager", "Swapped EFB color with '{}'", self.color_temp.info().name);
    }
}

#[cfg(test)]
#[path = "efb_targets_tests.rs"]
mod tests;
