/// XfbSource - display texture filled with a gamma-corrected copy of the EFB color

use crate::error::Result;
use crate::framebuffer::FramebufferManager;
use crate::graphics_device::{
    ClearValue, CopyShader, GraphicsDevice, ImageDesc, ImageUsage, QuadDraw, Rect2D,
    ResourceState, SurfaceFormat, Viewport,
};
use crate::surface::RenderSurface;
use crate::efb_trace;

pub struct XfbSource {
    texture: RenderSurface,
    layers: u32,
}

impl XfbSource {
    pub(crate) fn create(device: &mut dyn GraphicsDevice, width: u32, height: u32, layers: u32) -> Result<Self> {
        let layers = layers.max(1);
        let texture = RenderSurface::create(device, &ImageDesc {
            name: "XFB source texture".to_string(),
            width: width.max(1),
            height: height.max(1),
            format: SurfaceFormat::R8G8B8A8_UNORM,
            samples: 1,
            array_layers: layers,
            usage: ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE,
            clear_value: Some(ClearValue::Color([0.0, 0.0, 0.0, 1.0])),
        })?;

        Ok(Self { texture, layers })
    }

    pub fn texture(&self) -> &RenderSurface {
        &self.texture
    }

    pub fn width(&self) -> u32 {
        self.texture.info().width
    }

    pub fn height(&self) -> u32 {
        self.texture.info().height
    }

    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Copy the current EFB color into the display texture, applying `gamma`
    ///
    /// The EFB primary targets are active again afterwards.
    pub fn copy_from_efb(&mut self, manager: &mut FramebufferManager, gamma: f32) -> Result<()> {
        let texture = &mut self.texture;
        manager.with_targets(|device, targets| {
            let (target_width, target_height) = targets.target_size();
            let (width, height) = (texture.info().width, texture.info().height);
            let multisampled = targets.is_multisampled();

            device.set_viewport(Viewport::full(width, height))?;
            texture.transition_to(device, ResourceState::RenderTarget)?;
            device.bind_render_targets(&[texture.image()], None)?;

            let source = targets.color_mut();
            source.transition_to(device, ResourceState::PixelShaderResource)?;
            device.set_point_copy_sampler()?;
            device.draw_quad(&QuadDraw {
                source: source.image(),
                source_rect: Rect2D::sized(width, height),
                source_width: target_width,
                source_height: target_height,
                shader: CopyShader::ColorCopy { multisampled },
                gamma,
                output_format: SurfaceFormat::R8G8B8A8_UNORM,
            })?;

            targets.restore_as_active(device)?;
            device.restore_api_state()?;

            efb_trace!("efb::XfbSource", "Copied EFB into {}x{} XFB source (gamma {})", width, height, gamma);
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "xfb_source_tests.rs"]
mod tests;
