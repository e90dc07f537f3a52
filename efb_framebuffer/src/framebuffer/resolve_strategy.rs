/// ResolveStrategy - how "resolved" color/depth are obtained, chosen once at construction
///
/// - `Identity` (single-sampled EFB): the resolved surfaces are the primary
///   surfaces themselves. No copy, no allocation.
/// - `ResolveThenUse` (multisampled EFB): dedicated single-sampled surfaces are
///   filled on every request. Color uses a per-layer hardware resolve; depth
///   cannot be hardware-resolved and is drawn with a minimum-depth shader.

use crate::config::FramebufferConfig;
use crate::error::Result;
use crate::framebuffer::EfbTargets;
use crate::graphics_device::{
    ClearValue, CopyShader, GraphicsDevice, ImageDesc, ImageUsage, QuadDraw, Rect2D,
    ResourceState, SurfaceFormat, Viewport,
};
use crate::surface::RenderSurface;
use crate::efb_trace;

pub enum ResolveStrategy {
    Identity,
    ResolveThenUse {
        color: RenderSurface,
        depth: RenderSurface,
    },
}

impl ResolveStrategy {
    /// Pick the strategy for `config`, allocating resolve targets when multisampled
    pub fn create(device: &mut dyn GraphicsDevice, config: &FramebufferConfig) -> Result<Self> {
        if !config.is_multisampled() {
            return Ok(ResolveStrategy::Identity);
        }

        let (width, height) = config.effective_target_size();
        let usage = ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE | ImageUsage::TRANSFER;

        let color = RenderSurface::create(device, &ImageDesc {
            name: "EFB color resolve texture".to_string(),
            width,
            height,
            format: SurfaceFormat::R8G8B8A8_UNORM,
            samples: 1,
            array_layers: config.layers(),
            usage,
            clear_value: Some(ClearValue::Color([0.0, 0.0, 0.0, 1.0])),
        })?;
        let depth = RenderSurface::create(device, &ImageDesc {
            name: "EFB depth resolve texture".to_string(),
            width,
            height,
            format: SurfaceFormat::R32_FLOAT,
            samples: 1,
            array_layers: config.layers(),
            usage,
            clear_value: Some(ClearValue::Color([0.0, 0.0, 0.0, 0.0])),
        })?;

        Ok(ResolveStrategy::ResolveThenUse { color, depth })
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ResolveStrategy::Identity)
    }

    /// Single-sampled view of the EFB color
    ///
    /// When resolving, the primary color is back in `RenderTarget` afterwards
    /// and the returned surface is left in `ResolveDest`.
    pub fn resolved_color<'a>(
        &'a mut self,
        device: &mut dyn GraphicsDevice,
        targets: &'a mut EfbTargets,
    ) -> Result<&'a mut RenderSurface> {
        match self {
            ResolveStrategy::Identity => Ok(targets.color_mut()),
            ResolveStrategy::ResolveThenUse { color: resolved, .. } => {
                let layers = targets.layers();
                let source = targets.color_mut();

                resolved.transition_to(device, ResourceState::ResolveDest)?;
                source.transition_to(device, ResourceState::ResolveSource)?;
                for layer in 0..layers {
                    device.resolve_layer(source.image(), resolved.image(), layer, SurfaceFormat::R8G8B8A8_UNORM)?;
                }
                source.transition_to(device, ResourceState::RenderTarget)?;

                efb_trace!("efb::FramebufferManager", "Resolved EFB color ({} layers)", layers);
                Ok(resolved)
            }
        }
    }

    /// Single-sampled view of the EFB depth
    ///
    /// When resolving, the primary targets are re-bound afterwards and the
    /// returned surface is left in `RenderTarget`.
    pub fn resolved_depth<'a>(
        &'a mut self,
        device: &mut dyn GraphicsDevice,
        targets: &'a mut EfbTargets,
    ) -> Result<&'a mut RenderSurface> {
        match self {
            ResolveStrategy::Identity => Ok(targets.depth_mut()),
            ResolveStrategy::ResolveThenUse { depth: resolved, .. } => {
                let (width, height) = targets.target_size();

                device.set_viewport(Viewport::full(width, height))?;
                resolved.transition_to(device, ResourceState::RenderTarget)?;
                device.bind_render_targets(&[resolved.image()], None)?;

                let source = targets.depth_mut();
                source.transition_to(device, ResourceState::PixelShaderResource)?;
                device.set_point_copy_sampler()?;
                device.draw_quad(&QuadDraw {
                    source: source.image(),
                    source_rect: Rect2D::sized(width, height),
                    source_width: width,
                    source_height: height,
                    shader: CopyShader::DepthMinimum { multisampled: true },
                    gamma: 1.0,
                    output_format: SurfaceFormat::R32_FLOAT,
                })?;

                targets.restore_as_active(device)?;
                device.restore_api_state()?;

                efb_trace!("efb::FramebufferManager", "Resolved EFB depth");
                Ok(resolved)
            }
        }
    }
}

#[cfg(test)]
#[path = "resolve_strategy_tests.rs"]
mod tests;
