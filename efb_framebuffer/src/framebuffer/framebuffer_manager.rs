/// FramebufferManager - owner of the EFB targets and readback caches
///
/// One explicit instance per render loop. It holds the shared graphics device
/// and locks it for the duration of each operation.

use crate::config::FramebufferConfig;
use crate::error::{Error, Result};
use crate::framebuffer::{EfbTargets, ResolveStrategy};
use crate::graphics_device::{lock_device, GraphicsDevice, Rect2D, ResourceState, SharedGraphicsDevice};
use crate::readback::{ColorCache, DepthCache, ReadbackChannel};
use crate::surface::RenderSurface;
use crate::xfb::{GuestMemory, XfbEncoder, XfbSource};
use crate::{efb_error, efb_info, efb_trace};

/// EFB owner shared by the renderer and the readback paths
///
/// # Example
///
/// ```no_run
/// use efb_framebuffer::efb::{FramebufferConfig, FramebufferManager, SharedGraphicsDevice, XfbEncoder};
///
/// fn build(device: SharedGraphicsDevice, encoder: Box<dyn XfbEncoder>) -> efb_framebuffer::efb::Result<()> {
///     let mut manager = FramebufferManager::new(device, FramebufferConfig::scaled(2), encoder)?;
///     let _depth = manager.cached_depth(320, 240)?;
///     manager.invalidate_cache();
///     Ok(())
/// }
/// ```
pub struct FramebufferManager {
    config: FramebufferConfig,
    targets: EfbTargets,
    resolve: ResolveStrategy,
    color_cache: ColorCache,
    depth_cache: DepthCache,
    xfb_encoder: Box<dyn XfbEncoder>,
    device: SharedGraphicsDevice,
}

impl FramebufferManager {
    /// Create every EFB surface and both readback caches
    ///
    /// # Errors
    ///
    /// Any allocation failure. There is no partially constructed manager.
    pub fn new(
        device: SharedGraphicsDevice,
        config: FramebufferConfig,
        xfb_encoder: Box<dyn XfbEncoder>,
    ) -> Result<Self> {
        config.validate()?;

        let (targets, resolve, color_cache, depth_cache) = {
            let mut guard = lock_device(&device)?;
            let device: &mut dyn GraphicsDevice = &mut *guard;

            let mut targets = EfbTargets::create(device, &config)?;
            let resolve = ResolveStrategy::create(device, &config)?;
            let color_cache = ColorCache::create(device, ReadbackChannel::Color)?;
            let depth_cache = DepthCache::create(device, ReadbackChannel::Depth)?;

            targets.color_temp_mut().transition_to(device, ResourceState::RenderTarget)?;
            targets.restore_as_active(device)?;
            (targets, resolve, color_cache, depth_cache)
        };

        let (width, height) = targets.target_size();
        efb_info!("efb::FramebufferManager", "Created {}x{} EFB ({} samples, {} layers)",
            width, height, targets.samples(), targets.layers());

        Ok(Self { config, targets, resolve, color_cache, depth_cache, xfb_encoder, device })
    }

    pub fn config(&self) -> &FramebufferConfig {
        &self.config
    }

    /// Internal render resolution
    pub fn target_size(&self) -> (u32, u32) {
        self.targets.target_size()
    }

    /// Array layers of the primary surfaces (1 mono, 2 stereo)
    pub fn layers(&self) -> u32 {
        self.targets.layers()
    }

    pub fn color_surface(&self) -> &RenderSurface {
        self.targets.color()
    }

    pub fn depth_surface(&self) -> &RenderSurface {
        self.targets.depth()
    }

    pub fn color_temp_surface(&self) -> &RenderSurface {
        self.targets.color_temp()
    }

    /// Single-sampled EFB color, ready to be sampled
    ///
    /// The primary surface itself when not multisampled. Either way the
    /// returned surface is in `PixelShaderResource`; call
    /// [`restore_render_targets`](Self::restore_render_targets) before drawing
    /// into the EFB again.
    pub fn resolved_color(&mut self) -> Result<&RenderSurface> {
        let mut guard = lock_device(&self.device)?;
        let device: &mut dyn GraphicsDevice = &mut *guard;
        let surface = self.resolve.resolved_color(device, &mut self.targets)?;
        surface.transition_to(device, ResourceState::PixelShaderResource)?;
        Ok(surface)
    }

    /// Single-sampled EFB depth, ready to be sampled
    ///
    /// Same state contract as [`resolved_color`](Self::resolved_color).
    pub fn resolved_depth(&mut self) -> Result<&RenderSurface> {
        let mut guard = lock_device(&self.device)?;
        let device: &mut dyn GraphicsDevice = &mut *guard;
        let surface = self.resolve.resolved_depth(device, &mut self.targets)?;
        surface.transition_to(device, ResourceState::PixelShaderResource)?;
        Ok(surface)
    }

    /// Put the primary color/depth back into their drawing states and bind them
    pub fn restore_render_targets(&mut self) -> Result<()> {
        let mut guard = lock_device(&self.device)?;
        self.targets.restore_as_active(&mut *guard)
    }

    /// Exchange the primary and temp color surfaces for a pixel format reinterpretation
    pub fn swap_reinterpret_texture(&mut self) {
        self.targets.swap_reinterpret();
    }

    /// Packed RGBA8 color at native coordinates `(x, y)`
    pub fn cached_color(&mut self, x: u32, y: u32) -> Result<u32> {
        let mut guard = lock_device(&self.device)?;
        self.color_cache.get(&mut *guard, &mut self.targets, x, y)
    }

    /// Depth at native coordinates `(x, y)`
    pub fn cached_depth(&mut self, x: u32, y: u32) -> Result<f32> {
        let mut guard = lock_device(&self.device)?;
        self.depth_cache.get(&mut *guard, &mut self.targets, x, y)
    }

    /// Patch the color snapshot; ignored while the cache is empty
    pub fn set_cached_color(&mut self, x: u32, y: u32, value: u32) {
        self.color_cache.set(x, y, value);
    }

    /// Patch the depth snapshot; ignored while the cache is empty
    pub fn set_cached_depth(&mut self, x: u32, y: u32, value: f32) {
        self.depth_cache.set(x, y, value);
    }

    /// Drop both snapshots (called whenever the EFB may have changed)
    pub fn invalidate_cache(&mut self) {
        self.color_cache.invalidate();
        self.depth_cache.invalidate();
    }

    /// Encode `source_rect` of the resolved EFB color into guest memory at `address`
    ///
    /// `stride` is the XFB row size in bytes (two bytes per pixel).
    pub fn copy_to_display_output(
        &mut self,
        memory: &mut dyn GuestMemory,
        address: u32,
        stride: u32,
        height: u32,
        source_rect: Rect2D,
        gamma: f32,
    ) -> Result<()> {
        let len = stride as usize * height as usize;
        let destination = memory.pointer(address, len).ok_or_else(|| {
            efb_error!("efb::FramebufferManager", "XFB destination {:#010x} (+{} bytes) is not mapped", address, len);
            Error::InvalidResource(format!("XFB address {:#010x}", address))
        })?;

        let mut guard = lock_device(&self.device)?;
        let device: &mut dyn GraphicsDevice = &mut *guard;

        let resolved = self.resolve.resolved_color(device, &mut self.targets)?;
        resolved.transition_to(device, ResourceState::PixelShaderResource)?;
        self.xfb_encoder.encode(device, resolved, destination, stride / 2, height, source_rect, gamma)?;

        self.targets.restore_as_active(device)?;
        device.restore_api_state()?;

        efb_trace!("efb::FramebufferManager", "Encoded {}x{} XFB at {:#010x}", stride / 2, height, address);
        Ok(())
    }

    /// Create a display texture of `width x height` with `layers` layers
    pub fn create_display_source(&mut self, width: u32, height: u32, layers: u32) -> Result<XfbSource> {
        let mut guard = lock_device(&self.device)?;
        XfbSource::create(&mut *guard, width, height, layers)
    }

    /// Run `f` with the locked device and the EFB targets
    pub(crate) fn with_targets<R>(
        &mut self,
        f: impl FnOnce(&mut dyn GraphicsDevice, &mut EfbTargets) -> Result<R>,
    ) -> Result<R> {
        let mut guard = lock_device(&self.device)?;
        f(&mut *guard, &mut self.targets)
    }
}

impl Drop for FramebufferManager {
    fn drop(&mut self) {
        self.invalidate_cache();
        // Surfaces and staging buffers hand themselves to the release queue
    }
}

#[cfg(test)]
#[path = "framebuffer_manager_tests.rs"]
mod tests;
