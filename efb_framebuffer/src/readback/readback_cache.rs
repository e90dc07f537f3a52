/// ReadbackCache - single-slot CPU snapshot of one EFB channel (color or depth)
///
/// State machine: `Empty` -> `Populating` -> `Populated` -> (`invalidate`) -> `Empty`.
///
/// Populating is synchronous and stalls the GPU: the snapshot is always
/// native resolution (`EFB_WIDTH x EFB_HEIGHT`), so a scaled or multisampled
/// EFB is first drawn into a native-size intermediate surface with a
/// point-sampled quad, then copied into a row-pitched staging buffer, the
/// command stream is flushed and waited on, and the buffer is mapped.
///
/// `set` patches the mapped snapshot only. It never forces a populate and is
/// never written back to the GPU.

use std::marker::PhantomData;
use bytemuck::Pod;

use crate::config::{EFB_HEIGHT, EFB_WIDTH};
use crate::error::Result;
use crate::framebuffer::EfbTargets;
use crate::graphics_device::{
    ClearValue, CopyShader, GraphicsDevice, ImageDesc, ImageUsage, QuadDraw, Rect2D,
    ResourceState, SurfaceFormat, Viewport,
};
use crate::readback::{PitchedView, PitchedViewMut, RowPitch, StagingBuffer};
use crate::surface::RenderSurface;
use crate::{efb_debug, efb_err, efb_error, efb_trace};

// ===== CHANNEL =====

/// Which EFB surface a cache snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackChannel {
    Color,
    Depth,
}

impl ReadbackChannel {
    pub fn name(&self) -> &'static str {
        match self {
            ReadbackChannel::Color => "color",
            ReadbackChannel::Depth => "depth",
        }
    }

    /// Format of the native-resolution intermediate surface
    pub fn intermediate_format(&self) -> SurfaceFormat {
        match self {
            ReadbackChannel::Color => SurfaceFormat::R8G8B8A8_UNORM,
            ReadbackChannel::Depth => SurfaceFormat::R32_FLOAT,
        }
    }

    fn clear_value(&self) -> ClearValue {
        match self {
            ReadbackChannel::Color => ClearValue::Color([0.0, 0.0, 0.0, 1.0]),
            ReadbackChannel::Depth => ClearValue::Color([0.0, 0.0, 0.0, 0.0]),
        }
    }

    /// Shader used to bring the live surface down to native resolution
    pub fn copy_shader(&self, multisampled: bool) -> CopyShader {
        match self {
            ReadbackChannel::Color => CopyShader::ColorCopy { multisampled },
            ReadbackChannel::Depth => CopyShader::DepthMinimum { multisampled },
        }
    }

    fn source<'a>(&self, targets: &'a mut EfbTargets) -> &'a mut RenderSurface {
        match self {
            ReadbackChannel::Color => targets.color_mut(),
            ReadbackChannel::Depth => targets.depth_mut(),
        }
    }
}

/// Population state of a cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing cached, staging buffer unmapped
    Empty,
    /// Copy issued, waiting for the GPU
    Populating,
    /// Staging buffer mapped and readable
    Populated,
}

// ===== CACHE =====

pub struct ReadbackCache<T: Pod> {
    channel: ReadbackChannel,
    intermediate: RenderSurface,
    staging: StagingBuffer,
    pitch: RowPitch,
    state: CacheState,
    _texel: PhantomData<T>,
}

/// Color snapshot, one packed RGBA8 texel per pixel
pub type ColorCache = ReadbackCache<u32>;

/// Depth snapshot, one float per pixel
pub type DepthCache = ReadbackCache<f32>;

impl<T: Pod> ReadbackCache<T> {
    /// Allocate the intermediate surface and staging buffer for `channel`
    pub fn create(device: &mut dyn GraphicsDevice, channel: ReadbackChannel) -> Result<Self> {
        let format = channel.intermediate_format();
        debug_assert_eq!(std::mem::size_of::<T>() as u32, format.bytes_per_pixel());

        let intermediate = RenderSurface::create(device, &ImageDesc {
            name: format!("EFB {} cache texture", channel.name()),
            width: EFB_WIDTH,
            height: EFB_HEIGHT,
            format,
            samples: 1,
            array_layers: 1,
            usage: ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE | ImageUsage::TRANSFER,
            clear_value: Some(channel.clear_value()),
        })?;

        let pitch = RowPitch::aligned(EFB_WIDTH, format);
        let staging = StagingBuffer::create(
            device,
            &format!("EFB {} cache buffer", channel.name()),
            pitch.buffer_size(EFB_HEIGHT),
        )?;

        Ok(Self {
            channel,
            intermediate,
            staging,
            pitch,
            state: CacheState::Empty,
            _texel: PhantomData,
        })
    }

    pub fn channel(&self) -> ReadbackChannel {
        self.channel
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn row_pitch(&self) -> RowPitch {
        self.pitch
    }

    /// Native-resolution intermediate surface
    pub fn intermediate(&self) -> &RenderSurface {
        &self.intermediate
    }

    pub fn staging(&self) -> &StagingBuffer {
        &self.staging
    }

    /// Cached value at `(x, y)`, populating the cache first if it is empty
    pub fn get(&mut self, device: &mut dyn GraphicsDevice, targets: &mut EfbTargets, x: u32, y: u32) -> Result<T> {
        debug_assert!(x < EFB_WIDTH && y < EFB_HEIGHT, "cache read at ({}, {}) outside the EFB", x, y);

        if self.state == CacheState::Empty {
            self.populate(device, targets)?;
        }

        let bytes = self.staging.buffer().mapped().ok_or_else(|| {
            efb_err!("efb::ReadbackCache", "EFB {} cache is populated but '{}' is unmapped",
                self.channel.name(), self.staging.name())
        })?;
        Ok(PitchedView::<T>::new(bytes, self.pitch, EFB_WIDTH, EFB_HEIGHT).get(x, y))
    }

    /// Patch the cached value at `(x, y)`; a no-op while the cache is empty
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        debug_assert!(x < EFB_WIDTH && y < EFB_HEIGHT, "cache write at ({}, {}) outside the EFB", x, y);

        if self.state != CacheState::Populated {
            return;
        }
        if let Some(bytes) = self.staging.buffer_mut().mapped_mut() {
            PitchedViewMut::<T>::new(bytes, self.pitch, EFB_WIDTH, EFB_HEIGHT).set(x, y, value);
        }
    }

    /// Drop the snapshot; idempotent
    pub fn invalidate(&mut self) {
        if self.state == CacheState::Populated {
            self.staging.buffer_mut().unmap();
            efb_trace!("efb::ReadbackCache", "Invalidated EFB {} cache", self.channel.name());
        }
        self.state = CacheState::Empty;
    }

    fn populate(&mut self, device: &mut dyn GraphicsDevice, targets: &mut EfbTargets) -> Result<()> {
        debug_assert_eq!(self.state, CacheState::Empty, "EFB {} cache populate re-entered", self.channel.name());
        self.state = CacheState::Populating;

        match self.copy_and_map(device, targets) {
            Ok(()) => {
                self.state = CacheState::Populated;
                efb_debug!("efb::ReadbackCache", "Populated EFB {} cache (pitch {})",
                    self.channel.name(), self.pitch.bytes());
                Ok(())
            }
            Err(e) => {
                self.staging.buffer_mut().unmap();
                self.state = CacheState::Empty;
                efb_error!("efb::ReadbackCache", "Failed to populate EFB {} cache: {}", self.channel.name(), e);
                Err(e)
            }
        }
    }

    fn copy_and_map(&mut self, device: &mut dyn GraphicsDevice, targets: &mut EfbTargets) -> Result<()> {
        device.cpu_access_notify();

        let source = if targets.needs_native_copy() {
            self.draw_native_copy(device, targets)?;
            &mut self.intermediate
        } else {
            self.channel.source(targets)
        };

        source.transition_to(device, ResourceState::CopySource)?;
        let footprint = self.pitch.footprint(source.info().format, EFB_WIDTH, EFB_HEIGHT);
        device.copy_image_to_buffer(source.image(), self.staging.buffer_mut(), &footprint)?;

        // The CPU may not touch the buffer before the copy has landed
        device.execute_queued_work(true)?;

        targets.restore_as_active(device)?;
        device.restore_api_state()?;

        self.staging.buffer_mut().map()
    }

    /// Point-sample the live surface into the native-resolution intermediate
    fn draw_native_copy(&mut self, device: &mut dyn GraphicsDevice, targets: &mut EfbTargets) -> Result<()> {
        let (width, height) = targets.target_size();
        let multisampled = targets.is_multisampled();

        device.set_viewport(Viewport::full(EFB_WIDTH, EFB_HEIGHT))?;
        self.intermediate.transition_to(device, ResourceState::RenderTarget)?;
        device.bind_render_targets(&[self.intermediate.image()], None)?;

        let source = self.channel.source(targets);
        source.transition_to(device, ResourceState::PixelShaderResource)?;
        device.set_point_copy_sampler()?;
        device.draw_quad(&QuadDraw {
            source: source.image(),
            source_rect: Rect2D::sized(width, height),
            source_width: width,
            source_height: height,
            shader: self.channel.copy_shader(multisampled),
            gamma: 1.0,
            output_format: self.channel.intermediate_format(),
        })
    }
}

#[cfg(test)]
#[path = "readback_cache_tests.rs"]
mod tests;
