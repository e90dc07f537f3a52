/// VulkanGraphicsDevice - Vulkan implementation of the EFB graphics device traits
///
/// Headless: one graphics queue, dynamic rendering, and a ring of two command
/// batches. Each submitted batch is tagged with the release-queue batch id it
/// closed; resources released while it was recorded are dropped once its
/// fence has signaled.

use ash::vk;
use std::sync::Arc;
use efb_framebuffer::efb::device::{
    CommandRecorder, CommandStream, CopyFootprint, GpuImage, ImageDesc, QuadDraw, ReadbackBuffer,
    ReleaseQueue, ResourceAllocator, ResourceState, SurfaceFormat, Viewport, BatchId,
};
use efb_framebuffer::efb::{Error, Result};
use efb_framebuffer::{efb_bail, efb_debug, efb_err, efb_error, efb_trace};

use crate::quad_renderer::{QuadPass, QuadRenderer};
use crate::vulkan_config::VulkanConfig;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{sample_count_to_vk, surface_format_to_vk};
use crate::vulkan_image::VulkanImage;
use crate::vulkan_readback_buffer::VulkanReadbackBuffer;
use crate::vulkan_state::state_access;

/// Command batches that may be in flight at once
const BATCHES_IN_FLIGHT: usize = 2;

struct BatchSlot {
    command_buffer: vk::CommandBuffer,
    fence: vk::Fence,
    /// Release-queue batch submitted from this slot and not yet retired
    submitted: Option<BatchId>,
}

#[derive(Clone, Copy)]
struct Attachment {
    view: vk::ImageView,
    format: vk::Format,
}

/// Render targets recorded by `bind_render_targets`
struct BoundTargets {
    colors: Vec<Attachment>,
    color_formats: Vec<vk::Format>,
    depth: Option<Attachment>,
    extent: vk::Extent2D,
    layers: u32,
    samples: vk::SampleCountFlags,
}

/// Viewport set through the device, plus the copy taken by `save_api_state`
///
/// `None` means the full extent of the bound targets.
#[derive(Default)]
struct ViewportState {
    current: Option<vk::Viewport>,
    saved: Option<vk::Viewport>,
}

impl ViewportState {
    fn set(&mut self, viewport: vk::Viewport) {
        self.current = Some(viewport);
    }

    fn save(&mut self) {
        self.saved = self.current;
    }

    fn restore(&mut self) {
        self.current = self.saved;
    }

    fn effective(&self, extent: vk::Extent2D) -> vk::Viewport {
        self.current.unwrap_or(vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        })
    }
}

pub struct VulkanGraphicsDevice {
    quad_renderer: Box<dyn QuadRenderer>,
    command_pool: vk::CommandPool,
    batches: Vec<BatchSlot>,
    current: usize,
    /// A command buffer is open in the current slot
    recording: bool,
    /// `cmd_begin_rendering` is active on the open command buffer
    rendering: bool,
    bound: Option<BoundTargets>,
    viewport: ViewportState,
    point_sampler: vk::Sampler,
    linear_sampler: vk::Sampler,
    active_sampler: vk::Sampler,
    release_queue: Arc<ReleaseQueue>,
    /// Shared GPU context, kept alive by every image and buffer as well
    ctx: Arc<GpuContext>,
}

fn to_vk_viewport(viewport: Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

fn vk_image(image: &dyn GpuImage) -> Result<&VulkanImage> {
    image.as_any().downcast_ref::<VulkanImage>().ok_or_else(|| {
        efb_error!("efb::vulkan", "Image '{}' was not created by the Vulkan device", image.info().name);
        Error::InvalidResource(format!("'{}' is not a Vulkan image", image.info().name))
    })
}

fn vk_result(what: &str) -> impl Fn(vk::Result) -> Error + '_ {
    move |e| efb_err!("efb::vulkan", "Failed to {}: {:?}", what, e)
}

impl VulkanGraphicsDevice {
    /// Create a headless device with its own Vulkan context
    pub fn new(config: &VulkanConfig, quad_renderer: Box<dyn QuadRenderer>) -> Result<Self> {
        let ctx = Arc::new(GpuContext::new(config)?);
        Self::with_context(ctx, quad_renderer)
    }

    /// Create a device on an existing context
    pub fn with_context(ctx: Arc<GpuContext>, quad_renderer: Box<dyn QuadRenderer>) -> Result<Self> {
        let device = &ctx.device;
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
                efb_error!("efb::vulkan", "Failed to create command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(BATCHES_IN_FLIGHT as u32);
            let command_buffers = device.allocate_command_buffers(&allocate_info).map_err(|e| {
                efb_error!("efb::vulkan", "Failed to allocate command buffers: {:?}", e);
                Error::InitializationFailed(format!("Failed to allocate command buffers: {:?}", e))
            })?;

            // Signaled so the first wait on each slot returns immediately
            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let mut batches = Vec::with_capacity(BATCHES_IN_FLIGHT);
            for command_buffer in command_buffers {
                let fence = device.create_fence(&fence_info, None).map_err(|e| {
                    efb_error!("efb::vulkan", "Failed to create batch fence: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create fence: {:?}", e))
                })?;
                batches.push(BatchSlot { command_buffer, fence, submitted: None });
            }

            let point_sampler = Self::create_sampler(&ctx, vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST)?;
            let linear_sampler = Self::create_sampler(&ctx, vk::Filter::LINEAR, vk::SamplerMipmapMode::LINEAR)?;

            efb_debug!("efb::vulkan", "Graphics device ready ({} batches in flight)", BATCHES_IN_FLIGHT);

            Ok(Self {
                quad_renderer,
                command_pool,
                batches,
                current: 0,
                recording: false,
                rendering: false,
                bound: None,
                viewport: ViewportState::default(),
                point_sampler,
                linear_sampler,
                active_sampler: linear_sampler,
                release_queue: Arc::new(ReleaseQueue::new()),
                ctx,
            })
        }
    }

    fn create_sampler(ctx: &GpuContext, filter: vk::Filter, mipmap: vk::SamplerMipmapMode) -> Result<vk::Sampler> {
        let info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .max_lod(0.0);
        unsafe {
            ctx.device.create_sampler(&info, None).map_err(|e| {
                efb_error!("efb::vulkan", "Failed to create sampler: {:?}", e);
                Error::InitializationFailed(format!("Failed to create sampler: {:?}", e))
            })
        }
    }

    /// Shared GPU context
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    /// Command buffer currently being recorded (opens a batch if needed)
    ///
    /// The embedding renderer records its own EFB drawing here.
    pub fn command_buffer(&mut self) -> Result<vk::CommandBuffer> {
        if !self.recording {
            self.begin_batch()?;
        }
        Ok(self.batches[self.current].command_buffer)
    }

    /// Snapshot the active viewport so `restore_api_state` can reinstate it
    pub fn save_api_state(&mut self) {
        self.viewport.save();
    }

    /// Wait for the slot's previous submission, retire it and open its command buffer
    fn begin_batch(&mut self) -> Result<()> {
        let device = &self.ctx.device;
        let slot = &mut self.batches[self.current];
        unsafe {
            device
                .wait_for_fences(&[slot.fence], true, u64::MAX)
                .map_err(vk_result("wait for batch fence"))?;
            if let Some(batch) = slot.submitted.take() {
                self.release_queue.retire(batch);
            }

            device
                .reset_command_buffer(slot.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(vk_result("reset command buffer"))?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(slot.command_buffer, &begin_info)
                .map_err(vk_result("begin command buffer"))?;
        }
        self.recording = true;
        Ok(())
    }

    /// Open command buffer with no rendering scope active
    fn transfer_command_buffer(&mut self) -> Result<vk::CommandBuffer> {
        let command_buffer = self.command_buffer()?;
        self.end_rendering(command_buffer);
        Ok(command_buffer)
    }

    fn end_rendering(&mut self, command_buffer: vk::CommandBuffer) {
        if self.rendering {
            unsafe { self.ctx.device.cmd_end_rendering(command_buffer) };
            self.rendering = false;
        }
    }

    fn begin_rendering(&mut self, command_buffer: vk::CommandBuffer) -> Result<()> {
        let Some(bound) = self.bound.as_ref() else {
            efb_bail!("efb::vulkan", "Draw recorded with no render targets bound");
        };

        let color_attachments: Vec<vk::RenderingAttachmentInfo> = bound
            .colors
            .iter()
            .map(|target| {
                vk::RenderingAttachmentInfo::default()
                    .image_view(target.view)
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(vk::AttachmentLoadOp::LOAD)
                    .store_op(vk::AttachmentStoreOp::STORE)
            })
            .collect();
        let depth_attachment = bound.depth.map(|target| {
            vk::RenderingAttachmentInfo::default()
                .image_view(target.view)
                .image_layout(vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
        });

        let render_area = vk::Rect2D { offset: vk::Offset2D::default(), extent: bound.extent };
        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(bound.layers)
            .color_attachments(&color_attachments);
        if let Some(depth) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth);
        }

        let viewport = self.viewport.effective(bound.extent);

        unsafe {
            let device = &self.ctx.device;
            device.cmd_begin_rendering(command_buffer, &rendering_info);
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(command_buffer, 0, &[render_area]);
        }
        self.rendering = true;
        Ok(())
    }

    fn apply_viewport(&self, command_buffer: vk::CommandBuffer) {
        if let (true, Some(bound)) = (self.rendering, self.bound.as_ref()) {
            let viewport = self.viewport.effective(bound.extent);
            unsafe { self.ctx.device.cmd_set_viewport(command_buffer, 0, &[viewport]) };
        }
    }
}

// ===== RESOURCE ALLOCATION =====

impl ResourceAllocator for VulkanGraphicsDevice {
    fn create_image(&mut self, desc: &ImageDesc) -> Result<Box<dyn GpuImage>> {
        let image = VulkanImage::create(&self.ctx, desc)?;
        efb_trace!("efb::vulkan", "Created image '{}' ({}x{}, {} sample(s), {} layer(s))",
            desc.name, desc.width, desc.height, desc.samples, desc.array_layers);
        Ok(Box::new(image))
    }

    fn create_readback_buffer(&mut self, name: &str, size: u64) -> Result<Box<dyn ReadbackBuffer>> {
        let buffer = VulkanReadbackBuffer::create(&self.ctx, name, size)?;
        efb_trace!("efb::vulkan", "Created readback buffer '{}' ({} bytes)", name, size);
        Ok(Box::new(buffer))
    }
}

// ===== COMMAND RECORDING =====

impl CommandRecorder for VulkanGraphicsDevice {
    fn transition(&mut self, image: &dyn GpuImage, from: ResourceState, to: ResourceState) -> Result<()> {
        let image = vk_image(image)?;
        let command_buffer = self.transfer_command_buffer()?;
        let src = state_access(from);
        let dst = state_access(to);

        let barrier = vk::ImageMemoryBarrier::default()
            .src_access_mask(src.access)
            .dst_access_mask(dst.access)
            .old_layout(src.layout)
            .new_layout(dst.layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image.image)
            .subresource_range(image.full_range());

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                command_buffer,
                src.stage,
                dst.stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
        Ok(())
    }

    fn resolve_layer(
        &mut self,
        source: &dyn GpuImage,
        destination: &dyn GpuImage,
        layer: u32,
        format: SurfaceFormat,
    ) -> Result<()> {
        let source = vk_image(source)?;
        let destination = vk_image(destination)?;

        if format.is_depth() {
            efb_bail!("efb::vulkan", "Depth format {:?} cannot be resolved with a transfer resolve", format);
        }
        if layer >= source.info().array_layers || layer >= destination.info().array_layers {
            efb_bail!("efb::vulkan", "Resolve layer {} out of range for '{}' -> '{}'",
                layer, source.info().name, destination.info().name);
        }
        let vk_format = surface_format_to_vk(format);
        if source.format != vk_format || destination.format != vk_format {
            efb_bail!("efb::vulkan", "Resolve of '{}' -> '{}' as {:?} needs both images in that format",
                source.info().name, destination.info().name, format);
        }

        let command_buffer = self.transfer_command_buffer()?;
        let extent = source.extent();
        let region = vk::ImageResolve {
            src_subresource: source.layer(layer),
            src_offset: vk::Offset3D::default(),
            dst_subresource: destination.layer(layer),
            dst_offset: vk::Offset3D::default(),
            extent: vk::Extent3D { width: extent.width, height: extent.height, depth: 1 },
        };

        unsafe {
            self.ctx.device.cmd_resolve_image(
                command_buffer,
                source.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                destination.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }
        Ok(())
    }

    fn copy_image_to_buffer(
        &mut self,
        source: &dyn GpuImage,
        destination: &mut dyn ReadbackBuffer,
        footprint: &CopyFootprint,
    ) -> Result<()> {
        let source = vk_image(source)?;
        if footprint.byte_size() > destination.size() {
            efb_bail!("efb::vulkan", "Copy of {} bytes overflows a {} byte buffer",
                footprint.byte_size(), destination.size());
        }
        let Some(buffer) = destination.as_any_mut().downcast_mut::<VulkanReadbackBuffer>() else {
            efb_bail!("efb::vulkan", "Readback buffer was not created by the Vulkan device");
        };
        let buffer = buffer.buffer;

        let command_buffer = self.transfer_command_buffer()?;
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            // Expressed in texels, not bytes
            buffer_row_length: footprint.row_pitch / footprint.format.bytes_per_pixel(),
            buffer_image_height: 0,
            image_subresource: source.layer(0),
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D { width: footprint.width, height: footprint.height, depth: 1 },
        };

        unsafe {
            self.ctx.device.cmd_copy_image_to_buffer(
                command_buffer,
                source.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                buffer,
                &[region],
            );
        }
        Ok(())
    }

    fn bind_render_targets(&mut self, colors: &[&dyn GpuImage], depth: Option<&dyn GpuImage>) -> Result<()> {
        let colors = colors.iter().map(|c| vk_image(*c)).collect::<Result<Vec<_>>>()?;
        let depth = depth.map(vk_image).transpose()?;

        let Some(first) = colors.first().copied().or(depth) else {
            efb_bail!("efb::vulkan", "bind_render_targets called with no targets");
        };

        let bound = BoundTargets {
            colors: colors.iter().map(|c| Attachment { view: c.view, format: c.format }).collect(),
            color_formats: colors.iter().map(|c| c.format).collect(),
            depth: depth.map(|d| Attachment { view: d.view, format: d.format }),
            extent: first.extent(),
            layers: colors.iter().chain(depth.iter()).map(|i| i.info().array_layers).min().unwrap_or(1),
            samples: sample_count_to_vk(first.info().samples),
        };

        // New attachments need a new rendering scope
        if self.recording {
            let command_buffer = self.batches[self.current].command_buffer;
            self.end_rendering(command_buffer);
        }
        self.bound = Some(bound);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport.set(to_vk_viewport(viewport));
        if self.recording {
            self.apply_viewport(self.batches[self.current].command_buffer);
        }
        Ok(())
    }

    fn set_point_copy_sampler(&mut self) -> Result<()> {
        self.active_sampler = self.point_sampler;
        Ok(())
    }

    fn draw_quad(&mut self, draw: &QuadDraw<'_>) -> Result<()> {
        let source = vk_image(draw.source)?;
        let command_buffer = self.command_buffer()?;
        if !self.rendering {
            self.begin_rendering(command_buffer)?;
        }

        let Some(bound) = self.bound.as_ref() else {
            efb_bail!("efb::vulkan", "Draw recorded with no render targets bound");
        };
        let pass = QuadPass {
            device: &self.ctx.device,
            command_buffer,
            source_view: source.view,
            source_format: source.format,
            source_samples: sample_count_to_vk(source.info().samples),
            source_rect: draw.source_rect,
            source_size: (draw.source_width, draw.source_height),
            sampler: self.active_sampler,
            color_formats: &bound.color_formats,
            depth_format: bound.depth.map(|d| d.format),
            target_samples: bound.samples,
            target_layers: bound.layers,
            viewport: self.viewport.effective(bound.extent),
            shader: draw.shader,
            gamma: draw.gamma,
        };
        debug_assert_eq!(
            bound.color_formats.first().copied(),
            Some(surface_format_to_vk(draw.output_format)),
            "quad output format does not match the bound target"
        );

        self.quad_renderer.draw(&pass)
    }

    fn restore_api_state(&mut self) -> Result<()> {
        self.viewport.restore();
        self.active_sampler = self.linear_sampler;
        if self.recording {
            self.apply_viewport(self.batches[self.current].command_buffer);
        }
        Ok(())
    }
}

// ===== COMMAND STREAM =====

impl CommandStream for VulkanGraphicsDevice {
    fn execute_queued_work(&mut self, wait_for_completion: bool) -> Result<()> {
        let command_buffer = self.transfer_command_buffer()?;
        let device = &self.ctx.device;
        let slot = &mut self.batches[self.current];

        unsafe {
            device
                .end_command_buffer(command_buffer)
                .map_err(vk_result("end command buffer"))?;
            self.recording = false;

            device
                .reset_fences(&[slot.fence])
                .map_err(vk_result("reset batch fence"))?;
            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], slot.fence)
                .map_err(vk_result("submit commands to GPU queue"))?;

            let batch = self.release_queue.close_batch();
            slot.submitted = Some(batch);

            if wait_for_completion {
                device
                    .wait_for_fences(&[slot.fence], true, u64::MAX)
                    .map_err(vk_result("wait for batch fence"))?;
                slot.submitted = None;
                self.release_queue.retire(batch);
            }
            efb_trace!("efb::vulkan", "Submitted batch {} (wait={})", batch, wait_for_completion);
        }

        self.current = (self.current + 1) % BATCHES_IN_FLIGHT;
        Ok(())
    }

    fn cpu_access_notify(&mut self) {
        if self.recording {
            let command_buffer = self.batches[self.current].command_buffer;
            self.end_rendering(command_buffer);
        }
        efb_trace!("efb::vulkan", "CPU access to GPU-written memory requested");
    }

    fn release_queue(&self) -> Arc<ReleaseQueue> {
        self.release_queue.clone()
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            let device = &self.ctx.device;
            device.device_wait_idle().ok();

            // 1. Everything parked for in-flight batches is safe to free now
            let released = self.release_queue.drain_all();
            if released > 0 {
                efb_trace!("efb::vulkan", "Released {} pending resource(s) at teardown", released);
            }

            // 2. Embedding renderer's pipelines
            self.quad_renderer.destroy(device);

            // 3. Device-owned objects (command buffers are freed with their pool)
            device.destroy_sampler(self.point_sampler, None);
            device.destroy_sampler(self.linear_sampler, None);
            for slot in &self.batches {
                device.destroy_fence(slot.fence, None);
            }
            device.destroy_command_pool(self.command_pool, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_graphics_device_tests.rs"]
mod tests;
