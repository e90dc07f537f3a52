/// VulkanImage - Vulkan implementation of the GpuImage trait

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;
use efb_framebuffer::efb::device::{GpuImage, ImageDesc, ImageInfo};
use efb_framebuffer::efb::{Error, Result};
use efb_framebuffer::{efb_err, efb_error};

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{aspect_mask, image_usage_to_vk, sample_count_to_vk, surface_format_to_vk};

/// Vulkan image with an all-layers view
pub struct VulkanImage {
    /// Shared GPU context (device, allocator)
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// View over every array layer (2D array when layered)
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    pub(crate) format: vk::Format,
    pub(crate) aspect: vk::ImageAspectFlags,
    info: ImageInfo,
}

impl VulkanImage {
    /// Create, allocate and bind a device-local image described by `desc`
    pub fn create(ctx: &Arc<GpuContext>, desc: &ImageDesc) -> Result<Self> {
        let info = ImageInfo::from(desc);
        let format = surface_format_to_vk(info.format);
        let aspect = aspect_mask(info.format);
        let device = &ctx.device;

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: info.width.max(1),
                    height: info.height.max(1),
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(info.array_layers)
                .samples(sample_count_to_vk(info.samples))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(image_usage_to_vk(info.usage, info.format))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device.create_image(&image_create_info, None).map_err(|e| {
                efb_error!("efb::vulkan", "Failed to create image '{}': {:?}", info.name, e);
                Error::InitializationFailed(format!("create image '{}': {:?}", info.name, e))
            })?;

            let requirements = device.get_image_memory_requirements(image);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: &info.name,
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        efb_error!("efb::vulkan",
                            "Out of GPU memory for '{}' ({}x{}, {} sample(s), {} layer(s), {:.2} MB)",
                            info.name, info.width, info.height, info.samples, info.array_layers, size_mb);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here on, Drop releases whatever was created
            let mut created = Self {
                ctx: Arc::clone(ctx),
                image,
                view: vk::ImageView::null(),
                allocation: Some(allocation),
                format,
                aspect,
                info,
            };

            if let Some(allocation) = created.allocation.as_ref() {
                device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| efb_err!("efb::vulkan", "Failed to bind memory of '{}': {:?}", created.info.name, e))?;
            }

            let view_type = if created.info.array_layers > 1 {
                vk::ImageViewType::TYPE_2D_ARRAY
            } else {
                vk::ImageViewType::TYPE_2D
            };
            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(view_type)
                .format(format)
                .subresource_range(created.full_range());

            created.view = device
                .create_image_view(&view_create_info, None)
                .map_err(|e| efb_err!("efb::vulkan", "Failed to create view of '{}': {:?}", created.info.name, e))?;

            ctx.set_object_name(image, &created.info.name);
            Ok(created)
        }
    }

    /// Subresource range covering every layer
    pub(crate) fn full_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: self.info.array_layers,
        }
    }

    /// Subresource layers for a single array layer
    pub(crate) fn layer(&self, layer: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: self.aspect,
            mip_level: 0,
            base_array_layer: layer,
            layer_count: 1,
        }
    }

    pub(crate) fn extent(&self) -> vk::Extent2D {
        vk::Extent2D { width: self.info.width, height: self.info.height }
    }
}

impl GpuImage for VulkanImage {
    fn info(&self) -> &ImageInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }

            // Don't panic if lock fails - the image must still be destroyed
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
