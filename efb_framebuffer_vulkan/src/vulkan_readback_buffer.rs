/// VulkanReadbackBuffer - host-visible buffer receiving image-to-buffer copies

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;
use efb_framebuffer::efb::device::ReadbackBuffer;
use efb_framebuffer::efb::{Error, Result};
use efb_framebuffer::{efb_err, efb_error};

use crate::vulkan_context::GpuContext;

/// Vulkan readback buffer
///
/// gpu-allocator keeps host-visible memory persistently mapped. `map` makes
/// the GPU writes visible (invalidating non-coherent memory) and opens the
/// CPU window, `unmap` closes it.
pub struct VulkanReadbackBuffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    name: String,
    mapped: bool,
}

impl VulkanReadbackBuffer {
    pub fn create(ctx: &Arc<GpuContext>, name: &str, size: u64) -> Result<Self> {
        let device = &ctx.device;
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size.max(1))
                .usage(vk::BufferUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device.create_buffer(&buffer_info, None).map_err(|e| {
                efb_error!("efb::vulkan", "Failed to create buffer '{}': {:?}", name, e);
                Error::InitializationFailed(format!("create buffer '{}': {:?}", name, e))
            })?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name,
                        requirements,
                        location: MemoryLocation::GpuToCpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        efb_error!("efb::vulkan", "Out of host-visible memory for '{}' ({} bytes)", name, size);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            let created = Self {
                ctx: Arc::clone(ctx),
                buffer,
                allocation: Some(allocation),
                size,
                name: name.to_string(),
                mapped: false,
            };

            if let Some(allocation) = created.allocation.as_ref() {
                device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                    .map_err(|e| efb_err!("efb::vulkan", "Failed to bind memory of '{}': {:?}", name, e))?;
            }

            ctx.set_object_name(buffer, name);
            Ok(created)
        }
    }

    /// Make GPU writes to non-coherent memory visible to the CPU
    fn invalidate_host_range(&self, allocation: &Allocation) -> Result<()> {
        if allocation
            .memory_properties()
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT)
        {
            return Ok(());
        }

        let (offset, size) = invalidate_extent(
            allocation.offset(),
            allocation.size(),
            self.ctx.non_coherent_atom_size,
        );

        unsafe {
            let range = vk::MappedMemoryRange::default()
                .memory(allocation.memory())
                .offset(offset)
                .size(size);
            self.ctx
                .device
                .invalidate_mapped_memory_ranges(&[range])
                .map_err(|e| Error::MapFailed(format!("invalidate '{}': {:?}", self.name, e)))
        }
    }
}

/// Offset and size of the invalidation covering `[offset, offset + size)`
///
/// The offset is rounded down to `atom`. An end that is not atom-aligned may
/// lie in the last atom of the memory block, so the range then runs to the
/// end of the block (`vk::WHOLE_SIZE`) instead of past it.
pub(crate) fn invalidate_extent(offset: u64, size: u64, atom: u64) -> (u64, u64) {
    let atom = atom.max(1);
    let start = offset / atom * atom;
    let end = offset + size;
    if end % atom == 0 {
        (start, end - start)
    } else {
        (start, vk::WHOLE_SIZE)
    }
}

impl ReadbackBuffer for VulkanReadbackBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn map(&mut self) -> Result<()> {
        let Some(allocation) = self.allocation.as_ref() else {
            return Err(Error::MapFailed(format!("'{}' has no allocation", self.name)));
        };
        if allocation.mapped_ptr().is_none() {
            return Err(Error::MapFailed(format!("'{}' is not host-visible", self.name)));
        }
        self.invalidate_host_range(allocation)?;
        self.mapped = true;
        Ok(())
    }

    fn unmap(&mut self) {
        self.mapped = false;
    }

    fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn mapped(&self) -> Option<&[u8]> {
        if !self.mapped {
            return None;
        }
        let size = self.size as usize;
        self.allocation
            .as_ref()
            .and_then(|a| a.mapped_slice())
            .map(|bytes| &bytes[..size.min(bytes.len())])
    }

    fn mapped_mut(&mut self) -> Option<&mut [u8]> {
        if !self.mapped {
            return None;
        }
        let size = self.size as usize;
        self.allocation
            .as_mut()
            .and_then(|a| a.mapped_slice_mut())
            .map(|bytes| {
                let len = size.min(bytes.len());
                &mut bytes[..len]
            })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanReadbackBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_readback_buffer_tests.rs"]
mod tests;
