/// StagingBuffer - owned CPU-readable buffer released through the device's release queue

use std::mem::ManuallyDrop;
use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, ReadbackBuffer, ReleaseQueue, ReleasedResource};
use crate::efb_error;

pub struct StagingBuffer {
    buffer: ManuallyDrop<Box<dyn ReadbackBuffer>>,
    name: String,
    release_queue: Arc<ReleaseQueue>,
}

impl StagingBuffer {
    pub fn create(device: &mut dyn GraphicsDevice, name: &str, size: u64) -> Result<Self> {
        let buffer = device.create_readback_buffer(name, size).map_err(|e| {
            efb_error!("efb::ReadbackCache", "Failed to create '{}' ({} bytes): {}", name, size, e);
            e
        })?;

        Ok(Self {
            buffer: ManuallyDrop::new(buffer),
            name: name.to_string(),
            release_queue: device.release_queue(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> &dyn ReadbackBuffer {
        &**self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut dyn ReadbackBuffer {
        &mut **self.buffer
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        // SAFETY: `buffer` is never accessed again after this point
        let mut buffer = unsafe { ManuallyDrop::take(&mut self.buffer) };
        buffer.unmap();
        self.release_queue.defer(ReleasedResource::Buffer(buffer));
    }
}
