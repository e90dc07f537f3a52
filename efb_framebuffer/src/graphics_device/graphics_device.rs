/// GraphicsDevice - the collaborators the framebuffer core issues work against

use std::sync::{Arc, Mutex, MutexGuard};
use crate::error::Result;
use crate::efb_err;
use crate::graphics_device::{CommandRecorder, GpuImage, ImageDesc, ReadbackBuffer, ReleaseQueue};

/// Device resource allocator
pub trait ResourceAllocator {
    /// Create a 2D (array) image
    fn create_image(&mut self, desc: &ImageDesc) -> Result<Box<dyn GpuImage>>;

    /// Create a linear CPU-readable buffer of `size` bytes, initially unmapped
    fn create_readback_buffer(&mut self, name: &str, size: u64) -> Result<Box<dyn ReadbackBuffer>>;
}

/// Command-stream controller
pub trait CommandStream {
    /// Submit everything recorded so far
    ///
    /// When `wait_for_completion` is true, block until the GPU has finished it,
    /// so the CPU may read what the submitted commands wrote.
    fn execute_queued_work(&mut self, wait_for_completion: bool) -> Result<()>;

    /// Notify the stream that the CPU is about to read GPU-written memory
    fn cpu_access_notify(&mut self);

    /// Queue that holds released resources until their command batch completes
    fn release_queue(&self) -> Arc<ReleaseQueue>;
}

/// Everything the framebuffer core needs from a graphics backend
pub trait GraphicsDevice: ResourceAllocator + CommandRecorder + CommandStream + Send {}

impl<T: ResourceAllocator + CommandRecorder + CommandStream + Send> GraphicsDevice for T {}

/// Shared handle to the device also used by the rest of the renderer
pub type SharedGraphicsDevice = Arc<Mutex<dyn GraphicsDevice>>;

/// Lock the shared device, mapping a poisoned lock to `BackendError`
pub fn lock_device<'a>(
    device: &'a Mutex<dyn GraphicsDevice + 'static>,
) -> Result<MutexGuard<'a, dyn GraphicsDevice + 'static>> {
    device
        .lock()
        .map_err(|_| efb_err!("efb::GraphicsDevice", "Graphics device lock poisoned"))
}
