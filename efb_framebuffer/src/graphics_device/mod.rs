/// Graphics device module - the backend-facing traits and types the framebuffer core drives

pub mod format;
pub mod resource_state;
pub mod image;
pub mod readback_buffer;
pub mod command_recorder;
pub mod graphics_device;
pub mod release_queue;

pub use format::*;
pub use resource_state::*;
pub use image::*;
pub use readback_buffer::*;
pub use command_recorder::*;
pub use graphics_device::*;
pub use release_queue::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
