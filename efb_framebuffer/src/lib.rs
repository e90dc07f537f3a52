/*!
# EFB Framebuffer

Backend-agnostic management of an emulated GPU's embedded framebuffer (EFB).

The crate owns the EFB color/depth render targets, resolves them on demand
when multisampled, keeps a CPU-readable native-resolution snapshot of each for
pixel peeks, and feeds the external framebuffer (XFB) display path.

## Architecture

- **GraphicsDevice**: the collaborator traits a backend implements
  (`ResourceAllocator`, `CommandRecorder`, `CommandStream`)
- **RenderSurface**: one GPU image with its tracked synchronization state
- **ReadbackCache**: per-channel CPU snapshot (populate / set / invalidate)
- **FramebufferManager**: EFB targets, resolve strategy and both caches
- **XfbSource**: display texture receiving a gamma-corrected EFB copy

Backend implementations (see `efb_framebuffer_vulkan`) provide concrete types
for the device traits.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod surface;
pub mod readback;
pub mod framebuffer;
pub mod xfb;

// Main efb namespace module
pub mod efb {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration and native EFB constants
    pub use crate::config::*;

    // Framebuffer owner and its building blocks
    pub use crate::framebuffer::{EfbTargets, FramebufferManager, ResolveStrategy};
    pub use crate::readback::{CacheState, ColorCache, DepthCache, ReadbackCache, ReadbackChannel, RowPitch};
    pub use crate::surface::{RenderSurface, SurfaceId};
    pub use crate::xfb::{GuestMemory, XfbEncoder, XfbSource};

    // Device traits, re-exported flat for the common case
    pub use crate::graphics_device::{GraphicsDevice, SharedGraphicsDevice};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{set_logger, reset_logger, Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Everything a backend implements against
    pub mod device {
        pub use crate::graphics_device::*;
    }
}
