/// Collaborators of the display output path

use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Rect2D};
use crate::surface::RenderSurface;

/// Accessor for the emulated system's addressable memory
pub trait GuestMemory {
    /// Writable view of `len` bytes starting at guest `address`
    ///
    /// Returns `None` if any part of the range is not mapped.
    fn pointer(&mut self, address: u32, len: usize) -> Option<&mut [u8]>;
}

/// Encodes a resolved EFB color surface into guest XFB memory (YUYV)
///
/// The pixel encoding itself lives outside this crate.
pub trait XfbEncoder: Send {
    /// Encode `source_rect` of `source` into `destination`
    ///
    /// `width` is in XFB pixels (two bytes each), `destination` is
    /// `width * 2 * height` bytes. `source` is in `PixelShaderResource`.
    #[allow(clippy::too_many_arguments)]
    fn encode(
        &mut self,
        device: &mut dyn GraphicsDevice,
        source: &RenderSurface,
        destination: &mut [u8],
        width: u32,
        height: u32,
        source_rect: Rect2D,
        gamma: f32,
    ) -> Result<()>;
}
