/// RenderSurface - one owned GPU image plus its last-known synchronization state
///
/// Every use of a surface (render target, shader read, resolve, copy) goes
/// through `transition_to` first. Higher layers never record barriers on the
/// images directly.
///
/// Dropping a surface does not destroy the image immediately: it is handed to
/// the device's `ReleaseQueue` and destroyed once the command batch that may
/// still reference it has completed.

use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::graphics_device::{
    GpuImage, GraphicsDevice, ImageDesc, ImageInfo, ReleaseQueue, ReleasedResource, ResourceState,
};
use crate::{efb_error, efb_trace};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a render surface, stable across moves and swaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An owned GPU image with tracked state
pub struct RenderSurface {
    image: ManuallyDrop<Box<dyn GpuImage>>,
    state: ResourceState,
    id: SurfaceId,
    release_queue: Arc<ReleaseQueue>,
}

impl RenderSurface {
    /// Allocate a new surface on `device`
    ///
    /// The surface starts in `ResourceState::Common`.
    pub fn create(device: &mut dyn GraphicsDevice, desc: &ImageDesc) -> Result<Self> {
        let image = device.create_image(desc).map_err(|e| {
            efb_error!("efb::RenderSurface", "Failed to create '{}' ({}x{}, {} samples, {} layers): {}",
                desc.name, desc.width, desc.height, desc.samples, desc.array_layers, e);
            e
        })?;

        Ok(Self {
            image: ManuallyDrop::new(image),
            state: ResourceState::Common,
            id: SurfaceId::next(),
            release_queue: device.release_queue(),
        })
    }

    /// Identity of this surface
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Backend image
    pub fn image(&self) -> &dyn GpuImage {
        &**self.image
    }

    /// Image properties (name, size, format, samples, layers)
    pub fn info(&self) -> &ImageInfo {
        self.image.info()
    }

    /// Last-known synchronization state
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Bring the surface into `state`, recording a transition if needed
    pub fn transition_to(&mut self, device: &mut dyn GraphicsDevice, state: ResourceState) -> Result<()> {
        if self.state == state {
            return Ok(());
        }

        device.transition(&**self.image, self.state, state)?;
        efb_trace!("efb::RenderSurface", "'{}' {:?} -> {:?}", self.info().name, self.state, state);
        self.state = state;
        Ok(())
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        // SAFETY: `image` is never accessed again after this point
        let image = unsafe { ManuallyDrop::take(&mut self.image) };
        self.release_queue.defer(ReleasedResource::Image(image));
    }
}

impl std::fmt::Debug for RenderSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSurface")
            .field("id", &self.id)
            .field("name", &self.info().name)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
#[path = "render_surface_tests.rs"]
mod tests;
