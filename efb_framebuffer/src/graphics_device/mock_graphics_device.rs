/// Mock graphics device for unit tests (no GPU required)
///
/// Records every command as a string, fills readback buffers with a
/// deterministic per-pixel pattern and supports failure injection.

use std::any::Any;
use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::efb_bail;
use crate::graphics_device::{
    CommandRecorder, CommandStream, CopyFootprint, GpuImage, ImageDesc, ImageInfo,
    QuadDraw, ReadbackBuffer, ReleaseQueue, ResourceAllocator, ResourceState,
    SurfaceFormat, Viewport, BatchId,
};

/// Color value the mock writes for pixel `(x, y)`
pub fn color_pattern(x: u32, y: u32) -> u32 {
    (y << 16) | x
}

/// Depth value the mock writes for pixel `(x, y)`
pub fn depth_pattern(x: u32, y: u32) -> f32 {
    (y * 1000 + x) as f32
}

// ============================================================================
// Mock Image
// ============================================================================

#[derive(Debug)]
pub struct MockImage {
    pub id: u64,
    pub info: ImageInfo,
}

impl GpuImage for MockImage {
    fn info(&self) -> &ImageInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Readback Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockReadbackBuffer {
    pub name: String,
    pub data: Vec<u8>,
    pub mapped: bool,
    pub fail_map: bool,
    pub map_count: u32,
}

impl MockReadbackBuffer {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            data: vec![0; size as usize],
            mapped: false,
            fail_map: false,
            map_count: 0,
        }
    }
}

impl ReadbackBuffer for MockReadbackBuffer {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn map(&mut self) -> Result<()> {
        if self.fail_map {
            return Err(Error::MapFailed(format!("{} (injected)", self.name)));
        }
        self.mapped = true;
        self.map_count += 1;
        Ok(())
    }

    fn unmap(&mut self) {
        self.mapped = false;
    }

    fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn mapped(&self) -> Option<&[u8]> {
        self.mapped.then_some(self.data.as_slice())
    }

    fn mapped_mut(&mut self) -> Option<&mut [u8]> {
        if self.mapped {
            Some(self.data.as_mut_slice())
        } else {
            None
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Mock Graphics Device
// ============================================================================

pub struct MockGraphicsDevice {
    /// Every recorded command, in order
    pub commands: Vec<String>,
    /// Images created so far (by name)
    pub created_images: Vec<String>,
    /// Readback buffers created so far (by name)
    pub created_buffers: Vec<String>,
    /// Fail `create_image` for the image with this debug name
    pub fail_image_named: Option<String>,
    /// Readback buffers created from now on fail to map
    pub fail_map: bool,
    /// Last viewport set
    pub viewport: Option<Viewport>,
    /// Names of the currently bound color targets and depth target
    pub bound_colors: Vec<String>,
    pub bound_depth: Option<String>,
    /// Number of submissions and of blocking waits
    pub executes: u32,
    pub waits: u32,
    /// Number of CPU access notifications
    pub cpu_access_notifies: u32,
    /// Last known state of each image as seen through `transition`
    pub image_states: FxHashMap<u64, ResourceState>,
    release_queue: Arc<ReleaseQueue>,
    next_image_id: u64,
    completed_batch: Option<BatchId>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            created_images: Vec::new(),
            created_buffers: Vec::new(),
            fail_image_named: None,
            fail_map: false,
            viewport: None,
            bound_colors: Vec::new(),
            bound_depth: None,
            executes: 0,
            waits: 0,
            cpu_access_notifies: 0,
            image_states: FxHashMap::default(),
            release_queue: Arc::new(ReleaseQueue::new()),
            next_image_id: 0,
            completed_batch: None,
        }
    }

    /// Number of recorded commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Forget recorded commands (keeps resources and counters)
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Last batch reported complete
    pub fn completed_batch(&self) -> Option<BatchId> {
        self.completed_batch
    }

    fn image_name(image: &dyn GpuImage) -> String {
        image.info().name.clone()
    }

    fn image_id(image: &dyn GpuImage) -> Result<u64> {
        match image.as_any().downcast_ref::<MockImage>() {
            Some(mock) => Ok(mock.id),
            None => efb_bail!("efb::mock", "Image '{}' was not created by the mock device", image.info().name),
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceAllocator for MockGraphicsDevice {
    fn create_image(&mut self, desc: &ImageDesc) -> Result<Box<dyn GpuImage>> {
        if self.fail_image_named.as_deref() == Some(desc.name.as_str()) {
            return Err(Error::InitializationFailed(format!("create {} (injected)", desc.name)));
        }
        let id = self.next_image_id;
        self.next_image_id += 1;
        self.created_images.push(desc.name.clone());
        self.image_states.insert(id, ResourceState::Common);
        Ok(Box::new(MockImage { id, info: ImageInfo::from(desc) }))
    }

    fn create_readback_buffer(&mut self, name: &str, size: u64) -> Result<Box<dyn ReadbackBuffer>> {
        self.created_buffers.push(name.to_string());
        let mut buffer = MockReadbackBuffer::new(name, size);
        buffer.fail_map = self.fail_map;
        Ok(Box::new(buffer))
    }
}

impl CommandRecorder for MockGraphicsDevice {
    fn transition(&mut self, image: &dyn GpuImage, from: ResourceState, to: ResourceState) -> Result<()> {
        let id = Self::image_id(image)?;
        let tracked = self.image_states.get(&id).copied().unwrap_or(ResourceState::Common);
        if tracked != from {
            efb_bail!("efb::mock", "Transition of '{}' from {:?} but device saw {:?}",
                image.info().name, from, tracked);
        }
        self.image_states.insert(id, to);
        self.commands.push(format!("transition {} {:?}->{:?}", Self::image_name(image), from, to));
        Ok(())
    }

    fn resolve_layer(
        &mut self,
        source: &dyn GpuImage,
        destination: &dyn GpuImage,
        layer: u32,
        format: SurfaceFormat,
    ) -> Result<()> {
        if layer >= source.info().array_layers {
            efb_bail!("efb::mock", "Resolve layer {} out of range", layer);
        }
        self.commands.push(format!(
            "resolve {}->{} layer {} {:?}",
            Self::image_name(source), Self::image_name(destination), layer, format
        ));
        Ok(())
    }

    fn copy_image_to_buffer(
        &mut self,
        source: &dyn GpuImage,
        destination: &mut dyn ReadbackBuffer,
        footprint: &CopyFootprint,
    ) -> Result<()> {
        if footprint.byte_size() > destination.size() {
            efb_bail!("efb::mock", "Copy of {} bytes overflows a {} byte buffer",
                footprint.byte_size(), destination.size());
        }
        let Some(buffer) = destination.as_any_mut().downcast_mut::<MockReadbackBuffer>() else {
            efb_bail!("efb::mock", "Readback buffer was not created by the mock device");
        };

        let bpp = footprint.format.bytes_per_pixel() as usize;
        for y in 0..footprint.height {
            for x in 0..footprint.width {
                let offset = y as usize * footprint.row_pitch as usize + x as usize * bpp;
                let bytes = match footprint.format {
                    SurfaceFormat::R8G8B8A8_UNORM => color_pattern(x, y).to_le_bytes(),
                    SurfaceFormat::R32_FLOAT | SurfaceFormat::D32_FLOAT => depth_pattern(x, y).to_le_bytes(),
                };
                buffer.data[offset..offset + bpp].copy_from_slice(&bytes);
            }
        }

        self.commands.push(format!(
            "copy {}->{} {}x{} pitch {}",
            Self::image_name(source), buffer.name, footprint.width, footprint.height, footprint.row_pitch
        ));
        Ok(())
    }

    fn bind_render_targets(&mut self, colors: &[&dyn GpuImage], depth: Option<&dyn GpuImage>) -> Result<()> {
        self.bound_colors = colors.iter().map(|c| Self::image_name(*c)).collect();
        self.bound_depth = depth.map(Self::image_name);
        self.commands.push(format!("bind {:?} depth={:?}", self.bound_colors, self.bound_depth));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = Some(viewport);
        self.commands.push(format!("viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_point_copy_sampler(&mut self) -> Result<()> {
        self.commands.push("point_sampler".to_string());
        Ok(())
    }

    fn draw_quad(&mut self, draw: &QuadDraw<'_>) -> Result<()> {
        self.commands.push(format!(
            "draw_quad {:?} from {} into {:?} gamma {}",
            draw.shader, Self::image_name(draw.source), self.bound_colors, draw.gamma
        ));
        Ok(())
    }

    fn restore_api_state(&mut self) -> Result<()> {
        self.commands.push("restore_api_state".to_string());
        Ok(())
    }
}

impl CommandStream for MockGraphicsDevice {
    fn execute_queued_work(&mut self, wait_for_completion: bool) -> Result<()> {
        let closed = self.release_queue.close_batch();
        self.executes += 1;
        if wait_for_completion {
            self.waits += 1;
            self.completed_batch = Some(closed);
            self.release_queue.retire(closed);
        }
        self.commands.push(format!("execute wait={}", wait_for_completion));
        Ok(())
    }

    fn cpu_access_notify(&mut self) {
        self.cpu_access_notifies += 1;
        self.commands.push("cpu_access_notify".to_string());
    }

    fn release_queue(&self) -> Arc<ReleaseQueue> {
        self.release_queue.clone()
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
