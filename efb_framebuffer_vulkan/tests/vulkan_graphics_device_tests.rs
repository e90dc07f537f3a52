//! Integration tests for the Vulkan graphics device
//!
//! These tests create a real headless Vulkan device and drive the EFB
//! framebuffer manager through it. All tests require a GPU and are marked
//! with #[ignore].
//!
//! Run with: cargo test --test vulkan_graphics_device_tests -- --ignored

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use efb_framebuffer::efb::device::{
    CommandStream, GraphicsDevice, ImageDesc, ImageUsage, Rect2D, ResourceAllocator,
    SurfaceFormat,
};
use efb_framebuffer::efb::{
    FramebufferConfig, FramebufferManager, GuestMemory, RenderSurface, Result, SharedGraphicsDevice,
    StereoMode, XfbEncoder,
};
use efb_framebuffer_vulkan::efb_vulkan::{QuadPass, QuadRenderer, VulkanConfig, VulkanGraphicsDevice};

/// Counts copy quads without binding a pipeline
struct CountingQuadRenderer {
    draws: Arc<AtomicU32>,
}

impl QuadRenderer for CountingQuadRenderer {
    fn draw(&mut self, pass: &QuadPass<'_>) -> Result<()> {
        assert!(!pass.color_formats.is_empty());
        assert!(pass.target_layers >= 1);
        self.draws.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Leaves guest memory untouched
struct NullEncoder;

impl XfbEncoder for NullEncoder {
    fn encode(
        &mut self,
        _device: &mut dyn GraphicsDevice,
        _source: &RenderSurface,
        _destination: &mut [u8],
        _width: u32,
        _height: u32,
        _source_rect: Rect2D,
        _gamma: f32,
    ) -> Result<()> {
        Ok(())
    }
}

struct VecMemory(Vec<u8>);

impl GuestMemory for VecMemory {
    fn pointer(&mut self, address: u32, len: usize) -> Option<&mut [u8]> {
        let start = address as usize;
        self.0.get_mut(start..start.checked_add(len)?)
    }
}

fn create_device() -> (VulkanGraphicsDevice, Arc<AtomicU32>) {
    let draws = Arc::new(AtomicU32::new(0));
    let config = VulkanConfig { enable_validation: false, ..VulkanConfig::default() };
    let device = VulkanGraphicsDevice::new(
        &config,
        Box::new(CountingQuadRenderer { draws: draws.clone() }),
    )
    .unwrap();
    (device, draws)
}

fn create_manager(config: FramebufferConfig) -> (FramebufferManager, SharedGraphicsDevice, Arc<AtomicU32>) {
    let (device, draws) = create_device();
    let shared: SharedGraphicsDevice = Arc::new(Mutex::new(device));
    let manager = FramebufferManager::new(shared.clone(), config, Box::new(NullEncoder)).unwrap();
    (manager, shared, draws)
}

// ============================================================================
// RESOURCE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_create_multisampled_array_image() {
    let (mut device, _draws) = create_device();

    let image = device
        .create_image(&ImageDesc {
            name: "test color".to_string(),
            width: 320,
            height: 240,
            format: SurfaceFormat::R8G8B8A8_UNORM,
            samples: 4,
            array_layers: 2,
            usage: ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE | ImageUsage::TRANSFER,
            clear_value: None,
        })
        .unwrap();

    let info = image.info();
    assert_eq!((info.width, info.height), (320, 240));
    assert_eq!(info.samples, 4);
    assert_eq!(info.array_layers, 2);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_readback_buffer_maps_after_wait() {
    let (mut device, _draws) = create_device();

    let mut buffer = device.create_readback_buffer("test buffer", 4096).unwrap();
    assert_eq!(buffer.size(), 4096);
    assert!(buffer.mapped().is_none());

    device.execute_queued_work(true).unwrap();
    buffer.map().unwrap();
    assert_eq!(buffer.mapped().map(|b| b.len()), Some(4096));

    buffer.unmap();
    assert!(!buffer.is_mapped());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_empty_submissions() {
    let (mut device, _draws) = create_device();

    device.execute_queued_work(false).unwrap();
    device.execute_queued_work(false).unwrap();
    device.execute_queued_work(true).unwrap();
}

// ============================================================================
// FRAMEBUFFER MANAGER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_native_readback_copies_directly() {
    let (mut manager, _device, draws) = create_manager(FramebufferConfig::default());

    manager.cached_color(10, 10).unwrap();
    manager.cached_depth(639, 527).unwrap();

    assert_eq!(draws.load(Ordering::SeqCst), 0);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_set_then_get_cached_depth() {
    let (mut manager, _device, _draws) = create_manager(FramebufferConfig::default());

    manager.cached_depth(0, 0).unwrap();
    manager.set_cached_depth(4, 4, 0.5);

    assert_eq!(manager.cached_depth(4, 4).unwrap(), 0.5);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_scaled_msaa_readback_draws_native_copy() {
    let config = FramebufferConfig::scaled(2).with_multisamples(4);
    let (mut manager, _device, draws) = create_manager(config);

    manager.cached_color(100, 100).unwrap();
    manager.cached_color(101, 100).unwrap();
    assert_eq!(draws.load(Ordering::SeqCst), 1);

    manager.invalidate_cache();
    manager.cached_color(100, 100).unwrap();
    assert_eq!(draws.load(Ordering::SeqCst), 2);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_msaa_resolve_and_display_output() {
    let config = FramebufferConfig::default()
        .with_multisamples(4)
        .with_stereo_mode(StereoMode::SideBySide);
    let (mut manager, _device, _draws) = create_manager(config);

    let resolved = manager.resolved_color().unwrap();
    assert_eq!(resolved.info().samples, 1);
    assert_eq!(resolved.info().array_layers, 2);

    let mut memory = VecMemory(vec![0; 640 * 2 * 480]);
    manager
        .copy_to_display_output(&mut memory, 0, 640 * 2, 480, Rect2D::sized(640, 480), 1.0)
        .unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_xfb_source_copy() {
    let (mut manager, _device, draws) = create_manager(FramebufferConfig::scaled(2));

    let mut source = manager.create_display_source(640, 480, 1).unwrap();
    source.copy_from_efb(&mut manager, 2.2).unwrap();

    assert_eq!(draws.load(Ordering::SeqCst), 1);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_teardown_releases_everything() {
    let (manager, device, _draws) = create_manager(FramebufferConfig::scaled(2).with_multisamples(2));
    let queue = device.lock().unwrap().release_queue();

    drop(manager);
    assert!(queue.pending_count() > 0);

    device.lock().unwrap().execute_queued_work(true).unwrap();
    assert_eq!(queue.pending_count(), 0);
}
