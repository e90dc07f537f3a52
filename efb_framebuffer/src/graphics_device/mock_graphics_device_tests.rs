/// Unit tests for MockGraphicsDevice and associated mock types.
///
/// The framebuffer tests lean on the mock's bookkeeping, so it is checked here first.

use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    CommandRecorder, CommandStream, CopyFootprint, CopyShader, ImageDesc, ImageUsage,
    QuadDraw, ReadbackBuffer, Rect2D, ReleasedResource, ResourceAllocator, ResourceState,
    SurfaceFormat, Viewport, lock_device, SharedGraphicsDevice,
};
use crate::error::Error;
use std::sync::{Arc, Mutex};

fn color_desc(name: &str, samples: u32, layers: u32) -> ImageDesc {
    ImageDesc {
        name: name.to_string(),
        width: 16,
        height: 8,
        format: SurfaceFormat::R8G8B8A8_UNORM,
        samples,
        array_layers: layers,
        usage: ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE,
        clear_value: None,
    }
}

// ============================================================================
// Mock Readback Buffer Tests
// ============================================================================

#[test]
fn test_mock_buffer_unmapped_exposes_nothing() {
    let buffer = MockReadbackBuffer::new("staging", 32);
    assert_eq!(buffer.size(), 32);
    assert!(!buffer.is_mapped());
    assert!(buffer.mapped().is_none());
}

#[test]
fn test_mock_buffer_map_unmap() {
    let mut buffer = MockReadbackBuffer::new("staging", 32);
    buffer.map().unwrap();
    assert!(buffer.is_mapped());
    assert_eq!(buffer.mapped().unwrap().len(), 32);
    assert!(buffer.mapped_mut().is_some());

    buffer.unmap();
    assert!(!buffer.is_mapped());
    assert!(buffer.mapped_mut().is_none());
    assert_eq!(buffer.map_count, 1);
}

#[test]
fn test_mock_buffer_injected_map_failure() {
    let mut buffer = MockReadbackBuffer::new("staging", 32);
    buffer.fail_map = true;
    assert!(matches!(buffer.map(), Err(Error::MapFailed(_))));
    assert!(!buffer.is_mapped());
}

// ============================================================================
// Mock Device Tests
// ============================================================================

#[test]
fn test_create_image_records_name_and_info() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&color_desc("EFB color texture", 4, 2)).unwrap();

    assert_eq!(image.info().name, "EFB color texture");
    assert_eq!(image.info().samples, 4);
    assert_eq!(image.info().array_layers, 2);
    assert_eq!(device.created_images, vec!["EFB color texture".to_string()]);
}

#[test]
fn test_create_image_injected_failure() {
    let mut device = MockGraphicsDevice::new();
    device.fail_image_named = Some("broken".to_string());

    assert!(device.create_image(&color_desc("fine", 1, 1)).is_ok());
    assert!(matches!(
        device.create_image(&color_desc("broken", 1, 1)),
        Err(Error::InitializationFailed(_))
    ));
}

#[test]
fn test_transition_tracks_state() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&color_desc("img", 1, 1)).unwrap();

    device.transition(image.as_ref(), ResourceState::Common, ResourceState::RenderTarget).unwrap();
    device.transition(image.as_ref(), ResourceState::RenderTarget, ResourceState::CopySource).unwrap();

    assert_eq!(device.count("transition"), 2);
    assert_eq!(device.commands[1], "transition img RenderTarget->CopySource");
}

#[test]
fn test_transition_from_wrong_state_fails() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&color_desc("img", 1, 1)).unwrap();

    let result = device.transition(image.as_ref(), ResourceState::RenderTarget, ResourceState::CopySource);
    assert!(result.is_err());
}

#[test]
fn test_resolve_layer_out_of_range_fails() {
    let mut device = MockGraphicsDevice::new();
    let src = device.create_image(&color_desc("msaa", 4, 1)).unwrap();
    let dst = device.create_image(&color_desc("resolved", 1, 1)).unwrap();

    assert!(device.resolve_layer(src.as_ref(), dst.as_ref(), 0, SurfaceFormat::R8G8B8A8_UNORM).is_ok());
    assert!(device.resolve_layer(src.as_ref(), dst.as_ref(), 1, SurfaceFormat::R8G8B8A8_UNORM).is_err());
}

#[test]
fn test_copy_fills_color_pattern_at_pitch() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&color_desc("src", 1, 1)).unwrap();
    let mut buffer = device.create_readback_buffer("dst", 256 * 8).unwrap();
    let footprint = CopyFootprint {
        format: SurfaceFormat::R8G8B8A8_UNORM,
        width: 16,
        height: 8,
        row_pitch: 256,
    };

    device.copy_image_to_buffer(image.as_ref(), buffer.as_mut(), &footprint).unwrap();
    buffer.map().unwrap();
    let bytes = buffer.mapped().unwrap();

    let offset = 3 * 256 + 5 * 4;
    let texel = u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]);
    assert_eq!(texel, color_pattern(5, 3));
    assert_eq!(device.commands.last().unwrap(), "copy src->dst 16x8 pitch 256");
}

#[test]
fn test_copy_rejects_undersized_buffer() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&color_desc("src", 1, 1)).unwrap();
    let mut buffer = device.create_readback_buffer("dst", 64).unwrap();
    let footprint = CopyFootprint {
        format: SurfaceFormat::R32_FLOAT,
        width: 16,
        height: 8,
        row_pitch: 256,
    };

    assert!(device.copy_image_to_buffer(image.as_ref(), buffer.as_mut(), &footprint).is_err());
}

#[test]
fn test_bind_viewport_draw_record_commands() {
    let mut device = MockGraphicsDevice::new();
    let target = device.create_image(&color_desc("target", 1, 1)).unwrap();
    let source = device.create_image(&color_desc("source", 1, 1)).unwrap();

    device.bind_render_targets(&[target.as_ref()], None).unwrap();
    device.set_viewport(Viewport::full(16, 8)).unwrap();
    device.set_point_copy_sampler().unwrap();
    device.draw_quad(&QuadDraw {
        source: source.as_ref(),
        source_rect: Rect2D::sized(16, 8),
        source_width: 16,
        source_height: 8,
        shader: CopyShader::ColorCopy { multisampled: false },
        gamma: 1.0,
        output_format: SurfaceFormat::R8G8B8A8_UNORM,
    }).unwrap();
    device.restore_api_state().unwrap();

    assert_eq!(device.bound_colors, vec!["target".to_string()]);
    assert!(device.bound_depth.is_none());
    assert_eq!(device.viewport.unwrap().width, 16.0);
    assert_eq!(device.count("draw_quad"), 1);
    assert_eq!(device.commands.last().unwrap(), "restore_api_state");
}

#[test]
fn test_execute_with_wait_retires_deferred_resources() {
    let mut device = MockGraphicsDevice::new();
    let image = device.create_image(&color_desc("old", 1, 1)).unwrap();
    let queue = device.release_queue();
    queue.defer(ReleasedResource::Image(image));

    device.execute_queued_work(false).unwrap();
    assert_eq!(queue.pending_count(), 1);
    assert_eq!(device.completed_batch(), None);

    device.execute_queued_work(true).unwrap();
    assert_eq!(queue.pending_count(), 0);
    assert_eq!(device.executes, 2);
    assert_eq!(device.waits, 1);
    assert_eq!(device.completed_batch(), Some(1));
}

#[test]
fn test_cpu_access_notify_counts() {
    let mut device = MockGraphicsDevice::new();
    device.cpu_access_notify();
    assert_eq!(device.cpu_access_notifies, 1);
    assert_eq!(device.commands, vec!["cpu_access_notify".to_string()]);
}

#[test]
fn test_depth_pattern_values() {
    assert_eq!(depth_pattern(0, 0), 0.0);
    assert_eq!(depth_pattern(7, 2), 2007.0);
}

// ============================================================================
// Shared Device Lock Tests
// ============================================================================

#[test]
fn test_lock_shared_device_records_through_guard() {
    let shared: SharedGraphicsDevice = Arc::new(Mutex::new(MockGraphicsDevice::new()));
    {
        let mut guard = lock_device(&shared).unwrap();
        guard.cpu_access_notify();
    }
    let guard = lock_device(&shared).unwrap();
    assert_eq!(guard.release_queue().pending_count(), 0);
}

#[test]
fn test_lock_poisoned_device_is_backend_error() {
    let shared: SharedGraphicsDevice = Arc::new(Mutex::new(MockGraphicsDevice::new()));
    let poisoner = shared.clone();
    let _ = std::thread::spawn(move || {
        let _guard = poisoner.lock().unwrap();
        panic!("poison the device lock");
    })
    .join();

    match lock_device(&shared) {
        Err(Error::BackendError(msg)) => assert!(msg.contains("poisoned")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("poisoned lock must not be handed out"),
    };
}
