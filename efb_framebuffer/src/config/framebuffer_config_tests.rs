/// Tests for FramebufferConfig
///
/// These tests validate defaults, derived queries and validation.

use super::*;

// ============================================================================
// Tests: Defaults
// ============================================================================

#[test]
fn test_default_is_native_mono_single_sample() {
    let config = FramebufferConfig::default();
    assert_eq!(config.effective_target_size(), (EFB_WIDTH, EFB_HEIGHT));
    assert_eq!(config.sample_count(), 1);
    assert_eq!(config.layers(), 1);
    assert!(!config.is_multisampled());
    assert!(config.is_native_resolution());
}

#[test]
fn test_scaled_config() {
    let config = FramebufferConfig::scaled(3);
    assert_eq!(config.effective_target_size(), (1920, 1584));
    assert!(!config.is_native_resolution());

    // A zero scale falls back to native
    assert!(FramebufferConfig::scaled(0).is_native_resolution());
}

// ============================================================================
// Tests: Derived queries
// ============================================================================

#[test]
fn test_stereo_modes_use_two_layers() {
    assert_eq!(StereoMode::Off.layers(), 1);
    assert_eq!(StereoMode::SideBySide.layers(), 2);
    assert_eq!(StereoMode::TopAndBottom.layers(), 2);
    assert_eq!(StereoMode::Anaglyph.layers(), 2);

    let config = FramebufferConfig::default().with_stereo_mode(StereoMode::SideBySide);
    assert_eq!(config.layers(), 2);
}

#[test]
fn test_zero_dimensions_are_clamped() {
    let config = FramebufferConfig {
        target_width: 0,
        target_height: 0,
        ..FramebufferConfig::default()
    };
    assert_eq!(config.effective_target_size(), (1, 1));
}

#[test]
fn test_zero_samples_treated_as_one() {
    let config = FramebufferConfig::default().with_multisamples(0);
    assert_eq!(config.sample_count(), 1);
    assert!(!config.is_multisampled());
    assert!(config.validate().is_ok());
}

// ============================================================================
// Tests: Validation
// ============================================================================

#[test]
fn test_validate_accepts_power_of_two_samples() {
    for samples in [1, 2, 4, 8, 16, 32, 64] {
        let config = FramebufferConfig::default().with_multisamples(samples);
        assert!(config.validate().is_ok(), "samples = {}", samples);
    }
}

#[test]
fn test_validate_rejects_bad_sample_counts() {
    for samples in [3, 6, 128] {
        let config = FramebufferConfig::default().with_multisamples(samples);
        assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))), "samples = {}", samples);
    }
}
