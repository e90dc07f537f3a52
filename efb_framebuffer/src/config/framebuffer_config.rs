/// Framebuffer configuration and native EFB constants

use crate::error::{Error, Result};
use crate::efb_error;

/// Native EFB width in pixels
pub const EFB_WIDTH: u32 = 640;

/// Native EFB height in pixels
pub const EFB_HEIGHT: u32 = 528;

/// Row pitch alignment (bytes) required for linear image-to-buffer copies
pub const ROW_PITCH_ALIGNMENT: u32 = 256;

/// Highest multisample count accepted by `FramebufferConfig::validate`
pub const MAX_MULTISAMPLES: u32 = 64;

/// Stereoscopic rendering mode
///
/// Every mode other than `Off` renders two array layers (left/right eye).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StereoMode {
    /// Mono rendering, one layer
    #[default]
    Off,
    /// Left/right halves side by side
    SideBySide,
    /// Left/right halves stacked vertically
    TopAndBottom,
    /// Red/cyan anaglyph
    Anaglyph,
}

impl StereoMode {
    /// Number of array layers rendered per surface
    pub fn layers(&self) -> u32 {
        match self {
            StereoMode::Off => 1,
            _ => 2,
        }
    }
}

/// Framebuffer manager configuration
///
/// Supplied once at construction. Changing any field requires building a new
/// `FramebufferManager`.
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferConfig {
    /// Internal render width (native width times the internal resolution scale)
    pub target_width: u32,
    /// Internal render height
    pub target_height: u32,
    /// Multisample count of the primary color/depth targets (1 = no MSAA)
    pub multisamples: u32,
    /// Stereo mode (determines layer count)
    pub stereo_mode: StereoMode,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            target_width: EFB_WIDTH,
            target_height: EFB_HEIGHT,
            multisamples: 1,
            stereo_mode: StereoMode::Off,
        }
    }
}

impl FramebufferConfig {
    /// Configuration rendering at an integral multiple of the native resolution
    pub fn scaled(scale: u32) -> Self {
        let scale = scale.max(1);
        Self {
            target_width: EFB_WIDTH * scale,
            target_height: EFB_HEIGHT * scale,
            ..Self::default()
        }
    }

    /// Set the multisample count
    pub fn with_multisamples(mut self, multisamples: u32) -> Self {
        self.multisamples = multisamples;
        self
    }

    /// Set the stereo mode
    pub fn with_stereo_mode(mut self, stereo_mode: StereoMode) -> Self {
        self.stereo_mode = stereo_mode;
        self
    }

    /// Target size with each dimension clamped to at least one pixel
    pub fn effective_target_size(&self) -> (u32, u32) {
        (self.target_width.max(1), self.target_height.max(1))
    }

    /// Effective sample count (0 is treated as 1)
    pub fn sample_count(&self) -> u32 {
        self.multisamples.max(1)
    }

    /// Array layers per surface (1 mono, 2 stereo)
    pub fn layers(&self) -> u32 {
        self.stereo_mode.layers()
    }

    /// Whether the primary targets are multisampled
    pub fn is_multisampled(&self) -> bool {
        self.sample_count() > 1
    }

    /// Whether the render target matches the native EFB resolution
    pub fn is_native_resolution(&self) -> bool {
        self.effective_target_size() == (EFB_WIDTH, EFB_HEIGHT)
    }

    /// Check the configuration before any GPU resource is created
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the sample count is not a power of two
    /// in `1..=MAX_MULTISAMPLES`.
    pub fn validate(&self) -> Result<()> {
        let samples = self.sample_count();
        if !samples.is_power_of_two() || samples > MAX_MULTISAMPLES {
            efb_error!("efb::FramebufferConfig",
                "Unsupported multisample count {} (expected a power of two up to {})",
                samples, MAX_MULTISAMPLES);
            return Err(Error::InitializationFailed(format!(
                "unsupported multisample count {}", samples
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "framebuffer_config_tests.rs"]
mod tests;
