/// Surface pixel formats used by the EFB targets

/// Pixel format of a render surface or copy footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum SurfaceFormat {
    /// 8-bit RGBA, normalized (EFB color, resolve and display targets)
    R8G8B8A8_UNORM,
    /// 32-bit float single channel (resolved depth, depth readback)
    R32_FLOAT,
    /// 32-bit float depth attachment (primary EFB depth)
    D32_FLOAT,
}

impl SurfaceFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            SurfaceFormat::R8G8B8A8_UNORM => 4,
            SurfaceFormat::R32_FLOAT => 4,
            SurfaceFormat::D32_FLOAT => 4,
        }
    }

    /// Whether this is a depth attachment format
    pub fn is_depth(&self) -> bool {
        matches!(self, SurfaceFormat::D32_FLOAT)
    }
}
