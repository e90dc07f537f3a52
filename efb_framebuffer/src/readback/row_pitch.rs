/// Row pitch and typed views over a mapped, row-pitched region
///
/// A GPU-to-buffer copy writes rows at a fixed byte stride that is usually
/// larger than `width * bytes_per_pixel`. The views below do that stride math
/// in one place and bounds-check every access.

use std::marker::PhantomData;
use bytemuck::Pod;

use crate::config::ROW_PITCH_ALIGNMENT;
use crate::graphics_device::{CopyFootprint, SurfaceFormat};

/// Byte distance between the starts of two consecutive rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPitch(u32);

impl RowPitch {
    /// Smallest pitch holding `width` texels of `format` that satisfies the
    /// linear buffer copy alignment
    pub fn aligned(width: u32, format: SurfaceFormat) -> Self {
        let tight = width * format.bytes_per_pixel();
        Self(tight.div_ceil(ROW_PITCH_ALIGNMENT) * ROW_PITCH_ALIGNMENT)
    }

    /// Pitch in bytes
    pub fn bytes(&self) -> u32 {
        self.0
    }

    /// Buffer size needed for `rows` rows
    pub fn buffer_size(&self, rows: u32) -> u64 {
        self.0 as u64 * rows as u64
    }

    /// Copy layout for a `width x height` region of `format` at this pitch
    pub fn footprint(&self, format: SurfaceFormat, width: u32, height: u32) -> CopyFootprint {
        CopyFootprint {
            format,
            width,
            height,
            row_pitch: self.0,
        }
    }
}

/// Offset of texel `(x, y)`, panicking if it leaves the `width x height` region
fn texel_offset<T>(pitch: RowPitch, width: u32, height: u32, x: u32, y: u32) -> usize {
    assert!(x < width && y < height, "texel ({}, {}) outside {}x{}", x, y, width, height);
    y as usize * pitch.bytes() as usize + x as usize * std::mem::size_of::<T>()
}

/// Read-only typed view over a pitched region
pub struct PitchedView<'a, T: Pod> {
    bytes: &'a [u8],
    pitch: RowPitch,
    width: u32,
    height: u32,
    _texel: PhantomData<T>,
}

impl<'a, T: Pod> PitchedView<'a, T> {
    pub fn new(bytes: &'a [u8], pitch: RowPitch, width: u32, height: u32) -> Self {
        debug_assert!(pitch.bytes() as usize >= width as usize * std::mem::size_of::<T>());
        debug_assert!(bytes.len() as u64 >= pitch.buffer_size(height));
        Self { bytes, pitch, width, height, _texel: PhantomData }
    }

    /// Texel at `(x, y)`
    pub fn get(&self, x: u32, y: u32) -> T {
        let offset = texel_offset::<T>(self.pitch, self.width, self.height, x, y);
        bytemuck::pod_read_unaligned(&self.bytes[offset..offset + std::mem::size_of::<T>()])
    }
}

/// Mutable typed view over a pitched region
pub struct PitchedViewMut<'a, T: Pod> {
    bytes: &'a mut [u8],
    pitch: RowPitch,
    width: u32,
    height: u32,
    _texel: PhantomData<T>,
}

impl<'a, T: Pod> PitchedViewMut<'a, T> {
    pub fn new(bytes: &'a mut [u8], pitch: RowPitch, width: u32, height: u32) -> Self {
        debug_assert!(pitch.bytes() as usize >= width as usize * std::mem::size_of::<T>());
        debug_assert!(bytes.len() as u64 >= pitch.buffer_size(height));
        Self { bytes, pitch, width, height, _texel: PhantomData }
    }

    /// Texel at `(x, y)`
    pub fn get(&self, x: u32, y: u32) -> T {
        let offset = texel_offset::<T>(self.pitch, self.width, self.height, x, y);
        bytemuck::pod_read_unaligned(&self.bytes[offset..offset + std::mem::size_of::<T>()])
    }

    /// Overwrite the texel at `(x, y)`
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let offset = texel_offset::<T>(self.pitch, self.width, self.height, x, y);
        self.bytes[offset..offset + std::mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
    }
}

#[cfg(test)]
#[path = "row_pitch_tests.rs"]
mod tests;
