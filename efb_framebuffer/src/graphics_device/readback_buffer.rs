/// CPU-visible staging buffer trait

use std::any::Any;
use crate::error::Result;

/// Linear buffer in CPU-readable memory, the destination of GPU readback copies
///
/// The mapped region is only exposed as byte slices while mapped. A buffer
/// is either unmapped (`mapped()` returns `None`) or fully mapped.
pub trait ReadbackBuffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Map the buffer for CPU access
    ///
    /// Must only be called after the copies writing it have completed.
    fn map(&mut self) -> Result<()>;

    /// Unmap the buffer; a no-op if not mapped
    fn unmap(&mut self);

    /// Whether the buffer is currently mapped
    fn is_mapped(&self) -> bool;

    /// Mapped contents, or `None` when unmapped
    fn mapped(&self) -> Option<&[u8]>;

    /// Mutable mapped contents, or `None` when unmapped
    fn mapped_mut(&mut self) -> Option<&mut [u8]>;

    /// Backend downcast hook
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
