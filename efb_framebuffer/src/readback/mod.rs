/// CPU readback of the EFB - pitched views, staging buffers and the per-channel cache

pub mod row_pitch;
pub mod staging_buffer;
pub mod readback_cache;

pub use row_pitch::*;
pub use staging_buffer::*;
pub use readback_cache::*;
