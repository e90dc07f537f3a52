/// Render surfaces - GPU images with tracked synchronization state

pub mod render_surface;

pub use render_surface::*;
