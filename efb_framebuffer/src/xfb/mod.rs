/// External framebuffer (XFB) output - display sources and the encoder collaborators

pub mod xfb_encoder;
pub mod xfb_source;

pub use xfb_encoder::*;
pub use xfb_source::*;
