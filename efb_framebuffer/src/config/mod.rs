/// Configuration module - framebuffer sizing, multisampling and stereo settings

pub mod framebuffer_config;

pub use framebuffer_config::*;
