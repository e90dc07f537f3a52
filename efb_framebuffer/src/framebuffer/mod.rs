/// EFB render targets, resolve strategy and the framebuffer manager

pub mod efb_targets;
pub mod resolve_strategy;
pub mod framebuffer_manager;

pub use efb_targets::*;
pub use resolve_strategy::*;
pub use framebuffer_manager::*;
