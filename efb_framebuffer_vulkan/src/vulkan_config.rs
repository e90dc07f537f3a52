/// Vulkan backend configuration

/// Configuration of the headless Vulkan device
#[derive(Debug, Clone, PartialEq)]
pub struct VulkanConfig {
    /// Enable VK_LAYER_KHRONOS_validation and route its messages into the logger
    ///
    /// Only honored when the crate is built with the `vulkan-validation` feature.
    pub enable_validation: bool,
    /// Application name reported to the driver
    pub app_name: String,
    /// Application version reported to the driver (major, minor, patch)
    pub app_version: (u32, u32, u32),
}

impl Default for VulkanConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "EFB Framebuffer".to_string(),
            app_version: (0, 1, 0),
        }
    }
}
