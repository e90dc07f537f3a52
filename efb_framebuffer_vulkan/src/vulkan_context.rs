/// GpuContext - Vulkan instance, device and allocator shared by every Vulkan object
///
/// Images and buffers keep an `Arc<GpuContext>`, so the device outlives every
/// resource created from it, including resources still parked in a release
/// queue when the graphics device itself is dropped.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use efb_framebuffer::efb::{Error, Result};
use efb_framebuffer::{efb_err, efb_error, efb_info, efb_warn};

use crate::vulkan_config::VulkanConfig;

/// Debug utils loaders and messenger (present only when validation is active)
pub(crate) struct DebugUtils {
    instance_loader: ash::ext::debug_utils::Instance,
    device_loader: Option<ash::ext::debug_utils::Device>,
    messenger: vk::DebugUtilsMessengerEXT,
}

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Vulkan entry (keeps the loader library alive)
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    /// Vulkan logical device
    pub device: ash::Device,
    /// GPU memory allocator, dropped before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,
    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,
    /// Graphics queue family index
    pub graphics_queue_family: u32,
    /// `nonCoherentAtomSize` of the physical device
    pub non_coherent_atom_size: u64,
    debug_utils: Option<DebugUtils>,
}

fn init_error(what: &str, e: impl std::fmt::Debug) -> Error {
    efb_error!("efb::vulkan", "Failed to {}: {:?}", what, e);
    Error::InitializationFailed(format!("Failed to {}: {:?}", what, e))
}

impl GpuContext {
    /// Create a headless Vulkan 1.3 context with dynamic rendering enabled
    pub fn new(config: &VulkanConfig) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| init_error("load Vulkan library", e))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_error("encode application name", e))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"EFB Framebuffer")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let validation = Self::validation_requested(config);
            let extension_names = if validation {
                vec![ash::ext::debug_utils::NAME.as_ptr()]
            } else {
                vec![]
            };
            let layer_names = if validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error("create Vulkan instance", e))?;

            let mut debug_utils = if validation {
                Some(Self::create_messenger(&entry, &instance)?)
            } else {
                None
            };

            // Pick Physical Device (first one with a graphics queue)
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_error("enumerate physical devices", e))?;

            let (physical_device, graphics_queue_family) = physical_devices
                .into_iter()
                .find_map(|pd| {
                    instance
                        .get_physical_device_queue_family_properties(pd)
                        .iter()
                        .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
                        .map(|index| (pd, index as u32))
                })
                .ok_or_else(|| {
                    efb_error!("efb::vulkan", "No Vulkan GPU with a graphics queue found");
                    Error::InitializationFailed("No Vulkan GPU with a graphics queue found".to_string())
                })?;

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_queue_family)
                .queue_priorities(&queue_priorities)];

            let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default()
                .dynamic_rendering(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .push_next(&mut vulkan13_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_error("create logical device", e))?;

            let graphics_queue = device.get_device_queue(graphics_queue_family, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_error("create GPU allocator", e))?;

            if let Some(debug) = debug_utils.as_mut() {
                debug.device_loader = Some(ash::ext::debug_utils::Device::new(&instance, &device));
            }

            efb_info!("efb::vulkan", "Vulkan device '{}' ready (queue family {}, validation {})",
                device_name, graphics_queue_family, if validation { "on" } else { "off" });

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family,
                non_coherent_atom_size: properties.limits.non_coherent_atom_size.max(1),
                debug_utils,
            })
        }
    }

    #[cfg(feature = "vulkan-validation")]
    fn validation_requested(config: &VulkanConfig) -> bool {
        config.enable_validation
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn validation_requested(config: &VulkanConfig) -> bool {
        if config.enable_validation {
            efb_warn!("efb::vulkan",
                "Validation requested but the crate was built without the `vulkan-validation` feature");
        }
        false
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_messenger(entry: &ash::Entry, instance: &ash::Instance) -> Result<DebugUtils> {
        let instance_loader = ash::ext::debug_utils::Instance::new(entry, instance);
        crate::debug::init_debug_config();

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::messenger_severity_flags())
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = instance_loader
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| init_error("create debug messenger", e))?;

        Ok(DebugUtils { instance_loader, device_loader: None, messenger })
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_messenger(_entry: &ash::Entry, _instance: &ash::Instance) -> Result<DebugUtils> {
        Err(init_error("create debug messenger", "validation support not compiled in"))
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Whether validation messages are being routed into the logger
    pub fn validation_enabled(&self) -> bool {
        self.debug_utils.is_some()
    }

    /// Lock the memory allocator
    pub fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| efb_err!("efb::vulkan", "GPU allocator lock poisoned"))
    }

    /// Attach a debug name to a Vulkan object (no-op without validation)
    pub fn set_object_name<H: vk::Handle>(&self, handle: H, name: &str) {
        let Some(loader) = self.debug_utils.as_ref().and_then(|d| d.device_loader.as_ref()) else {
            return;
        };
        let Ok(name) = CString::new(name) else {
            return;
        };
        let info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(handle)
            .object_name(&name);
        unsafe {
            if let Err(e) = loader.set_debug_utils_object_name(&info) {
                efb_warn!("efb::vulkan", "Failed to name Vulkan object {:?}: {:?}", name, e);
            }
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Free VkDeviceMemory pages BEFORE destroying the device
            ManuallyDrop::drop(&mut self.allocator);

            // 2. Stop callbacks, then destroy the messenger BEFORE device and instance
            if let Some(debug) = self.debug_utils.take() {
                crate::debug::cleanup_debug_config();
                debug.instance_loader.destroy_debug_utils_messenger(debug.messenger, None);
            }

            // 3. Destroy device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
