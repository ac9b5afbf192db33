//! Process-wide graphics context.
//!
//! [`GraphicsContext`] bundles the Vulkan objects that live for the whole run
//! of the application: the loader entry, the instance (with its debug
//! messenger), the selected GPU and the logical device with its graphics
//! queue. Windows, surfaces and swapchains borrow from it.
//!
//! # Resource Destruction Order
//!
//! 1. Wait for the device to become idle
//! 2. Destroy the logical device
//! 3. Destroy the debug messenger and the instance
//!
//! Swapchains and surfaces created from the context must be dropped first.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use ash::{Entry, vk};
use tracing::{error, info, warn};

use vkboot_core::AppConfig;

use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, select_physical_device};

/// Owner of the instance, the selected GPU and the logical device.
pub struct GraphicsContext {
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Logical device (destroyed before the instance).
    device: ManuallyDrop<Arc<Device>>,
    /// Capabilities of the selected GPU.
    device_info: PhysicalDeviceInfo,
    /// `VK_KHR_surface` function table.
    surface_loader: ash::khr::surface::Instance,
}

impl GraphicsContext {
    /// Creates the instance, selects a GPU and creates the logical device.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The Vulkan loader is missing
    /// - A required instance extension is unavailable
    /// - No GPU or no graphics-capable queue family exists
    /// - Device creation fails
    pub fn new(config: &AppConfig) -> Result<Self, RhiError> {
        info!("Initializing graphics context");

        let instance = Instance::new(&config.graphics, &config.diagnostics)?;

        // A failure past this point drops `instance`, which destroys it.
        let device_info = select_physical_device(instance.handle())?;
        let device = Device::new(&instance, &device_info)?;

        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        info!(
            "Graphics context ready: {} ({}), queue family {}",
            device_info.device_name(),
            device_info.device_type_name(),
            device_info.graphics_family
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            device: ManuallyDrop::new(device),
            device_info,
            surface_loader,
        })
    }

    /// Returns the Vulkan loader entry.
    #[inline]
    pub fn entry(&self) -> &Entry {
        self.instance.entry()
    }

    /// Returns the instance wrapper.
    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Returns the selected physical device handle.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.device_info.device
    }

    /// Returns the capabilities of the selected GPU.
    #[inline]
    pub fn device_info(&self) -> &PhysicalDeviceInfo {
        &self.device_info
    }

    /// Returns the logical device.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Returns the graphics queue.
    #[inline]
    pub fn queue(&self) -> vk::Queue {
        self.device.graphics_queue()
    }

    /// Returns the queue family the graphics queue belongs to.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.device.graphics_family()
    }

    /// Returns the `VK_KHR_surface` function table.
    #[inline]
    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!(
                "Failed to wait for device idle during context drop: {:?}",
                e
            );
        }

        let outstanding = Arc::strong_count(&self.device) - 1;
        if outstanding > 0 {
            warn!(
                "{} device reference(s) still alive while the graphics context is dropped",
                outstanding
            );
        }

        unsafe {
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Graphics context destroyed");
    }
}
