//! Physical device (GPU) selection.
//!
//! This module handles GPU enumeration and graphics queue family selection.
//!
//! # Overview
//!
//! The selection process involves:
//! 1. Enumerating all available GPUs and logging each candidate
//! 2. Taking the first enumerated GPU
//! 3. Picking its first queue family with graphics support
//!
//! Taking the first GPU is a placeholder heuristic: it does not look at device
//! type, memory or surface support, so a machine whose first device is a
//! software rasterizer will end up rendering on it.
//!
//! # Example
//!
//! ```no_run
//! use vkboot_core::config::{DiagnosticsConfig, GraphicsConfig};
//! use vkboot_rhi::instance::Instance;
//! use vkboot_rhi::physical_device::select_physical_device;
//!
//! let instance = Instance::new(&GraphicsConfig::default(), &DiagnosticsConfig::default())
//!     .expect("Failed to create instance");
//!
//! let device_info = select_physical_device(instance.handle())
//!     .expect("Failed to select physical device");
//!
//! println!("Selected GPU: {:?}", device_info.device_name());
//! ```

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::RhiError;

/// Source of physical devices and their properties.
///
/// Implemented for [`ash::Instance`]; tests substitute a fake.
pub trait GpuEnumerator {
    /// Lists every physical device in enumeration order.
    fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, RhiError>;

    /// Returns the device properties (name, limits, versions).
    fn device_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties;

    /// Returns the supported device features.
    fn device_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;

    /// Returns the queue families of the device.
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
}

impl GpuEnumerator for ash::Instance {
    fn physical_devices(&self) -> Result<Vec<vk::PhysicalDevice>, RhiError> {
        Ok(unsafe { self.enumerate_physical_devices()? })
    }

    fn device_properties(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceProperties {
        unsafe { self.get_physical_device_properties(device) }
    }

    fn device_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        unsafe { self.get_physical_device_features(device) }
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe { self.get_physical_device_queue_family_properties(device) }
    }
}

/// Information about the selected physical device (GPU).
///
/// This is the capability snapshot the context hands out read-only.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API and driver version, etc.).
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features.
    pub features: vk::PhysicalDeviceFeatures,
    /// Index of the first queue family that supports graphics operations.
    pub graphics_family: u32,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        device_name(&self.properties)
    }

    /// Returns the device type (Discrete, Integrated, etc.).
    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.properties.device_type
    }

    /// Returns a human-readable string for the device type.
    pub fn device_type_name(&self) -> &'static str {
        device_type_name(self.properties.device_type)
    }

    /// Returns the Vulkan API version supported by the device.
    pub fn api_version(&self) -> (u32, u32, u32) {
        split_version(self.properties.api_version)
    }

    /// Returns the driver version, decoded with the Vulkan version layout.
    ///
    /// Vendors are free to pack this field differently, so treat it as a hint.
    pub fn driver_version(&self) -> (u32, u32, u32) {
        split_version(self.properties.driver_version)
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        let (d_major, d_minor, d_patch) = self.driver_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field(
                "driver_version",
                &format!("{}.{}.{}", d_major, d_minor, d_patch),
            )
            .field("graphics_family", &self.graphics_family)
            .finish()
    }
}

/// Selects the physical device and graphics queue family to use.
///
/// Every enumerated GPU is logged, then the first one is taken
/// unconditionally. Its first queue family advertising graphics support
/// becomes the graphics family.
///
/// # Errors
///
/// - [`RhiError::NoPhysicalDevice`] if the instance exposes no GPU.
/// - [`RhiError::NoGraphicsQueue`] if the first GPU has no graphics-capable
///   queue family.
pub fn select_physical_device(gpus: &impl GpuEnumerator) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = gpus.physical_devices()?;

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoPhysicalDevice);
    }

    info!("Found {} GPU(s)", devices.len());

    for &device in &devices {
        log_candidate(&gpus.device_properties(device));
    }

    // First enumerated device, regardless of type or capability
    let device = devices[0];
    let properties = gpus.device_properties(device);
    let features = gpus.device_features(device);

    let graphics_family = find_graphics_family(&gpus.queue_families(device)).ok_or_else(|| {
        warn!(
            "GPU '{}' exposes no graphics-capable queue family",
            device_name(&properties)
        );
        RhiError::NoGraphicsQueue
    })?;

    let selected = PhysicalDeviceInfo {
        device,
        properties,
        features,
        graphics_family,
    };

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}, graphics queue family {}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch,
        graphics_family
    );

    Ok(selected)
}

/// Returns the index of the first queue family with graphics support.
pub fn find_graphics_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|family| {
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|index| index as u32)
}

fn log_candidate(properties: &vk::PhysicalDeviceProperties) {
    let (major, minor, patch) = split_version(properties.api_version);
    let (d_major, d_minor, d_patch) = split_version(properties.driver_version);
    info!(
        "GPU '{}' ({}): Vulkan {}.{}.{}, driver {}.{}.{}",
        device_name(properties),
        device_type_name(properties.device_type),
        major,
        minor,
        patch,
        d_major,
        d_minor,
        d_patch
    );
    debug!("  vendor 0x{:04x}, device 0x{:04x}", properties.vendor_id, properties.device_id);
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> &str {
    unsafe {
        CStr::from_ptr(properties.device_name.as_ptr())
            .to_str()
            .unwrap_or("Unknown Device")
    }
}

fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

fn split_version(version: u32) -> (u32, u32, u32) {
    (
        vk::api_version_major(version),
        vk::api_version_minor(version),
        vk::api_version_patch(version),
    )
}
