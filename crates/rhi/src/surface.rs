//! Surface capability queries.
//!
//! [`SurfaceSupport`] is the seam between swapchain negotiation and the
//! driver. The real implementation forwards to `VK_KHR_surface`; tests feed
//! canned capabilities through a fake.

use ash::vk;
use tracing::{debug, warn};

use crate::error::RhiError;

/// Queries a physical device's support for a surface.
pub trait SurfaceSupport {
    /// Whether `queue_family` of `device` can present to `surface`.
    fn present_support(
        &self,
        device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, RhiError>;

    /// Image count bounds, extents and transforms of the surface.
    fn capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, RhiError>;

    /// Supported format and color space pairs, in driver order.
    fn formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, RhiError>;

    /// Supported present modes, in driver order.
    fn present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, RhiError>;
}

impl SurfaceSupport for ash::khr::surface::Instance {
    fn present_support(
        &self,
        device: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> Result<bool, RhiError> {
        Ok(unsafe { self.get_physical_device_surface_support(device, queue_family, surface)? })
    }

    fn capabilities(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, RhiError> {
        Ok(unsafe { self.get_physical_device_surface_capabilities(device, surface)? })
    }

    fn formats(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, RhiError> {
        Ok(unsafe { self.get_physical_device_surface_formats(device, surface)? })
    }

    fn present_modes(
        &self,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, RhiError> {
        Ok(unsafe { self.get_physical_device_surface_present_modes(device, surface)? })
    }
}

/// Checks that `queue_family` can present to `surface`.
///
/// Device and queue family are chosen before any window exists, so this is
/// the first point where presentation can be verified. There is no fallback
/// selection: an unsupported pair is reported as an error.
///
/// # Errors
///
/// Returns [`RhiError::PresentationUnsupported`] if the family cannot present,
/// or the query error itself.
pub fn verify_present_support(
    support: &impl SurfaceSupport,
    device: vk::PhysicalDevice,
    queue_family: u32,
    surface: vk::SurfaceKHR,
) -> Result<(), RhiError> {
    if support.present_support(device, queue_family, surface)? {
        debug!("Queue family {} supports presentation", queue_family);
        Ok(())
    } else {
        warn!("Queue family {} cannot present to the surface", queue_family);
        Err(RhiError::PresentationUnsupported {
            family: queue_family,
        })
    }
}
