//! Vulkan surface ownership.

use ash::vk;

/// RAII wrapper for a Vulkan surface.
///
/// This struct owns a `vk::SurfaceKHR` handle and ensures it is properly destroyed
/// when dropped. The surface loader is stored internally to perform cleanup.
///
/// # Ownership
/// The caller must ensure that the Vulkan instance outlives this surface, and
/// that any swapchain created for it is dropped first.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Takes ownership of a surface created from the instance behind `surface_loader`.
    pub(crate) fn from_raw(
        handle: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
    ) -> Self {
        Self {
            handle,
            surface_loader,
        }
    }

    /// Get the raw Vulkan surface handle.
    ///
    /// # Note
    /// The returned handle is valid only as long as this `Surface` instance exists.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: The handle was created by ash_window::create_surface from the
        // same instance as the loader, and is destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}
