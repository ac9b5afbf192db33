//! RHI-specific error types.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// Failed to load Vulkan
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// The instance exposes no physical devices
    #[error("No Vulkan-capable GPU found")]
    NoPhysicalDevice,

    /// The selected GPU has no queue family with graphics support
    #[error("Selected GPU has no graphics-capable queue family")]
    NoGraphicsQueue,

    /// The graphics queue family cannot present to the window surface
    #[error("Queue family {family} cannot present to the window surface")]
    PresentationUnsupported {
        /// Queue family that was checked.
        family: u32,
    },

    /// The surface reports no supported formats
    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,

    /// A required instance or device extension is unavailable
    #[error("Required extension unavailable: {0}")]
    MissingExtension(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Swapchain error
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// Window system error
    #[error("Platform error: {0}")]
    PlatformError(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
