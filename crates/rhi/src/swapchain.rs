//! Swapchain negotiation and creation.
//!
//! This module picks swapchain parameters from what a surface reports and
//! creates the VkSwapchainKHR together with its presentable images.
//!
//! # Overview
//!
//! Negotiation ([`SwapchainConfig::negotiate`]) is a pure function of the
//! queried [`SwapchainSupportDetails`] and the requested window size:
//! - Image count: one more than the minimum, capped by the maximum if any
//! - Format: the first reported pair, or B8G8R8A8_UNORM / SRGB_NONLINEAR when
//!   the surface leaves the format open
//! - Extent: the surface's current extent, or the requested size when the
//!   surface lets the swapchain decide
//! - Present mode: MAILBOX when available, FIFO otherwise
//!
//! Composite alpha, pre-transform and sharing mode are fixed to opaque,
//! identity and exclusive.
//!
//! A [`SwapchainConfig`] is only meaningful for the surface and device it was
//! negotiated against; swapchain recreation on resize is not implemented.
//!
//! # Example
//!
//! ```no_run
//! use vkboot_core::AppConfig;
//! use vkboot_rhi::GraphicsContext;
//! use vkboot_rhi::swapchain::{Swapchain, SwapchainConfig, SwapchainSupportDetails};
//! use ash::vk;
//!
//! let context = GraphicsContext::new(&AppConfig::default()).expect("Failed to create context");
//! // ... create a surface for a window ...
//! let surface: vk::SurfaceKHR = vk::SurfaceKHR::null(); // placeholder
//!
//! let support = SwapchainSupportDetails::query(
//!     context.surface_loader(),
//!     context.physical_device(),
//!     surface,
//! )
//! .expect("Failed to query surface support");
//! let config = SwapchainConfig::negotiate(&support, vk::Extent2D { width: 800, height: 600 })
//!     .expect("Surface reports no formats");
//!
//! let swapchain = Swapchain::new(&context, surface, &config).expect("Failed to create swapchain");
//! println!("{} images", swapchain.image_count());
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::context::GraphicsContext;
use crate::device::Device;
use crate::error::RhiError;
use crate::surface::SurfaceSupport;

/// Format used when the surface reports `VK_FORMAT_UNDEFINED`, meaning any
/// format is acceptable.
pub const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Swapchain surface support details.
///
/// Contains information about what the surface supports for swapchain creation.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms, etc.)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes (FIFO, MAILBOX, IMMEDIATE, etc.)
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the queries fail.
    pub fn query(
        support: &impl SurfaceSupport,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self, RhiError> {
        let capabilities = support.capabilities(physical_device, surface)?;
        let formats = support.formats(physical_device, surface)?;
        let present_modes = support.present_modes(physical_device, surface)?;

        debug!(
            "Swapchain support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }
}

/// Negotiated swapchain parameters.
#[derive(Debug, Clone, Copy)]
pub struct SwapchainConfig {
    /// Minimum number of images requested from the driver.
    pub image_count: u32,
    /// Image format and color space.
    pub surface_format: vk::SurfaceFormatKHR,
    /// Presentation policy.
    pub present_mode: vk::PresentModeKHR,
    /// Image size in pixels.
    pub extent: vk::Extent2D,
}

impl SwapchainConfig {
    /// Derives swapchain parameters from the surface support details.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::NoSurfaceFormat`] if the surface reports no formats.
    pub fn negotiate(
        support: &SwapchainSupportDetails,
        requested_extent: vk::Extent2D,
    ) -> Result<Self, RhiError> {
        if !support
            .capabilities
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            warn!(
                "Surface does not list IDENTITY among supported transforms ({:?})",
                support.capabilities.supported_transforms
            );
        }

        let config = Self {
            image_count: determine_image_count(&support.capabilities),
            surface_format: choose_surface_format(&support.formats)?,
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(&support.capabilities, requested_extent),
        };

        info!(
            "Negotiated swapchain: {}x{}, format {:?}, color space {:?}, present mode {:?}, {} images",
            config.extent.width,
            config.extent.height,
            config.surface_format.format,
            config.surface_format.color_space,
            config.present_mode,
            config.image_count
        );

        Ok(config)
    }
}

/// Vulkan swapchain wrapper.
///
/// This struct manages the swapchain and its associated resources:
/// - Swapchain images (owned by the swapchain, not explicitly managed)
/// - Image views (managed by this struct)
///
/// # Thread Safety
///
/// The swapchain is not thread-safe. Only one thread should interact with
/// it at a time.
pub struct Swapchain {
    /// Reference to the logical device
    device: Arc<Device>,
    /// Swapchain extension loader
    swapchain_loader: ash::khr::swapchain::Device,
    /// Swapchain handle
    swapchain: vk::SwapchainKHR,
    /// Swapchain images (owned by the swapchain)
    images: Vec<vk::Image>,
    /// Image views for the swapchain images
    image_views: Vec<vk::ImageView>,
    /// Parameters the swapchain was created with
    config: SwapchainConfig,
}

impl Swapchain {
    /// Creates a swapchain for `surface` with negotiated parameters.
    ///
    /// `config` must have been negotiated against the same surface and the
    /// context's physical device.
    ///
    /// # Errors
    ///
    /// Returns an error if swapchain or image view creation fails.
    pub fn new(
        context: &GraphicsContext,
        surface: vk::SurfaceKHR,
        config: &SwapchainConfig,
    ) -> Result<Self, RhiError> {
        let config = *config;
        let device = context.device().clone();
        let swapchain_loader =
            ash::khr::swapchain::Device::new(context.instance().handle(), device.handle());

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(config.image_count)
            .image_format(config.surface_format.format)
            .image_color_space(config.surface_format.color_space)
            .image_extent(config.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(config.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(e.into());
            }
        };
        info!("Swapchain created with {} images", images.len());

        let image_views =
            match create_image_views(&device, &images, config.surface_format.format) {
                Ok(views) => views,
                Err(e) => {
                    unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                    return Err(e);
                }
            };

        Ok(Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views,
            config,
        })
    }

    /// Returns the swapchain handle.
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Returns the parameters the swapchain was created with.
    #[inline]
    pub fn config(&self) -> &SwapchainConfig {
        &self.config
    }

    /// Returns the swapchain image format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.config.surface_format.format
    }

    /// Returns the swapchain color space.
    #[inline]
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.config.surface_format.color_space
    }

    /// Returns the swapchain extent (resolution).
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.config.extent
    }

    /// Returns the present mode.
    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.config.present_mode
    }

    /// Returns the number of swapchain images.
    ///
    /// The driver may create more images than requested.
    #[inline]
    pub fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    /// Returns all swapchain images.
    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// Returns all image views.
    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Destroy image views first
        destroy_image_views(&self.device, &self.image_views);
        self.image_views.clear();

        // Images are destroyed together with the swapchain
        unsafe {
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.config.extent.width,
            self.config.extent.height,
            self.images.len()
        );
    }
}

/// Chooses the surface format.
///
/// The first reported pair is used as is. A lone `UNDEFINED` entry means the
/// surface accepts anything, in which case [`DEFAULT_SURFACE_FORMAT`] is used.
fn choose_surface_format(
    formats: &[vk::SurfaceFormatKHR],
) -> Result<vk::SurfaceFormatKHR, RhiError> {
    let first = formats.first().ok_or(RhiError::NoSurfaceFormat)?;

    if first.format == vk::Format::UNDEFINED {
        debug!("Surface leaves the format open, using B8G8R8A8_UNORM with SRGB_NONLINEAR");
        return Ok(DEFAULT_SURFACE_FORMAT);
    }

    debug!(
        "Selected first reported surface format: {:?} / {:?}",
        first.format, first.color_space
    );
    Ok(*first)
}

/// Chooses the best present mode from the available modes.
///
/// Prefers MAILBOX (triple buffering, no tearing, low latency).
/// Falls back to FIFO (vsync, guaranteed to be available).
fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode (triple buffering)");
        return vk::PresentModeKHR::MAILBOX;
    }

    debug!("Selected FIFO present mode (vsync)");
    vk::PresentModeKHR::FIFO
}

/// Chooses the swapchain extent (resolution).
///
/// A current extent of `u32::MAX` means the swapchain decides, in which case
/// the requested window size is used.
fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        debug!(
            "Using current surface extent: {}x{}",
            capabilities.current_extent.width, capabilities.current_extent.height
        );
        return capabilities.current_extent;
    }

    debug!(
        "Surface extent is open, using requested {}x{}",
        requested.width, requested.height
    );
    requested
}

/// Determines the number of swapchain images to request.
///
/// One more than the minimum, capped by the maximum unless the maximum is 0
/// (no limit).
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count.saturating_add(1);

    let image_count = if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    };

    debug!(
        "Image count: {} (min: {}, max: {})",
        image_count,
        capabilities.min_image_count,
        if capabilities.max_image_count == 0 {
            "unlimited".to_string()
        } else {
            capabilities.max_image_count.to_string()
        }
    );

    image_count
}

/// Creates image views for swapchain images.
fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, RhiError> {
    let mut image_views = Vec::with_capacity(images.len());

    for (i, &image) in images.iter().enumerate() {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        match unsafe { device.handle().create_image_view(&create_info, None) } {
            Ok(view) => image_views.push(view),
            Err(e) => {
                destroy_image_views(device, &image_views);
                return Err(RhiError::SwapchainError(format!(
                    "Failed to create image view {}: {:?}",
                    i, e
                )));
            }
        }
    }

    debug!("Created {} image views", image_views.len());
    Ok(image_views)
}

fn destroy_image_views(device: &Device, image_views: &[vk::ImageView]) {
    for &image_view in image_views {
        unsafe {
            device.handle().destroy_image_view(image_view, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn test_choose_surface_format_takes_first() {
        let formats = vec![
            surface_format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            surface_format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];

        let selected = choose_surface_format(&formats).unwrap();
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_choose_surface_format_keeps_color_space() {
        let formats = vec![surface_format(
            vk::Format::A2B10G10R10_UNORM_PACK32,
            vk::ColorSpaceKHR::HDR10_ST2084_EXT,
        )];

        let selected = choose_surface_format(&formats).unwrap();
        assert_eq!(selected.format, vk::Format::A2B10G10R10_UNORM_PACK32);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::HDR10_ST2084_EXT);
    }

    #[test]
    fn test_choose_surface_format_undefined_uses_default() {
        let formats = vec![surface_format(
            vk::Format::UNDEFINED,
            vk::ColorSpaceKHR::SRGB_NONLINEAR,
        )];

        let selected = choose_surface_format(&formats).unwrap();
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_choose_surface_format_empty_is_an_error() {
        assert!(matches!(
            choose_surface_format(&[]),
            Err(RhiError::NoSurfaceFormat)
        ));
    }

    #[test]
    fn test_choose_present_mode_prefers_mailbox() {
        let modes = vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_choose_present_mode_fallback_to_fifo() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: extent(800, 600),
            ..Default::default()
        };

        let chosen = choose_extent(&capabilities, extent(1024, 768));
        assert_eq!(chosen.width, 800);
        assert_eq!(chosen.height, 600);
    }

    #[test]
    fn test_choose_extent_open_uses_requested() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: extent(u32::MAX, u32::MAX),
            ..Default::default()
        };

        let chosen = choose_extent(&capabilities, extent(1024, 768));
        assert_eq!(chosen.width, 1024);
        assert_eq!(chosen.height, 768);
    }

    #[test]
    fn test_determine_image_count() {
        // Test with max limit
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 3);

        // Max equal to min caps the count at the minimum
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 2);

        // Test with no max limit
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0, // 0 means no limit
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 3);
    }

    #[test]
    fn test_image_count_stays_within_bounds() {
        for min in 1..=8 {
            for max in min..=16 {
                let capabilities = vk::SurfaceCapabilitiesKHR {
                    min_image_count: min,
                    max_image_count: max,
                    ..Default::default()
                };
                let count = determine_image_count(&capabilities);
                assert!(
                    (min..=max).contains(&count),
                    "count {} outside [{}, {}]",
                    count,
                    min,
                    max
                );
            }

            let unbounded = vk::SurfaceCapabilitiesKHR {
                min_image_count: min,
                max_image_count: 0,
                ..Default::default()
            };
            assert_eq!(determine_image_count(&unbounded), min + 1);
        }
    }

    #[test]
    fn test_negotiate_combines_choices() {
        let support = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: extent(1920, 1080),
                ..Default::default()
            },
            formats: vec![surface_format(
                vk::Format::B8G8R8A8_SRGB,
                vk::ColorSpaceKHR::SRGB_NONLINEAR,
            )],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };

        let config = SwapchainConfig::negotiate(&support, extent(800, 600)).unwrap();
        assert_eq!(config.image_count, 3);
        assert_eq!(config.surface_format.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(config.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(config.extent.width, 1920);
        assert_eq!(config.extent.height, 1080);
    }

    #[test]
    fn test_negotiate_without_formats_fails() {
        let support = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(matches!(
            SwapchainConfig::negotiate(&support, extent(800, 600)),
            Err(RhiError::NoSurfaceFormat)
        ));
    }
}
