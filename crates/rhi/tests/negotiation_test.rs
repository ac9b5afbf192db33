//! Integration tests for presentation checks and swapchain negotiation
//! against a scripted surface.

use vkboot_rhi::RhiError;
use vkboot_rhi::surface::{SurfaceSupport, verify_present_support};
use vkboot_rhi::swapchain::{SwapchainConfig, SwapchainSupportDetails};
use vkboot_rhi::vk::{self, Handle};

/// A surface whose answers are fixed up front.
struct ScriptedSurface {
    present_family: u32,
    capabilities: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
}

impl ScriptedSurface {
    /// An 800x600 window surface offering FIFO only.
    fn window_800x600() -> Self {
        Self {
            present_family: 0,
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: vk::Extent2D {
                    width: 800,
                    height: 600,
                },
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                ..Default::default()
            },
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }
}

impl SurfaceSupport for ScriptedSurface {
    fn present_support(
        &self,
        _device: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> Result<bool, RhiError> {
        Ok(queue_family == self.present_family)
    }

    fn capabilities(
        &self,
        _device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<vk::SurfaceCapabilitiesKHR, RhiError> {
        Ok(self.capabilities)
    }

    fn formats(
        &self,
        _device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::SurfaceFormatKHR>, RhiError> {
        Ok(self.formats.clone())
    }

    fn present_modes(
        &self,
        _device: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> Result<Vec<vk::PresentModeKHR>, RhiError> {
        Ok(self.present_modes.clone())
    }
}

fn gpu() -> vk::PhysicalDevice {
    vk::PhysicalDevice::from_raw(1)
}

fn surface() -> vk::SurfaceKHR {
    vk::SurfaceKHR::from_raw(2)
}

fn requested(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
}

#[test]
fn test_window_surface_negotiates_fifo_with_three_images() {
    let scripted = ScriptedSurface::window_800x600();

    verify_present_support(&scripted, gpu(), 0, surface())
        .expect("Family 0 should be able to present");

    let details = SwapchainSupportDetails::query(&scripted, gpu(), surface())
        .expect("Failed to query support details");
    let config = SwapchainConfig::negotiate(&details, requested(800, 600))
        .expect("Failed to negotiate swapchain");

    assert_eq!(config.image_count, 3);
    assert_eq!(config.present_mode, vk::PresentModeKHR::FIFO);
    assert_eq!(config.extent.width, 800);
    assert_eq!(config.extent.height, 600);
    assert_eq!(config.surface_format.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(
        config.surface_format.color_space,
        vk::ColorSpaceKHR::SRGB_NONLINEAR
    );
}

#[test]
fn test_family_without_present_support_is_rejected() {
    let scripted = ScriptedSurface {
        present_family: 1,
        ..ScriptedSurface::window_800x600()
    };

    let result = verify_present_support(&scripted, gpu(), 0, surface());
    assert!(matches!(
        result,
        Err(RhiError::PresentationUnsupported { family: 0 })
    ));
}

#[test]
fn test_open_format_falls_back_to_bgra_unorm() {
    let scripted = ScriptedSurface {
        formats: vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::UNDEFINED,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ],
        ..ScriptedSurface::window_800x600()
    };

    let details = SwapchainSupportDetails::query(&scripted, gpu(), surface()).unwrap();
    let config = SwapchainConfig::negotiate(&details, requested(800, 600)).unwrap();

    assert_eq!(config.surface_format.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(
        config.surface_format.color_space,
        vk::ColorSpaceKHR::SRGB_NONLINEAR
    );
}

#[test]
fn test_open_extent_uses_requested_window_size() {
    let mut scripted = ScriptedSurface::window_800x600();
    scripted.capabilities.current_extent = requested(u32::MAX, u32::MAX);

    let details = SwapchainSupportDetails::query(&scripted, gpu(), surface()).unwrap();
    let config = SwapchainConfig::negotiate(&details, requested(1280, 720)).unwrap();

    assert_eq!(config.extent.width, 1280);
    assert_eq!(config.extent.height, 720);
}

#[test]
fn test_mailbox_is_preferred_when_offered() {
    let scripted = ScriptedSurface {
        present_modes: vec![
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::MAILBOX,
        ],
        ..ScriptedSurface::window_800x600()
    };

    let details = SwapchainSupportDetails::query(&scripted, gpu(), surface()).unwrap();
    let config = SwapchainConfig::negotiate(&details, requested(800, 600)).unwrap();

    assert_eq!(config.present_mode, vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_surface_without_formats_is_rejected() {
    let scripted = ScriptedSurface {
        formats: vec![],
        ..ScriptedSurface::window_800x600()
    };

    let details = SwapchainSupportDetails::query(&scripted, gpu(), surface()).unwrap();
    assert!(matches!(
        SwapchainConfig::negotiate(&details, requested(800, 600)),
        Err(RhiError::NoSurfaceFormat)
    ));
}
