//! Window, surface and swapchain bundle.

use tracing::info;
use winit::event_loop::ActiveEventLoop;

use vkboot_platform::{NativeWindow, Surface, Window};
use vkboot_rhi::surface::verify_present_support;
use vkboot_rhi::swapchain::{Swapchain, SwapchainConfig, SwapchainSupportDetails};
use vkboot_rhi::{GraphicsContext, RhiError, RhiResult};

/// A native window with a bound surface and a swapchain.
///
/// # Resource Destruction Order
///
/// Fields drop in declaration order: swapchain, then surface, then window.
/// The whole bundle must be dropped before the [`GraphicsContext`] it was
/// opened with.
pub struct Presentation {
    /// Swapchain (destroyed first).
    swapchain: Swapchain,
    /// Surface the swapchain presents to; only held for its drop.
    _surface: Surface,
    /// Native window the surface is bound to (destroyed last).
    window: Window,
}

impl Presentation {
    /// Opens a window and prepares it for presentation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The window cannot be created
    /// - Surface creation fails
    /// - The context's graphics queue family cannot present to the surface
    /// - Swapchain negotiation or creation fails
    pub fn open(
        context: &GraphicsContext,
        event_loop: &ActiveEventLoop,
        width: u32,
        height: u32,
        title: &str,
    ) -> RhiResult<Self> {
        let window = Window::new(event_loop, width, height, title)
            .map_err(|e| RhiError::PlatformError(e.to_string()))?;

        Self::attach(context, window)
    }

    /// Binds a surface and swapchain to an existing window.
    ///
    /// # Errors
    ///
    /// See [`Presentation::open`].
    pub fn attach(context: &GraphicsContext, window: Window) -> RhiResult<Self> {
        let surface = window
            .create_surface(context.entry(), context.instance().handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        verify_present_support(
            context.surface_loader(),
            context.physical_device(),
            context.queue_family_index(),
            surface.handle(),
        )?;

        let support = SwapchainSupportDetails::query(
            context.surface_loader(),
            context.physical_device(),
            surface.handle(),
        )?;
        let config = SwapchainConfig::negotiate(&support, window.surface_extent())?;

        let swapchain = Swapchain::new(context, surface.handle(), &config)?;

        info!(
            "Presentation ready: {}x{}, {} swapchain images",
            swapchain.extent().width,
            swapchain.extent().height,
            swapchain.image_count()
        );

        Ok(Self {
            swapchain,
            _surface: surface,
            window,
        })
    }

    /// Returns the window.
    #[inline]
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Returns the window mutably, for run-flag updates.
    #[inline]
    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    /// Returns the swapchain.
    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }
}
