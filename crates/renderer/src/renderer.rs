//! Graphics context and presentation orchestration.
//!
//! This module provides the [`Renderer`] struct that owns the
//! [`GraphicsContext`] and, once a window is open, its [`Presentation`].

use tracing::{error, info};
use winit::event_loop::ActiveEventLoop;
use winit::window::WindowId;

use vkboot_core::AppConfig;
use vkboot_rhi::swapchain::Swapchain;
use vkboot_rhi::{GraphicsContext, RhiResult};

use crate::presentation::Presentation;

/// Owner of every Vulkan object the application creates.
///
/// # Resource Destruction Order
///
/// 1. Wait for all GPU work to complete
/// 2. Destroy the presentation (swapchain, surface, window)
/// 3. Destroy the graphics context (device, debug messenger, instance)
pub struct Renderer {
    /// Window bundle (destroyed before the context).
    presentation: Option<Presentation>,
    /// Instance, GPU and logical device (destroyed last).
    context: GraphicsContext,
}

impl Renderer {
    /// Creates the graphics context. No window is opened yet.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of context creation fails.
    pub fn new(config: &AppConfig) -> RhiResult<Self> {
        let context = GraphicsContext::new(config)?;

        Ok(Self {
            presentation: None,
            context,
        })
    }

    /// Opens the application window and creates its swapchain.
    ///
    /// Any previously opened window is destroyed first.
    ///
    /// # Errors
    ///
    /// Returns an error if window, surface or swapchain creation fails.
    pub fn open_window(
        &mut self,
        event_loop: &ActiveEventLoop,
        width: u32,
        height: u32,
        title: &str,
    ) -> RhiResult<()> {
        if self.presentation.take().is_some() {
            info!("Replacing the open window");
        }

        info!("Opening window {}x{} \"{}\"", width, height, title);
        let presentation = Presentation::open(&self.context, event_loop, width, height, title)?;
        self.presentation = Some(presentation);
        Ok(())
    }

    /// Returns whether the application should keep running.
    ///
    /// `false` once the window was closed. Without an open window there is
    /// nothing to stop, so this is `true`.
    pub fn run(&self) -> bool {
        self.presentation
            .as_ref()
            .is_none_or(|presentation| presentation.window().update())
    }

    /// Clears the window's run flag.
    pub fn close_window(&mut self) {
        if let Some(presentation) = self.presentation.as_mut() {
            presentation.window_mut().close();
        }
    }

    /// Identifier of the open window, if any.
    pub fn window_id(&self) -> Option<WindowId> {
        self.presentation
            .as_ref()
            .map(|presentation| presentation.window().id())
    }

    /// Returns the graphics context.
    #[inline]
    pub fn context(&self) -> &GraphicsContext {
        &self.context
    }

    /// Returns the presentation bundle of the open window.
    #[inline]
    pub fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_ref()
    }

    /// Returns the swapchain of the open window.
    #[inline]
    pub fn swapchain(&self) -> Option<&Swapchain> {
        self.presentation.as_ref().map(Presentation::swapchain)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Wait for all GPU work to complete before destroying resources
        if let Err(e) = self.context.device().wait_idle() {
            error!(
                "Failed to wait for device idle during renderer drop: {:?}",
                e
            );
        }

        // Presentation objects borrow the device and instance
        drop(self.presentation.take());

        info!("Renderer destroyed");
    }
}
