//! Window management using winit.
//!
//! This module provides window creation and Vulkan surface creation functionality.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use vkboot_core::{Error, Result};

use crate::surface::Surface;

/// A native window a Vulkan surface can be created for.
pub trait NativeWindow {
    /// Size of the drawable area in pixels.
    fn surface_extent(&self) -> vk::Extent2D;

    /// Creates a Vulkan surface bound to this window.
    ///
    /// `instance` must outlive the returned [`Surface`].
    fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface>;
}

/// "Should continue running" flag of a window.
///
/// Starts set; [`RunState::close`] clears it for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    running: bool,
}

impl RunState {
    /// Creates a flag in the running state.
    pub fn new() -> Self {
        Self { running: true }
    }

    /// Clears the flag. Closing twice is harmless.
    pub fn close(&mut self) {
        if self.running {
            tracing::debug!("Window close requested");
        }
        self.running = false;
    }

    /// Returns whether the application should keep running.
    pub fn update(&self) -> bool {
        self.running
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-size window with a run flag.
///
/// The run flag starts set and is cleared by [`Window::close`]; the event loop
/// polls it through [`Window::update`].
pub struct Window {
    window: Arc<WinitWindow>,
    width: u32,
    height: u32,
    run_state: RunState,
}

impl Window {
    /// Create a new window with the given dimensions and title.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Window`] if either dimension is zero or the platform
    /// refuses to create the window.
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        validate_size(width, height)?;

        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!("Window created: {}x{} \"{}\"", width, height, title);

        Ok(Self {
            window: Arc::new(window),
            width,
            height,
            run_state: RunState::new(),
        })
    }

    /// Get a reference to the underlying winit window.
    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    /// Identifier used to route winit events to this window.
    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    /// Get the requested width of the window.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the requested height of the window.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Marks the window as closed; the next [`Window::update`] returns `false`.
    pub fn close(&mut self) {
        self.run_state.close();
    }

    /// Returns whether the application should keep running.
    pub fn update(&self) -> bool {
        self.run_state.update()
    }
}

impl NativeWindow for Window {
    fn surface_extent(&self) -> vk::Extent2D {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            // Minimized or not yet mapped
            return vk::Extent2D {
                width: self.width,
                height: self.height,
            };
        }
        vk::Extent2D {
            width: size.width,
            height: size.height,
        }
    }

    fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: The entry and instance are valid references provided by the caller.
        // The display and window handles are valid as they come from the winit window.
        // The surface will be destroyed in the Surface::drop implementation.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created successfully");

        Ok(Surface::from_raw(handle, surface_loader))
    }
}

/// Rejects window sizes with a zero dimension.
pub fn validate_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::Window(format!(
            "Window size must be non-zero, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_starts_running() {
        assert!(RunState::new().update());
        assert_eq!(RunState::default(), RunState::new());
    }

    #[test]
    fn test_run_state_close_stops_running() {
        let mut state = RunState::new();
        state.close();
        assert!(!state.update());

        // Closing again keeps it stopped
        state.close();
        assert!(!state.update());
    }

    #[test]
    fn test_validate_size_accepts_positive() {
        assert!(validate_size(800, 600).is_ok());
        assert!(validate_size(1, 1).is_ok());
    }

    #[test]
    fn test_validate_size_rejects_zero() {
        assert!(matches!(validate_size(0, 600), Err(Error::Window(_))));
        assert!(matches!(validate_size(800, 0), Err(Error::Window(_))));
        assert!(matches!(validate_size(0, 0), Err(Error::Window(_))));
    }
}
