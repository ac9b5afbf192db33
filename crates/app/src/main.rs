//! vkboot - Main Entry Point
//!
//! Creates a Vulkan instance and device, opens a window with a surface and a
//! swapchain, and pumps window events until the window is closed.

use anyhow::{Context, Result, bail};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use vkboot_core::AppConfig;
use vkboot_core::config::WindowConfig;
use vkboot_renderer::Renderer;

struct App {
    window_config: WindowConfig,
    renderer: Renderer,
    /// First fatal error; reported by `main` after the event loop exits.
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(config: &AppConfig, renderer: Renderer) -> Self {
        Self {
            window_config: config.window.clone(),
            renderer,
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.fatal.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.window_id().is_some() {
            return;
        }

        let WindowConfig {
            width,
            height,
            ref title,
        } = self.window_config;

        match self.renderer.open_window(event_loop, width, height, title) {
            Ok(()) => info!("Initialization complete, entering main loop"),
            Err(e) => {
                let err = anyhow::Error::new(e).context("Failed to open window");
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.renderer.window_id() != Some(id) {
            return;
        }

        if let WindowEvent::CloseRequested = event {
            info!("Close requested, shutting down");
            self.renderer.close_window();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.renderer.run() {
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    vkboot_core::init_logging();
    info!("Starting vkboot");

    let config = AppConfig::load_default().context("Failed to load configuration")?;

    let renderer = match Renderer::new(&config) {
        Ok(renderer) => renderer,
        Err(e) => {
            error!("Failed to initialize Vulkan: {}", e);
            return Err(e).context("Failed to initialize Vulkan");
        }
    };

    // Create event loop
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    // Create app and run
    let mut app = App::new(&config, renderer);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.fatal.take() {
        return Err(err);
    }
    if app.renderer.window_id().is_none() {
        bail!("Event loop exited before a window was opened");
    }

    info!("Shutting down");
    Ok(())
}
