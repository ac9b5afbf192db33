//! Composition of the graphics context and the presentation surface.
//!
//! This crate wires the lower layers together:
//! - Graphics context creation from the application configuration
//! - Window, surface and swapchain setup
//! - Teardown ordering between the two

mod presentation;
mod renderer;

pub use presentation::Presentation;
pub use renderer::Renderer;
