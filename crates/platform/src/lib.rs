//! Platform abstraction layer for vkboot.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Raw window handles for Vulkan surface creation

mod surface;
mod window;

pub use surface::Surface;
pub use window::{NativeWindow, RunState, Window, validate_size};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::{ActiveEventLoop, EventLoop};
