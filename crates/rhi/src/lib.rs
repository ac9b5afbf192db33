//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance creation and validation diagnostics
//! - Physical device and queue family selection
//! - Logical device and graphics queue creation
//! - Surface capability queries and swapchain negotiation

mod error;

pub mod context;
pub mod device;
pub mod diagnostics;
pub mod instance;
pub mod physical_device;
pub mod surface;
pub mod swapchain;

pub use context::GraphicsContext;
pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
