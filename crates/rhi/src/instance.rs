//! Vulkan instance management.
//!
//! This module handles VkInstance creation, validation layers and the
//! diagnostics registration.
//!
//! # Overview
//!
//! The [`Instance`] struct provides a safe abstraction over the Vulkan instance,
//! including optional validation layer support for debugging purposes. The
//! instance always enables `VK_KHR_surface` plus the window-system surface
//! extensions this platform can use.
//!
//! # Example
//!
//! ```no_run
//! use vkboot_core::config::{DiagnosticsConfig, GraphicsConfig};
//! use vkboot_rhi::instance::Instance;
//!
//! let instance = Instance::new(&GraphicsConfig::default(), &DiagnosticsConfig::default())
//!     .expect("Failed to create Vulkan instance");
//!
//! // Access the underlying Vulkan handles
//! let vk_instance = instance.handle();
//! let entry = instance.entry();
//! ```

use std::collections::HashSet;
use std::ffi::{CStr, CString, c_char};

use ash::{Entry, vk};
use tracing::{debug, info, warn};
use vkboot_core::config::{DiagnosticsConfig, GraphicsConfig};

use crate::diagnostics::{DebugMessenger, MessengerSettings};
use crate::error::RhiError;

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Engine name reported to the driver.
const ENGINE_NAME: &CStr = c"vkboot";

/// Vulkan instance wrapper with optional validation layer support.
///
/// This struct manages the lifetime of the Vulkan instance and its associated
/// debug messenger. When dropped, the messenger is unregistered before the
/// instance is destroyed.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Validation callback registration (only present when validation is enabled)
    debug_messenger: Option<DebugMessenger>,
    /// Settings read by the validation callback; dropped after the instance
    debug_settings: Option<MessengerSettings>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `graphics` - Application identity and whether validation is requested
    /// * `diagnostics` - How validation messages are reported
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Vulkan library cannot be loaded
    /// - Required surface extensions are not available
    /// - Instance creation fails
    /// - Debug messenger setup fails (when validation is enabled)
    pub fn new(
        graphics: &GraphicsConfig,
        diagnostics: &DiagnosticsConfig,
    ) -> Result<Self, RhiError> {
        // Load the Vulkan library
        let entry = unsafe { Entry::load()? };

        let available_extensions = Self::available_extensions(&entry, None)?;

        let validation_available = if graphics.enable_validation {
            let layer_available = Self::is_validation_layer_available(&entry)?;
            let debug_utils_available = layer_available
                && (available_extensions.contains(ash::ext::debug_utils::NAME)
                    || Self::available_extensions(&entry, Some(VALIDATION_LAYER_NAME))?
                        .contains(ash::ext::debug_utils::NAME));
            resolve_validation(layer_available, debug_utils_available)
        } else {
            false
        };

        let mut extensions =
            select_surface_extensions(|name| available_extensions.contains(name))?;
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME);
        }

        let flags = enable_portability(&available_extensions, &mut extensions);

        let extension_names: Vec<*const c_char> =
            extensions.iter().map(|ext| ext.as_ptr()).collect();

        for ext in &extensions {
            debug!("Enabling instance extension {}", ext.to_string_lossy());
        }

        // Set up layers
        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let application_name =
            CString::new(graphics.application_name.replace('\0', "")).unwrap_or_default();

        // Set up application info
        let app_info = vk::ApplicationInfo::default()
            .application_name(&application_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        // The callback settings must exist before the instance so the chained
        // create info can report instance creation itself.
        let debug_settings = validation_available.then(|| MessengerSettings::new(diagnostics));
        let mut chained_debug_info = debug_settings.as_ref().map(MessengerSettings::create_info);

        let mut create_info = vk::InstanceCreateInfo::default()
            .flags(flags)
            .application_info(&app_info)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layers);

        if let Some(debug_info) = chained_debug_info.as_mut() {
            create_info = create_info.push_next(debug_info);
        }

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(RhiError::from)?
        };

        info!(
            "Vulkan instance created for '{}' (API version 1.0)",
            graphics.application_name
        );

        // Set up debug messenger if validation is enabled
        let debug_messenger = match &debug_settings {
            Some(settings) => match DebugMessenger::new(&entry, &instance, settings) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            },
            None => None,
        };

        if validation_available {
            info!("Validation layers enabled");
        }

        Ok(Self {
            entry,
            instance,
            debug_messenger,
            debug_settings,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Lists the instance extensions the loader reports, or those provided
    /// by `layer` when given.
    fn available_extensions(
        entry: &Entry,
        layer: Option<&CStr>,
    ) -> Result<HashSet<CString>, RhiError> {
        let properties = unsafe { entry.enumerate_instance_extension_properties(layer)? };

        Ok(properties
            .iter()
            .map(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }.to_owned())
            .collect())
    }

    /// Checks if the Khronos validation layer is available.
    fn is_validation_layer_available(entry: &Entry) -> Result<bool, RhiError> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        let validation_layer_name = VALIDATION_LAYER_NAME.to_bytes_with_nul();

        let found = available_layers.iter().any(|layer| {
            let layer_name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            layer_name.to_bytes_with_nul() == validation_layer_name
        });

        Ok(found)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // Unregister the messenger before the instance goes away
        drop(self.debug_messenger.take());
        unsafe {
            self.instance.destroy_instance(None);
        }
        // Only now may the callback settings go: vkDestroyInstance reports
        // through the chained create info.
        drop(self.debug_settings.take());
        info!("Vulkan instance destroyed");
    }
}

/// Decides whether validation can be enabled.
///
/// Both the Khronos layer and `VK_EXT_debug_utils` are needed; without either
/// the instance is created without validation.
fn resolve_validation(layer_available: bool, debug_utils_available: bool) -> bool {
    if !layer_available {
        warn!("Validation layer requested but not available, proceeding without it");
        return false;
    }
    if !debug_utils_available {
        warn!(
            "{} not available, proceeding without validation",
            ash::ext::debug_utils::NAME.to_string_lossy()
        );
        return false;
    }
    true
}

/// Enables portability enumeration where MoltenVK needs it.
#[cfg(target_os = "macos")]
fn enable_portability(
    available: &HashSet<CString>,
    extensions: &mut Vec<&'static CStr>,
) -> vk::InstanceCreateFlags {
    if available.contains(ash::khr::portability_enumeration::NAME) {
        extensions.push(ash::khr::portability_enumeration::NAME);
        vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR
    } else {
        vk::InstanceCreateFlags::empty()
    }
}

#[cfg(not(target_os = "macos"))]
fn enable_portability(
    _available: &HashSet<CString>,
    _extensions: &mut Vec<&'static CStr>,
) -> vk::InstanceCreateFlags {
    vk::InstanceCreateFlags::empty()
}

/// Window-system surface extensions this platform may use.
///
/// The instance enables every one of these the loader reports; at least one
/// must be present.
pub fn platform_surface_extensions() -> Vec<&'static CStr> {
    let mut extensions = Vec::new();

    #[cfg(target_os = "windows")]
    extensions.push(ash::khr::win32_surface::NAME);

    #[cfg(all(unix, not(target_os = "macos"), not(target_os = "android")))]
    {
        extensions.push(ash::khr::xlib_surface::NAME);
        extensions.push(ash::khr::xcb_surface::NAME);
        extensions.push(ash::khr::wayland_surface::NAME);
    }

    #[cfg(target_os = "android")]
    extensions.push(ash::khr::android_surface::NAME);

    #[cfg(target_os = "macos")]
    extensions.push(ash::ext::metal_surface::NAME);

    extensions
}

/// Picks the surface extensions to enable.
///
/// `VK_KHR_surface` is mandatory, as is at least one platform surface
/// extension from [`platform_surface_extensions`].
///
/// # Errors
///
/// Returns [`RhiError::MissingExtension`] naming what is absent.
pub fn select_surface_extensions(
    is_available: impl Fn(&CStr) -> bool,
) -> Result<Vec<&'static CStr>, RhiError> {
    if !is_available(ash::khr::surface::NAME) {
        return Err(RhiError::MissingExtension(
            ash::khr::surface::NAME.to_string_lossy().into_owned(),
        ));
    }

    let candidates = platform_surface_extensions();
    let platform: Vec<&'static CStr> = candidates
        .iter()
        .copied()
        .filter(|name| is_available(name))
        .collect();

    if platform.is_empty() {
        let names: Vec<_> = candidates.iter().map(|c| c.to_string_lossy()).collect();
        return Err(RhiError::MissingExtension(format!(
            "any of [{}]",
            names.join(", ")
        )));
    }

    let mut extensions = Vec::with_capacity(platform.len() + 2);
    extensions.push(ash::khr::surface::NAME);
    extensions.extend(platform);
    Ok(extensions)
}
