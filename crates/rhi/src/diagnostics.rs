//! Validation and debug message routing.
//!
//! A [`DebugMessenger`] is the single registration of the validation callback
//! for an instance. It owns the `VK_EXT_debug_utils` loader and the messenger
//! handle; the settings the callback reads arrive through its user data
//! pointer from a [`MessengerSettings`] owned by the instance, so no
//! process-wide state is involved.
//!
//! Every message becomes one tagged line such as
//! `VKDBG: WARNING: PERFORMANCE: @[BestPractices-vkCreateDevice]: ...`
//! and is forwarded to `tracing` at the matching level. On Windows, ERROR
//! messages additionally raise a blocking message box.

use std::borrow::Cow;
use std::ffi::{CStr, c_char, c_void};
use std::fmt::Write;

use ash::{Entry, vk};
use tracing::{debug, error, info, warn};
use vkboot_core::config::DiagnosticsConfig;

use crate::error::RhiError;

/// Title of the message box raised for ERROR messages.
#[cfg_attr(not(windows), allow(dead_code))]
const ERROR_DIALOG_TITLE: &str = "Vulkan Error!";

/// Callback settings shared with the driver through the messenger user data.
///
/// The settings are boxed so their address stays fixed while the driver holds
/// the pointer. They must stay alive until the instance is destroyed, since a
/// create info chained into instance creation also reports
/// `vkDestroyInstance`.
pub struct MessengerSettings {
    config: Box<DiagnosticsConfig>,
}

impl MessengerSettings {
    /// Captures the diagnostics configuration for the callback.
    pub fn new(config: &DiagnosticsConfig) -> Self {
        Self {
            config: Box::new(config.clone()),
        }
    }

    /// Builds the messenger create info pointing at these settings.
    ///
    /// The returned struct may be chained into `VkInstanceCreateInfo` so that
    /// instance creation and destruction are reported too.
    pub fn create_info(&self) -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
        let user_data = &*self.config as *const DiagnosticsConfig as *mut c_void;

        vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(severity_mask(&self.config))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback))
            .user_data(user_data)
    }

    /// Returns the captured configuration.
    #[inline]
    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }
}

/// Registered validation callback for one instance.
///
/// Must be dropped before the instance it was created from, and the
/// [`MessengerSettings`] it was registered with must outlive both.
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Registers the validation callback with `instance`.
    ///
    /// # Errors
    ///
    /// Returns an error if `vkCreateDebugUtilsMessengerEXT` fails.
    /// `VK_EXT_debug_utils` must have been enabled on `instance`; otherwise the
    /// loader's entry points are missing and calling them panics.
    pub fn new(
        entry: &Entry,
        instance: &ash::Instance,
        settings: &MessengerSettings,
    ) -> Result<Self, RhiError> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let messenger = unsafe {
            loader
                .create_debug_utils_messenger(&settings.create_info(), None)?
        };

        debug!(
            "Debug messenger registered (verbose: {}, modal on error: {})",
            settings.config().verbose,
            settings.config().modal_on_error
        );

        Ok(Self { loader, messenger })
    }

    /// Returns the messenger handle.
    #[inline]
    pub fn handle(&self) -> vk::DebugUtilsMessengerEXT {
        self.messenger
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        // SAFETY: the messenger was created from this loader and the owning
        // Instance drops us before destroying the VkInstance.
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
        debug!("Debug messenger unregistered");
    }
}

/// Severities forwarded to the callback.
fn severity_mask(config: &DiagnosticsConfig) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    let mut mask =
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR;
    if config.verbose {
        mask |= vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE;
    }
    mask
}

/// Formats a validation message as a single tagged line.
///
/// Tags appear in the order INFO, WARNING, PERFORMANCE, ERROR, DEBUG,
/// followed by the originating message id in brackets and the body with
/// line breaks folded into spaces.
pub fn format_message(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    origin: &str,
    body: &str,
) -> String {
    let mut line = String::from("VKDBG: ");

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        line.push_str("INFO: ");
    }
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        line.push_str("WARNING: ");
    }
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        line.push_str("PERFORMANCE: ");
    }
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        line.push_str("ERROR: ");
    }
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE) {
        line.push_str("DEBUG: ");
    }

    let body = body.trim_end().replace(['\r', '\n'], " ");
    let _ = write!(line, "@[{}]: {}", origin, body);
    line
}

/// Reads a driver-provided C string, substituting `fallback` for null.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives the
/// returned value.
unsafe fn driver_str<'a>(ptr: *const c_char, fallback: &'static str) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed(fallback)
    } else {
        unsafe { CStr::from_ptr(ptr).to_string_lossy() }
    }
}

/// Debug callback invoked by the validation layer.
///
/// `user_data` is null or points at the [`DiagnosticsConfig`] owned by the
/// [`MessengerSettings`] that registered this callback.
///
/// # Safety
///
/// This function is called from the Vulkan driver and must follow the
/// Vulkan specification for debug callbacks.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let body = unsafe { driver_str(callback_data.p_message, "(no message)") };
    let origin = unsafe { driver_str(callback_data.p_message_id_name, "unknown") };

    let line = format_message(message_severity, message_type, &origin, &body);

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("{}", line);

        let modal = !user_data.is_null()
            && unsafe { &*(user_data as *const DiagnosticsConfig) }.modal_on_error;
        if modal {
            show_error_dialog(&line);
        }
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("{}", line);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        info!("{}", line);
    } else {
        debug!("{}", line);
    }

    // Never abort the call that triggered the message
    vk::FALSE
}

#[cfg(windows)]
fn show_error_dialog(text: &str) {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;

    use winapi::um::winuser::{MB_ICONERROR, MB_OK, MessageBoxW};

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
    }

    let text = wide(text);
    let caption = wide(ERROR_DIALOG_TITLE);

    // SAFETY: both buffers are NUL-terminated UTF-16 and outlive the call.
    unsafe {
        MessageBoxW(
            std::ptr::null_mut(),
            text.as_ptr(),
            caption.as_ptr(),
            MB_OK | MB_ICONERROR,
        );
    }
}

#[cfg(not(windows))]
fn show_error_dialog(_text: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_warning_validation() {
        let line = format_message(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            "VUID-vkCreateDevice-01",
            "something is off",
        );
        assert_eq!(line, "VKDBG: WARNING: @[VUID-vkCreateDevice-01]: something is off");
    }

    #[test]
    fn test_format_performance_tag_follows_warning() {
        let line = format_message(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
            vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            "BestPractices",
            "slow path",
        );
        assert_eq!(line, "VKDBG: WARNING: PERFORMANCE: @[BestPractices]: slow path");
    }

    #[test]
    fn test_format_error_and_verbose_tags() {
        let line = format_message(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
            "Loader",
            "bad",
        );
        assert_eq!(line, "VKDBG: ERROR: @[Loader]: bad");

        let line = format_message(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
            "Loader",
            "detail",
        );
        assert_eq!(line, "VKDBG: DEBUG: @[Loader]: detail");
    }

    #[test]
    fn test_format_folds_line_breaks() {
        let line = format_message(
            vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
            "Loader",
            "first\nsecond\r\n",
        );
        assert!(!line.contains('\n'));
        assert!(line.starts_with("VKDBG: INFO: @[Loader]: first second"));
    }

    #[test]
    fn test_severity_mask() {
        let quiet = severity_mask(&DiagnosticsConfig::default());
        assert!(quiet.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
        assert!(quiet.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR));
        assert!(!quiet.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));

        let verbose = severity_mask(&DiagnosticsConfig {
            verbose: true,
            ..Default::default()
        });
        assert!(verbose.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
        assert!(verbose.contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
    }

    #[test]
    fn test_create_info_points_at_settings() {
        let settings = MessengerSettings::new(&DiagnosticsConfig::default());
        let info = settings.create_info();

        assert!(info.pfn_user_callback.is_some());
        assert_eq!(
            info.p_user_data as *const DiagnosticsConfig,
            settings.config() as *const DiagnosticsConfig
        );
    }

    #[test]
    fn test_callback_never_aborts() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default()
            .message_id_name(c"Test-Origin")
            .message(c"just a warning");

        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);

        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }
}
