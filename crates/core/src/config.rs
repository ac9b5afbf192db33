//! Application configuration.
//!
//! Configuration is read from a TOML file. Every field has a default, so a
//! missing file or a file that only sets a few keys is valid:
//!
//! ```toml
//! [window]
//! width = 1024
//! height = 768
//!
//! [diagnostics]
//! verbose = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "VKBOOT_CONFIG";

/// Configuration file looked up in the working directory by default.
pub const DEFAULT_CONFIG_FILE: &str = "vkboot.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Window placement and title.
    pub window: WindowConfig,
    /// Instance and device creation settings.
    pub graphics: GraphicsConfig,
    /// Validation message routing.
    pub diagnostics: DiagnosticsConfig,
}

/// Window settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Inner width in physical pixels.
    pub width: u32,
    /// Inner height in physical pixels.
    pub height: u32,
    /// Title bar text.
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "Vulkan".to_string(),
        }
    }
}

/// Instance and device creation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Application name reported to the driver.
    pub application_name: String,
    /// Request the Khronos validation layer and debug messenger.
    pub enable_validation: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            application_name: "Vulkan Test Application".to_string(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

/// Validation message routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Also report INFO and VERBOSE messages.
    pub verbose: bool,
    /// Raise a blocking message box for ERROR messages where supported.
    pub modal_on_error: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            modal_on_error: true,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read and
    /// [`Error::Config`] if it cannot be parsed or fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        info!("Loaded config from {}", path.display());
        debug!("{:?}", config);

        Ok(config)
    }

    /// Loads configuration from the path in `VKBOOT_CONFIG`, or from
    /// `vkboot.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::load`].
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_path())
    }

    /// Returns the path [`AppConfig::load_default`] reads from.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would otherwise only fail deep inside window creation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either window dimension is zero.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "Vulkan");
        assert_eq!(config.graphics.application_name, "Vulkan Test Application");
        assert_eq!(config.graphics.enable_validation, cfg!(debug_assertions));
        assert!(!config.diagnostics.verbose);
        assert!(config.diagnostics.modal_on_error);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [window]
            width = 1024

            [diagnostics]
            verbose = true
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "Vulkan");
        assert!(config.diagnostics.verbose);
        assert!(config.diagnostics.modal_on_error);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(AppConfig::from_toml("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_zero_window_size_rejected() {
        let result = AppConfig::from_toml("[window]\nheight = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = AppConfig::from_toml("[window\nwidth = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("vkboot-config-does-not-exist.toml");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("vkboot-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[window]\ntitle = \"Loaded\"\n").unwrap();

        let config = AppConfig::load(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.unwrap().window.title, "Loaded");
    }
}
