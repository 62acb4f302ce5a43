//! CRT Configuration Management
//!
//! Handles loading shader configuration from ~/.crt/config.toml and reading
//! the postprocess shader files it names. Supports hot-reloading and default
//! config generation.

pub mod watcher;

pub use watcher::{ShaderEvent, ShaderWatcher, ShaderWatcherBuilder};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = ".crt";
/// Default configuration file name
const CONFIG_FILE_NAME: &str = "config.toml";
/// Directory for user shader files
const SHADERS_DIR_NAME: &str = "shaders";
/// Overrides the configuration directory when set
const CONFIG_DIR_ENV: &str = "CRT_CONFIG_DIR";

/// Highest WCAG contrast ratio (white on black)
pub const MAX_CONTRAST: f32 = 21.0;

/// Shader configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// WGSL fragment shaders applied to the finished frame, in order.
    /// Relative paths resolve against the config directory.
    #[serde(default)]
    pub postprocess: Vec<PathBuf>,

    /// Minimum contrast ratio between text and its background, 1 to 21
    #[serde(default = "default_min_contrast")]
    pub min_contrast: f32,

    /// Blend in linear space (sRGB attachment)
    #[serde(default)]
    pub linear_blending: bool,
}

fn default_min_contrast() -> f32 {
    1.0
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            postprocess: Vec::new(),
            min_contrast: default_min_contrast(),
            linear_blending: false,
        }
    }
}

impl ShaderConfig {
    /// `min_contrast` clamped to the valid ratio range
    pub fn clamped_min_contrast(&self) -> f32 {
        if self.min_contrast.is_nan() {
            return default_min_contrast();
        }
        self.min_contrast.clamp(1.0, MAX_CONTRAST)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Shader settings
    #[serde(default)]
    pub shaders: ShaderConfig,
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            log::info!("Config file not found, creating default at {:?}", config_path);
            Self::create_default_config()?;
        }

        let config = Self::load_from(&config_path)?;
        log::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;

        if config.shaders.clamped_min_contrast() != config.shaders.min_contrast {
            log::warn!(
                "min_contrast {} out of range, using {}",
                config.shaders.min_contrast,
                config.shaders.clamped_min_contrast()
            );
        }

        Ok(config)
    }

    /// Get the configuration directory path (~/.crt/, or $CRT_CONFIG_DIR)
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(CONFIG_DIR_NAME))
    }

    /// Get the configuration file path (~/.crt/config.toml)
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Get the user shader directory path (~/.crt/shaders/)
    pub fn shaders_dir() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(SHADERS_DIR_NAME))
    }

    /// Create the default configuration file and directory structure
    pub fn create_default_config() -> Result<(), ConfigError> {
        let config_dir = Self::config_dir()?;
        let shaders_dir = Self::shaders_dir()?;
        let config_path = Self::config_file_path()?;

        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::CreateDirError(config_dir.clone(), e))?;
        fs::create_dir_all(&shaders_dir)
            .map_err(|e| ConfigError::CreateDirError(shaders_dir.clone(), e))?;

        fs::write(&config_path, Self::default_config_contents()?)
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e))?;

        log::info!("Created default configuration at {:?}", config_path);
        Ok(())
    }

    /// Text of a freshly generated config file
    pub fn default_config_contents() -> Result<String, ConfigError> {
        let toml_content =
            toml::to_string_pretty(&Config::default()).map_err(ConfigError::SerializeError)?;

        Ok(format!(
            "# CRT Shader Configuration\n\
             #\n\
             # postprocess lists WGSL fragment shaders run over the finished\n\
             # frame in order, e.g. [\"shaders/scanlines.wgsl\"]. Each must\n\
             # declare `fs_main(@location(0) uv: vec2<f32>)` and read the\n\
             # frame from @binding(0) with the sampler at @binding(1).\n\
             \n\
             {toml_content}"
        ))
    }

    /// Postprocess shader paths with relative entries resolved against `base_dir`
    pub fn postprocess_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.shaders
            .postprocess
            .iter()
            .map(|path| {
                if path.is_absolute() {
                    path.clone()
                } else {
                    base_dir.join(path)
                }
            })
            .collect()
    }

    /// Read every postprocess shader, in order
    ///
    /// The chain is all or nothing: the first file that cannot be read fails
    /// the whole load rather than shifting later stages down an index.
    pub fn load_postprocess_sources(&self, base_dir: &Path) -> Result<Vec<String>, ConfigError> {
        self.postprocess_paths(base_dir)
            .into_iter()
            .map(|path| -> Result<String, ConfigError> {
                let source = fs::read_to_string(&path)
                    .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
                log::debug!("Read postprocess shader {:?}", path);
                Ok(source)
            })
            .collect()
    }

    /// Postprocess sources to hand to the shader set
    ///
    /// Same as [`Config::load_postprocess_sources`], except a read failure is
    /// logged and yields an empty chain, so rendering carries on without
    /// postprocessing.
    pub fn load_postprocess_chain(&self, base_dir: &Path) -> Vec<String> {
        self.load_postprocess_sources(base_dir).unwrap_or_else(|e| {
            log::warn!("Postprocessing disabled: {}", e);
            Vec::new()
        })
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// Home directory not found
    NoHomeDirectory,
    /// Failed to read config file
    ReadError(PathBuf, std::io::Error),
    /// Failed to parse config file
    ParseError(PathBuf, toml::de::Error),
    /// Failed to serialize config
    SerializeError(toml::ser::Error),
    /// Failed to write config file
    WriteError(PathBuf, std::io::Error),
    /// Failed to create directory
    CreateDirError(PathBuf, std::io::Error),
    /// Failed to set up file watcher
    WatchError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoHomeDirectory => write!(f, "Could not determine home directory"),
            ConfigError::ReadError(path, e) => write!(f, "Failed to read {:?}: {}", path, e),
            ConfigError::ParseError(path, e) => write!(f, "Failed to parse {:?}: {}", path, e),
            ConfigError::SerializeError(e) => write!(f, "Failed to serialize config: {}", e),
            ConfigError::WriteError(path, e) => write!(f, "Failed to write {:?}: {}", path, e),
            ConfigError::CreateDirError(path, e) => write!(f, "Failed to create {:?}: {}", path, e),
            ConfigError::WatchError(e) => write!(f, "Failed to watch files: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError(_, e)
            | ConfigError::WriteError(_, e)
            | ConfigError::CreateDirError(_, e) => Some(e),
            ConfigError::ParseError(_, e) => Some(e),
            ConfigError::SerializeError(e) => Some(e),
            ConfigError::NoHomeDirectory | ConfigError::WatchError(_) => None,
        }
    }
}
