//! Common test utilities and harness
//!
//! Provides an isolated config directory with helpers to write a config
//! file and postprocess shaders into it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Test environment with isolated config directory
pub struct TestEnvironment {
    /// Temporary directory for test config
    pub temp_dir: TempDir,
    /// Path to the config directory
    pub config_dir: PathBuf,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_dir = temp_dir.path().to_path_buf();

        std::fs::create_dir_all(config_dir.join("shaders"))
            .expect("Failed to create shaders directory");

        Self {
            temp_dir,
            config_dir,
        }
    }

    /// Write a test config file
    pub fn write_config(&self, content: &str) -> PathBuf {
        let config_path = self.config_path();
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    /// Write a postprocess shader under shaders/
    pub fn write_shader(&self, name: &str, content: &str) -> PathBuf {
        let shader_path = self.config_dir.join("shaders").join(name);
        std::fs::write(&shader_path, content).expect("Failed to write test shader");
        shader_path
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// A postprocess shader that passes the frame through
pub const PASSTHROUGH: &str = r#"
@group(0) @binding(0) var frame: texture_2d<f32>;
@group(0) @binding(1) var frame_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(frame, frame_sampler, uv);
}
"#;

/// A postprocess shader that does not parse
pub const BROKEN: &str = "@fragment fn fs_main( -> {";
