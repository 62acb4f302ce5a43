//! Errors raised while assembling and compiling shader pipelines

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShaderError {
    /// The pipeline compiler rejected a shader stage or the pipeline itself.
    #[error("failed to compile pipeline '{label}': {message}")]
    Compile { label: String, message: String },

    /// A built-in `#include` target could not be read.
    #[error("failed to read shader include {path:?}: {source}")]
    Include {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Storage for the postprocess chain could not be reserved.
    #[error("out of memory reserving {requested} postprocess pipeline slots")]
    OutOfMemory { requested: usize },
}

impl ShaderError {
    /// Convenience constructor for compiler failures
    pub fn compile(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            label: label.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = ShaderError::compile("postprocess 2", "unknown identifier `foo`");
        let msg = err.to_string();
        assert!(msg.contains("postprocess 2"));
        assert!(msg.contains("unknown identifier"));
    }

    #[test]
    fn test_include_error_keeps_source() {
        let err = ShaderError::Include {
            path: PathBuf::from("shaders/missing.wgsl"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("missing.wgsl"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_out_of_memory_display() {
        let err = ShaderError::OutOfMemory { requested: 4 };
        assert!(err.to_string().contains('4'));
    }
}
