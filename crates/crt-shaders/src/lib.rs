//! CRT Shaders - pipeline set for the cell renderer
//!
//! This crate owns every render pipeline the terminal draws with:
//! - Built-in pipelines: cell text, cell background and image placements,
//!   assembled from embedded WGSL fragments
//! - Postprocess chain: user fragment shaders applied in order to the
//!   finished frame
//!
//! It also defines the byte layouts the renderer writes every frame (instance
//! records and uniforms). Pipeline creation goes through [`PipelineCompiler`],
//! so everything except [`gpu`] can be exercised without a GPU.

pub mod builtin;
pub mod error;
pub mod gpu;
pub mod include;
pub mod layout;
pub mod mock;
pub mod pipeline;
pub mod postprocess;
pub mod shader_set;
pub mod shaders;

pub use builtin::BuiltinSources;
pub use error::ShaderError;
pub use gpu::{GpuPipeline, WgpuCompiler};
pub use include::{EmbeddedLoader, FsLoader, IncludeLoader};
pub use layout::{CellBg, CellText, CellTextMode, FrameFlags, Image, PaddingExtend, Uniforms};
pub use pipeline::{Blend, PipelineCompiler, PipelineDescriptor, ResourceBinding};
pub use postprocess::build_postprocess;
pub use shader_set::ShaderSet;
