//! Pipeline compiler interface
//!
//! Everything in this crate that creates GPU pipelines goes through
//! [`PipelineCompiler`]. The production implementation is
//! [`crate::gpu::WgpuCompiler`]; tests use [`crate::mock::MockCompiler`].
//!
//! A compiled pipeline is released by dropping it. Owners in this crate
//! decide exactly when each handle is dropped, so every successfully
//! compiled handle is released once and nothing else is.

use crate::error::ShaderError;

/// A resource bound at `@group(0) @binding(index)`, in slice order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBinding {
    /// The per-frame [`crate::Uniforms`] buffer
    Uniforms,
    /// Read-only storage buffer of [`crate::CellBg`] records
    CellBgStorage,
    /// Filterable 2D float texture
    Texture,
    /// Filtering sampler
    Sampler,
}

/// How fragment output combines with the attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blend {
    /// Overwrite the attachment
    Replace,
    /// Shader outputs premultiplied alpha
    PremultipliedAlpha,
}

/// Everything a compiler needs to build one render pipeline
#[derive(Debug, Clone)]
pub struct PipelineDescriptor<'a> {
    pub label: &'a str,
    /// WGSL vertex module, exactly one `@vertex` entry point
    pub vertex_source: &'a str,
    /// WGSL fragment module, exactly one `@fragment` entry point
    pub fragment_source: &'a str,
    /// Per-instance record layout, `None` for passes that only use the
    /// vertex index
    pub instance: Option<wgpu::VertexBufferLayout<'static>>,
    /// Whether vertex input advances per vertex or per instance
    pub step_mode: wgpu::VertexStepMode,
    pub bindings: &'static [ResourceBinding],
    pub blend: Blend,
}

/// Builds pipelines from descriptors
pub trait PipelineCompiler {
    /// Opaque pipeline handle; dropping it releases the pipeline
    type Pipeline;

    /// Compile both stages and link them into a pipeline
    fn compile(&self, desc: &PipelineDescriptor<'_>) -> Result<Self::Pipeline, ShaderError>;
}

impl<C: PipelineCompiler + ?Sized> PipelineCompiler for &C {
    type Pipeline = C::Pipeline;

    fn compile(&self, desc: &PipelineDescriptor<'_>) -> Result<Self::Pipeline, ShaderError> {
        (**self).compile(desc)
    }
}
