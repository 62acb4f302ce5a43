//! Postprocess chain builder
//!
//! Turns caller-supplied WGSL fragment modules into an ordered list of
//! full-screen pipelines. Stage 0 reads the composited frame and every later
//! stage reads the output of the one before it, so order is preserved.
//!
//! Sources are handed to the compiler verbatim. They are user files and are
//! never run through [`crate::include`].

use crate::error::ShaderError;
use crate::pipeline::{Blend, PipelineCompiler, PipelineDescriptor, ResourceBinding};

pub const POSTPROCESS_BINDINGS: &[ResourceBinding] =
    &[ResourceBinding::Texture, ResourceBinding::Sampler];

/// Label given to the pipeline for stage `index`
pub fn stage_label(index: usize) -> String {
    format!("postprocess {index}")
}

/// Compile one pipeline per source, in order
///
/// An empty `sources` returns an empty `Vec` without allocating. Otherwise
/// storage for exactly `sources.len()` pipelines is reserved up front. If
/// stage `k` fails, the `k` pipelines already built are released and the
/// error is returned; nothing is released for stage `k` or later.
pub fn build_postprocess<C, S>(
    compiler: &C,
    full_screen_vertex: &str,
    sources: &[S],
) -> Result<Vec<C::Pipeline>, ShaderError>
where
    C: PipelineCompiler,
    S: AsRef<str>,
{
    if sources.is_empty() {
        return Ok(Vec::new());
    }

    let mut chain = Vec::new();
    chain
        .try_reserve_exact(sources.len())
        .map_err(|_| ShaderError::OutOfMemory {
            requested: sources.len(),
        })?;

    for (index, source) in sources.iter().enumerate() {
        let label = stage_label(index);
        let desc = PipelineDescriptor {
            label: &label,
            vertex_source: full_screen_vertex,
            fragment_source: source.as_ref(),
            instance: None,
            step_mode: wgpu::VertexStepMode::Vertex,
            bindings: POSTPROCESS_BINDINGS,
            blend: Blend::Replace,
        };

        match compiler.compile(&desc) {
            Ok(pipeline) => {
                log::debug!("Built {label}");
                chain.push(pipeline);
            }
            Err(err) => {
                log::debug!(
                    "{label} failed, releasing {} built postprocess pipelines",
                    chain.len()
                );
                drop(chain);
                return Err(err);
            }
        }
    }

    Ok(chain)
}
