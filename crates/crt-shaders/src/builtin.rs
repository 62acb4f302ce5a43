//! Built-in pipeline constructors
//!
//! Text, background and image pipelines are fixed: each picks its expanded
//! WGSL, its instance layout and step mode, and hands the rest to the
//! compiler. Errors come back unchanged.

use std::path::Path;

use crate::error::ShaderError;
use crate::include::{self, IncludeLoader};
use crate::layout::{CellText, Image};
use crate::pipeline::{Blend, PipelineCompiler, PipelineDescriptor, ResourceBinding};
use crate::shaders;

pub const TEXT_BINDINGS: &[ResourceBinding] = &[
    ResourceBinding::Uniforms,
    ResourceBinding::CellBgStorage,
    ResourceBinding::Texture,
    ResourceBinding::Texture,
];

pub const BACKGROUND_BINDINGS: &[ResourceBinding] = &[
    ResourceBinding::Uniforms,
    ResourceBinding::CellBgStorage,
];

pub const IMAGE_BINDINGS: &[ResourceBinding] = &[
    ResourceBinding::Uniforms,
    ResourceBinding::Texture,
    ResourceBinding::Sampler,
];

/// Expanded WGSL for every built-in stage
#[derive(Debug, Clone)]
pub struct BuiltinSources {
    pub full_screen_vertex: String,
    pub cell_text_vertex: String,
    pub cell_text_fragment: String,
    pub cell_bg_fragment: String,
    pub image_vertex: String,
    pub image_fragment: String,
}

impl BuiltinSources {
    /// Expand the shaders embedded in this crate
    pub fn embedded() -> Result<Self, ShaderError> {
        Self::load(shaders::embedded())
    }

    /// Expand each entry file in [`crate::shaders`] through `loader`
    pub fn load<L: IncludeLoader + ?Sized>(loader: &L) -> Result<Self, ShaderError> {
        let expand = |name: &str| -> Result<String, ShaderError> {
            let path = Path::new(name);
            let source = loader.load(path).map_err(|source| ShaderError::Include {
                path: path.to_path_buf(),
                source,
            })?;
            include::expand_with(&source, &include::base_dir_of(path), loader)
        };

        let sources = Self {
            full_screen_vertex: expand(shaders::FULL_SCREEN_VERTEX)?,
            cell_text_vertex: expand(shaders::CELL_TEXT_VERTEX)?,
            cell_text_fragment: expand(shaders::CELL_TEXT_FRAGMENT)?,
            cell_bg_fragment: expand(shaders::CELL_BG_FRAGMENT)?,
            image_vertex: expand(shaders::IMAGE_VERTEX)?,
            image_fragment: expand(shaders::IMAGE_FRAGMENT)?,
        };
        log::debug!("Expanded built-in shader sources");
        Ok(sources)
    }
}

/// Foreground glyphs, one instance per [`CellText`]
pub fn text_pipeline<C: PipelineCompiler>(
    compiler: &C,
    sources: &BuiltinSources,
) -> Result<C::Pipeline, ShaderError> {
    compiler.compile(&PipelineDescriptor {
        label: "cell text",
        vertex_source: &sources.cell_text_vertex,
        fragment_source: &sources.cell_text_fragment,
        instance: Some(CellText::desc()),
        step_mode: wgpu::VertexStepMode::Instance,
        bindings: TEXT_BINDINGS,
        blend: Blend::PremultipliedAlpha,
    })
}

/// Cell backgrounds, one full-screen pass reading the cell color buffer
pub fn background_pipeline<C: PipelineCompiler>(
    compiler: &C,
    sources: &BuiltinSources,
) -> Result<C::Pipeline, ShaderError> {
    compiler.compile(&PipelineDescriptor {
        label: "cell bg",
        vertex_source: &sources.full_screen_vertex,
        fragment_source: &sources.cell_bg_fragment,
        instance: None,
        step_mode: wgpu::VertexStepMode::Vertex,
        bindings: BACKGROUND_BINDINGS,
        blend: Blend::Replace,
    })
}

/// Image placements, one instance per [`Image`]
pub fn image_pipeline<C: PipelineCompiler>(
    compiler: &C,
    sources: &BuiltinSources,
) -> Result<C::Pipeline, ShaderError> {
    compiler.compile(&PipelineDescriptor {
        label: "image",
        vertex_source: &sources.image_vertex,
        fragment_source: &sources.image_fragment,
        instance: Some(Image::desc()),
        step_mode: wgpu::VertexStepMode::Instance,
        bindings: IMAGE_BINDINGS,
        blend: Blend::PremultipliedAlpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::EmbeddedLoader;
    use crate::mock::{MockCompiler, MockEvent};

    fn validate(label: &str, source: &str) {
        if let Err(message) = crate::gpu::validate_wgsl(source) {
            panic!("{label}: {message}");
        }
    }

    #[test]
    fn test_embedded_sources_expand_fully() {
        let sources = BuiltinSources::embedded().unwrap();
        for src in [
            &sources.full_screen_vertex,
            &sources.cell_text_vertex,
            &sources.cell_text_fragment,
            &sources.cell_bg_fragment,
            &sources.image_vertex,
            &sources.image_fragment,
        ] {
            assert!(!src.contains("#include"));
        }
        assert!(sources.cell_text_vertex.contains("struct Uniforms"));
        assert!(sources.image_vertex.contains("fn quad_corner"));
        assert!(sources.full_screen_vertex.contains("fn quad_corner"));
    }

    #[test]
    fn test_embedded_sources_are_valid_wgsl() {
        let sources = BuiltinSources::embedded().unwrap();
        validate("full screen", &sources.full_screen_vertex);
        validate("cell text vertex", &sources.cell_text_vertex);
        validate("cell text fragment", &sources.cell_text_fragment);
        validate("cell bg fragment", &sources.cell_bg_fragment);
        validate("image vertex", &sources.image_vertex);
        validate("image fragment", &sources.image_fragment);
    }

    #[test]
    fn test_missing_fragment_fails_load() {
        let loader = EmbeddedLoader::new(&[("full_screen.wgsl", "#include \"quad.wgsl\"")]);
        let err = BuiltinSources::load(&loader).unwrap_err();
        assert!(matches!(err, ShaderError::Include { .. }));
    }

    #[test]
    fn test_text_pipeline_is_instanced() {
        let compiler = MockCompiler::new();
        let sources = BuiltinSources::embedded().unwrap();
        let _text = text_pipeline(&compiler, &sources).unwrap();

        let desc = compiler.last_descriptor().unwrap();
        assert_eq!(desc.label, "cell text");
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(desc.instance_stride, Some(32));
        assert_eq!(desc.vertex_source, sources.cell_text_vertex);
    }

    #[test]
    fn test_background_pipeline_is_full_screen() {
        let compiler = MockCompiler::new();
        let sources = BuiltinSources::embedded().unwrap();
        let _bg = background_pipeline(&compiler, &sources).unwrap();

        let desc = compiler.last_descriptor().unwrap();
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Vertex);
        assert_eq!(desc.instance_stride, None);
        assert_eq!(desc.vertex_source, sources.full_screen_vertex);
    }

    #[test]
    fn test_image_pipeline_is_instanced() {
        let compiler = MockCompiler::new();
        let sources = BuiltinSources::embedded().unwrap();
        let _image = image_pipeline(&compiler, &sources).unwrap();

        let desc = compiler.last_descriptor().unwrap();
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(desc.instance_stride, Some(48));
    }

    #[test]
    fn test_compiler_error_is_returned_unchanged() {
        let compiler = MockCompiler::new().fail_on_label("image");
        let sources = BuiltinSources::embedded().unwrap();
        let err = image_pipeline(&compiler, &sources).unwrap_err();
        match err {
            ShaderError::Compile { label, .. } => assert_eq!(label, "image"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(compiler.events(), vec![MockEvent::Failed("image".to_string())]);
    }
}
