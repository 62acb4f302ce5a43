//! wgpu pipeline compiler
//!
//! Stages are checked with naga first so a bad shader comes back as a
//! readable [`ShaderError::Compile`] with source spans. Pipeline creation then
//! runs inside a validation error scope, which catches layout mismatches that
//! only the device can see.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::ShaderError;
use crate::pipeline::{Blend, PipelineCompiler, PipelineDescriptor, ResourceBinding};

/// A compiled render pipeline and the bind group layout it expects at group 0
#[derive(Debug)]
pub struct GpuPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Builds [`GpuPipeline`]s for one color target format
#[derive(Debug, Clone)]
pub struct WgpuCompiler {
    device: Arc<wgpu::Device>,
    target_format: wgpu::TextureFormat,
}

impl WgpuCompiler {
    pub fn new(device: Arc<wgpu::Device>, target_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            target_format,
        }
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    fn shader_module(&self, label: &str, stage: &str, source: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} {stage}")),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
        })
    }
}

impl PipelineCompiler for WgpuCompiler {
    type Pipeline = GpuPipeline;

    fn compile(&self, desc: &PipelineDescriptor<'_>) -> Result<GpuPipeline, ShaderError> {
        validate_wgsl(desc.vertex_source)
            .map_err(|message| ShaderError::compile(desc.label, format!("vertex stage: {message}")))?;
        validate_wgsl(desc.fragment_source).map_err(|message| {
            ShaderError::compile(desc.label, format!("fragment stage: {message}"))
        })?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = self.shader_module(desc.label, "vertex", desc.vertex_source);
        let fragment = self.shader_module(desc.label, "fragment", desc.fragment_source);

        let entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| layout_entry(index as u32, *binding))
            .collect();

        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Bind Group Layout", desc.label)),
                entries: &entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Pipeline Layout", desc.label)),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let buffers: Vec<wgpu::VertexBufferLayout<'static>> = desc
            .instance
            .iter()
            .map(|layout| wgpu::VertexBufferLayout {
                step_mode: desc.step_mode,
                ..layout.clone()
            })
            .collect();

        let blend = match desc.blend {
            Blend::Replace => wgpu::BlendState::REPLACE,
            Blend::PremultipliedAlpha => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: None,
                    buffers: &buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: None,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ShaderError::compile(desc.label, err.to_string()));
        }

        log::debug!("Created render pipeline '{}'", desc.label);
        Ok(GpuPipeline {
            pipeline,
            bind_group_layout,
        })
    }
}

fn layout_entry(binding: u32, resource: ResourceBinding) -> wgpu::BindGroupLayoutEntry {
    let (visibility, ty) = match resource {
        ResourceBinding::Uniforms => (
            wgpu::ShaderStages::VERTEX_FRAGMENT,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        ),
        ResourceBinding::CellBgStorage => (
            wgpu::ShaderStages::VERTEX_FRAGMENT,
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
        ),
        ResourceBinding::Texture => (
            wgpu::ShaderStages::FRAGMENT,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
        ),
        ResourceBinding::Sampler => (
            wgpu::ShaderStages::FRAGMENT,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        ),
    };

    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

/// Parse and validate a WGSL module, returning naga's rendered diagnostic
pub fn validate_wgsl(source: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(source))?;
    Ok(module)
}
