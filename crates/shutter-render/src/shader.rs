//! Shader program manager
//!
//! A program is one vertex stage + one fragment stage, each chosen from the
//! fixed WGSL variants and prefixed with the shared prelude, linked into a
//! render pipeline per target format. Compile and link failures are logged
//! and leave the program invalid rather than aborting.

use crate::context::{GpuContext, DEPTH_FORMAT};
use crate::resources::SharedBindings;
use crate::uniforms::{UniformBlock, UniformValue};
use shutter_core::{ShaderPair, ShaderVariant, VertexLayout};
use std::path::Path;

pub const PRELUDE: &str = include_str!("shaders/prelude.wgsl");

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

/// Variant body for one stage, without the prelude
pub fn stage_body(variant: ShaderVariant, stage: Stage) -> &'static str {
    match (variant, stage) {
        (ShaderVariant::Default, Stage::Vertex) => include_str!("shaders/default.vert.wgsl"),
        (ShaderVariant::NoTexture, Stage::Vertex) => include_str!("shaders/notexture.vert.wgsl"),
        (ShaderVariant::Textured, Stage::Vertex) => include_str!("shaders/textured.vert.wgsl"),
        (ShaderVariant::FaceIndex, Stage::Vertex) => include_str!("shaders/faceidx.vert.wgsl"),
        (ShaderVariant::Flat, Stage::Vertex) => include_str!("shaders/flat.vert.wgsl"),
        (ShaderVariant::Default, Stage::Fragment) => include_str!("shaders/default.frag.wgsl"),
        (ShaderVariant::NoTexture, Stage::Fragment) => include_str!("shaders/notexture.frag.wgsl"),
        (ShaderVariant::Textured, Stage::Fragment) => include_str!("shaders/textured.frag.wgsl"),
        (ShaderVariant::FaceIndex, Stage::Fragment) => include_str!("shaders/faceidx.frag.wgsl"),
        (ShaderVariant::Flat, Stage::Fragment) => include_str!("shaders/flat.frag.wgsl"),
    }
}

/// Complete WGSL module text for a stage body
pub fn with_prelude(body: &str) -> String {
    format!("{}\n{}", PRELUDE, body)
}

/// Read a stage body from disk. A read failure is logged and yields an
/// empty body, which then fails to compile.
pub fn read_stage_file(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to read shader file {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// Compiled stages linked into one pipeline per target format, plus the
/// program's CPU-side uniform block
pub struct ShaderProgram {
    label: String,
    layout: VertexLayout,
    pipelines: Vec<(wgpu::TextureFormat, wgpu::RenderPipeline)>,
    uniforms: UniformBlock,
}

impl ShaderProgram {
    /// Build the program for a variant pair
    pub fn new(
        gpu: &GpuContext,
        bindings: &SharedBindings,
        pair: ShaderPair,
        formats: &[wgpu::TextureFormat],
    ) -> Self {
        Self::from_sources(
            gpu,
            bindings,
            &format!("{}+{}", pair.vertex, pair.fragment),
            stage_body(pair.vertex, Stage::Vertex),
            stage_body(pair.fragment, Stage::Fragment),
            pair.layout(),
            formats,
        )
    }

    /// Build a program from WGSL stage files on disk
    pub fn from_files(
        gpu: &GpuContext,
        bindings: &SharedBindings,
        vertex_path: &Path,
        fragment_path: &Path,
        layout: VertexLayout,
        formats: &[wgpu::TextureFormat],
    ) -> Self {
        let vertex = read_stage_file(vertex_path);
        let fragment = read_stage_file(fragment_path);
        let label = format!("{}+{}", vertex_path.display(), fragment_path.display());
        Self::from_sources(gpu, bindings, &label, &vertex, &fragment, layout, formats)
    }

    /// Compile both stage bodies and link them. Stage modules are dropped on
    /// return whether or not linking succeeded.
    pub fn from_sources(
        gpu: &GpuContext,
        bindings: &SharedBindings,
        label: &str,
        vertex_body: &str,
        fragment_body: &str,
        layout: VertexLayout,
        formats: &[wgpu::TextureFormat],
    ) -> Self {
        let vertex = compile_stage(&gpu.device, label, Stage::Vertex, vertex_body);
        let fragment = compile_stage(&gpu.device, label, Stage::Fragment, fragment_body);

        let mut pipelines = Vec::new();
        match (&vertex, &fragment) {
            (Some(vs), Some(fs)) => {
                for &format in formats {
                    if let Some(pipeline) = link(&gpu.device, bindings, label, vs, fs, layout, format) {
                        pipelines.push((format, pipeline));
                    }
                }
            }
            _ => log::error!("Program {} not linked: a stage failed to compile", label),
        }

        if pipelines.is_empty() {
            log::warn!("Program {} is invalid; its draws will be skipped", label);
        } else {
            log::debug!("Program {} linked for {} target format(s)", label, pipelines.len());
        }

        Self {
            label: label.to_string(),
            layout,
            pipelines,
            uniforms: UniformBlock::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn is_valid(&self) -> bool {
        !self.pipelines.is_empty()
    }

    pub fn pipeline(&self, format: wgpu::TextureFormat) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.iter().find(|(f, _)| *f == format).map(|(_, p)| p)
    }

    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.uniforms.set(name, value);
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }
}

fn stage_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Vertex => "vertex",
        Stage::Fragment => "fragment",
    }
}

fn compile_stage(device: &wgpu::Device, label: &str, stage: Stage, body: &str) -> Option<wgpu::ShaderModule> {
    if body.trim().is_empty() {
        log::error!("ERROR::SHADER::{}::COMPILATION_FAILED ({}): empty source", stage_name(stage).to_uppercase(), label);
        return None;
    }

    let source = with_prelude(body);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        None => Some(module),
        Some(error) => {
            log::error!(
                "ERROR::SHADER::{}::COMPILATION_FAILED ({})\n{}",
                stage_name(stage).to_uppercase(),
                label,
                error
            );
            None
        }
    }
}

fn vertex_attributes(layout: VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|attr| wgpu::VertexAttribute {
            format: match attr.components {
                2 => wgpu::VertexFormat::Float32x2,
                4 => wgpu::VertexFormat::Float32x4,
                _ => wgpu::VertexFormat::Float32x3,
            },
            offset: attr.offset,
            shader_location: attr.slot,
        })
        .collect()
}

fn link(
    device: &wgpu::Device,
    bindings: &SharedBindings,
    label: &str,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    layout: VertexLayout,
    format: wgpu::TextureFormat,
) -> Option<wgpu::RenderPipeline> {
    let attributes = vertex_attributes(layout);

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&bindings.pipeline_layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: layout.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        None => Some(pipeline),
        Some(error) => {
            log::error!("ERROR::SHADER::PROGRAM::LINKING_FAILED ({}, {:?})\n{}", label, format, error);
            None
        }
    }
}
