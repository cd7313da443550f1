//! wgpu implementation of [`EffectBackend`].

use std::collections::HashMap;

use glam::UVec2;
use wgpu::util::DeviceExt;

use super::{
    BackendError, BackendResult, EffectBackend, MaterialId, ProgramId, TargetId, TextureId,
    check_no_feedback, check_rgba_len, check_target_size,
};
use crate::gpu::GpuContext;
use crate::programs;
use crate::texture::{RenderTarget, Texture};

/// Uniforms shared by every blend program. Layout matches `Uniforms` in
/// [`BLEND_PRELUDE`](crate::programs::BLEND_PRELUDE).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlendUniforms {
    /// Output resolution in pixels.
    resolution: [f32; 2],
    /// `transition_progress`
    progress: f32,
    /// Padding for alignment.
    _pad: f32,
}

struct Program {
    name: String,
    pipeline: wgpu::RenderPipeline,
}

struct Material {
    program: ProgramId,
    uniform_buffer: wgpu::Buffer,
    progress: f32,
    source: Option<TargetId>,
    mask: Option<TextureId>,
}

/// Renders transition effects with wgpu.
///
/// Every program is a fullscreen pass over the output target with the bind group
/// described in [`programs`](crate::programs). Unbound textures sample a 1x1 white
/// fallback, so a material can be blitted before its source or mask is set.
///
/// Render targets are created in [`GpuContext::format`] with a `Depth32Float` depth
/// attachment. Hosts render cameras into them through [`target_view`](Self::target_view)
/// and [`depth_view`](Self::depth_view).
pub struct WgpuBackend {
    gpu: GpuContext,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    fallback: Texture,
    programs: Vec<Program>,
    materials: HashMap<MaterialId, Material>,
    textures: HashMap<TextureId, Texture>,
    targets: HashMap<TargetId, RenderTarget>,
    next_handle: usize,
}

impl WgpuBackend {
    /// Create a backend with no programs registered.
    pub fn new(gpu: GpuContext) -> Self {
        let device = &gpu.device;

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blend Bind Group Layout"),
            entries: &[
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // origin_cam_tex
                texture_entry(1),
                // scene_tex
                texture_entry(2),
                // transition_mask_tex
                texture_entry(3),
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blend Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blend Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let fallback = Texture::white(&gpu);

        Self {
            gpu,
            bind_group_layout,
            pipeline_layout,
            sampler,
            fallback,
            programs: Vec::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            targets: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Create a backend with every built-in program compiled.
    pub fn with_builtin_programs(gpu: GpuContext) -> BackendResult<Self> {
        let mut backend = Self::new(gpu);
        for (name, fragment) in programs::BUILTIN_PROGRAMS {
            backend.register_program(name, fragment)?;
        }
        Ok(backend)
    }

    /// Compile a blend program from its fragment stage and make it findable by `name`.
    ///
    /// `fragment` must define `fn fs` using the bindings of
    /// [`BLEND_PRELUDE`](crate::programs::BLEND_PRELUDE). Registering an existing name
    /// recompiles it in place; materials already created from it pick up the new
    /// pipeline. On a compile error the previous version is kept.
    pub fn register_program(&mut self, name: &str, fragment: &str) -> BackendResult<ProgramId> {
        let pipeline = self.compile(name, fragment)?;

        if let Some(index) = self.programs.iter().position(|p| p.name == name) {
            self.programs[index].pipeline = pipeline;
            log::info!("Recompiled blend program '{}'", name);
            return Ok(ProgramId(index));
        }

        self.programs.push(Program {
            name: name.to_string(),
            pipeline,
        });
        log::debug!("Registered blend program '{}'", name);
        Ok(ProgramId(self.programs.len() - 1))
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Color view of a render target, for rendering a camera into it.
    pub fn target_view(&self, target: TargetId) -> Option<&wgpu::TextureView> {
        self.targets.get(&target).map(|t| &t.color_view)
    }

    /// Depth view of a render target.
    pub fn depth_view(&self, target: TargetId) -> Option<&wgpu::TextureView> {
        self.targets.get(&target).map(|t| &t.depth_view)
    }

    fn compile(&self, name: &str, fragment: &str) -> BackendResult<wgpu::RenderPipeline> {
        let device = &self.gpu.device;
        let source = programs::program_source(fragment);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(name),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Blend program '{}' failed to compile: {}", name, error);
            return Err(BackendError::ProgramCompilation {
                name: name.to_string(),
                message: error.to_string(),
            });
        }
        Ok(pipeline)
    }

    fn next_handle(&mut self) -> usize {
        self.next_handle += 1;
        self.next_handle
    }

    fn material_mut(&mut self, material: MaterialId) -> BackendResult<&mut Material> {
        self.materials
            .get_mut(&material)
            .ok_or(BackendError::UnknownMaterial(material))
    }

    fn new_uniform_buffer(&self) -> wgpu::Buffer {
        self.gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Blend Uniforms"),
                contents: bytemuck::cast_slice(&[BlendUniforms {
                    resolution: [1.0, 1.0],
                    progress: 0.0,
                    _pad: 0.0,
                }]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn target(&self, target: TargetId) -> BackendResult<&RenderTarget> {
        self.targets
            .get(&target)
            .ok_or(BackendError::UnknownTarget(target))
    }
}

impl EffectBackend for WgpuBackend {
    fn find_program(&self, name: &str) -> Option<ProgramId> {
        self.programs
            .iter()
            .position(|p| p.name == name)
            .map(ProgramId)
    }

    fn create_material(&mut self, program: ProgramId) -> BackendResult<MaterialId> {
        if program.0 >= self.programs.len() {
            return Err(BackendError::UnknownProgram(program));
        }
        let uniform_buffer = self.new_uniform_buffer();
        let id = MaterialId(self.next_handle());
        self.materials.insert(
            id,
            Material {
                program,
                uniform_buffer,
                progress: 0.0,
                source: None,
                mask: None,
            },
        );
        Ok(id)
    }

    fn clone_material(&mut self, material: MaterialId) -> BackendResult<MaterialId> {
        let (program, progress, source, mask) = {
            let m = self
                .materials
                .get(&material)
                .ok_or(BackendError::UnknownMaterial(material))?;
            (m.program, m.progress, m.source, m.mask)
        };
        let uniform_buffer = self.new_uniform_buffer();
        let id = MaterialId(self.next_handle());
        self.materials.insert(
            id,
            Material {
                program,
                uniform_buffer,
                progress,
                source,
                mask,
            },
        );
        Ok(id)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        if let Some(m) = self.materials.remove(&material) {
            m.uniform_buffer.destroy();
        }
    }

    fn contains_material(&self, material: MaterialId) -> bool {
        self.materials.contains_key(&material)
    }

    fn set_source_texture(&mut self, material: MaterialId, target: TargetId) -> BackendResult<()> {
        self.target(target)?;
        self.material_mut(material)?.source = Some(target);
        Ok(())
    }

    fn set_mask_texture(&mut self, material: MaterialId, texture: TextureId) -> BackendResult<()> {
        if !self.textures.contains_key(&texture) {
            return Err(BackendError::UnknownTexture(texture));
        }
        self.material_mut(material)?.mask = Some(texture);
        Ok(())
    }

    fn set_progress(&mut self, material: MaterialId, progress: f32) -> BackendResult<()> {
        self.material_mut(material)?.progress = progress;
        Ok(())
    }

    fn create_texture(&mut self, size: UVec2, rgba: &[u8]) -> BackendResult<TextureId> {
        check_rgba_len(size, rgba)?;
        check_target_size(size)?;
        let id = TextureId(self.next_handle());
        let texture = Texture::from_rgba(&self.gpu, rgba, size, &format!("Mask Texture {}", id.0));
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(t) = self.textures.remove(&texture) {
            t.texture.destroy();
        }
    }

    fn contains_texture(&self, texture: TextureId) -> bool {
        self.textures.contains_key(&texture)
    }

    fn create_render_target(&mut self, size: UVec2) -> BackendResult<TargetId> {
        check_target_size(size)?;
        let id = TargetId(self.next_handle());
        let target = RenderTarget::new(&self.gpu, size, &format!("Camera Target {}", id.0));
        self.targets.insert(id, target);
        Ok(id)
    }

    fn release_render_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.remove(&target) {
            t.color.destroy();
            t.depth.destroy();
        }
    }

    fn render_target_size(&self, target: TargetId) -> Option<UVec2> {
        self.targets.get(&target).map(|t| t.size)
    }

    fn blit(
        &mut self,
        material: MaterialId,
        scene: TargetId,
        output: TargetId,
    ) -> BackendResult<()> {
        let m = self
            .materials
            .get(&material)
            .ok_or(BackendError::UnknownMaterial(material))?;
        check_no_feedback(output, scene, m.source)?;

        let scene_view = &self.target(scene)?.color_view;
        let out = self.target(output)?;
        // A source or mask released behind the material's back samples the fallback
        let origin_view = m
            .source
            .and_then(|id| self.targets.get(&id))
            .map_or(&self.fallback.view, |t| &t.color_view);
        let mask_view = m
            .mask
            .and_then(|id| self.textures.get(&id))
            .map_or(&self.fallback.view, |t| &t.view);
        let pipeline = &self.programs[m.program.0].pipeline;

        let uniforms = BlendUniforms {
            resolution: [out.size.x as f32, out.size.y as f32],
            progress: m.progress,
            _pad: 0.0,
        };
        self.gpu
            .queue
            .write_buffer(&m.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blend Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: m.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(origin_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(mask_view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Blend Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blend Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &out.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}
