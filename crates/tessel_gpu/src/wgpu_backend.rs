//! wgpu device backend
//!
//! Draw calls are recorded into passes as they arrive and encoded into a single
//! command buffer at [`GpuBackend::end_frame`]. Uniform values are snapshotted per
//! draw into a frame-wide arena bound with dynamic offsets, so setting a uniform
//! between two draws behaves like it does on an immediate-mode API.
//!
//! Render pipelines are built lazily from (shader, vertex layout, target formats,
//! depth test, blend mode) and cached until their shader is released.

use std::num::NonZeroU64;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use tessel_core::{
    BlendMode, BufferDesc, BufferId, BufferKind, ClearValue, CoreError, DrawCall, FramebufferId,
    GpuBackend, GpuResource, PassTarget, ReleaseQueue, Result as CoreResult, ShaderId,
    ShaderReflection, ShaderSource, TextureDesc, TextureFormat, TextureId, UniformValue,
    VertexLayoutDesc,
};
use wgpu::util::DeviceExt;

use crate::error::{GpuError, Result};
use crate::reflect::reflect_wgsl;

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_ascii_lowercase())
}

/// Backend configuration
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Adapter selection preference
    pub power_preference: wgpu::PowerPreference,
    /// Surface presentation mode
    pub present_mode: wgpu::PresentMode,
    /// Override the surface format (defaults to the adapter's preferred format)
    pub surface_format: Option<wgpu::TextureFormat>,
    /// Initial size of the per-frame uniform arena in bytes
    pub initial_uniform_bytes: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            present_mode: wgpu::PresentMode::AutoVsync,
            surface_format: None,
            initial_uniform_bytes: 64 * 1024,
        }
    }
}

impl BackendConfig {
    /// Apply `TESSEL_GPU_POWER` (`low`/`high`) and `TESSEL_GPU_PRESENT_MODE`
    /// (`fifo`/`immediate`/`mailbox`/`auto`) overrides
    pub fn with_env_overrides(mut self) -> Self {
        match env_string("TESSEL_GPU_POWER").as_deref() {
            Some("low") => self.power_preference = wgpu::PowerPreference::LowPower,
            Some("high") => self.power_preference = wgpu::PowerPreference::HighPerformance,
            Some(other) => tracing::warn!("ignoring TESSEL_GPU_POWER={}", other),
            None => {}
        }
        match env_string("TESSEL_GPU_PRESENT_MODE").as_deref() {
            Some("fifo") => self.present_mode = wgpu::PresentMode::Fifo,
            Some("immediate") => self.present_mode = wgpu::PresentMode::Immediate,
            Some("mailbox") => self.present_mode = wgpu::PresentMode::Mailbox,
            Some("auto") => self.present_mode = wgpu::PresentMode::AutoVsync,
            Some(other) => tracing::warn!("ignoring TESSEL_GPU_PRESENT_MODE={}", other),
            None => {}
        }
        self
    }
}

fn log_backend_config(config: &BackendConfig, adapter: &wgpu::Adapter) {
    let info = adapter.get_info();
    tracing::info!(
        "gpu backend: adapter={} ({:?}), power={:?}, present_mode={:?}, uniform_arena={} KiB",
        info.name,
        info.backend,
        config.power_preference,
        config.present_mode,
        config.initial_uniform_bytes / 1024
    );
}

fn map_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

fn vertex_format(components: u32) -> Result<wgpu::VertexFormat> {
    match components {
        1 => Ok(wgpu::VertexFormat::Float32),
        2 => Ok(wgpu::VertexFormat::Float32x2),
        3 => Ok(wgpu::VertexFormat::Float32x3),
        4 => Ok(wgpu::VertexFormat::Float32x4),
        other => Err(GpuError::UnsupportedAttribute(other)),
    }
}

fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    match mode {
        BlendMode::Replace => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Premultiplied => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource storage
// ─────────────────────────────────────────────────────────────────────────────

struct BufferEntry {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    desc: TextureDesc,
}

struct ShaderEntry {
    module: wgpu::ShaderModule,
    reflection: ShaderReflection,
    /// CPU copy of the uniform block, snapshotted into the arena on every draw
    staging: Vec<u8>,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
}

struct FramebufferEntry {
    color: SmallVec<[TextureId; 4]>,
    depth: Option<TextureId>,
}

/// Depth (and, without a surface, color) attachments of the default framebuffer
struct ScreenTarget {
    color: Option<wgpu::Texture>,
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    shader: ShaderId,
    layout: VertexLayoutDesc,
    color_formats: SmallVec<[wgpu::TextureFormat; 4]>,
    depth_format: Option<wgpu::TextureFormat>,
    depth_test: bool,
    blend: BlendMode,
}

struct RecordedDraw {
    shader: ShaderId,
    layout: VertexLayoutDesc,
    vertex_buffer: BufferId,
    vertex_count: u32,
    indices: Option<(BufferId, u32)>,
    uniform_offset: u32,
    textures: SmallVec<[(u32, TextureId); 4]>,
    depth_test: bool,
    blend: BlendMode,
    viewport: (u32, u32),
}

struct RecordedPass {
    target: PassTarget,
    clear: Option<ClearValue>,
    draws: Vec<RecordedDraw>,
}

/// Formats and size of a pass target, resolved at encode time
struct TargetInfo {
    color_formats: SmallVec<[wgpu::TextureFormat; 4]>,
    depth_format: Option<wgpu::TextureFormat>,
    size: (u32, u32),
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// [`GpuBackend`] on top of a wgpu device
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface: Option<(wgpu::Surface<'static>, wgpu::SurfaceConfiguration)>,
    screen_format: wgpu::TextureFormat,
    screen: ScreenTarget,
    size: (u32, u32),
    viewport: (u32, u32),

    buffers: SlotMap<BufferId, BufferEntry>,
    textures: SlotMap<TextureId, TextureEntry>,
    shaders: SlotMap<ShaderId, ShaderEntry>,
    framebuffers: SlotMap<FramebufferId, FramebufferEntry>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    sampler: wgpu::Sampler,

    uniform_buffer: wgpu::Buffer,
    uniform_capacity: u64,
    uniform_alignment: usize,
    uniform_arena: Vec<u8>,

    passes: Vec<RecordedPass>,
    depth_test: bool,
    blend: BlendMode,
    bound_textures: FxHashMap<u32, TextureId>,
    release_queue: ReleaseQueue,
}

impl WgpuBackend {
    /// Create a backend rendering into an offscreen color target
    pub fn headless(width: u32, height: u32, config: BackendConfig) -> Result<Self> {
        pollster::block_on(Self::create(None, width, height, config))
    }

    /// Create a backend presenting to a window surface
    pub fn with_surface<W>(window: Arc<W>, width: u32, height: u32, config: BackendConfig) -> Result<Self>
    where
        W: raw_window_handle::HasWindowHandle
            + raw_window_handle::HasDisplayHandle
            + Send
            + Sync
            + 'static,
    {
        let instance = Self::instance();
        let surface = instance.create_surface(window)?;
        pollster::block_on(Self::create(Some((instance, surface)), width, height, config))
    }

    fn instance() -> wgpu::Instance {
        wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        })
    }

    async fn create(
        surface: Option<(wgpu::Instance, wgpu::Surface<'static>)>,
        width: u32,
        height: u32,
        config: BackendConfig,
    ) -> Result<Self> {
        let config = config.with_env_overrides();
        let (instance, surface) = match surface {
            Some((instance, surface)) => (instance, Some(surface)),
            None => (Self::instance(), None),
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::AdapterNotFound)?;
        log_backend_config(&config, &adapter);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Tessel Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let (width, height) = (width.max(1), height.max(1));
        let surface = match surface {
            Some(surface) => {
                let mut surface_config = surface
                    .get_default_config(&adapter, width, height)
                    .ok_or(GpuError::AdapterNotFound)?;
                surface_config.present_mode = config.present_mode;
                if let Some(format) = config.surface_format {
                    surface_config.format = format;
                }
                surface.configure(&device, &surface_config);
                Some((surface, surface_config))
            }
            None => None,
        };
        let screen_format = surface
            .as_ref()
            .map(|(_, c)| c.format)
            .or(config.surface_format)
            .unwrap_or(wgpu::TextureFormat::Rgba8Unorm);
        let screen = Self::create_screen_target(&device, screen_format, width, height, surface.is_none());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Tessel Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_capacity = config.initial_uniform_bytes.max(256);
        let uniform_buffer = Self::create_uniform_buffer(&device, uniform_capacity);
        let uniform_alignment = device.limits().min_uniform_buffer_offset_alignment as usize;

        Ok(Self {
            device,
            queue,
            surface,
            screen_format,
            screen,
            size: (width, height),
            viewport: (width, height),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            shaders: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            pipelines: FxHashMap::default(),
            sampler,
            uniform_buffer,
            uniform_capacity,
            uniform_alignment,
            uniform_arena: Vec::new(),
            passes: Vec::new(),
            depth_test: false,
            blend: BlendMode::default(),
            bound_textures: FxHashMap::default(),
            release_queue: ReleaseQueue::new(),
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Tessel Uniform Arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_screen_target(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        offscreen: bool,
    ) -> ScreenTarget {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = offscreen.then(|| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Tessel Offscreen Color"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Tessel Screen Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        ScreenTarget {
            color,
            depth,
            depth_view,
        }
    }

    fn create_bind_group_layouts(
        device: &wgpu::Device,
        reflection: &ShaderReflection,
    ) -> (wgpu::BindGroupLayout, wgpu::BindGroupLayout) {
        let mut uniform_entries = Vec::new();
        if reflection.uniform_block_size > 0 {
            uniform_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(reflection.uniform_block_size as u64),
                },
                count: None,
            });
        }

        let mut texture_entries = Vec::new();
        for texture in &reflection.textures {
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture.unit * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: if texture.depth {
                        wgpu::TextureSampleType::Depth
                    } else {
                        wgpu::TextureSampleType::Float { filterable: true }
                    },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            if texture.sampled {
                texture_entries.push(wgpu::BindGroupLayoutEntry {
                    binding: texture.unit * 2 + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
        }

        let uniform = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tessel Uniform Layout"),
            entries: &uniform_entries,
        });
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tessel Texture Layout"),
            entries: &texture_entries,
        });
        (uniform, textures)
    }

    fn target_info(&self, target: PassTarget) -> CoreResult<TargetInfo> {
        match target {
            PassTarget::Screen => Ok(TargetInfo {
                color_formats: smallvec::smallvec![self.screen_format],
                depth_format: Some(wgpu::TextureFormat::Depth32Float),
                size: self.size,
            }),
            PassTarget::Framebuffer(id) => {
                let fb = self.framebuffers.get(id).ok_or(CoreError::StaleHandle("framebuffer"))?;
                let mut color_formats = SmallVec::new();
                let mut size = self.size;
                for (i, &texture) in fb.color.iter().enumerate() {
                    let entry = self.textures.get(texture).ok_or(CoreError::StaleHandle("texture"))?;
                    if i == 0 {
                        size = (entry.desc.width, entry.desc.height);
                    }
                    color_formats.push(map_format(entry.desc.format));
                }
                let depth_format = match fb.depth {
                    Some(texture) => Some(map_format(
                        self.textures
                            .get(texture)
                            .ok_or(CoreError::StaleHandle("texture"))?
                            .desc
                            .format,
                    )),
                    None => None,
                };
                Ok(TargetInfo {
                    color_formats,
                    depth_format,
                    size,
                })
            }
        }
    }

    fn pipeline_key(draw: &RecordedDraw, info: &TargetInfo) -> PipelineKey {
        PipelineKey {
            shader: draw.shader,
            layout: draw.layout.clone(),
            color_formats: info.color_formats.clone(),
            depth_format: info.depth_format,
            depth_test: draw.depth_test && info.depth_format.is_some(),
            blend: draw.blend,
        }
    }

    fn ensure_pipeline(&mut self, key: &PipelineKey) -> CoreResult<()> {
        if self.pipelines.contains_key(key) {
            return Ok(());
        }
        let shader = self.shaders.get(key.shader).ok_or(CoreError::StaleHandle("shader"))?;

        let attributes = key
            .layout
            .attributes
            .iter()
            .map(|a| {
                Ok(wgpu::VertexAttribute {
                    format: vertex_format(a.components)?,
                    offset: a.offset as u64 * 4,
                    shader_location: a.location,
                })
            })
            .collect::<Result<SmallVec<[wgpu::VertexAttribute; 4]>>>()?;
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: key.layout.stride as u64 * 4,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        };

        let blend = blend_state(key.blend);
        let targets: Vec<Option<wgpu::ColorTargetState>> = key
            .color_formats
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let depth_stencil = key.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: key.depth_test,
            depth_compare: if key.depth_test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Tessel Pipeline"),
            layout: Some(&shader.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader.module,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader.module,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        tracing::debug!("created pipeline for shader {:?} ({} targets)", key.shader, key.color_formats.len());
        self.pipelines.insert(key.clone(), pipeline);
        Ok(())
    }

    fn upload_uniforms(&mut self) {
        if self.uniform_arena.is_empty() {
            return;
        }
        let needed = self.uniform_arena.len() as u64;
        if needed > self.uniform_capacity {
            self.uniform_capacity = needed.next_power_of_two();
            self.uniform_buffer = Self::create_uniform_buffer(&self.device, self.uniform_capacity);
            tracing::debug!("uniform arena grown to {} KiB", self.uniform_capacity / 1024);
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_arena);
    }

    fn uniform_bind_group(&self, shader: &ShaderEntry) -> wgpu::BindGroup {
        let size = shader.reflection.uniform_block_size as u64;
        let entries: Vec<wgpu::BindGroupEntry> = if size > 0 {
            vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(size),
                }),
            }]
        } else {
            Vec::new()
        };
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tessel Uniform Group"),
            layout: &shader.uniform_layout,
            entries: &entries,
        })
    }

    fn texture_bind_group(&self, shader: &ShaderEntry, draw: &RecordedDraw) -> CoreResult<wgpu::BindGroup> {
        let mut entries = Vec::new();
        for (reflected, &(unit, texture)) in shader.reflection.textures.iter().zip(draw.textures.iter()) {
            let entry = self.textures.get(texture).ok_or(CoreError::StaleHandle("texture"))?;
            entries.push(wgpu::BindGroupEntry {
                binding: unit * 2,
                resource: wgpu::BindingResource::TextureView(&entry.view),
            });
            if reflected.sampled {
                entries.push(wgpu::BindGroupEntry {
                    binding: unit * 2 + 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                });
            }
        }
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tessel Texture Group"),
            layout: &shader.texture_layout,
            entries: &entries,
        }))
    }

    fn reconfigure_surface(&mut self) {
        if let Some((surface, config)) = &mut self.surface {
            config.width = self.size.0;
            config.height = self.size.1;
            surface.configure(&self.device, config);
        }
    }

    fn encode_passes(&mut self, passes: &[RecordedPass], screen_view: &wgpu::TextureView) -> CoreResult<()> {
        let mut infos = Vec::with_capacity(passes.len());
        for pass in passes {
            let info = self.target_info(pass.target)?;
            for draw in &pass.draws {
                self.ensure_pipeline(&Self::pipeline_key(draw, &info))?;
            }
            infos.push(info);
        }
        self.upload_uniforms();

        let mut uniform_groups: FxHashMap<ShaderId, wgpu::BindGroup> = FxHashMap::default();
        let mut texture_groups: Vec<Vec<wgpu::BindGroup>> = Vec::with_capacity(passes.len());
        for pass in passes {
            let mut groups = Vec::with_capacity(pass.draws.len());
            for draw in &pass.draws {
                let shader = self.shaders.get(draw.shader).ok_or(CoreError::StaleHandle("shader"))?;
                if !uniform_groups.contains_key(&draw.shader) {
                    uniform_groups.insert(draw.shader, self.uniform_bind_group(shader));
                }
                groups.push(self.texture_bind_group(shader, draw)?);
            }
            texture_groups.push(groups);
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Tessel Frame Encoder"),
        });

        for ((pass, info), groups) in passes.iter().zip(&infos).zip(&texture_groups) {
            let mut color_views: SmallVec<[&wgpu::TextureView; 4]> = SmallVec::new();
            let depth_view = match pass.target {
                PassTarget::Screen => {
                    color_views.push(screen_view);
                    Some(&self.screen.depth_view)
                }
                PassTarget::Framebuffer(id) => {
                    let fb = self.framebuffers.get(id).ok_or(CoreError::StaleHandle("framebuffer"))?;
                    for &texture in &fb.color {
                        color_views.push(&self.textures.get(texture).ok_or(CoreError::StaleHandle("texture"))?.view);
                    }
                    match fb.depth {
                        Some(texture) => Some(&self.textures.get(texture).ok_or(CoreError::StaleHandle("texture"))?.view),
                        None => None,
                    }
                }
            };

            let color_load = match pass.clear {
                Some(clear) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: clear.color[0] as f64,
                    g: clear.color[1] as f64,
                    b: clear.color[2] as f64,
                    a: clear.color[3] as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_views
                .iter()
                .map(|view| {
                    Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: color_load,
                            store: wgpu::StoreOp::Store,
                        },
                    })
                })
                .collect();
            let depth_attachment = depth_view.map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: match pass.clear.and_then(|c| c.depth) {
                        Some(depth) => wgpu::LoadOp::Clear(depth),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            });

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Tessel Pass"),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for (draw, texture_group) in pass.draws.iter().zip(groups) {
                let (Some(pipeline), Some(vertices), Some(uniforms)) = (
                    self.pipelines.get(&Self::pipeline_key(draw, info)),
                    self.buffers.get(draw.vertex_buffer),
                    uniform_groups.get(&draw.shader),
                ) else {
                    tracing::warn!("skipping draw with released resources");
                    continue;
                };
                let width = draw.viewport.0.min(info.size.0);
                let height = draw.viewport.1.min(info.size.1);
                if width == 0 || height == 0 {
                    continue;
                }
                rpass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
                rpass.set_pipeline(pipeline);

                let has_uniforms = self
                    .shaders
                    .get(draw.shader)
                    .is_some_and(|s| s.reflection.uniform_block_size > 0);
                let offsets: &[u32] = if has_uniforms { &[draw.uniform_offset] } else { &[] };
                rpass.set_bind_group(0, uniforms, offsets);
                rpass.set_bind_group(1, texture_group, &[]);
                rpass.set_vertex_buffer(0, vertices.buffer.slice(..));

                match draw.indices {
                    Some((index_buffer, count)) => {
                        let Some(indices) = self.buffers.get(index_buffer) else {
                            continue;
                        };
                        rpass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..count, 0, 0..1);
                    }
                    None => rpass.draw(0..draw.vertex_count, 0..1),
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }

    fn create_buffer(&mut self, desc: &BufferDesc, contents: &[u8]) -> CoreResult<BufferId> {
        let usage = match desc.kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: desc.label,
            contents,
            usage,
        });
        Ok(self.buffers.insert(BufferEntry {
            buffer,
            kind: desc.kind,
        }))
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> CoreResult<()> {
        let entry = self.buffers.get(buffer).ok_or(CoreError::StaleHandle("buffer"))?;
        if entry.kind == BufferKind::Index {
            return Err(CoreError::InvalidArgument("index buffers are immutable".into()));
        }
        let end = offset + data.len() as u64;
        if end > entry.buffer.size() {
            return Err(CoreError::OutOfBounds {
                index: end as usize,
                len: entry.buffer.size() as usize,
            });
        }
        self.queue.write_buffer(&entry.buffer, offset, data);
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: Option<&[u8]>) -> CoreResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(CoreError::InvalidArgument(format!(
                "texture size {}x{}",
                desc.width, desc.height
            )));
        }
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if desc.render_target {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        let descriptor = wgpu::TextureDescriptor {
            label: desc.label,
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: map_format(desc.format),
            usage,
            view_formats: &[],
        };
        let texture = match pixels {
            Some(pixels) => {
                if pixels.len() != desc.byte_len() {
                    return Err(CoreError::InvalidArgument(format!(
                        "expected {} bytes of pixel data, got {}",
                        desc.byte_len(),
                        pixels.len()
                    )));
                }
                self.device.create_texture_with_data(
                    &self.queue,
                    &descriptor,
                    wgpu::util::TextureDataOrder::LayerMajor,
                    pixels,
                )
            }
            None => self.device.create_texture(&descriptor),
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.textures.insert(TextureEntry {
            texture,
            view,
            desc: *desc,
        }))
    }

    fn create_shader(&mut self, source: &ShaderSource) -> CoreResult<(ShaderId, ShaderReflection)> {
        let reflection = reflect_wgsl(&source.label, &source.wgsl)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(source.label.as_ref()),
            source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
        });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GpuError::ShaderParse {
                label: source.label.to_string(),
                message: err.to_string(),
            }
            .into());
        }

        let (uniform_layout, texture_layout) = Self::create_bind_group_layouts(&self.device, &reflection);
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(source.label.as_ref()),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        tracing::debug!(
            "compiled shader `{}`: {} attributes, {} uniforms, {} textures",
            source.label,
            reflection.attributes.len(),
            reflection.uniforms.len(),
            reflection.textures.len()
        );

        let id = self.shaders.insert(ShaderEntry {
            module,
            staging: vec![0; reflection.uniform_block_size as usize],
            reflection: reflection.clone(),
            uniform_layout,
            texture_layout,
            pipeline_layout,
        });
        Ok((id, reflection))
    }

    fn create_framebuffer(&mut self, color: &[TextureId], depth: Option<TextureId>) -> CoreResult<FramebufferId> {
        for &texture in color.iter().chain(depth.iter()) {
            let entry = self.textures.get(texture).ok_or(CoreError::StaleHandle("texture"))?;
            if !entry.desc.render_target {
                return Err(CoreError::InvalidArgument(
                    "framebuffer attachments must be render targets".into(),
                ));
            }
        }
        Ok(self.framebuffers.insert(FramebufferEntry {
            color: color.iter().copied().collect(),
            depth,
        }))
    }

    fn release(&mut self, resource: GpuResource) {
        match resource {
            GpuResource::Buffer(id) => {
                if let Some(entry) = self.buffers.remove(id) {
                    entry.buffer.destroy();
                }
            }
            GpuResource::Texture(id) => {
                if let Some(entry) = self.textures.remove(id) {
                    entry.texture.destroy();
                }
            }
            GpuResource::Shader(id) => {
                self.shaders.remove(id);
                self.pipelines.retain(|key, _| key.shader != id);
            }
            GpuResource::Framebuffer(id) => {
                self.framebuffers.remove(id);
            }
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return;
        }
        self.size = size;
        self.reconfigure_surface();
        self.screen.depth.destroy();
        if let Some(color) = &self.screen.color {
            color.destroy();
        }
        self.screen = Self::create_screen_target(
            &self.device,
            self.screen_format,
            size.0,
            size.1,
            self.surface.is_none(),
        );
        tracing::debug!("surface resized to {}x{}", size.0, size.1);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn begin_pass(&mut self, target: PassTarget, clear: Option<ClearValue>) -> CoreResult<()> {
        if let PassTarget::Framebuffer(id) = target {
            if !self.framebuffers.contains_key(id) {
                return Err(CoreError::StaleHandle("framebuffer"));
            }
        }
        self.passes.push(RecordedPass {
            target,
            clear,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) -> CoreResult<()> {
        let entry = self.shaders.get_mut(shader).ok_or(CoreError::StaleHandle("shader"))?;
        let uniform = entry
            .reflection
            .uniform(name)
            .ok_or_else(|| CoreError::UnknownUniform(name.to_string()))?;
        value.write_into(&mut entry.staging, uniform)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> CoreResult<()> {
        if !self.textures.contains_key(texture) {
            return Err(CoreError::StaleHandle("texture"));
        }
        self.bound_textures.insert(unit, texture);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> CoreResult<()> {
        let shader = self.shaders.get(call.shader).ok_or(CoreError::StaleHandle("shader"))?;

        let mut textures = SmallVec::new();
        for texture in &shader.reflection.textures {
            let bound = self
                .bound_textures
                .get(&texture.unit)
                .copied()
                .ok_or_else(|| CoreError::Backend(format!("nothing bound to texture unit {}", texture.unit)))?;
            textures.push((texture.unit, bound));
        }

        let uniform_offset = if shader.staging.is_empty() {
            0
        } else {
            let offset = self.uniform_arena.len().next_multiple_of(self.uniform_alignment);
            self.uniform_arena.resize(offset, 0);
            self.uniform_arena.extend_from_slice(&shader.staging);
            offset as u32
        };

        let pass = self
            .passes
            .last_mut()
            .ok_or_else(|| CoreError::Backend("draw outside of a pass".into()))?;
        pass.draws.push(RecordedDraw {
            shader: call.shader,
            layout: call.layout.clone(),
            vertex_buffer: call.vertex_buffer,
            vertex_count: call.vertex_count,
            indices: call.indices,
            uniform_offset,
            textures,
            depth_test: self.depth_test,
            blend: self.blend,
            viewport: self.viewport,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> CoreResult<()> {
        let passes = std::mem::take(&mut self.passes);

        let frame = match &self.surface {
            Some((surface, _)) => match surface.get_current_texture() {
                Ok(frame) => Some(frame),
                Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                    tracing::debug!("surface outdated, skipping frame");
                    self.reconfigure_surface();
                    self.uniform_arena.clear();
                    return Ok(());
                }
                Err(err) => {
                    self.uniform_arena.clear();
                    return Err(GpuError::from(err).into());
                }
            },
            None => None,
        };

        let screen_view = match (&frame, &self.screen.color) {
            (Some(frame), _) => frame.texture.create_view(&wgpu::TextureViewDescriptor::default()),
            (None, Some(color)) => color.create_view(&wgpu::TextureViewDescriptor::default()),
            (None, None) => {
                self.uniform_arena.clear();
                return Err(CoreError::Backend("no screen target".into()));
            }
        };

        let result = self.encode_passes(&passes, &screen_view);
        self.uniform_arena.clear();
        if let Some(frame) = frame {
            frame.present();
        }
        result
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        let pending = self.release_queue.len();
        let live = self.buffers.len() + self.textures.len() + self.shaders.len() + self.framebuffers.len();
        if live > pending {
            tracing::warn!("wgpu backend dropped with {} unreleased GPU resources", live - pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_format_mapping() {
        assert_eq!(vertex_format(2).unwrap(), wgpu::VertexFormat::Float32x2);
        assert_eq!(vertex_format(3).unwrap(), wgpu::VertexFormat::Float32x3);
        assert!(matches!(vertex_format(16), Err(GpuError::UnsupportedAttribute(16))));
    }

    #[test]
    fn test_blend_modes() {
        assert!(blend_state(BlendMode::Replace).is_none());
        assert_eq!(
            blend_state(BlendMode::Premultiplied),
            Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING)
        );
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_headless_device_frame() {
        let mut backend = WgpuBackend::headless(64, 64, BackendConfig::default()).unwrap();
        backend
            .begin_pass(PassTarget::Screen, Some(ClearValue::color_depth([0.0, 0.0, 0.0, 1.0])))
            .unwrap();
        backend.end_frame().unwrap();
    }
}
