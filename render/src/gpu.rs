use bar::Canvas;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface has no usable format")]
    UnsupportedSurface,
    #[error("no surface for bar {0}")]
    UnknownBar(usize),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Uploads finished canvases to one window surface per bar.
pub struct Presenter {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    vertex_buffer: wgpu::Buffer,
    surfaces: Vec<BarSurface>,
}

struct BarSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    texture: Option<TextureResources>,
}

struct TextureResources {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    pixel_buffer: Vec<u8>,
    width: u32,
    height: u32,
    row_stride: u32,
}

impl Presenter {
    /// Creates one surface per window, in bar order.
    pub async fn new<W>(windows: Vec<W>) -> Result<Self, PresentError>
    where
        W: wgpu::WindowHandle + 'static,
    {
        let instance = wgpu::Instance::default();
        let surfaces = windows
            .into_iter()
            .map(|window| instance.create_surface(window))
            .collect::<Result<Vec<_>, _>>()?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: surfaces.first(),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(PresentError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await?;

        let fragment_entry = |binding, ty| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty,
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("canvas_bind_group_layout"),
            entries: &[
                fragment_entry(
                    0,
                    wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                ),
                fragment_entry(
                    1,
                    wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("canvas_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::include_wgsl!("bar.wgsl"));

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("canvas_quad"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let surfaces = surfaces
            .into_iter()
            .map(|surface| {
                let config = surface_config(&surface, &adapter)?;
                let pipeline = create_pipeline(&device, &pipeline_layout, &shader, config.format);
                Ok(BarSurface {
                    surface,
                    config,
                    pipeline,
                    texture: None,
                })
            })
            .collect::<Result<Vec<_>, PresentError>>()?;

        debug!("presenter ready for {} surfaces", surfaces.len());
        Ok(Self {
            adapter,
            device,
            queue,
            bind_group_layout,
            vertex_buffer,
            surfaces,
        })
    }

    /// Shows the top-left `width`x`height` pixels of `canvas` on bar `index`.
    pub fn publish(
        &mut self,
        index: usize,
        canvas: &Canvas,
        width: u32,
        height: u32,
    ) -> Result<(), PresentError> {
        let width = width.min(canvas.width());
        let height = height.min(canvas.height());
        if width == 0 || height == 0 {
            return Ok(());
        }

        let bar = self
            .surfaces
            .get_mut(index)
            .ok_or(PresentError::UnknownBar(index))?;

        if bar.config.width != width || bar.config.height != height {
            bar.config.width = width;
            bar.config.height = height;
            bar.surface.configure(&self.device, &bar.config);
        }
        let resources = match bar.texture.take() {
            Some(resources) if resources.width == width && resources.height == height => resources,
            _ => create_texture_resources(&self.device, &self.bind_group_layout, width, height),
        };
        let resources = bar.texture.insert(resources);

        copy_rows(
            canvas,
            &mut resources.pixel_buffer,
            resources.row_stride,
            width,
            height,
        );
        upload_texture(&self.queue, resources);

        let frame = match bar.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("surface for bar {index} out of date; reconfiguring");
                bar.surface.configure(&self.device, &bar.config);
                bar.surface.get_current_texture()?
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("publish_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("publish_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&bar.pipeline);
            pass.set_bind_group(0, &resources.bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..QUAD.len() as u32, 0..1);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }
}

fn surface_config(
    surface: &wgpu::Surface,
    adapter: &wgpu::Adapter,
) -> Result<wgpu::SurfaceConfiguration, PresentError> {
    let capabilities = surface.get_capabilities(adapter);
    let format = capabilities
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .or_else(|| capabilities.formats.first().copied())
        .ok_or(PresentError::UnsupportedSurface)?;
    let present_mode = capabilities
        .present_modes
        .first()
        .copied()
        .ok_or(PresentError::UnsupportedSurface)?;
    let alpha_mode = capabilities
        .alpha_modes
        .first()
        .copied()
        .ok_or(PresentError::UnsupportedSurface)?;

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: 1,
        height: 1,
        present_mode,
        alpha_mode,
        view_formats: Vec::new(),
        desired_maximum_frame_latency: 2,
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("canvas_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: "vs_main",
            buffers: &[Vertex::LAYOUT],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: "fs_main",
            targets: &[Some(format.into())],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_texture_resources(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    width: u32,
    height: u32,
) -> TextureResources {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("canvas_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    // Defaults clamp to edge and sample the nearest texel.
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("canvas_sampler"),
        ..Default::default()
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("canvas_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    let row_stride = aligned_row_bytes(width);
    TextureResources {
        texture,
        bind_group,
        pixel_buffer: vec![0u8; (row_stride * height) as usize],
        width,
        height,
        row_stride,
    }
}

/// Copies the visible part of the canvas into a row-aligned upload buffer.
fn copy_rows(canvas: &Canvas, buffer: &mut [u8], stride: u32, width: u32, height: u32) {
    for (y, dst) in buffer
        .chunks_exact_mut(stride as usize)
        .take(height as usize)
        .enumerate()
    {
        let src = canvas.row(y as u32, width);
        dst[..src.len()].copy_from_slice(src);
    }
}

fn upload_texture(queue: &wgpu::Queue, resources: &TextureResources) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &resources.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &resources.pixel_buffer,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(resources.row_stride),
            rows_per_image: Some(resources.height),
        },
        wgpu::Extent3d {
            width: resources.width,
            height: resources.height,
            depth_or_array_layers: 1,
        },
    );
}

fn aligned_row_bytes(width: u32) -> u32 {
    let bytes_per_pixel = 4;
    let row_bytes = width * bytes_per_pixel;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padding = (alignment - (row_bytes % alignment)) % alignment;
    row_bytes + padding
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &Self::ATTRIBUTES,
    };
}

const fn vertex(position: [f32; 2], uv: [f32; 2]) -> Vertex {
    Vertex { position, uv }
}

/// Two triangles covering the whole surface, texture origin top-left.
const QUAD: [Vertex; 6] = [
    vertex([-1.0, -1.0], [0.0, 1.0]),
    vertex([1.0, -1.0], [1.0, 1.0]),
    vertex([1.0, 1.0], [1.0, 0.0]),
    vertex([-1.0, -1.0], [0.0, 1.0]),
    vertex([1.0, 1.0], [1.0, 0.0]),
    vertex([-1.0, 1.0], [0.0, 0.0]),
];
