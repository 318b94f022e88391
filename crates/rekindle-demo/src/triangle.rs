use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use rekindle_engine::core::{FrameCtx, GpuCtx, Scene};
use rekindle_engine::device::Generation;
use rekindle_engine::gpu::WgpuBackend;
use rekindle_engine::time::StepTime;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct Vertex {
    pos:   [f32; 3],
    color: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const VERTICES: [Vertex; 3] = [
    Vertex { pos: [ 0.0,  0.5, 0.5], color: [1.0, 0.0, 0.0, 1.0] },
    Vertex { pos: [ 0.5, -0.5, 0.5], color: [0.0, 1.0, 0.0, 1.0] },
    Vertex { pos: [-0.5, -0.5, 0.5], color: [0.0, 0.0, 1.0, 1.0] },
];

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SpinUniform {
    angle:  f32,
    aspect: f32,
    _pad:   [f32; 2], // 16-byte alignment
}

/// Device objects of one generation.
struct DeviceObjects {
    generation: Generation,
    pipeline:   wgpu::RenderPipeline,
    vertices:   wgpu::Buffer,
    spin_ubo:   wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// A spinning RGB triangle.
#[derive(Default)]
pub struct TriangleScene {
    objects: Option<DeviceObjects>,
    angle:   f32,
    aspect:  f32,
}

impl TriangleScene {
    /// Radians per second.
    const SPEED: f32 = 0.8;
}

impl Scene<WgpuBackend> for TriangleScene {
    fn create_device_resources(&mut self, gpu: &GpuCtx<'_, WgpuBackend>) {
        let device = gpu.device.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("triangle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/triangle.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("triangle bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<SpinUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("triangle pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        // Drawn without depth testing; the engine still clears the depth view.
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("triangle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface.format(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("triangle vbo"),
            contents: bytemuck::cast_slice(&VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let spin_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triangle spin ubo"),
            size: std::mem::size_of::<SpinUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("triangle bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: spin_ubo.as_entire_binding(),
            }],
        });

        log::info!(
            "triangle resources created for {} ({}, {:?})",
            gpu.generation,
            gpu.level,
            gpu.surface.format()
        );

        self.objects = Some(DeviceObjects {
            generation: gpu.generation,
            pipeline,
            vertices,
            spin_ubo,
            bind_group,
        });
    }

    fn create_window_resources(&mut self, gpu: &GpuCtx<'_, WgpuBackend>) {
        self.aspect = gpu.aspect_ratio();
    }

    fn release_device_resources(&mut self) {
        if let Some(objects) = self.objects.take() {
            log::debug!("triangle resources released for {}", objects.generation);
        }
    }

    fn update(&mut self, time: &StepTime) {
        self.angle = (self.angle + time.dt * Self::SPEED) % std::f32::consts::TAU;
    }

    fn draw(&mut self, frame: &mut FrameCtx<'_, WgpuBackend>) {
        let Some(objects) = self.objects.as_ref() else { return; };
        let device = frame.gpu.device.device();
        let queue = frame.gpu.context;

        let spin = SpinUniform {
            angle:  self.angle,
            aspect: self.aspect.max(f32::EPSILON),
            _pad:   [0.0; 2],
        };
        queue.write_buffer(&objects.spin_ubo, 0, bytemuck::bytes_of(&spin));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("triangle encoder"),
        });

        // Pass is dropped before the encoder is finished.
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("triangle pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.render_target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&objects.pipeline);
            rpass.set_bind_group(0, &objects.bind_group, &[]);
            rpass.set_vertex_buffer(0, objects.vertices.slice(..));
            rpass.draw(0..VERTICES.len() as u32, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}
