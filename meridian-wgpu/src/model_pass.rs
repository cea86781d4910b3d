use std::num::NonZeroU64;

use meridian_gltf::{draw_model, BufferHandle, DrawCommands, DrawError, Model, ModelBuffers};
use meridian_gpu_shared::MeshUniforms;

use crate::backend::WgpuResources;

const MESH_UNIFORMS_SIZE: u64 = std::mem::size_of::<MeshUniforms>() as u64;

/// Rounds `size` up to the next multiple of `alignment`.
pub fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

/// One uniform buffer holding the [`MeshUniforms`] of every mesh of a model,
/// bound with a dynamic offset per mesh.
pub struct MeshUniformArena {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: u64,
    count: u64,
}

impl MeshUniformArena {
    pub fn new(device: &wgpu::Device, capacity: u64) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Uniforms BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(MESH_UNIFORMS_SIZE),
                },
                count: None,
            }],
        });
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let stride = align_to(MESH_UNIFORMS_SIZE, alignment);
        let capacity = capacity.max(1);
        let (buffer, bind_group) = Self::allocate(device, &layout, stride, capacity);
        Self {
            layout,
            buffer,
            bind_group,
            stride,
            capacity,
            count: 0,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Mesh Uniforms Buffer"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Uniforms BG"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(MESH_UNIFORMS_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Number of mesh blocks written by the last [`write`](Self::write).
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Writes the current uniforms of every mesh, in draw order.
    /// Must run after posing and before the pass that draws the model.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, model: &Model) -> Result<(), DrawError> {
        let mut collected = UniformCollector::default();
        draw_model(model, &mut collected)?;
        let count = collected.0.len() as u64;

        if count > self.capacity {
            self.capacity = count.next_power_of_two();
            log::debug!("growing mesh uniform arena to {} blocks", self.capacity);
            let (buffer, bind_group) = Self::allocate(device, &self.layout, self.stride, self.capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
        }

        let mut bytes = vec![0u8; (self.stride * count) as usize];
        for (i, uniforms) in collected.0.iter().enumerate() {
            let offset = i * self.stride as usize;
            bytes[offset..offset + MESH_UNIFORMS_SIZE as usize].copy_from_slice(bytemuck::bytes_of(uniforms));
        }
        if !bytes.is_empty() {
            queue.write_buffer(&self.buffer, 0, &bytes);
        }
        self.count = count;
        Ok(())
    }
}

#[derive(Default)]
struct UniformCollector(Vec<MeshUniforms>);

impl DrawCommands for UniformCollector {
    fn bind_buffers(&mut self, _buffers: &ModelBuffers) {}

    fn set_mesh_uniforms(&mut self, uniforms: &MeshUniforms) {
        self.0.push(*uniforms);
    }

    fn draw_indexed(&mut self, _first_index: u32, _index_count: u32) {}

    fn draw(&mut self, _first_vertex: u32, _vertex_count: u32) {}
}

/// Records a model's draws into a render pass.
///
/// The pipeline and the other bind groups must already be set. When an arena
/// is attached, mesh uniforms are bound at `uniform_group` with the offset of
/// the next written block.
pub struct ModelPass<'p, 'e> {
    pass: &'p mut wgpu::RenderPass<'e>,
    resources: &'p WgpuResources,
    uniforms: Option<(&'p MeshUniformArena, u32)>,
    next_block: u64,
}

impl<'p, 'e> ModelPass<'p, 'e> {
    pub fn new(pass: &'p mut wgpu::RenderPass<'e>, resources: &'p WgpuResources) -> Self {
        Self {
            pass,
            resources,
            uniforms: None,
            next_block: 0,
        }
    }

    pub fn with_uniforms(mut self, arena: &'p MeshUniformArena, uniform_group: u32) -> Self {
        self.uniforms = Some((arena, uniform_group));
        self
    }

    fn buffer(&self, handle: BufferHandle) -> Option<&'p wgpu::Buffer> {
        self.resources.buffer(handle)
    }
}

impl DrawCommands for ModelPass<'_, '_> {
    fn bind_buffers(&mut self, buffers: &ModelBuffers) {
        match self.buffer(buffers.vertex) {
            Some(vertex) => self.pass.set_vertex_buffer(0, vertex.slice(..)),
            None => log::warn!("vertex buffer {} is not resident", buffers.vertex.0),
        }
        if let Some(handle) = buffers.index {
            match self.buffer(handle) {
                Some(index) => self.pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32),
                None => log::warn!("index buffer {} is not resident", handle.0),
            }
        }
    }

    fn set_mesh_uniforms(&mut self, _uniforms: &MeshUniforms) {
        let Some((arena, group)) = self.uniforms else {
            return;
        };
        if self.next_block >= arena.count {
            log::warn!("mesh uniform arena holds {} blocks; was it written for this model?", arena.count);
            return;
        }
        let offset = (self.next_block * arena.stride) as wgpu::DynamicOffset;
        self.pass.set_bind_group(group, &arena.bind_group, &[offset]);
        self.next_block += 1;
    }

    fn draw_indexed(&mut self, first_index: u32, index_count: u32) {
        self.pass.draw_indexed(first_index..first_index + index_count, 0, 0..1);
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.pass.draw(first_vertex..first_vertex + vertex_count, 0..1);
    }
}
