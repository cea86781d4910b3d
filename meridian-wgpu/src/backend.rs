use meridian_gltf::{
    AddressMode, BufferHandle, FilterMode, ModelBuffers, RenderResources, TextureHandle, TextureSampler, UploadError,
};
use meridian_gpu_shared::ModelVertex;
use wgpu::util::DeviceExt;

use crate::handle::HandleStore;

/// GPU texture with associated view and sampler.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

/// Owns every texture and buffer uploaded for imported models.
pub struct WgpuResources {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: HandleStore<GpuTexture>,
    buffers: HandleStore<wgpu::Buffer>,
}

impl WgpuResources {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HandleStore::new(),
            buffers: HandleStore::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(handle.0)
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.0)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}

impl RenderResources for WgpuResources {
    fn upload_texture(
        &mut self,
        name: &str,
        image: &[u8],
        sampler: &TextureSampler,
    ) -> Result<TextureHandle, UploadError> {
        let rgba = image::load_from_memory(image)
            .map_err(|e| UploadError::new(format!("texture '{name}': {e}")))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(UploadError::new(format!("texture '{name}' is empty")));
        }

        let texture_size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: texture_size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            texture_size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&sampler_descriptor(name, sampler));

        log::debug!("uploaded texture '{name}' ({width}x{height})");
        let handle = self.textures.insert(GpuTexture {
            texture,
            view,
            sampler,
            width,
            height,
        });
        Ok(TextureHandle(handle))
    }

    fn create_vertex_index_buffers(
        &mut self,
        name: &str,
        vertices: &[u8],
        indices: &[u32],
    ) -> Result<ModelBuffers, UploadError> {
        if vertices.is_empty() || vertices.len() % ModelVertex::STRIDE != 0 {
            return Err(UploadError::new(format!(
                "model '{name}': vertex data is {} bytes, not a non-zero multiple of {}",
                vertices.len(),
                ModelVertex::STRIDE
            )));
        }

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let vertex = BufferHandle(self.buffers.insert(vertex_buffer));

        let index = (!indices.is_empty()).then(|| {
            let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Model Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            BufferHandle(self.buffers.insert(index_buffer))
        });

        let buffers = ModelBuffers {
            vertex,
            index,
            vertex_count: (vertices.len() / ModelVertex::STRIDE) as u32,
            index_count: indices.len() as u32,
        };
        log::info!(
            "model '{name}': created buffers for {} vertices, {} indices",
            buffers.vertex_count,
            buffers.index_count
        );
        Ok(buffers)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.textures.remove(handle.0) {
            texture.texture.destroy();
        }
    }

    fn release_buffers(&mut self, buffers: ModelBuffers) {
        for handle in std::iter::once(buffers.vertex).chain(buffers.index) {
            if let Some(buffer) = self.buffers.remove(handle.0) {
                buffer.destroy();
            }
        }
    }
}

pub fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

pub fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

pub fn sampler_descriptor<'a>(label: &'a str, sampler: &TextureSampler) -> wgpu::SamplerDescriptor<'a> {
    wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode(sampler.address_mode_u),
        address_mode_v: address_mode(sampler.address_mode_v),
        address_mode_w: address_mode(sampler.address_mode_w),
        mag_filter: filter_mode(sampler.mag_filter),
        min_filter: filter_mode(sampler.min_filter),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x3, // normal
    2 => Float32x2, // uv0
    3 => Float32x2, // uv1
    4 => Uint16x4,  // joint0
    5 => Float32x4, // weight0
];

/// Layout of the single interleaved [`ModelVertex`] buffer.
pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: ModelVertex::STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_shared_struct() {
        let layout = vertex_buffer_layout();
        assert_eq!(layout.array_stride, 64);
        let offsets: Vec<usize> = layout.attributes.iter().map(|a| a.offset as usize).collect();
        assert_eq!(offsets, ModelVertex::OFFSETS.to_vec());
        let locations: Vec<u32> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_sampler_mapping() {
        let sampler = TextureSampler {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Linear,
            address_mode_u: AddressMode::MirroredRepeat,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
        };
        let desc = sampler_descriptor("s", &sampler);
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::MirrorRepeat);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.address_mode_w, wgpu::AddressMode::ClampToEdge);

        let defaults = sampler_descriptor("d", &TextureSampler::default());
        assert_eq!(defaults.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(defaults.mag_filter, wgpu::FilterMode::Linear);
    }
}
