//! Boundary with the render backend.
//!
//! The importer never touches a graphics API. It hands encoded image bytes
//! and the merged vertex/index arrays to a [`RenderResources`] implementation
//! and records draws through [`DrawCommands`]. Handles are opaque `u64`s
//! minted by the backend.

use meridian_gpu_shared::MeshUniforms;

use crate::error::UploadError;
use crate::texture::TextureSampler;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// GPU buffers holding a model's merged geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelBuffers {
    pub vertex: BufferHandle,
    /// `None` when the model has no indices.
    pub index: Option<BufferHandle>,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Texture and buffer allocation.
pub trait RenderResources {
    /// Decodes and uploads one image. `image` is still encoded (PNG, JPEG, ...).
    fn upload_texture(
        &mut self,
        name: &str,
        image: &[u8],
        sampler: &TextureSampler,
    ) -> Result<TextureHandle, UploadError>;

    /// Creates the vertex buffer from `vertices` (tightly packed
    /// [`ModelVertex`](meridian_gpu_shared::ModelVertex)es) and the 32-bit
    /// index buffer.
    fn create_vertex_index_buffers(
        &mut self,
        name: &str,
        vertices: &[u8],
        indices: &[u32],
    ) -> Result<ModelBuffers, UploadError>;

    fn release_texture(&mut self, handle: TextureHandle);

    fn release_buffers(&mut self, buffers: ModelBuffers);
}

/// Command recording for [`crate::draw_model`].
pub trait DrawCommands {
    fn bind_buffers(&mut self, buffers: &ModelBuffers);

    /// Called once per mesh before its primitives are drawn.
    fn set_mesh_uniforms(&mut self, _uniforms: &MeshUniforms) {}

    fn draw_indexed(&mut self, first_index: u32, index_count: u32);

    fn draw(&mut self, first_vertex: u32, vertex_count: u32);
}
