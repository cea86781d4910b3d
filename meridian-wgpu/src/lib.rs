//! wgpu backend for Meridian glTF models.
//!
//! [`WgpuResources`] implements the importer's upload boundary: images are
//! decoded with the `image` crate into RGBA8 textures and the merged geometry
//! becomes one vertex buffer and one `u32` index buffer. [`ModelPass`] replays
//! [`meridian_gltf::draw_model`] into a `wgpu::RenderPass`.

mod backend;
mod handle;
mod model_pass;

pub use backend::{address_mode, filter_mode, sampler_descriptor, vertex_buffer_layout, GpuTexture, WgpuResources};
pub use handle::HandleStore;
pub use model_pass::{align_to, MeshUniformArena, ModelPass};
