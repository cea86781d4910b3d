//! glTF 2.0 scene import for the Meridian renderer.
//!
//! [`import_model`] turns a `.gltf` or `.glb` file into a [`Model`]: a node
//! forest with skinned meshes, materials, textures and keyframe animations,
//! plus one merged vertex array and one merged index array for the whole
//! scene. [`load_model`] additionally uploads the model through a
//! [`RenderResources`] backend, and [`draw_model`] records its draws through
//! [`DrawCommands`].
//!
//! Per frame, [`update_animation`] poses the model and refreshes world
//! matrices and skinning uniforms.

pub mod accessor;
pub mod animation;
pub mod bounds;
pub mod draw;
pub mod error;
pub mod import;
pub mod material;
pub mod model;
pub mod node;
pub mod primitive;
mod references;
pub mod resources;
pub mod settings;
pub mod skin;
pub mod texture;

#[cfg(test)]
mod test_assets;

pub use animation::{Animation, AnimationChannel, AnimationPath, AnimationSampler, Interpolation};
pub use bounds::{BoundingBox, SceneDimensions};
pub use draw::draw_model;
pub use error::{AnimationError, Diagnostic, DrawError, LoadError, UploadError};
pub use import::{import_model, load_model, ContainerKind};
pub use material::{AlphaMode, Material, Workflow};
pub use model::Model;
pub use node::{Node, NodeId};
pub use primitive::{Mesh, Primitive};
pub use resources::{BufferHandle, DrawCommands, ModelBuffers, RenderResources, TextureHandle};
pub use settings::ImportSettings;
pub use skin::Skin;
pub use texture::{AddressMode, FilterMode, Texture, TextureSampler};

/// Poses `model` at `time` seconds of animation `index`.
/// See [`Model::update_animation`].
pub fn update_animation(model: &mut Model, index: usize, time: f32) {
    model.update_animation(index, time);
}
