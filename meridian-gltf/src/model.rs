use std::sync::Arc;

use glam::Mat4;
use meridian_gpu_shared::ModelVertex;

use crate::animation::Animation;
use crate::bounds::SceneDimensions;
use crate::error::{AnimationError, Diagnostic, UploadError};
use crate::material::Material;
use crate::node::{self, Node, NodeId};
use crate::resources::{ModelBuffers, RenderResources};
use crate::skin::Skin;
use crate::texture::{Texture, TextureSampler};

/// A loaded glTF scene.
///
/// Topology, geometry and materials are fixed after load. Only node
/// transforms (and the derived world matrices and skinning uniforms) change,
/// through [`Model::update_animation`].
#[derive(Debug)]
pub struct Model {
    pub name: String,
    /// Global scale requested at import.
    pub scale: f32,
    /// Node arena in post-order; children precede their parents.
    pub nodes: Vec<Node>,
    pub roots: Vec<NodeId>,
    /// Source materials followed by the default material.
    pub materials: Vec<Arc<Material>>,
    pub textures: Vec<Texture>,
    pub samplers: Vec<TextureSampler>,
    pub skins: Vec<Arc<Skin>>,
    pub animations: Vec<Animation>,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub dimensions: SceneDimensions,
    /// Unit cube to scene extents.
    pub aabb: Mat4,
    /// Contents of `extensionsUsed`.
    pub extensions: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set once [`Model::upload`] succeeded.
    pub buffers: Option<ModelBuffers>,
}

impl Model {
    /// The material used by primitives without a valid material index.
    pub fn default_material(&self) -> Option<&Arc<Material>> {
        self.materials.last()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Finds a node by its index in the source document.
    pub fn node_from_index(&self, index: usize) -> Option<&Node> {
        node::find_by_index(&self.nodes, &self.roots, index).and_then(|id| self.node(id))
    }

    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        node::find_by_name(&self.nodes, &self.roots, name).and_then(|id| self.node(id))
    }

    pub fn animation_by_name(&self, name: &str) -> Option<usize> {
        self.animations.iter().position(|a| a.name == name)
    }

    /// The merged vertex array as raw bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some()
    }

    /// Recomputes world matrices top-down and refreshes mesh uniforms.
    pub fn update_transforms(&mut self) {
        node::update_world_transforms(&mut self.nodes, &self.roots);
        node::refresh_mesh_uniforms(&mut self.nodes);
    }

    /// Poses the model at `time` seconds of animation `index`.
    ///
    /// Logs and does nothing if the model has no animations or the index is
    /// out of range.
    pub fn update_animation(&mut self, index: usize, time: f32) {
        match self.try_update_animation(index, time) {
            Ok(_) => {}
            Err(err @ AnimationError::NoAnimations(_)) => log::warn!("{err}"),
            Err(err) => log::error!("{err}"),
        }
    }

    /// Like [`Model::update_animation`] but reports misuse. Returns whether
    /// any node transform changed.
    pub fn try_update_animation(&mut self, index: usize, time: f32) -> Result<bool, AnimationError> {
        if self.animations.is_empty() {
            return Err(AnimationError::NoAnimations(self.name.clone()));
        }
        let animation = self.animations.get(index).ok_or_else(|| AnimationError::OutOfRange {
            model: self.name.clone(),
            index,
            count: self.animations.len(),
        })?;

        let touched = animation.apply(&mut self.nodes, time);
        if touched {
            self.update_transforms();
        }
        Ok(touched)
    }

    /// Uploads textures, then the merged vertex/index buffers.
    ///
    /// On failure everything created by this call is released again and the
    /// model is left without GPU resources.
    pub fn upload<R: RenderResources + ?Sized>(&mut self, resources: &mut R) -> Result<(), UploadError> {
        for i in 0..self.textures.len() {
            let texture = &self.textures[i];
            match resources.upload_texture(&texture.name, &texture.image, &texture.sampler) {
                Ok(handle) => self.textures[i].handle = Some(handle),
                Err(err) => {
                    log::error!("model '{}': texture '{}' upload failed: {err}", self.name, texture.name);
                    self.release(resources);
                    return Err(err);
                }
            }
        }

        if !self.vertices.is_empty() {
            let vertices: &[u8] = bytemuck::cast_slice(&self.vertices);
            match resources.create_vertex_index_buffers(&self.name, vertices, &self.indices) {
                Ok(buffers) => self.buffers = Some(buffers),
                Err(err) => {
                    log::error!("model '{}': buffer creation failed: {err}", self.name);
                    self.release(resources);
                    return Err(err);
                }
            }
        }

        log::info!(
            "model '{}' uploaded: {} textures, {} vertices, {} indices",
            self.name,
            self.textures.len(),
            self.vertices.len(),
            self.indices.len()
        );
        Ok(())
    }

    /// Releases every GPU resource held by the model.
    pub fn release<R: RenderResources + ?Sized>(&mut self, resources: &mut R) {
        for texture in &mut self.textures {
            if let Some(handle) = texture.handle.take() {
                resources.release_texture(handle);
            }
        }
        if let Some(buffers) = self.buffers.take() {
            resources.release_buffers(buffers);
        }
    }
}
