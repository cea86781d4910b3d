//! Scene graph nodes.
//!
//! Nodes live in a flat arena owned by the [`Model`](crate::Model) and refer
//! to each other through [`NodeId`]s. The arena is filled in post-order, so
//! children always precede their parents.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use meridian_gpu_shared::MAX_NUM_JOINTS;

use crate::bounds::BoundingBox;
use crate::primitive::Mesh;
use crate::skin::Skin;

/// Index of a node in the model's node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub struct Node {
    /// Index of the node in the source document.
    pub index: usize,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Explicit local matrix. Replaces translation/rotation/scale when set.
    pub matrix: Option<Mat4>,
    pub mesh: Option<Mesh>,
    pub skin_index: Option<usize>,
    pub skin: Option<Arc<Skin>>,
    pub world: Mat4,
    pub aabb: BoundingBox,
    pub bvh: BoundingBox,
}

impl Node {
    pub fn new(index: usize, name: String) -> Self {
        Self {
            index,
            name,
            parent: None,
            children: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            matrix: None,
            mesh: None,
            skin_index: None,
            skin: None,
            world: Mat4::IDENTITY,
            aabb: BoundingBox::default(),
            bvh: BoundingBox::default(),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        match self.matrix {
            Some(matrix) => matrix,
            None => Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation),
        }
    }

    pub(crate) fn set_transform(&mut self, transform: gltf::scene::Transform) {
        match transform {
            gltf::scene::Transform::Matrix { matrix } => {
                self.matrix = Some(Mat4::from_cols_array_2d(&matrix));
            }
            gltf::scene::Transform::Decomposed {
                translation,
                rotation,
                scale,
            } => {
                self.translation = Vec3::from_array(translation);
                self.rotation = Quat::from_array(rotation);
                self.scale = Vec3::from_array(scale);
            }
        }
    }
}

/// Recomputes `world = parent.world * local` for every node reachable from
/// `roots`, top-down.
pub fn update_world_transforms(nodes: &mut [Node], roots: &[NodeId]) {
    let mut stack: Vec<(NodeId, Mat4)> = roots.iter().rev().map(|&id| (id, Mat4::IDENTITY)).collect();
    while let Some((id, parent_world)) = stack.pop() {
        let node = &mut nodes[id.0];
        node.world = parent_world * node.local_matrix();
        let world = node.world;
        for &child in node.children.iter().rev() {
            stack.push((child, world));
        }
    }
}

/// Rewrites the uniform block of every mesh node from current world
/// matrices: the node matrix and, for skinned nodes, the joint palette
/// `inverse(world) * joint.world * inverse_bind`.
pub fn refresh_mesh_uniforms(nodes: &mut [Node]) {
    for i in 0..nodes.len() {
        if nodes[i].mesh.is_none() {
            continue;
        }
        let world = nodes[i].world;
        let joints: Option<Vec<Mat4>> = nodes[i].skin.as_ref().map(|skin| {
            let inverse = world.inverse();
            skin.joints
                .iter()
                .zip(skin.inverse_bind_matrices.iter())
                .take(MAX_NUM_JOINTS)
                .map(|(joint, ibm)| match joint {
                    Some(joint) => inverse * nodes[joint.0].world * *ibm,
                    None => Mat4::IDENTITY,
                })
                .collect()
        });

        if let Some(mesh) = nodes[i].mesh.as_mut() {
            mesh.uniforms.matrix = world.to_cols_array_2d();
            match joints {
                Some(joints) => {
                    for (slot, joint) in mesh.uniforms.joint_matrix.iter_mut().zip(&joints) {
                        *slot = joint.to_cols_array_2d();
                    }
                    mesh.uniforms.joint_count = joints.len() as f32;
                }
                None => mesh.uniforms.joint_count = 0.0,
            }
        }
    }
}

/// Depth-first search for the node with source index `index`.
pub fn find_by_index(nodes: &[Node], roots: &[NodeId], index: usize) -> Option<NodeId> {
    find(nodes, roots, |node| node.index == index)
}

/// Depth-first search for the first node called `name`.
pub fn find_by_name(nodes: &[Node], roots: &[NodeId], name: &str) -> Option<NodeId> {
    find(nodes, roots, |node| node.name == name)
}

fn find(nodes: &[Node], roots: &[NodeId], pred: impl Fn(&Node) -> bool) -> Option<NodeId> {
    let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        let node = nodes.get(id.0)?;
        if pred(node) {
            return Some(id);
        }
        stack.extend(node.children.iter().rev().copied());
    }
    None
}
