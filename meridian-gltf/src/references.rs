//! Out-of-range references that degrade instead of failing the load.
//!
//! The document is validated as a whole, so the indices the importer
//! tolerates (primitive materials, node skins, skin skeletons and joints,
//! channel targets) are detached from the JSON before validation and kept
//! here, keyed by their owner.

use std::collections::HashMap;

use gltf::json;

#[derive(Debug, Default)]
pub(crate) struct DanglingReferences {
    /// (mesh, primitive) to material index.
    materials: HashMap<(usize, usize), usize>,
    /// node to skin index.
    skins: HashMap<usize, usize>,
    /// skin to skeleton node index.
    skeletons: HashMap<usize, usize>,
    /// skin to its full joint list, kept only when a joint is out of range.
    joints: HashMap<usize, Vec<usize>>,
    /// animation to the target node of every removed channel.
    channel_targets: HashMap<usize, Vec<usize>>,
}

impl DanglingReferences {
    /// Removes every tolerated out-of-range reference from `root`.
    pub fn detach(root: &mut json::Root) -> Self {
        let mut dangling = Self::default();
        let materials = root.materials.len();
        let nodes = root.nodes.len();
        let skins = root.skins.len();

        for (m, mesh) in root.meshes.iter_mut().enumerate() {
            for (p, primitive) in mesh.primitives.iter_mut().enumerate() {
                if let Some(index) = primitive.material.filter(|i| i.value() >= materials) {
                    dangling.materials.insert((m, p), index.value());
                    primitive.material = None;
                }
            }
        }

        for (n, node) in root.nodes.iter_mut().enumerate() {
            if let Some(index) = node.skin.filter(|i| i.value() >= skins) {
                dangling.skins.insert(n, index.value());
                node.skin = None;
            }
        }

        for (s, skin) in root.skins.iter_mut().enumerate() {
            if let Some(index) = skin.skeleton.filter(|i| i.value() >= nodes) {
                dangling.skeletons.insert(s, index.value());
                skin.skeleton = None;
            }
            if skin.joints.iter().any(|j| j.value() >= nodes) {
                dangling.joints.insert(s, skin.joints.iter().map(|j| j.value()).collect());
                skin.joints.retain(|j| j.value() < nodes);
            }
        }

        for (a, animation) in root.animations.iter_mut().enumerate() {
            let mut targets = Vec::new();
            animation.channels.retain(|channel| {
                let node = channel.target.node.value();
                if node < nodes {
                    true
                } else {
                    targets.push(node);
                    false
                }
            });
            if !targets.is_empty() {
                dangling.channel_targets.insert(a, targets);
            }
        }

        if !dangling.is_empty() {
            log::debug!("detached out-of-range references: {dangling:?}");
        }
        dangling
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
            && self.skins.is_empty()
            && self.skeletons.is_empty()
            && self.joints.is_empty()
            && self.channel_targets.is_empty()
    }

    pub fn material(&self, mesh: usize, primitive: usize) -> Option<usize> {
        self.materials.get(&(mesh, primitive)).copied()
    }

    pub fn skin(&self, node: usize) -> Option<usize> {
        self.skins.get(&node).copied()
    }

    pub fn skeleton(&self, skin: usize) -> Option<usize> {
        self.skeletons.get(&skin).copied()
    }

    /// The declared joint list of `skin`, when it holds an out-of-range joint.
    pub fn joints(&self, skin: usize) -> Option<&[usize]> {
        self.joints.get(&skin).map(Vec::as_slice)
    }

    pub fn channel_targets(&self, animation: usize) -> &[usize] {
        self.channel_targets.get(&animation).map(Vec::as_slice).unwrap_or_default()
    }
}
