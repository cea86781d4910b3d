use bytemuck::{Pod, Zeroable};

/// Maximum number of joints a single skinned mesh can reference.
/// Must match the array length declared in the skinning vertex shader.
pub const MAX_NUM_JOINTS: usize = 128;

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Per-mesh uniform block: world matrix plus the skinning joint palette.
///
/// `joint_count` is stored as f32 to keep the block a plain array of floats,
/// which is what the skinning shader reads.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshUniforms {
    pub matrix: [[f32; 4]; 4],
    pub joint_matrix: [[[f32; 4]; 4]; MAX_NUM_JOINTS],
    pub joint_count: f32,
    pub _pad: [f32; 3],
}

impl MeshUniforms {
    /// Uniform block with identity transforms and no active joints.
    pub fn identity() -> Self {
        Self {
            matrix: IDENTITY,
            joint_matrix: [IDENTITY; MAX_NUM_JOINTS],
            joint_count: 0.0,
            _pad: [0.0; 3],
        }
    }

    /// Number of joints currently written to the palette.
    pub fn active_joints(&self) -> usize {
        self.joint_count as usize
    }
}

impl Default for MeshUniforms {
    fn default() -> Self {
        Self::identity()
    }
}
