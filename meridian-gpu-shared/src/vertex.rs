use bytemuck::{Pod, Zeroable};

/// Interleaved vertex shared by every primitive of an imported model.
///
/// All primitives of all meshes are appended into a single array of these,
/// which is uploaded as one vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
    pub joint0: [u16; 4],
    pub weight0: [f32; 4],
}

impl ModelVertex {
    /// Byte offsets of each attribute, in declaration order.
    pub const OFFSETS: [usize; 6] = [0, 12, 24, 32, 40, 48];

    /// Size of one vertex in bytes.
    pub const STRIDE: usize = std::mem::size_of::<ModelVertex>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_has_no_padding() {
        assert_eq!(ModelVertex::STRIDE, 64);
        let v = ModelVertex {
            position: [1.0, 2.0, 3.0],
            weight0: [1.0, 0.0, 0.0, 0.0],
            ..Default::default()
        };
        let bytes = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[4..8], &2.0f32.to_le_bytes());
        assert_eq!(&bytes[ModelVertex::OFFSETS[5]..ModelVertex::OFFSETS[5] + 4], &1.0f32.to_le_bytes());
    }
}
