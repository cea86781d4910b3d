//! Axis-aligned bounding boxes and the per-node bounding volume pass.

use glam::{Mat4, Vec3};

use crate::node::{Node, NodeId};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
    pub valid: bool,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max, valid: true }
    }

    /// Axis-aligned box enclosing this box after transformation by `m`
    /// (Arvo's method: accumulate the extremes of each basis column).
    pub fn transformed(&self, m: &Mat4) -> BoundingBox {
        let mut min = m.w_axis.truncate();
        let mut max = min;

        let columns = [
            (m.x_axis.truncate(), self.min.x, self.max.x),
            (m.y_axis.truncate(), self.min.y, self.max.y),
            (m.z_axis.truncate(), self.min.z, self.max.z),
        ];
        for (axis, lo, hi) in columns {
            let v0 = axis * lo;
            let v1 = axis * hi;
            min += v0.min(v1);
            max += v0.max(v1);
        }

        BoundingBox::new(min, max)
    }

    /// Grows this box to include `other`. An invalid box adopts `other`.
    pub fn union(&mut self, other: &BoundingBox) {
        if !other.valid {
            return;
        }
        if self.valid {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        } else {
            *self = *other;
        }
    }
}

/// Folds a child's bounding volume into its parent's running box.
///
/// Both corners take the component-wise minimum, so the max corner never
/// grows. Scene dimensions do not depend on it: they are computed from leaf
/// volumes only.
pub fn accumulate_child_bvh(parent: &mut BoundingBox, child: &BoundingBox) {
    parent.min = parent.min.min(child.min);
    parent.max = parent.max.min(child.max);
}

/// Computes world AABBs and BVH boxes for `id` and its subtree.
/// World matrices must be current.
pub fn calculate_bounding_box(nodes: &mut [Node], id: NodeId, parent: Option<NodeId>) {
    let node = &mut nodes[id.0];
    if let Some(mesh) = &node.mesh {
        if mesh.bounding_box.valid {
            node.aabb = mesh.bounding_box.transformed(&node.world);
            if node.children.is_empty() {
                node.bvh = node.aabb;
            }
        }
    }

    let bvh = node.bvh;
    let children = node.children.clone();
    if let Some(parent) = parent {
        accumulate_child_bvh(&mut nodes[parent.0].bvh, &bvh);
    }

    for child in children {
        calculate_bounding_box(nodes, child, Some(id));
    }
}

/// Scene-wide extents over every valid node BVH box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SceneDimensions {
    pub min: Vec3,
    pub max: Vec3,
}

impl SceneDimensions {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(-f32::MAX);
        let mut any = false;
        for node in nodes.iter().filter(|n| n.bvh.valid) {
            min = min.min(node.bvh.min);
            max = max.max(node.bvh.max);
            any = true;
        }
        if !any {
            return Self::default();
        }
        Self { min, max }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Transform mapping the unit cube onto the scene extents.
    pub fn aabb_matrix(&self) -> Mat4 {
        let mut m = Mat4::from_scale(self.size());
        m.w_axis = self.min.extend(1.0);
        m
    }
}

/// Runs the bounding volume pass over the whole forest.
pub fn compute_scene_bounds(nodes: &mut [Node], roots: &[NodeId]) -> SceneDimensions {
    for &root in roots {
        calculate_bounding_box(nodes, root, None);
    }
    let dimensions = SceneDimensions::from_nodes(nodes);
    log::debug!(
        "scene dimensions: min {:?}, max {:?}",
        dimensions.min,
        dimensions.max
    );
    dimensions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::Mesh;
    use glam::Quat;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_transformed_translation_and_scale() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(10.0, 0.0, 0.0),
        );
        let aabb = unit_box().transformed(&m);
        assert!(aabb.valid);
        assert_eq!(aabb.min, Vec3::new(8.0, -1.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(12.0, 1.0, 1.0));
    }

    #[test]
    fn test_transformed_rotation_stays_axis_aligned() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let m = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let aabb = b.transformed(&m);
        assert!((aabb.min - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((aabb.max - Vec3::new(0.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_union_skips_invalid() {
        let mut b = BoundingBox::default();
        b.union(&BoundingBox::default());
        assert!(!b.valid);
        b.union(&unit_box());
        assert_eq!(b, unit_box());
        b.union(&BoundingBox::new(Vec3::ZERO, Vec3::splat(3.0)));
        assert_eq!(b.min, Vec3::splat(-1.0));
        assert_eq!(b.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_accumulation_takes_min_for_both_corners() {
        let mut parent = BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 5.0, 5.0));
        let child = BoundingBox::new(Vec3::new(-1.0, 1.0, -2.0), Vec3::new(9.0, 3.0, 5.0));
        accumulate_child_bvh(&mut parent, &child);
        assert_eq!(parent.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(parent.max, Vec3::new(5.0, 3.0, 5.0));
    }

    fn mesh_node(index: usize, bb: BoundingBox, translation: Vec3) -> Node {
        let mut node = Node::new(index, format!("n{index}"));
        let mut mesh = Mesh::new(index, format!("m{index}"), Mat4::IDENTITY);
        mesh.bounding_box = bb;
        node.mesh = Some(mesh);
        node.world = Mat4::from_translation(translation);
        node
    }

    #[test]
    fn test_leaf_boxes_define_scene_dimensions() {
        // parent (0, no mesh) with two mesh leaves
        let mut nodes = vec![
            mesh_node(1, unit_box(), Vec3::new(-5.0, 0.0, 0.0)),
            mesh_node(2, unit_box(), Vec3::new(5.0, 0.0, 0.0)),
            Node::new(0, "root".into()),
        ];
        nodes[0].parent = Some(NodeId(2));
        nodes[1].parent = Some(NodeId(2));
        nodes[2].children = vec![NodeId(0), NodeId(1)];

        let dims = compute_scene_bounds(&mut nodes, &[NodeId(2)]);
        assert!(nodes[0].bvh.valid && nodes[1].bvh.valid);
        assert!(!nodes[2].bvh.valid);
        assert_eq!(dims.min, Vec3::new(-6.0, -1.0, -1.0));
        assert_eq!(dims.max, Vec3::new(6.0, 1.0, 1.0));

        // parent box saw both children through the min/min rule
        assert_eq!(nodes[2].bvh.min, Vec3::new(-6.0, -1.0, -1.0));
        assert_eq!(nodes[2].bvh.max, Vec3::new(-4.0, 0.0, 0.0));

        let aabb = dims.aabb_matrix();
        assert_eq!(aabb.transform_point3(Vec3::ZERO), dims.min);
        assert_eq!(aabb.transform_point3(Vec3::ONE), dims.max);
    }

    #[test]
    fn test_mesh_node_with_children_gets_aabb_but_no_bvh() {
        let mut nodes = vec![Node::new(1, "child".into()), mesh_node(0, unit_box(), Vec3::ZERO)];
        nodes[0].parent = Some(NodeId(1));
        nodes[1].children = vec![NodeId(0)];
        compute_scene_bounds(&mut nodes, &[NodeId(1)]);
        assert!(nodes[1].aabb.valid);
        assert!(!nodes[1].bvh.valid);
    }

    #[test]
    fn test_no_valid_boxes_gives_zero_dimensions() {
        let mut nodes = vec![Node::new(0, "empty".into())];
        let dims = compute_scene_bounds(&mut nodes, &[NodeId(0)]);
        assert_eq!(dims, SceneDimensions::default());
    }
}
