//! Meshes, primitives and the vertex/index extractor.
//!
//! Every primitive of every mesh appends into one shared vertex array and
//! one shared index array. Indices are rebased onto the shared vertex array
//! as they are read, so a primitive is drawn with nothing more than its
//! index window.

use std::sync::Arc;

use gltf::accessor::{DataType, Dimensions};
use gltf::Semantic;
use glam::{Mat4, Vec3, Vec4};
use meridian_gpu_shared::{MeshUniforms, ModelVertex};

use crate::accessor::{bound_vec3, AccessorView};
use crate::bounds::BoundingBox;
use crate::error::{Diagnostic, DiagnosticLog, LoadError};
use crate::material::Material;
use crate::references::DanglingReferences;

#[derive(Clone, Debug)]
pub struct Primitive {
    pub first_index: u32,
    pub index_count: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub material: Arc<Material>,
    /// Local-space box from the POSITION accessor bounds.
    pub bounding_box: BoundingBox,
    pub has_skin: bool,
    /// The source primitive declared an index accessor.
    pub has_indices: bool,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub index: usize,
    pub name: String,
    pub primitives: Vec<Primitive>,
    pub matrix: Mat4,
    /// Union of the valid primitive boxes.
    pub bounding_box: BoundingBox,
    pub uniforms: Box<MeshUniforms>,
}

impl Mesh {
    pub fn new(index: usize, name: String, matrix: Mat4) -> Self {
        let mut uniforms = Box::new(MeshUniforms::identity());
        uniforms.matrix = matrix.to_cols_array_2d();
        Self {
            index,
            name,
            primitives: Vec::new(),
            matrix,
            bounding_box: BoundingBox::default(),
            uniforms,
        }
    }
}

/// Merged vertex and index arrays of a model under construction.
#[derive(Debug, Default)]
pub(crate) struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

pub(crate) struct MeshContext<'a> {
    pub buffers: &'a [gltf::buffer::Data],
    /// Real materials followed by the default material.
    pub materials: &'a [Arc<Material>],
    pub dangling: &'a DanglingReferences,
}

impl MeshContext<'_> {
    fn material(&self, index: Option<usize>) -> Arc<Material> {
        let default = self.materials.len().saturating_sub(1);
        let slot = index.filter(|&i| i < default).unwrap_or(default);
        match self.materials.get(slot) {
            Some(material) => Arc::clone(material),
            None => Arc::new(Material::default()),
        }
    }
}

pub(crate) fn load_mesh(
    mesh: &gltf::Mesh<'_>,
    matrix: Mat4,
    ctx: &MeshContext<'_>,
    geometry: &mut Geometry,
    diagnostics: &mut DiagnosticLog,
) -> Result<Mesh, LoadError> {
    let name = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
    let mut out = Mesh::new(mesh.index(), name, matrix);

    for primitive in mesh.primitives() {
        let context = format!("mesh '{}' primitive {}", out.name, primitive.index());
        let primitive = load_primitive(mesh.index(), &primitive, &context, ctx, geometry, diagnostics)?;
        out.bounding_box.union(&primitive.bounding_box);
        out.primitives.push(primitive);
    }
    Ok(out)
}

fn load_primitive(
    mesh_index: usize,
    primitive: &gltf::Primitive<'_>,
    context: &str,
    ctx: &MeshContext<'_>,
    geometry: &mut Geometry,
    diagnostics: &mut DiagnosticLog,
) -> Result<Primitive, LoadError> {
    let position_accessor = primitive
        .get(&Semantic::Positions)
        .ok_or_else(|| LoadError::malformed(format!("{context} has no POSITION attribute")))?;
    let positions = AccessorView::resolve(&position_accessor, ctx.buffers)
        .ok_or_else(|| LoadError::malformed(format!("{context}: POSITION data lies outside its buffer")))?;
    if !positions.is(DataType::F32, Dimensions::Vec3) {
        return Err(LoadError::malformed(format!(
            "{context}: POSITION stored as {}",
            positions.layout()
        )));
    }
    let count = positions.count();

    let optional = |name: &str,
                    semantic: Semantic,
                    layouts: &[(DataType, Dimensions)],
                    diagnostics: &mut DiagnosticLog| {
        checked_attribute(
            name,
            primitive.get(&semantic).map(|a| AccessorView::resolve(&a, ctx.buffers)),
            layouts,
            count,
            context,
            diagnostics,
        )
    };
    let normals = optional("NORMAL", Semantic::Normals, &[(DataType::F32, Dimensions::Vec3)], diagnostics);
    let uv0 = optional("TEXCOORD_0", Semantic::TexCoords(0), &[(DataType::F32, Dimensions::Vec2)], diagnostics);
    let uv1 = optional("TEXCOORD_1", Semantic::TexCoords(1), &[(DataType::F32, Dimensions::Vec2)], diagnostics);
    let joints = optional(
        "JOINTS_0",
        Semantic::Joints(0),
        &[(DataType::U16, Dimensions::Vec4), (DataType::U8, Dimensions::Vec4)],
        diagnostics,
    );
    let weights = optional("WEIGHTS_0", Semantic::Weights(0), &[(DataType::F32, Dimensions::Vec4)], diagnostics);
    let skin = joints.zip(weights);

    let vertex_start = geometry.vertices.len();
    let first_vertex = u32::try_from(vertex_start)
        .map_err(|_| LoadError::malformed(format!("{context}: vertex count exceeds u32")))?;
    geometry.vertices.reserve(count);
    for i in 0..count {
        let position = positions
            .read_f32::<3>(i)
            .ok_or_else(|| LoadError::malformed(format!("{context}: POSITION element {i} unreadable")))?;
        let mut vertex = ModelVertex {
            position,
            ..Default::default()
        };
        if let Some(n) = normals.and_then(|v| v.read_f32::<3>(i)) {
            vertex.normal = Vec3::from_array(n).normalize_or_zero().to_array();
        }
        if let Some(uv) = uv0.and_then(|v| v.read_f32::<2>(i)) {
            vertex.uv0 = uv;
        }
        if let Some(uv) = uv1.and_then(|v| v.read_f32::<2>(i)) {
            vertex.uv1 = uv;
        }
        if let Some((joints, weights)) = skin {
            vertex.joint0 = joints.read_u16::<4>(i).unwrap_or_default();
            vertex.weight0 = weights.read_f32::<4>(i).unwrap_or_default();
        }
        vertex.weight0 = fallback_weights(vertex.weight0);
        geometry.vertices.push(vertex);
    }

    let first_index = u32::try_from(geometry.indices.len())
        .map_err(|_| LoadError::malformed(format!("{context}: index count exceeds u32")))?;
    let mut index_count = 0;
    if let Some(accessor) = primitive.indices() {
        match AccessorView::resolve(&accessor, ctx.buffers) {
            Some(view) => match append_indices(&view, first_vertex, count, &mut geometry.indices) {
                Ok(n) => index_count = n,
                Err(detail) => {
                    log::error!("{context}: {detail}");
                    diagnostics.report(Diagnostic::encoding(context, detail));
                }
            },
            None => diagnostics.report(Diagnostic::encoding(context, "index data lies outside its buffer")),
        }
    }

    let material_index = primitive
        .material()
        .index()
        .or_else(|| ctx.dangling.material(mesh_index, primitive.index()));
    let real_materials = ctx.materials.len().saturating_sub(1);
    if let Some(index) = material_index.filter(|&i| i >= real_materials) {
        diagnostics.report(Diagnostic::unresolved(
            context,
            format!("material {index} of {real_materials}"),
        ));
    }

    let bounding_box = match (
        bound_vec3(position_accessor.min()),
        bound_vec3(position_accessor.max()),
    ) {
        (Some(min), Some(max)) => BoundingBox::new(Vec3::from_array(min), Vec3::from_array(max)),
        _ => BoundingBox::default(),
    };

    Ok(Primitive {
        first_index,
        index_count,
        first_vertex,
        vertex_count: count as u32,
        material: ctx.material(material_index),
        bounding_box,
        has_skin: skin.is_some(),
        has_indices: primitive.indices().is_some(),
    })
}

/// A zero-length weight vector binds the vertex fully to its first joint.
pub fn fallback_weights(weights: [f32; 4]) -> [f32; 4] {
    if Vec4::from_array(weights).length() == 0.0 {
        [1.0, 0.0, 0.0, 0.0]
    } else {
        weights
    }
}

/// Validates an optional vertex attribute.
///
/// Returns the view when it resolved to one of `layouts` and holds at least
/// `min_count` elements; otherwise reports why it is ignored. A missing
/// attribute (`resolved == None`) is silently absent.
pub(crate) fn checked_attribute<'a>(
    name: &str,
    resolved: Option<Option<AccessorView<'a>>>,
    layouts: &[(DataType, Dimensions)],
    min_count: usize,
    context: &str,
    diagnostics: &mut DiagnosticLog,
) -> Option<AccessorView<'a>> {
    let view = match resolved? {
        Some(view) => view,
        None => {
            diagnostics.report(Diagnostic::encoding(context, format!("{name} data lies outside its buffer")));
            return None;
        }
    };
    if !layouts.iter().any(|&(dt, dims)| view.is(dt, dims)) {
        diagnostics.report(Diagnostic::encoding(
            context,
            format!("{name} stored as {}", view.layout()),
        ));
        return None;
    }
    if view.count() < min_count {
        diagnostics.report(Diagnostic::encoding(
            context,
            format!("{name} has {} elements, POSITION has {min_count}", view.count()),
        ));
        return None;
    }
    Some(view)
}

/// Appends every index of `view` rebased by `vertex_start`.
/// Returns the number of indices appended.
///
/// Each index must address one of the primitive's own `vertex_count`
/// vertices. On any bad element nothing is appended.
pub(crate) fn append_indices(
    view: &AccessorView<'_>,
    vertex_start: u32,
    vertex_count: usize,
    out: &mut Vec<u32>,
) -> Result<u32, String> {
    match view.data_type() {
        DataType::U8 | DataType::U16 | DataType::U32 if view.dimensions() == Dimensions::Scalar => {}
        _ => return Err(format!("index component type {} not supported", view.layout())),
    }
    let start = out.len();
    for i in 0..view.count() {
        let rebased = match view.read_index(i) {
            None => Err(format!("index element {i} unreadable")),
            Some(raw) if raw as usize >= vertex_count => Err(format!(
                "index element {i} is {raw}, primitive has {vertex_count} vertices"
            )),
            Some(raw) => raw
                .checked_add(vertex_start)
                .ok_or_else(|| format!("index element {i} overflows the merged vertex range")),
        };
        match rebased {
            Ok(index) => out.push(index),
            Err(detail) => {
                out.truncate(start);
                return Err(detail);
            }
        }
    }
    Ok((out.len() - start) as u32)
}
