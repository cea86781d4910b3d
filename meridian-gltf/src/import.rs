//! The load pipeline: container decode, resolution of every asset section in
//! dependency order, node hierarchy construction and the final pose and
//! bounds passes.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use glam::Mat4;

use crate::animation::load_animations;
use crate::bounds::compute_scene_bounds;
use crate::error::{DiagnosticLog, LoadError};
use crate::material::load_materials;
use crate::model::Model;
use crate::node::{Node, NodeId};
use crate::primitive::{load_mesh, Geometry, MeshContext};
use crate::references::DanglingReferences;
use crate::resources::RenderResources;
use crate::settings::ImportSettings;
use crate::skin::{assign_skins, load_skins};
use crate::texture::{load_samplers, load_textures};

const GLB_MAGIC: &[u8; 4] = b"glTF";

/// Container format, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// JSON document, buffers in external files or data URIs.
    Gltf,
    /// Binary container with an embedded buffer.
    Glb,
}

impl ContainerKind {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("gltf") => Ok(Self::Gltf),
            Some("glb") => Ok(Self::Glb),
            _ => Err(LoadError::UnsupportedExtension(path.to_path_buf())),
        }
    }

    /// Checks the leading bytes against the expected container.
    pub fn check(self, bytes: &[u8]) -> Result<(), LoadError> {
        let binary = bytes.starts_with(GLB_MAGIC);
        match (self, binary) {
            (Self::Glb, false) => Err(LoadError::malformed("missing GLB header")),
            (Self::Gltf, true) => Err(LoadError::malformed("binary GLB data in a .gltf file")),
            _ => Ok(()),
        }
    }
}

/// Reads and imports a `.gltf` or `.glb` file without touching the GPU.
pub fn import_model(path: impl AsRef<Path>, settings: &ImportSettings) -> Result<Model, LoadError> {
    let path = path.as_ref();
    let result = import_file(path, settings);
    if let Err(err) = &result {
        log::error!("failed to load '{}': {err}", path.display());
    }
    result
}

fn import_file(path: &Path, settings: &ImportSettings) -> Result<Model, LoadError> {
    settings.validate()?;
    let kind = ContainerKind::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    kind.check(&bytes)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    decode(name, &bytes, path.parent(), settings)
}

/// Imports a model file and uploads it through `resources`.
///
/// Nothing is uploaded unless the whole import succeeded, and a failed
/// upload releases what it already created.
pub fn load_model<R: RenderResources + ?Sized>(
    path: impl AsRef<Path>,
    scale: f32,
    resources: &mut R,
) -> Result<Model, LoadError> {
    let path = path.as_ref();
    let mut model = import_model(path, &ImportSettings::with_scale(scale))?;
    model.upload(resources)?;
    Ok(model)
}

impl Model {
    /// Imports a model from an in-memory `.gltf` or `.glb` image. External
    /// buffers and images are resolved against `base_dir`.
    pub fn from_slice(bytes: &[u8], base_dir: Option<&Path>, settings: &ImportSettings) -> Result<Model, LoadError> {
        settings.validate()?;
        decode("memory".to_string(), bytes, base_dir, settings)
    }
}

fn decode(name: String, bytes: &[u8], base_dir: Option<&Path>, settings: &ImportSettings) -> Result<Model, LoadError> {
    log::debug!("decoding '{name}' ({} bytes)", bytes.len());
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(bytes)?;
    let mut root = document.into_json();
    let dangling = DanglingReferences::detach(&mut root);
    let document = gltf::Document::from_json(root)?;
    let buffers = gltf::import_buffers(&document, base_dir, blob).map_err(|err| match err {
        gltf::Error::Io(source) => LoadError::Io {
            path: base_dir.map(Path::to_path_buf).unwrap_or_default(),
            source,
        },
        other => LoadError::from(other),
    })?;

    let mut diagnostics = DiagnosticLog::default();
    let samplers = load_samplers(&document);
    let textures = load_textures(&document, &buffers, &samplers, base_dir)?;
    let materials: Vec<_> = load_materials(&document).into_iter().map(Arc::new).collect();

    let scene = match settings.scene {
        Some(index) => document
            .scenes()
            .nth(index)
            .ok_or_else(|| LoadError::malformed(format!("scene {index} does not exist")))?,
        None => document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| LoadError::malformed("asset contains no scene"))?,
    };

    let mut builder = SceneBuilder {
        ctx: MeshContext {
            buffers: &buffers,
            materials: &materials,
            dangling: &dangling,
        },
        nodes: Vec::new(),
        roots: Vec::new(),
        visited: HashSet::new(),
        geometry: Geometry::default(),
        diagnostics: &mut diagnostics,
    };
    for node in scene.nodes() {
        let id = builder.load_node(&node)?;
        builder.roots.push(id);
    }
    let SceneBuilder {
        mut nodes,
        roots,
        geometry,
        ..
    } = builder;

    let animations = load_animations(&document, &buffers, &nodes, &roots, &dangling, &mut diagnostics);
    let skins = load_skins(&document, &buffers, &nodes, &roots, &dangling, &mut diagnostics);
    assign_skins(&mut nodes, &skins, &mut diagnostics);

    let mut model = Model {
        name,
        scale: settings.scale,
        nodes,
        roots,
        materials,
        textures,
        samplers,
        skins,
        animations,
        vertices: geometry.vertices,
        indices: geometry.indices,
        dimensions: Default::default(),
        aabb: Mat4::IDENTITY,
        extensions: document.extensions_used().map(str::to_string).collect(),
        diagnostics: diagnostics.into_vec(),
        buffers: None,
    };
    model.update_transforms();
    model.dimensions = compute_scene_bounds(&mut model.nodes, &model.roots);
    model.aabb = model.dimensions.aabb_matrix();

    log::info!(
        "loaded '{}': {} nodes, {} vertices, {} indices, {} materials, {} animations, {} warnings",
        model.name,
        model.nodes.len(),
        model.vertices.len(),
        model.indices.len(),
        model.materials.len(),
        model.animations.len(),
        model.diagnostics.len()
    );
    Ok(model)
}

struct SceneBuilder<'a> {
    ctx: MeshContext<'a>,
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    visited: HashSet<usize>,
    geometry: Geometry,
    diagnostics: &'a mut DiagnosticLog,
}

impl SceneBuilder<'_> {
    /// Builds `source` and its subtree; children are pushed before the node.
    fn load_node(&mut self, source: &gltf::Node<'_>) -> Result<NodeId, LoadError> {
        if !self.visited.insert(source.index()) {
            return Err(LoadError::malformed(format!(
                "node {} is reachable twice; the hierarchy is not a tree",
                source.index()
            )));
        }

        let mut node = Node::new(source.index(), source.name().unwrap_or_default().to_string());
        node.set_transform(source.transform());
        node.skin_index = source
            .skin()
            .map(|skin| skin.index())
            .or_else(|| self.ctx.dangling.skin(source.index()));

        for child in source.children() {
            let child = self.load_node(&child)?;
            node.children.push(child);
        }

        if let Some(mesh) = source.mesh() {
            let matrix = node.matrix.unwrap_or(Mat4::IDENTITY);
            node.mesh = Some(load_mesh(&mesh, matrix, &self.ctx, &mut self.geometry, self.diagnostics)?);
        }

        let id = NodeId(self.nodes.len());
        for &child in &node.children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(node);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_assets::AssetBuilder;
    use serde_json::json;

    #[test]
    fn test_minimal_triangle() {
        let _ = env_logger::builder().is_test(true).try_init();
        let model = AssetBuilder::triangle().import();
        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.indices, vec![0, 1, 2]);
        assert_eq!(model.materials.len(), 1);

        let mesh = model.nodes[0].mesh.as_ref().unwrap();
        assert_eq!(mesh.primitives.len(), 1);
        let primitive = &mesh.primitives[0];
        assert!(Arc::ptr_eq(&primitive.material, model.default_material().unwrap()));
        assert!(model.diagnostics.is_empty());
        assert!(model.dimensions.max.x > model.dimensions.min.x);
        assert_eq!(model.scale, 1.0);
    }

    #[test]
    fn test_glb_and_data_uri_forms_agree() {
        let asset = AssetBuilder::triangle();
        let settings = ImportSettings::default();
        let from_glb = Model::from_slice(&asset.to_glb(), None, &settings).unwrap();
        let from_json = Model::from_slice(&asset.to_embedded_gltf(), None, &settings).unwrap();
        assert_eq!(from_glb.vertices, from_json.vertices);
        assert_eq!(from_glb.indices, from_json.indices);
    }

    #[test]
    fn test_children_precede_parents() {
        let mut asset = AssetBuilder::new();
        asset.push("nodes", json!({ "name": "root", "children": [1, 2] }));
        asset.push("nodes", json!({ "name": "left", "children": [3] }));
        asset.push("nodes", json!({ "name": "right" }));
        asset.push("nodes", json!({ "name": "leaf" }));
        asset.push("scenes", json!({ "nodes": [0] }));
        let model = asset.import();

        let names: Vec<_> = model.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["leaf", "left", "right", "root"]);
        assert_eq!(model.roots, vec![NodeId(3)]);
        assert_eq!(model.nodes[0].parent, Some(NodeId(1)));
        assert_eq!(model.nodes[1].parent, Some(NodeId(3)));
        assert_eq!(model.nodes[3].children, vec![NodeId(1), NodeId(2)]);
        assert!(model.nodes[3].parent.is_none());
    }

    #[test]
    fn test_shared_child_is_malformed() {
        let mut asset = AssetBuilder::new();
        asset.push("nodes", json!({ "children": [2] }));
        asset.push("nodes", json!({ "children": [2] }));
        asset.push("nodes", json!({}));
        asset.push("scenes", json!({ "nodes": [0, 1] }));
        let err = Model::from_slice(&asset.to_glb(), None, &ImportSettings::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAsset(_)));
    }

    #[test]
    fn test_cycle_is_malformed() {
        let mut asset = AssetBuilder::new();
        asset.push("nodes", json!({ "children": [1] }));
        asset.push("nodes", json!({ "children": [0] }));
        asset.push("scenes", json!({ "nodes": [0] }));
        let err = Model::from_slice(&asset.to_glb(), None, &ImportSettings::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAsset(_)));
    }

    #[test]
    fn test_missing_scene_is_malformed() {
        let mut asset = AssetBuilder::new();
        asset.push("nodes", json!({}));
        let err = Model::from_slice(&asset.to_glb(), None, &ImportSettings::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAsset(_)));

        let err = Model::from_slice(
            &AssetBuilder::triangle().to_glb(),
            None,
            &ImportSettings {
                scene: Some(3),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MalformedAsset(_)));
    }

    #[test]
    fn test_scene_override() {
        let mut asset = AssetBuilder::triangle();
        asset.push("nodes", json!({ "name": "other" }));
        asset.push("scenes", json!({ "nodes": [1] }));
        asset.set("scene", json!(0));
        let settings = ImportSettings {
            scene: Some(1),
            ..Default::default()
        };
        let model = Model::from_slice(&asset.to_glb(), None, &settings).unwrap();
        assert_eq!(model.nodes.len(), 1);
        assert_eq!(model.nodes[0].name, "other");
        assert!(model.vertices.is_empty());
    }

    #[test]
    fn test_missing_position_fails() {
        let mut asset = AssetBuilder::new();
        let normals = asset.vec3_accessor(&[[0.0, 0.0, 1.0]; 3]);
        asset.push("meshes", json!({ "primitives": [{ "attributes": { "NORMAL": normals } }] }));
        asset.push("nodes", json!({ "mesh": 0 }));
        asset.push("scenes", json!({ "nodes": [0] }));
        let err = Model::from_slice(&asset.to_glb(), None, &ImportSettings::default()).unwrap_err();
        assert!(matches!(err, LoadError::MalformedAsset(_)));
    }

    #[test]
    fn test_invalid_scale_is_rejected_before_decoding() {
        let err = Model::from_slice(b"garbage", None, &ImportSettings::with_scale(-2.0)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidScale(_)));
    }

    #[test]
    fn test_extensions_are_recorded() {
        let mut asset = AssetBuilder::triangle();
        asset.use_extension("KHR_materials_unlit");
        let model = asset.import();
        assert_eq!(model.extensions, vec!["KHR_materials_unlit".to_string()]);
    }

    #[test]
    fn test_container_kind() {
        assert_eq!(ContainerKind::from_path(Path::new("a/b.GLB")).unwrap(), ContainerKind::Glb);
        assert_eq!(ContainerKind::from_path(Path::new("b.gltf")).unwrap(), ContainerKind::Gltf);
        assert!(matches!(
            ContainerKind::from_path(Path::new("b.obj")),
            Err(LoadError::UnsupportedExtension(_))
        ));
        assert!(ContainerKind::Glb.check(b"glTF\x02\0\0\0").is_ok());
        assert!(ContainerKind::Glb.check(b"{\"asset\"").is_err());
        assert!(ContainerKind::Gltf.check(b"glTF\x02\0\0\0").is_err());
        assert!(ContainerKind::Gltf.check(b"{\"asset\"").is_ok());
    }
}
