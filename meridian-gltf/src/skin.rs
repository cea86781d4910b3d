use std::sync::Arc;

use gltf::accessor::{DataType, Dimensions};
use glam::Mat4;

use crate::accessor::AccessorView;
use crate::error::{Diagnostic, DiagnosticLog};
use crate::node::{self, Node, NodeId};
use crate::references::DanglingReferences;

#[derive(Clone, Debug, PartialEq)]
pub struct Skin {
    pub name: String,
    pub skeleton_root: Option<NodeId>,
    /// One slot per declared joint, so `JOINTS_0` values index it directly.
    /// A joint that is not in the scene is `None` and poses as identity.
    pub joints: Vec<Option<NodeId>>,
    /// Parallel to `joints`.
    pub inverse_bind_matrices: Vec<Mat4>,
}

/// Builds every skin of the document against the already built node forest.
pub(crate) fn load_skins(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    nodes: &[Node],
    roots: &[NodeId],
    dangling: &DanglingReferences,
    diagnostics: &mut DiagnosticLog,
) -> Vec<Arc<Skin>> {
    document
        .skins()
        .map(|skin| Arc::new(load_skin(&skin, buffers, nodes, roots, dangling, diagnostics)))
        .collect()
}

fn load_skin(
    skin: &gltf::Skin<'_>,
    buffers: &[gltf::buffer::Data],
    nodes: &[Node],
    roots: &[NodeId],
    dangling: &DanglingReferences,
    diagnostics: &mut DiagnosticLog,
) -> Skin {
    let name = skin
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("skin_{}", skin.index()));
    let context = format!("skin '{name}'");

    let skeleton = skin
        .skeleton()
        .map(|root| root.index())
        .or_else(|| dangling.skeleton(skin.index()));
    let skeleton_root = skeleton.and_then(|root| {
        let found = node::find_by_index(nodes, roots, root);
        if found.is_none() {
            diagnostics.report(Diagnostic::unresolved(&context, format!("skeleton root node {root}")));
        }
        found
    });

    let source_matrices = skin
        .inverse_bind_matrices()
        .and_then(|accessor| match AccessorView::resolve(&accessor, buffers) {
            Some(view) if view.is(DataType::F32, Dimensions::Mat4) => Some(
                view.iter_f32::<16>()
                    .map(|m| Mat4::from_cols_array(&m))
                    .collect::<Vec<_>>(),
            ),
            Some(view) => {
                diagnostics.report(Diagnostic::encoding(
                    &context,
                    format!("inverse bind matrices stored as {}", view.layout()),
                ));
                None
            }
            None => {
                diagnostics.report(Diagnostic::encoding(&context, "unreadable inverse bind matrices"));
                None
            }
        });

    let declared: Vec<usize> = match dangling.joints(skin.index()) {
        Some(joints) => joints.to_vec(),
        None => skin.joints().map(|joint| joint.index()).collect(),
    };
    let mut joints = Vec::with_capacity(declared.len());
    let mut inverse_bind_matrices = Vec::with_capacity(declared.len());
    for (i, &joint) in declared.iter().enumerate() {
        let id = node::find_by_index(nodes, roots, joint);
        if id.is_none() {
            diagnostics.report(Diagnostic::unresolved(&context, format!("joint node {joint}")));
        }
        joints.push(id);
        let ibm = source_matrices
            .as_ref()
            .and_then(|matrices| matrices.get(i).copied())
            .unwrap_or(Mat4::IDENTITY);
        inverse_bind_matrices.push(ibm);
    }

    log::debug!("{context}: {} joints", joints.len());
    Skin {
        name,
        skeleton_root,
        joints,
        inverse_bind_matrices,
    }
}

/// Gives every node that references a skin its shared skin record.
pub(crate) fn assign_skins(nodes: &mut [Node], skins: &[Arc<Skin>], diagnostics: &mut DiagnosticLog) {
    for node in nodes.iter_mut() {
        let Some(skin_index) = node.skin_index else {
            continue;
        };
        match skins.get(skin_index) {
            Some(skin) => node.skin = Some(Arc::clone(skin)),
            None => diagnostics.report(Diagnostic::unresolved(
                format!("node '{}'", node.name),
                format!("skin {skin_index} of {}", skins.len()),
            )),
        }
    }
}
