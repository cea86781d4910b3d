use crate::error::DrawError;
use crate::model::Model;
use crate::node::NodeId;
use crate::resources::DrawCommands;

/// Records draws for every primitive of the model.
///
/// The merged buffers are bound once, then the node forest is walked depth
/// first: each mesh pushes its uniform block and draws its primitives, by
/// index window when the primitive has indices and by vertex range otherwise.
pub fn draw_model<C: DrawCommands + ?Sized>(model: &Model, commands: &mut C) -> Result<(), DrawError> {
    let buffers = model
        .buffers
        .ok_or_else(|| DrawError::NotUploaded(model.name.clone()))?;
    commands.bind_buffers(&buffers);
    for &root in &model.roots {
        draw_node(model, root, commands);
    }
    Ok(())
}

fn draw_node<C: DrawCommands + ?Sized>(model: &Model, id: NodeId, commands: &mut C) {
    let Some(node) = model.node(id) else {
        return;
    };

    if let Some(mesh) = &node.mesh {
        commands.set_mesh_uniforms(&mesh.uniforms);
        for primitive in &mesh.primitives {
            if primitive.index_count > 0 {
                commands.draw_indexed(primitive.first_index, primitive.index_count);
            } else if !primitive.has_indices && primitive.vertex_count > 0 {
                commands.draw(primitive.first_vertex, primitive.vertex_count);
            }
        }
    }

    for &child in &node.children {
        draw_node(model, child, commands);
    }
}
