//! Plain-old-data layouts shared between the Meridian glTF importer and the
//! GPU backends that consume its vertex and uniform blobs.

pub mod uniforms;
pub mod vertex;

pub use uniforms::{MeshUniforms, MAX_NUM_JOINTS};
pub use vertex::ModelVertex;
