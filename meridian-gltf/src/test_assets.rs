//! Synthetic glTF assets for unit tests.
//!
//! The builder accumulates a JSON document and one binary buffer. Every
//! accessor gets its own 4-byte aligned buffer view.

use base64::Engine as _;
use serde_json::{json, Value};

use crate::model::Model;
use crate::settings::ImportSettings;

pub(crate) struct AssetBuilder {
    root: Value,
    bin: Vec<u8>,
}

const FLOAT: u32 = 5126;
const UNSIGNED_BYTE: u32 = 5121;
const UNSIGNED_SHORT: u32 = 5123;

impl AssetBuilder {
    pub fn new() -> Self {
        Self {
            root: json!({ "asset": { "version": "2.0" } }),
            bin: Vec::new(),
        }
    }

    /// One node with one indexed triangle, no material, in scene 0.
    pub fn triangle() -> Self {
        let mut asset = Self::new();
        let mesh = asset.triangle_mesh();
        asset.push("nodes", json!({ "mesh": mesh }));
        asset.push("scenes", json!({ "nodes": [0] }));
        asset.set("scene", json!(0));
        asset
    }

    /// Appends `value` to the top-level array `key` and returns its index.
    pub fn push(&mut self, key: &str, value: Value) -> usize {
        if !self.root[key].is_array() {
            self.root[key] = json!([]);
        }
        let array = self.root[key].as_array_mut().unwrap();
        array.push(value);
        array.len() - 1
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.root[key] = value;
    }

    /// Sets `field` on element `index` of the top-level array `key`.
    pub fn edit(&mut self, key: &str, index: usize, field: &str, value: Value) {
        self.root[key][index][field] = value;
    }

    pub fn use_extension(&mut self, name: &str) {
        self.push("extensionsUsed", json!(name));
    }

    pub fn raw_view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        self.push(
            "bufferViews",
            json!({ "buffer": 0, "byteOffset": offset, "byteLength": bytes.len() }),
        )
    }

    fn accessor(&mut self, bytes: &[u8], component_type: u32, count: usize, ty: &str) -> usize {
        let view = self.raw_view(bytes);
        self.push(
            "accessors",
            json!({ "bufferView": view, "componentType": component_type, "count": count, "type": ty }),
        )
    }

    fn floats(values: impl IntoIterator<Item = f32>) -> Vec<u8> {
        values.into_iter().flat_map(f32::to_le_bytes).collect()
    }

    /// POSITION accessor with the mandatory min/max bounds.
    pub fn positions(&mut self, positions: &[[f32; 3]]) -> usize {
        let index = self.vec3_accessor(positions);
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        self.root["accessors"][index]["min"] = json!(min);
        self.root["accessors"][index]["max"] = json!(max);
        index
    }

    /// Scalar float accessor with bounds, usable as animation input.
    pub fn scalar_accessor(&mut self, values: &[f32]) -> usize {
        let bytes = Self::floats(values.iter().copied());
        let index = self.accessor(&bytes, FLOAT, values.len(), "SCALAR");
        let min = values.iter().copied().fold(f32::MAX, f32::min);
        let max = values.iter().copied().fold(f32::MIN, f32::max);
        self.root["accessors"][index]["min"] = json!([min]);
        self.root["accessors"][index]["max"] = json!([max]);
        index
    }

    pub fn vec2_accessor(&mut self, values: &[[f32; 2]]) -> usize {
        let bytes = Self::floats(values.iter().flatten().copied());
        self.accessor(&bytes, FLOAT, values.len(), "VEC2")
    }

    pub fn vec3_accessor(&mut self, values: &[[f32; 3]]) -> usize {
        let bytes = Self::floats(values.iter().flatten().copied());
        self.accessor(&bytes, FLOAT, values.len(), "VEC3")
    }

    pub fn vec4_accessor(&mut self, values: &[[f32; 4]]) -> usize {
        let bytes = Self::floats(values.iter().flatten().copied());
        self.accessor(&bytes, FLOAT, values.len(), "VEC4")
    }

    /// `values` holds column-major matrices back to back.
    pub fn mat4_accessor(&mut self, values: &[f32]) -> usize {
        let bytes = Self::floats(values.iter().copied());
        self.accessor(&bytes, FLOAT, values.len() / 16, "MAT4")
    }

    pub fn u8_vec4_accessor(&mut self, values: &[[u8; 4]]) -> usize {
        let bytes: Vec<u8> = values.iter().flatten().copied().collect();
        self.accessor(&bytes, UNSIGNED_BYTE, values.len(), "VEC4")
    }

    pub fn u16_vec4_accessor(&mut self, values: &[[u16; 4]]) -> usize {
        let bytes: Vec<u8> = values.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();
        self.accessor(&bytes, UNSIGNED_SHORT, values.len(), "VEC4")
    }

    pub fn u16_indices(&mut self, indices: &[u16]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
        self.accessor(&bytes, UNSIGNED_SHORT, indices.len(), "SCALAR")
    }

    /// Indexed right triangle with its corner at `origin`, as primitive JSON.
    pub fn triangle_primitive(&mut self, origin: [f32; 3]) -> Value {
        let [x, y, z] = origin;
        let positions = self.positions(&[[x, y, z], [x + 1.0, y, z], [x, y + 1.0, z]]);
        let indices = self.u16_indices(&[0, 1, 2]);
        json!({ "attributes": { "POSITION": positions }, "indices": indices })
    }

    pub fn triangle_mesh(&mut self) -> usize {
        let primitive = self.triangle_primitive([0.0, 0.0, 0.0]);
        self.push("meshes", json!({ "primitives": [primitive] }))
    }

    pub fn data_uri_image(&mut self, bytes: &[u8], mime_type: &str) -> usize {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.push("images", json!({ "uri": format!("data:{mime_type};base64,{encoded}") }))
    }

    fn padded_bin(&self) -> Vec<u8> {
        let mut bin = self.bin.clone();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        bin
    }

    fn document(&self, buffer_uri: Option<String>) -> Vec<u8> {
        let mut root = self.root.clone();
        if !self.bin.is_empty() {
            let mut buffer = json!({ "byteLength": self.padded_bin().len() });
            if let Some(uri) = buffer_uri {
                buffer["uri"] = json!(uri);
            }
            root["buffers"] = json!([buffer]);
        }
        serde_json::to_vec(&root).unwrap()
    }

    /// JSON document with the buffer embedded as a base64 data URI.
    pub fn to_embedded_gltf(&self) -> Vec<u8> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.padded_bin());
        self.document(Some(format!("data:application/octet-stream;base64,{encoded}")))
    }

    pub fn to_glb(&self) -> Vec<u8> {
        let mut json = self.document(None);
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let bin = self.padded_bin();

        let mut total = 12 + 8 + json.len();
        if !bin.is_empty() {
            total += 8 + bin.len();
        }

        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());

        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
        glb.extend_from_slice(&json);

        if !bin.is_empty() {
            glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
            glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
            glb.extend_from_slice(&bin);
        }
        glb
    }

    pub fn parse(&self) -> (gltf::Document, Vec<gltf::buffer::Data>) {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&self.to_glb()).unwrap();
        let buffers = gltf::import_buffers(&document, None, blob).unwrap();
        (document, buffers)
    }

    pub fn import(&self) -> Model {
        Model::from_slice(&self.to_glb(), None, &ImportSettings::default()).unwrap()
    }
}
