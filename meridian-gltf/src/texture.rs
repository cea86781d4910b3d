//! Sampler and texture resolution.
//!
//! Image bytes are kept encoded; decoding belongs to the [`RenderResources`]
//! implementation that uploads them.
//!
//! [`RenderResources`]: crate::resources::RenderResources

use std::path::Path;

use base64::Engine as _;
use gltf::texture::{MagFilter, MinFilter, WrappingMode};

use crate::error::LoadError;
use crate::resources::TextureHandle;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    #[default]
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

/// Engine-side sampler description handed to the texture collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
}

pub fn mag_filter_mode(filter: Option<MagFilter>) -> FilterMode {
    match filter {
        Some(MagFilter::Nearest) => FilterMode::Nearest,
        Some(MagFilter::Linear) | None => FilterMode::Linear,
    }
}

/// Collapses the six glTF minification filters onto two modes.
/// The mipmap half of the name decides for the mipmapped variants.
pub fn min_filter_mode(filter: Option<MinFilter>) -> FilterMode {
    match filter {
        Some(MinFilter::Nearest)
        | Some(MinFilter::NearestMipmapNearest)
        | Some(MinFilter::LinearMipmapNearest) => FilterMode::Nearest,
        Some(MinFilter::Linear)
        | Some(MinFilter::NearestMipmapLinear)
        | Some(MinFilter::LinearMipmapLinear)
        | None => FilterMode::Linear,
    }
}

pub fn address_mode(mode: WrappingMode) -> AddressMode {
    match mode {
        WrappingMode::Repeat => AddressMode::Repeat,
        WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        WrappingMode::MirroredRepeat => AddressMode::MirroredRepeat,
    }
}

impl TextureSampler {
    pub fn from_gltf(sampler: &gltf::texture::Sampler<'_>) -> Self {
        let address_mode_v = address_mode(sampler.wrap_t());
        Self {
            mag_filter: mag_filter_mode(sampler.mag_filter()),
            min_filter: min_filter_mode(sampler.min_filter()),
            address_mode_u: address_mode(sampler.wrap_s()),
            address_mode_v,
            // glTF has no third wrap axis
            address_mode_w: address_mode_v,
        }
    }
}

/// Texture record: still-encoded image bytes plus the sampler to use.
#[derive(Clone, Debug)]
pub struct Texture {
    pub index: usize,
    pub name: String,
    pub image_index: usize,
    pub mime_type: Option<String>,
    pub image: Vec<u8>,
    pub sampler: TextureSampler,
    /// Set once the texture collaborator accepted the upload.
    pub handle: Option<TextureHandle>,
}

/// Resolves every sampler of the document, in source order.
pub fn load_samplers(document: &gltf::Document) -> Vec<TextureSampler> {
    document
        .samplers()
        .map(|sampler| TextureSampler::from_gltf(&sampler))
        .collect()
}

/// Resolves every texture of the document to its image bytes and sampler.
///
/// A texture without a sampler uses the default linear/repeat sampler.
pub fn load_textures(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    samplers: &[TextureSampler],
    base_dir: Option<&Path>,
) -> Result<Vec<Texture>, LoadError> {
    let mut textures = Vec::new();
    for texture in document.textures() {
        let image = texture.source();
        let (bytes, mime_type) = image_bytes(&image, buffers, base_dir)?;
        let sampler = texture
            .sampler()
            .index()
            .and_then(|i| samplers.get(i).copied())
            .unwrap_or_default();
        let name = texture
            .name()
            .or_else(|| image.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("texture_{}", texture.index()));

        log::debug!(
            "texture '{}': image {} ({} bytes), sampler {:?}",
            name,
            image.index(),
            bytes.len(),
            sampler
        );
        textures.push(Texture {
            index: texture.index(),
            name,
            image_index: image.index(),
            mime_type,
            image: bytes,
            sampler,
            handle: None,
        });
    }
    Ok(textures)
}

fn image_bytes(
    image: &gltf::Image<'_>,
    buffers: &[gltf::buffer::Data],
    base_dir: Option<&Path>,
) -> Result<(Vec<u8>, Option<String>), LoadError> {
    match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffers.get(view.buffer().index()).ok_or_else(|| {
                LoadError::malformed(format!("image {} references a missing buffer", image.index()))
            })?;
            let start = view.offset();
            let bytes = start
                .checked_add(view.length())
                .and_then(|end| buffer.get(start..end))
                .ok_or_else(|| {
                    LoadError::malformed(format!("image {} view lies outside its buffer", image.index()))
                })?;
            Ok((bytes.to_vec(), Some(mime_type.to_string())))
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            let mime_type = mime_type.map(str::to_string);
            if let Some(data) = uri.strip_prefix("data:") {
                let (header, payload) = data.split_once(',').ok_or_else(|| {
                    LoadError::malformed(format!("image {} has a malformed data URI", image.index()))
                })?;
                if !header.ends_with(";base64") {
                    return Err(LoadError::malformed(format!(
                        "image {} data URI is not base64 encoded",
                        image.index()
                    )));
                }
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(payload)
                    .map_err(|e| LoadError::malformed(format!("image {}: {e}", image.index())))?;
                let mime_type = mime_type.or_else(|| {
                    header.strip_suffix(";base64").filter(|m| !m.is_empty()).map(str::to_string)
                });
                return Ok((bytes, mime_type));
            }
            let path = match base_dir {
                Some(dir) => dir.join(uri),
                None => Path::new(uri).to_path_buf(),
            };
            let bytes = std::fs::read(&path).map_err(|source| LoadError::Io { path, source })?;
            Ok((bytes, mime_type))
        }
    }
}
