//! Error and diagnostic types for the import pipeline.
//!
//! Structural failures abort a load with a [`LoadError`]. Problems confined to
//! one attribute, sampler, channel or joint only produce a [`Diagnostic`]: the
//! offending piece falls back to its default and the rest of the model loads.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors returned by [`crate::load_model`] and [`crate::import_model`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The model file (or a file it references) could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path does not end in `.gltf` or `.glb`.
    #[error("'{0}' is neither a .gltf nor a .glb file")]
    UnsupportedExtension(PathBuf),

    /// The requested global scale is not a positive finite number.
    #[error("model scale must be finite and greater than zero, got {0}")]
    InvalidScale(f32),

    /// The container failed to parse or a mandatory piece of the asset is missing.
    #[error("malformed glTF asset: {0}")]
    MalformedAsset(String),

    /// A render collaborator rejected an upload. Everything uploaded before the
    /// failure has already been released.
    #[error("GPU upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl LoadError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedAsset(message.into())
    }
}

impl From<gltf::Error> for LoadError {
    fn from(err: gltf::Error) -> Self {
        Self::MalformedAsset(err.to_string())
    }
}

/// Error reported by a [`crate::RenderResources`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UploadError {
    pub message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from [`crate::draw_model`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("model '{0}' has no GPU buffers; upload it before drawing")]
    NotUploaded(String),
}

/// Errors from [`crate::Model::try_update_animation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("model '{0}' does not contain animations")]
    NoAnimations(String),

    #[error("model '{model}' has no animation with index {index} ({count} available)")]
    OutOfRange {
        model: String,
        index: usize,
        count: usize,
    },
}

/// Non-fatal problem found while importing. Collected on the model and logged
/// as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Data was present but stored in a layout the consumer cannot read.
    #[error("unsupported encoding in {context}: {detail}")]
    UnsupportedEncoding { context: String, detail: String },

    /// An index into the asset (joint, channel target, skin) did not resolve.
    #[error("unresolved reference in {context}: {detail}")]
    UnresolvedReference { context: String, detail: String },
}

impl Diagnostic {
    pub(crate) fn encoding(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnsupportedEncoding {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn unresolved(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub fn is_unsupported_encoding(&self) -> bool {
        matches!(self, Self::UnsupportedEncoding { .. })
    }

    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, Self::UnresolvedReference { .. })
    }
}

/// Accumulates diagnostics during a single import.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
