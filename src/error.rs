//! Error type shared by every viewer operation.

use crate::layer::LayerId;
use crate::scene::SceneId;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Errors raised by the viewer and its collaborators.
///
/// None of these are transient: they signal a programming or integration
/// mistake and are surfaced synchronously to the caller of the operation
/// that detected them.
#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    /// The scene is not registered with this viewer.
    #[error("no such scene: {0}")]
    UnknownScene(SceneId),

    /// The layer does not belong to the scene it was removed from.
    #[error("no such layer: {0}")]
    UnknownLayer(LayerId),

    /// Reconciliation found a stage/scene delta other than a single layer.
    ///
    /// This is fatal for the viewer: either there is a bug or the stage was
    /// mutated behind the viewer's back.
    #[error(
        "stage out of sync with {scene}: {removed} layer(s) missing from scene, {added} layer(s) missing from stage"
    )]
    OutOfSync {
        scene: SceneId,
        removed: usize,
        added: usize,
    },

    /// No usable stage backend, or the requested one is unknown/unsupported.
    #[error("unsupported stage backend: {0}")]
    UnsupportedBackend(String),

    /// The stage does not hold exactly the outgoing scene's layers.
    #[error("stage not in sync with viewer: expected {expected} layer(s), found {found}")]
    StageDesync { expected: usize, found: usize },

    /// GPU adapter, device or surface acquisition failed.
    #[error("gpu error: {0}")]
    Gpu(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl ViewerError {
    pub fn unsupported_backend(name: impl Into<String>) -> Self {
        Self::UnsupportedBackend(name.into())
    }

    pub fn gpu(msg: impl Into<String>) -> Self {
        Self::Gpu(msg.into())
    }

    /// Whether the error leaves the viewer unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfSync { .. } | Self::StageDesync { .. })
    }
}
