//! Top-level error type. Scene/mesh loading and image output are the
//! only places this renderer returns `Err` from; per-sample numerical
//! degeneracies (a zero pdf, a missed intersection, NaN radiance) are
//! handled inline and never surface as an error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene file not found: {0}")]
    SceneFileNotFound(PathBuf),

    #[error("failed to parse scene file {path}: {source}")]
    SceneFileParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("mesh file not found: {0}")]
    MeshFileNotFound(PathBuf),

    #[error("malformed mesh file {path}: {reason}")]
    MeshFileMalformed { path: PathBuf, reason: String },

    #[error("failed to read mesh file {path}: {source}")]
    MeshFileParse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scene file is missing required field `{field}`")]
    MissingRequiredField { field: &'static str },

    #[error("failed to write output image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RenderError>;
