use std::path::PathBuf;

use thiserror::Error;

/// Reasons the model asset can fail to resolve.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("invalid glTF asset")]
    Gltf(#[from] gltf::Error),
    #[error("asset does not contain any scene nodes")]
    EmptyScene,
}
