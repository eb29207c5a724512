//! Error types.
//!
//! Loading the model or the emissive map is the only operation that can fail
//! once the GPU context exists. Everything else (resize, update, render) is
//! treated as infallible for a configured surface.

use thiserror::Error;

/// Fetching or decoding an asset failed.
///
/// Carries the asset path as it was requested (relative to the asset root)
/// and the underlying cause, which may be an IO, HTTP, glTF or image error.
#[derive(Debug, Error)]
#[error("failed to load asset `{path}`: {cause}")]
pub struct AssetLoadError {
    pub path: String,
    #[source]
    pub cause: anyhow::Error,
}

impl AssetLoadError {
    pub fn new(path: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            path: path.into(),
            cause: cause.into(),
        }
    }
}

/// Wraps any error into an [`AssetLoadError`] for the given path.
pub(crate) trait WithAssetPath<T> {
    fn with_asset_path(self, path: &str) -> Result<T, AssetLoadError>;
}

impl<T, E> WithAssetPath<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn with_asset_path(self, path: &str) -> Result<T, AssetLoadError> {
        self.map_err(|cause| AssetLoadError::new(path, cause))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn keeps_path_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: Result<(), _> = Err(io);
        let err = err.with_asset_path("models/floppy.glb").unwrap_err();

        assert_eq!(err.path, "models/floppy.glb");
        assert!(err.to_string().contains("models/floppy.glb"));
        assert!(err.source().is_some());
    }
}
