use std::path::PathBuf;

use thiserror::Error;

/// Library error type for photo-puzzle operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The selected image directory is missing, not a directory, or cannot be listed.
    #[error("image directory {} cannot be read", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No stored preference and the directory picker was cancelled.
    #[error("no image directory selected")]
    NoDirectory,

    /// A single image file could not be decoded.
    #[error("failed to decode {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The preference store could not be read or written.
    #[error("preference store {}: {message}", .path.display())]
    Preferences { path: PathBuf, message: String },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
