// ---------------------------------------------------------------------------
// AscentError: errors at the edges of the simulation core
// ---------------------------------------------------------------------------

use std::fmt;

/// Errors from loading tuning files, save records and browser storage.
///
/// The simulation itself never fails; degenerate numeric input is recovered
/// in place. Only I/O and decoding at the boundary can go wrong.
#[derive(Debug)]
pub enum AscentError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// JSON encoding or decoding failed.
    Json(serde_json::Error),
    /// Browser storage unavailable or refused the write.
    Storage(String),
    /// Save record version is newer than this build supports.
    UnsupportedVersion { max_supported: u32, found: u32 },
}

pub type Result<T> = std::result::Result<T, AscentError>;

impl fmt::Display for AscentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AscentError::Io(e) => write!(f, "I/O error: {e}"),
            AscentError::Json(e) => write!(f, "JSON error: {e}"),
            AscentError::Storage(msg) => write!(f, "Storage error: {msg}"),
            AscentError::UnsupportedVersion {
                max_supported,
                found,
            } => write!(
                f,
                "Unsupported save version: found v{found}, \
                 this build supports up to v{max_supported}"
            ),
        }
    }
}

impl std::error::Error for AscentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AscentError::Io(e) => Some(e),
            AscentError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AscentError {
    fn from(e: std::io::Error) -> Self {
        AscentError::Io(e)
    }
}

impl From<serde_json::Error> for AscentError {
    fn from(e: serde_json::Error) -> Self {
        AscentError::Json(e)
    }
}
