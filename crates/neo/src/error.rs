//! Engine error type.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum NeoError {
    /// Reading a file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A configuration file could not be parsed.
    Config(serde_json::Error),
    /// Creating the event loop or window failed.
    Window(String),
    /// Adapter, device or surface setup failed.
    Gpu(String),
}

impl fmt::Display for NeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeoError::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            NeoError::Config(e) => write!(f, "invalid config: {e}"),
            NeoError::Window(e) => write!(f, "window error: {e}"),
            NeoError::Gpu(e) => write!(f, "gpu error: {e}"),
        }
    }
}

impl std::error::Error for NeoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NeoError::Io { source, .. } => Some(source),
            NeoError::Config(e) => Some(e),
            NeoError::Window(_) | NeoError::Gpu(_) => None,
        }
    }
}

impl From<serde_json::Error> for NeoError {
    fn from(e: serde_json::Error) -> Self {
        NeoError::Config(e)
    }
}

pub type Result<T, E = NeoError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_error_names_the_path() {
        let err = NeoError::Io {
            path: PathBuf::from("shaders/phong.vert"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.to_string(), "failed to read shaders/phong.vert: gone");
        assert!(err.source().is_some());
    }

    #[test]
    fn config_errors_convert() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("nope");
        let err: NeoError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("invalid config"));
    }
}
