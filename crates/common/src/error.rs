//! Common error types.

use thiserror::Error;

/// Error type shared by the rendering, export and ingestion layers.
///
/// Model mutations never produce one of these: operations on the layer model
/// are total and treat unknown ids as no-ops.
#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Drawing surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type StudioResult<T> = Result<T, StudioError>;

impl StudioError {
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::SurfaceUnavailable(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StudioError::surface("canvas is 0x0");
        assert_eq!(err.to_string(), "Drawing surface unavailable: canvas is 0x0");

        let err = StudioError::encode("bad buffer");
        assert!(matches!(err, StudioError::Encode(_)));
    }

    #[test]
    fn test_json_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: StudioError = parse.unwrap_err().into();
        assert!(matches!(err, StudioError::Json(_)));
    }
}
