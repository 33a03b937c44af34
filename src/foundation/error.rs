use std::path::Path;

/// Convenience result type used across lakebloom.
pub type LakebloomResult<T> = Result<T, LakebloomError>;

/// Top-level error taxonomy used by the pipeline stages.
///
/// Every variant carries a message that names the resource involved (a path, a dimension, or the
/// empty set) so unattended runs stay diagnosable from the log alone.
#[derive(thiserror::Error, Debug)]
pub enum LakebloomError {
    /// Persisted series data could not be parsed.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// Grid, geometry, or generator configuration is invalid.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A frame or chart image could not be produced or written.
    #[error("render error: {0}")]
    Render(String),

    /// A required input path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An input that must be non-empty had nothing in it.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A frame file exists but cannot be used for assembly.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The requested video encoding backend cannot be used on this host.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The encoder ran but failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// A render or encode exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LakebloomError {
    /// Build a [`LakebloomError::DataFormat`] value.
    pub fn data_format(msg: impl Into<String>) -> Self {
        Self::DataFormat(msg.into())
    }

    /// Build a [`LakebloomError::InvalidParameter`] value.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Build a [`LakebloomError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`LakebloomError::NotFound`] value naming `path`.
    pub fn not_found(path: &Path) -> Self {
        Self::NotFound(format!("'{}' does not exist", path.display()))
    }

    /// Build a [`LakebloomError::EmptyInput`] value.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Build a [`LakebloomError::MalformedFrame`] value.
    pub fn malformed_frame(msg: impl Into<String>) -> Self {
        Self::MalformedFrame(msg.into())
    }

    /// Build a [`LakebloomError::BackendUnavailable`] value.
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Build a [`LakebloomError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`LakebloomError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Return `true` for [`LakebloomError::BackendUnavailable`].
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
