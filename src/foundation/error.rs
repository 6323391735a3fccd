/// Convenience result type used across stillclip.
pub type StillclipResult<T> = Result<T, StillclipError>;

/// Top-level error taxonomy, one variant per pipeline failure class.
#[derive(thiserror::Error, Debug)]
pub enum StillclipError {
    /// Filesystem errors while clearing the destination path.
    #[error("prepare error: {0}")]
    Prepare(String),

    /// The source image could not be read or decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Encoding-session errors: creation, buffer mismatch, append, finalize.
    #[error("writer error: {0}")]
    Writer(String),

    /// The intermediate container exposes no usable video track.
    #[error("composition error: {0}")]
    Composition(String),

    /// The normalizing export pass failed.
    #[error("export error: {0}")]
    Export(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StillclipError {
    /// Build a [`StillclipError::Prepare`] value.
    pub fn prepare(msg: impl Into<String>) -> Self {
        Self::Prepare(msg.into())
    }

    /// Build a [`StillclipError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`StillclipError::Writer`] value.
    pub fn writer(msg: impl Into<String>) -> Self {
        Self::Writer(msg.into())
    }

    /// Build a [`StillclipError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build a [`StillclipError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StillclipError::prepare("x")
                .to_string()
                .contains("prepare error:")
        );
        assert!(
            StillclipError::decode("x")
                .to_string()
                .contains("decode error:")
        );
        assert!(
            StillclipError::writer("x")
                .to_string()
                .contains("writer error:")
        );
        assert!(
            StillclipError::composition("x")
                .to_string()
                .contains("composition error:")
        );
        assert!(
            StillclipError::export("x")
                .to_string()
                .contains("export error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StillclipError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
