use crate::format::registry::FormatKind;
use crate::validate::ValidationErrors;

/// Convenience result type used across imgelf.
pub type ImgElfResult<T> = Result<T, ImgElfError>;

/// Top-level error taxonomy used by the public APIs.
#[derive(thiserror::Error, Debug)]
pub enum ImgElfError {
    /// One or more request fields failed validation. Carries every violation, not just the first.
    #[error("validation error: {0}")]
    Validation(ValidationErrors),

    /// A format name outside the supported set.
    #[error("invalid format: \"{0}\" is not one of png, jpeg, gif, webp, tiff, ico, bmp")]
    InvalidFormat(String),

    /// The canvas cannot be serialized by the target codec.
    #[error("encoding error ({format}): {reason}")]
    Encoding {
        /// Target format of the failed encode.
        format: FormatKind,
        /// Human-readable cause.
        reason: String,
    },

    /// Rasterization failed before encoding started.
    #[error("render error: {0}")]
    Render(String),

    /// Invalid service configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImgElfError {
    /// Build an [`ImgElfError::InvalidFormat`] value.
    pub fn invalid_format(name: impl Into<String>) -> Self {
        Self::InvalidFormat(name.into())
    }

    /// Build an [`ImgElfError::Encoding`] value.
    pub fn encoding(format: FormatKind, reason: impl Into<String>) -> Self {
        Self::Encoding {
            format,
            reason: reason.into(),
        }
    }

    /// Build an [`ImgElfError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build an [`ImgElfError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The structured per-field errors, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ImgElfError::invalid_format("jpg")
                .to_string()
                .contains("invalid format:")
        );
        assert!(
            ImgElfError::encoding(FormatKind::Jpeg, "alpha")
                .to_string()
                .contains("encoding error (jpeg):")
        );
        assert!(
            ImgElfError::render("x")
                .to_string()
                .contains("render error:")
        );
        assert!(
            ImgElfError::config("x")
                .to_string()
                .contains("config error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ImgElfError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
        assert!(err.validation_errors().is_none());
    }
}
