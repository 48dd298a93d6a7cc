//! Error taxonomy for host-surface and cross-context failures.
//!
//! Every host failure is caught at the point of call and converted into one
//! of these variants; none propagate as panics. Fatal variants permanently
//! disable the affected feature until the panel is recreated, transient ones
//! leave the session alive.

use thiserror::Error;

use crate::geometry::SelectionRect;

#[derive(Debug, Error)]
pub enum Error {
    /// The host lacks the AI surface entirely, or it is disabled.
    #[error("AI capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Model download or initialization failed.
    #[error("Model acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// Session creation failed after the text-only fallback was exhausted.
    #[error("Session creation failed: {0}")]
    SessionCreationFailed(String),

    /// Appending an image turn to the session failed. Recoverable: the
    /// session stays alive and a text-only send is still allowed.
    #[error("Failed to process image: {0}")]
    MultimodalAppendFailed(String),

    /// The response stream completed with no usable content.
    #[error("Generation produced no content")]
    EmptyGeneration,

    /// A cross-context hop failed: no active tab, channel closed, or the
    /// capture permission was denied.
    #[error("Messaging failure: {0}")]
    MessagingFailure(String),

    /// Selection below the minimum size. Discarded silently, never shown
    /// to the user.
    #[error("Selection too small: {}x{}", .0.width, .0.height)]
    CaptureTooSmall(SelectionRect),

    /// The host raster could not be decoded or the crop could not be
    /// encoded. Surfaces in the panel like any other hop failure.
    #[error("Image processing failed: {0}")]
    ImageDecode(String),
}

impl Error {
    /// Whether the condition permanently disables the affected feature's
    /// input controls (until the panel is reopened).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::CapabilityUnavailable(_) | Error::SessionCreationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(Error::CapabilityUnavailable("no surface".into()).is_fatal());
        assert!(Error::SessionCreationFailed("boom".into()).is_fatal());
        assert!(!Error::MultimodalAppendFailed("boom".into()).is_fatal());
        assert!(!Error::EmptyGeneration.is_fatal());
        assert!(!Error::MessagingFailure("channel closed".into()).is_fatal());
    }

    #[test]
    fn messages_are_descriptive() {
        let err = Error::MessagingFailure("No active tab found".into());
        assert!(err.to_string().contains("No active tab found"));

        let err = Error::CaptureTooSmall(SelectionRect {
            x: 0.0,
            y: 0.0,
            width: 3.0,
            height: 2.0,
        });
        assert!(err.to_string().contains("3x2"));
    }
}
