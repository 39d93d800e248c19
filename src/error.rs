use thiserror::Error;

use crate::playback::PlaybackError;
use crate::session::SessionError;

/// Conditions the editor reports to the operator instead of acting
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no path available")]
    NoPath,
    #[error("no boundary defined; draw one first")]
    NoBoundary,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<PlaybackError> for EditorError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::NoPath => EditorError::NoPath,
        }
    }
}
