use std::time::Duration;

use thiserror::Error;

use crate::extract::ExtractError;

pub type Result<T> = std::result::Result<T, TalkErr>;

/// Failures a generation attempt can surface. All of them are terminal for
/// the attempt that produced them; the controller performs no retries.
/// Cancellation is not represented here because it is not an error.
#[derive(Debug, Error)]
pub enum TalkErr {
    /// The backend call failed or returned no usable text.
    #[error("backend error: {0}")]
    Backend(String),

    /// The configured request timeout elapsed before the backend answered.
    #[error("backend request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}
