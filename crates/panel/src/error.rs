use sitewatch_common::IntervalError;
use thiserror::Error;

/// Why a panel operation did not go through. The `Display` text is what the
/// user is shown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Invalid interval ({0}). Please enter a positive whole number of seconds.")]
    Validation(#[from] IntervalError),
    #[error("Could not reach the server: {0}")]
    Transport(String),
    #[error("{0}")]
    Application(String),
    #[error("A change to {0} is still being saved. Try again once it completes.")]
    Busy(String),
    #[error("Unknown site: {0}")]
    UnknownTarget(String),
}

impl From<reqwest::Error> for EditError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EditError::Transport("request timed out".to_string())
        } else {
            EditError::Transport(err.to_string())
        }
    }
}
