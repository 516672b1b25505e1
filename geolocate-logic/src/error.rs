use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::ErrorCode;

/// Ways getting a position can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The platform has no location capability at all
    #[error("no location source is available")]
    NoProviderAvailable,
    #[error("permission to access the location was denied")]
    PermissionDenied,
    #[error("the position is unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position")]
    Timeout,
    /// The source reported a code outside of the known ones
    #[error("location source reported unknown error code {0}")]
    UnknownProviderCode(ErrorCode),
}

impl LocationError {
    pub const PERMISSION_DENIED: ErrorCode = 1;
    pub const POSITION_UNAVAILABLE: ErrorCode = 2;
    pub const TIMEOUT: ErrorCode = 3;

    pub fn from_code(code: ErrorCode) -> Self {
        match code {
            Self::PERMISSION_DENIED => Self::PermissionDenied,
            Self::POSITION_UNAVAILABLE => Self::PositionUnavailable,
            Self::TIMEOUT => Self::Timeout,
            other => Self::UnknownProviderCode(other),
        }
    }

    /// The code this error is reported under, a missing source counts as an unavailable position.
    /// [None] for unknown codes.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::PermissionDenied => Some(Self::PERMISSION_DENIED),
            Self::NoProviderAvailable | Self::PositionUnavailable => {
                Some(Self::POSITION_UNAVAILABLE)
            }
            Self::Timeout => Some(Self::TIMEOUT),
            Self::UnknownProviderCode(_) => None,
        }
    }
}

/// User facing messages for error codes 1, 2 and 3, in that order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMessages([String; 3]);

impl ErrorMessages {
    pub fn new(
        permission_denied: impl Into<String>,
        position_unavailable: impl Into<String>,
        timeout: impl Into<String>,
    ) -> Self {
        Self([
            permission_denied.into(),
            position_unavailable.into(),
            timeout.into(),
        ])
    }

    /// Text to show the user for `error`, unknown codes fall back to the error's own description
    pub fn message_for(&self, error: LocationError) -> String {
        match error.code() {
            Some(code) => self.0[usize::from(code) - 1].clone(),
            None => error.to_string(),
        }
    }
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self::new(
            "Geolokalisierung nicht möglich!",
            "Geolokalisierung fehlgeschlagen.",
            "Geolokalisierung fehlgeschlagen (Zeitüberschreitung)",
        )
    }
}
