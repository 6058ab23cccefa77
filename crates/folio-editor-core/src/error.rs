//! Error types for the editing engine.
//!
//! None of these cross the session's event API: handlers downgrade them to
//! [`Notice`](crate::Notice)s or logged fallbacks so an editing surface never
//! dies mid-session.

use thiserror::Error;

use crate::surface::SurfaceState;

/// Errors raised while reading markup into a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// Input exceeded the configured byte limit.
    #[error("markup is {len} bytes, limit is {limit}")]
    TooLarge { len: usize, limit: usize },

    /// Element nesting went past the supported depth.
    #[error("markup nests deeper than {0} elements")]
    TooDeep(usize),
}

/// Errors that can occur inside the editing engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditorError {
    /// Markup could not be read.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Command name not recognized.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command value missing or malformed.
    #[error("invalid value for {command}: {value:?}")]
    InvalidValue { command: String, value: Option<String> },

    /// Link target is not a well-formed URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Surface state machine refused a transition.
    #[error("cannot move surface from {from:?} to {to:?}")]
    InvalidTransition { from: SurfaceState, to: SurfaceState },
}
