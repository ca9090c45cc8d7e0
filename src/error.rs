//! Error types for marshalling and unmarshalling.
//!
//! Every error is a structural or configuration defect, never a transient
//! fault: a wrong destination, an unexpected token, a missing registration.
//! The right response is to abort the run, not to retry it.
//!
//! ## Error Categories
//!
//! - **Bind**: the root value or destination is unusable
//!   ([`Error::InvalidUnmarshalTarget`], [`Error::Unsettable`])
//! - **Step**: a token does not fit the destination shape, or the engine was
//!   stepped past completion ([`Error::Incompatible`], [`Error::Overshoot`])
//! - **Resolution**: no atlas entry and no natural mapping for a type
//!   ([`Error::NotFound`])
//! - **Atlas**: the atlas itself is malformed ([`Error::DuplicateEntry`],
//!   [`Error::EntryMismatch`])
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{Error, ErrorCategory};
//!
//! let err = Error::invalid_unmarshal_target::<String>();
//! assert_eq!(err.category(), ErrorCategory::Bind);
//! assert!(err.to_string().contains("String"));
//! ```

use crate::token::TokenKind;
use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while transcoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The destination is a value copy of a concrete type, not a writable slot.
    #[error("invalid unmarshal target: non-addressable {type_name}")]
    InvalidUnmarshalTarget { type_name: &'static str },

    /// The destination is a value copy of a wildcard, so there is nowhere to
    /// write whatever concrete value the stream produces.
    #[error("unsettable: wildcard destination {type_name} is not addressable")]
    Unsettable { type_name: &'static str },

    /// The token does not fit the shape the current frame expects.
    #[error("incompatible: expected {expected}, found {found}")]
    Incompatible {
        expected: &'static str,
        found: TokenKind,
    },

    /// The engine was stepped after it reported completion.
    #[error("overshoot: step called after completion")]
    Overshoot,

    /// The engine has no live run: nothing was bound, or an earlier step
    /// failed.
    #[error("no bound run: bind a value before stepping")]
    NotBound,

    /// No registered entry and no natural mapping for the type.
    #[error("no atlas entry for type {type_name}")]
    NotFound { type_name: &'static str },

    /// A record received a key it has no field for, under the reject policy.
    #[error("unknown key {key:?} for record {record}")]
    UnknownKey { record: &'static str, key: String },

    /// A scalar token could not be converted to the destination type.
    #[error("cannot convert {value} to {target}")]
    Coercion { value: String, target: &'static str },

    /// An atlas entry was applied to a value of a different type.
    #[error("atlas entry mismatch: expected a value of type {expected}")]
    EntryMismatch { expected: &'static str },

    /// Two entries were registered for the same type.
    #[error("duplicate atlas entry for type {type_name}")]
    DuplicateEntry { type_name: &'static str },

    /// The frame stack grew past the configured limit.
    #[error("nesting depth exceeds limit of {limit}")]
    DepthLimit { limit: usize },

    /// A token source ran dry before the unmarshaller completed.
    #[error("token stream ended before the value was complete")]
    UnexpectedEnd,

    /// Failure reported by a transform hook or a token sink.
    #[error("{0}")]
    Custom(String),
}

/// Coarse classification of an [`Error`], following when it can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Bind,
    Step,
    Resolution,
    Atlas,
}

impl Error {
    /// Creates an [`Error::InvalidUnmarshalTarget`] naming `T`.
    pub fn invalid_unmarshal_target<T: ?Sized>() -> Self {
        Error::InvalidUnmarshalTarget {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Creates an incompatible-shape error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::{Error, TokenKind};
    ///
    /// let err = Error::incompatible("map open", TokenKind::String);
    /// assert!(err.to_string().contains("expected map open, found string"));
    /// ```
    pub fn incompatible(expected: &'static str, found: TokenKind) -> Self {
        Error::Incompatible { expected, found }
    }

    pub fn coercion<V: fmt::Display>(value: V, target: &'static str) -> Self {
        Error::Coercion {
            value: value.to_string(),
            target,
        }
    }

    pub fn entry_mismatch<T: ?Sized>() -> Self {
        Error::EntryMismatch {
            expected: std::any::type_name::<T>(),
        }
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns which phase of a run this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidUnmarshalTarget { .. } | Error::Unsettable { .. } => {
                ErrorCategory::Bind
            }
            Error::NotFound { .. } => ErrorCategory::Resolution,
            Error::DuplicateEntry { .. } | Error::EntryMismatch { .. } => ErrorCategory::Atlas,
            Error::Incompatible { .. }
            | Error::Overshoot
            | Error::NotBound
            | Error::UnknownKey { .. }
            | Error::Coercion { .. }
            | Error::DepthLimit { .. }
            | Error::UnexpectedEnd
            | Error::Custom(_) => ErrorCategory::Step,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
