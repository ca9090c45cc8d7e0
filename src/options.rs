//! Configuration options for the marshaller and unmarshaller.
//!
//! This module provides types to tune engine behaviour:
//!
//! - [`Options`]: Main configuration struct
//! - [`UnknownKeys`]: What a record does with keys it has no field for
//!
//! ## Examples
//!
//! ```rust
//! use atlas_tok::{Atlas, Options, UnknownKeys, Unmarshaller};
//!
//! let atlas = Atlas::new();
//! let options = Options::new()
//!     .with_unknown_keys(UnknownKeys::Skip)
//!     .with_max_depth(64);
//! let unmarshaller = Unmarshaller::new(&atlas).with_options(options);
//! assert!(!unmarshaller.is_done());
//! ```

/// Policy for map keys that match no field of the destination record.
///
/// - **Reject**: Default, fail with [`Error::UnknownKey`](crate::Error::UnknownKey)
/// - **Skip**: Consume and discard the whole value under the key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    #[default]
    Reject,
    Skip,
}

/// Default bound on frame stack depth.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration options shared by both engines.
///
/// # Examples
///
/// ```rust
/// use atlas_tok::{Options, UnknownKeys};
///
/// let options = Options::new();
/// assert_eq!(options.unknown_keys, UnknownKeys::Reject);
/// assert_eq!(options.max_depth, Some(512));
///
/// let unbounded = Options::new().without_max_depth();
/// assert_eq!(unbounded.max_depth, None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Fallback for records whose entry does not set its own policy.
    pub unknown_keys: UnknownKeys,
    /// Maximum number of frames on the stack; `None` means unbounded.
    pub max_depth: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            unknown_keys: UnknownKeys::default(),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl Options {
    /// Creates default options (reject unknown keys, depth bound of 512).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default unknown-key policy.
    #[must_use]
    pub fn with_unknown_keys(mut self, policy: UnknownKeys) -> Self {
        self.unknown_keys = policy;
        self
    }

    /// Sets the frame stack depth bound.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atlas_tok::Options;
    ///
    /// let options = Options::new().with_max_depth(8);
    /// assert_eq!(options.max_depth, Some(8));
    /// ```
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Removes the frame stack depth bound.
    #[must_use]
    pub fn without_max_depth(mut self) -> Self {
        self.max_depth = None;
        self
    }
}
