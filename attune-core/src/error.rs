// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types shared by every attune crate.
//!
//! Only recoverable conditions live here. Broken internal invariants, such as the
//! activation counter dropping below zero, are bugs and panic instead.
//!
//! # Examples
//!
//! ```
//! use attune_core::{AttuneError, Result};
//!
//! fn publish_after_close() -> Result<()> {
//!     Err(AttuneError::closed("broadcast closed"))
//! }
//!
//! assert!(publish_after_close().unwrap_err().is_closed());
//! ```

/// Root error type for attune operations.
#[derive(Debug, thiserror::Error)]
pub enum AttuneError {
    /// The broadcast or subscription has been closed or cancelled.
    ///
    /// Returned by `publish` on a closed broadcast and by `recv` on an ended
    /// subscription. Never silently dropped.
    #[error("Channel closed: {context}")]
    ChannelClosed {
        /// What was closed when the operation was attempted
        context: String,
    },

    /// A strict value read happened before anything was published.
    #[error("No value has been published yet")]
    NoValue,

    /// A consumer's `deliver` or `transform` callback failed.
    ///
    /// Only the loop that ran the callback is torn down; the broadcast and its
    /// other subscribers keep running.
    #[error("Delivery callback failed: {0}")]
    Delivery(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The activity signal was already terminated when work was requested.
    #[error("Activity signal terminated")]
    Terminated,
}

impl AttuneError {
    /// Create a closed-channel error with the given context
    pub fn closed(context: impl Into<String>) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    /// Wrap a failure raised inside a user callback
    pub fn delivery(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Box::new(error))
    }

    /// Returns `true` for [`AttuneError::ChannelClosed`].
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. })
    }

    /// Returns `true` for [`AttuneError::Delivery`].
    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

/// Specialized Result type for attune operations
pub type Result<T> = std::result::Result<T, AttuneError>;
