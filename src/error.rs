// src/error.rs
//! Error handling for the culling engine.
//!
//! - **Performance**: Enum discriminant (cheap match), `#[inline]` everywhere, allocations *only* on error paths.
//! - **Features**: Context chaining, custom messages, `is_*` helpers, `Result` alias.
//! - Works perfectly with `?`, async, threads.

use std::fmt;
use thiserror::Error;

/// Main error type — lightweight, Send + Sync + 'static, perfect for libraries.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// GPU buffer allocation failed (device out of memory). Fatal for the
    /// current activation: the engine never runs on a partial buffer set.
    #[error("buffer allocation failed: {0}")]
    BufferAllocation(String),

    /// Result-buffer readback failed. The affected sampling interval falls
    /// back to frustum-only gating; the next interval retries cleanly.
    #[error("occlusion readback failed: {0}")]
    Readback(String),

    /// A configuration knob was rejected during validation.
    #[error("invalid config: {0}")]
    Config(String),

    /// Simple custom message (allocation only when error happens).
    #[error("{0}")]
    Custom(String),

    /// Rich context chaining (like anyhow but zero-cost when you control the types).
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a custom error message (zero-cost when possible).
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a formatted custom error (like `format!` but returns `Error`).
    #[inline]
    pub fn format(args: fmt::Arguments) -> Self {
        Self::Custom(fmt::format(args))
    }

    /// Add context to any error (chainable, like `.context()` in anyhow).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Quick static message (no allocation if you pass `&'static str`).
    #[inline]
    pub fn msg(msg: &'static str) -> Self {
        Self::Custom(msg.into())
    }

    // === Kind checks (branch prediction friendly) ===

    /// `true` for errors that must abort the current activation.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::BufferAllocation(_) => true,
            Error::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_readback(&self) -> bool {
        match self {
            Error::Readback(_) => true,
            Error::WithContext { source, .. } => source.is_readback(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Convenient `Result` alias — use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;
