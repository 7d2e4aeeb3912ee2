//! Error types for blackbox decoding.
//!
//! Corruption found mid-stream is never represented here -- it is
//! recoverable and is folded into [`crate::decoder::FrameEvent::Corrupt`] and
//! [`crate::stats::Stats`] instead. `DecodeError` only covers the two fatal
//! tiers: header-level failures and schema-violating data.

use std::fmt;

/// Fatal decode failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Tier 2: the header was missing or incomplete (e.g. no I or P frame
    /// definition, or a field array whose length disagrees with the field
    /// count).
    Header(String),
    /// Tier 3: a predictor or encoding id the decoder doesn't recognize, or
    /// one whose required context (e.g. `motor[0]`, a GPS home frame def)
    /// the schema never defined.
    Schema(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Header(msg) => write!(f, "header error: {msg}"),
            DecodeError::Schema(msg) => write!(f, "schema error: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

pub type Result<T> = std::result::Result<T, DecodeError>;
