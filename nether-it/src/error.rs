//! Error types for IT module decoding

use std::io;

use thiserror::Error;

/// Errors that abort an IT decode.
///
/// Non-fatal inconsistencies (pattern size mismatches, truncated sample data,
/// discarded Zxx effects) are logged through `tracing` and never surface here.
#[derive(Debug, Error)]
pub enum ItError {
    /// Magic mismatch: not an IT file, try another decoder
    #[error("not an IT module (expected 'IMPM')")]
    Unsupported,
    #[error("too many orders: {0} (max 256)")]
    TooManyOrders(u16),
    #[error("too many instruments: {0} (max 240)")]
    TooManyInstruments(u16),
    #[error("too many samples: {0} (max 240)")]
    TooManySamples(u16),
    #[error("too many patterns: {0} (max 240)")]
    TooManyPatterns(u16),
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ItError {
    /// True when the data simply is not an IT module
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// True for structural header errors (as opposed to I/O)
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::TooManyOrders(_)
                | Self::TooManyInstruments(_)
                | Self::TooManySamples(_)
                | Self::TooManyPatterns(_)
        )
    }
}
