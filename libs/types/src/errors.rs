//! Error types shared across the ledger crates
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Errors raised while parsing or validating shared types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypesError {
    #[error("Invalid address hex: {input}")]
    InvalidAddressHex { input: String },

    #[error("Invalid address length: expected {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    #[error("Fee set total {total} exceeds {max} per mille")]
    FeeSetTooLarge { total: u32, max: u32 },
}
