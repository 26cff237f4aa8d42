//! ObjectIO Common - Shared types and utilities
//!
//! This crate provides the error definitions and configuration types
//! used by the unique identifier registry and the tools built on it.

pub mod config;
pub mod error;

pub use config::{Config, LoggingConfig, UniqueConfig};
pub use error::{Error, Result};

/// Width in bits of identifiers handed out by the registry
pub const UNIQUE_BITS: u32 = 56;

/// Mask of the valid identifier bits
pub const UNIQUE_MASK: u64 = (1u64 << UNIQUE_BITS) - 1;

/// Mask covering the low `bits` bits of a `u64`
///
/// `bits` must be in `1..=64`; 64 yields `u64::MAX`.
#[must_use]
pub const fn mask_for_bits(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
