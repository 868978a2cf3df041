//! Shared newtypes and utilities used across all modules.

pub mod address;
pub mod json;
pub mod units;

pub use address::{normalize_public_key, normalize_str, CanonicalAddress, PublicKeyRepr};
pub use units::lamports_to_sol;
