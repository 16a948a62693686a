//! Foundation types for Strata.
//!
//! This crate provides the content-addressed identifier used throughout the
//! system. Every other Strata crate depends on `strata-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — Content-addressed identifier (BLAKE3 hash)
//! - [`TypeError`] — Errors from identifier parsing

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
