//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] — domain-level errors
//! - [`string`] — small string helpers (slugification)

pub mod error;
pub mod string;
