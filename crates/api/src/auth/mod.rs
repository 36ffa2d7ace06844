//! Authentication primitives.
//!
//! Tokens are issued by the platform's identity service; this crate only
//! validates them.

pub mod jwt;
