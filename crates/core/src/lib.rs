//! Domain logic for the EBIC notification and messaging core.
//!
//! Everything in this crate is pure: no database access, no network I/O.
//! Persistence and delivery live in `ebic-db` and `ebic-messaging`.

pub mod channels;
pub mod error;
pub mod monitor;
pub mod notification;
pub mod permissions;
pub mod report;
pub mod review;
pub mod template;
pub mod types;
