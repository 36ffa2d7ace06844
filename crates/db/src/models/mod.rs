//! Row models and input DTOs.
//!
//! Row structs derive `FromRow` + `Serialize` and are returned by the
//! repositories; DTOs derive `Deserialize` and feed inserts/updates. JSON
//! field names are camelCase to match the admin dashboard.

pub mod email;
pub mod message;
pub mod notification;
pub mod report;
pub mod status;
pub mod submission;
pub mod template;
pub mod user;
