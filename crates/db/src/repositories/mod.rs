//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod email_log_repo;
pub mod email_queue_repo;
pub mod message_repo;
pub mod notification_preference_repo;
pub mod notification_repo;
pub mod permission_repo;
pub mod queue_control_repo;
pub mod report_repo;
pub mod submission_repo;
pub mod template_repo;
pub mod user_repo;

pub use email_log_repo::EmailLogRepo;
pub use email_queue_repo::EmailQueueRepo;
pub use message_repo::MessageRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::NotificationRepo;
pub use permission_repo::PermissionRepo;
pub use queue_control_repo::QueueControlRepo;
pub use report_repo::ReportRepo;
pub use submission_repo::SubmissionRepo;
pub use template_repo::TemplateRepo;
pub use user_repo::UserRepo;
