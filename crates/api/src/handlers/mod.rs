pub mod email;
pub mod notification;
pub mod report;
pub mod template;
