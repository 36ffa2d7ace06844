//! EBIC notification and messaging dispatch core.
//!
//! - [`FanoutEngine`] delivers one admin event to every eligible,
//!   opted-in admin.
//! - [`TemplateDispatcher`] sends one templated message to one recipient
//!   over every channel the template and recipient allow.
//! - [`QueueMonitor`] aggregates delivery health and runs operator actions.
//! - [`ReportWorker`] drives report exports through their lifecycle.
//!
//! Persistence goes through the port traits in [`store`]; [`postgres`]
//! backs them with the `ebic-db` repositories. The `testing` feature adds
//! an in-process store and recording channel senders for test suites.

pub mod audience;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod fanout;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod monitor;
pub mod postgres;
pub mod reports;
pub mod review;
pub mod store;

pub use audience::{Audience, AudienceResolver};
pub use delivery::email::{EmailConfig, EmailSender};
pub use delivery::whatsapp::{WhatsAppConfig, WhatsAppSender};
pub use delivery::{ChannelError, ChannelSender, OutboundMessage, SendReceipt};
pub use dispatcher::{DispatchRequest, DispatchResult, Recipient, TemplateDispatcher};
pub use error::{MessagingError, StoreError};
pub use fanout::{FanoutConfig, FanoutEngine, FanoutOutcome};
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryStore;
pub use monitor::{MonitorConfig, QueueMonitor};
pub use postgres::PgStore;
pub use reports::{FileReportGenerator, ReportGenerator, ReportWorker, ReportWorkerConfig};
pub use review::{ReviewOutcome, ReviewService};
pub use store::MessagingStore;
