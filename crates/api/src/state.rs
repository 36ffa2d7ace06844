use std::sync::Arc;

use ebic_messaging::store::{
    NotificationStore, PermissionEngine, PreferenceStore, ReportStore, StoreHealth, TemplateStore,
};
use ebic_messaging::{
    AudienceResolver, ChannelSender, FanoutEngine, FileReportGenerator, MessagingStore,
    QueueMonitor, ReportWorker, ReportWorkerConfig, ReviewService, TemplateDispatcher,
};
use tokio::sync::Notify;

use crate::config::{MessagingConfig, ServerConfig};

/// Outbound channel senders.
#[derive(Clone)]
pub struct Channels {
    pub email: Arc<dyn ChannelSender>,
    pub whatsapp: Arc<dyn ChannelSender>,
}

/// Shared application state available to all axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub notifications: Arc<dyn NotificationStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub permissions: Arc<dyn PermissionEngine>,
    pub templates: Arc<dyn TemplateStore>,
    pub reports: Arc<dyn ReportStore>,
    pub store_health: Arc<dyn StoreHealth>,
    pub monitor: Arc<QueueMonitor>,
    pub review: Arc<ReviewService>,
    pub report_files: Arc<FileReportGenerator>,
    /// Signalled after a report is queued so the worker polls immediately.
    pub report_wakeup: Arc<Notify>,
}

impl AppState {
    /// Wire every service over one backing store.
    pub fn new<S: MessagingStore>(
        config: ServerConfig,
        store: Arc<S>,
        channels: Channels,
        messaging: MessagingConfig,
        report_files: FileReportGenerator,
    ) -> Self {
        let dispatcher = TemplateDispatcher::new(
            store.clone(),
            store.clone(),
            store.clone(),
            vec![channels.email.clone(), channels.whatsapp.clone()],
        );
        let fanout = FanoutEngine::new(
            AudienceResolver::new(store.clone(), store.clone()),
            store.clone(),
            store.clone(),
            channels.email.clone(),
            messaging.fanout,
        );
        let monitor = QueueMonitor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            channels.email,
            messaging.monitor,
        );
        let review = ReviewService::new(store.clone(), Arc::new(dispatcher), Arc::new(fanout));

        Self {
            config: Arc::new(config),
            notifications: store.clone(),
            preferences: store.clone(),
            permissions: store.clone(),
            templates: store.clone(),
            reports: store.clone(),
            store_health: store,
            monitor: Arc::new(monitor),
            review: Arc::new(review),
            report_files: Arc::new(report_files),
            report_wakeup: Arc::new(Notify::new()),
        }
    }

    /// A report worker sharing this state's store, output directory and
    /// wake-up signal.
    pub fn report_worker(&self, config: ReportWorkerConfig) -> ReportWorker {
        ReportWorker::new(self.reports.clone(), self.report_files.clone(), config)
            .with_wakeup(self.report_wakeup.clone())
    }
}
