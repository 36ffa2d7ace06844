//! Submission review: record the decision, tell the submitter, tell the
//! admins.

use std::sync::Arc;

use ebic_core::channels::Locale;
use ebic_core::error::CoreError;
use ebic_core::notification::NotificationRequest;
use ebic_core::review::{status_update_variables, ReviewDecision, SubmissionKind};
use ebic_core::types::DbId;
use ebic_db::models::submission::SubmissionContact;
use serde::Serialize;

use crate::dispatcher::{DispatchRequest, DispatchResult, Recipient, TemplateDispatcher};
use crate::error::MessagingError;
use crate::fanout::{FanoutEngine, FanoutOutcome};
use crate::store::SubmissionStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub record: SubmissionContact,
    /// `None` when the status-update message could not be dispatched at all.
    pub dispatch: Option<DispatchResult>,
    pub notified: Option<FanoutOutcome>,
}

pub struct ReviewService {
    submissions: Arc<dyn SubmissionStore>,
    dispatcher: Arc<TemplateDispatcher>,
    fanout: Arc<FanoutEngine>,
}

impl ReviewService {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        dispatcher: Arc<TemplateDispatcher>,
        fanout: Arc<FanoutEngine>,
    ) -> Self {
        Self {
            submissions,
            dispatcher,
            fanout,
        }
    }

    /// Apply a review decision.
    ///
    /// The status change is the only part that can fail the call; the
    /// submitter message and the admin fan-out are best effort.
    pub async fn apply(
        &self,
        kind: SubmissionKind,
        id: DbId,
        decision: ReviewDecision,
        reason: Option<&str>,
        locale: Locale,
        reviewer: DbId,
    ) -> Result<ReviewOutcome, MessagingError> {
        let record = self
            .submissions
            .set_status(kind, id, decision)
            .await?
            .ok_or(CoreError::NotFound {
                entity: kind.entity(),
                id,
            })?;
        tracing::info!(
            kind = kind.as_str(),
            id,
            status = decision.record_status(),
            reviewer,
            "Submission reviewed"
        );

        let request = DispatchRequest {
            slug: decision.template_slug().to_string(),
            recipient: Recipient {
                email: Some(record.email.clone()),
                phone: record.phone.clone(),
                name: Some(record.name.clone()),
            },
            variables: status_update_variables(kind, decision, &record.name, reason),
            locale,
            sender_id: Some(reviewer),
        };
        let dispatch = match self.dispatcher.send_templated(&request).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), id, error = %e, "Status update message not sent");
                None
            }
        };

        let event = NotificationRequest::submission_reviewed(
            kind.as_str(),
            id,
            &record.name,
            decision.is_approved(),
        );
        let notified = match self.fanout.notify(&event).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(kind = kind.as_str(), id, error = %e, "Review notification fan-out failed");
                None
            }
        };

        Ok(ReviewOutcome {
            record,
            dispatch,
            notified,
        })
    }
}
