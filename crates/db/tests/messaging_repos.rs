//! Repository tests against a real database.

use ebic_core::report::{ReportFormat, ReportStatus, ReportType, INTERRUPTED_MESSAGE};
use ebic_core::review::{ReviewDecision, SubmissionKind};
use ebic_db::models::email::{CreateEmailLog, EnqueueEmail};
use ebic_db::models::notification::{CreateNotification, NotificationFilter};
use ebic_db::models::report::CreateReport;
use ebic_db::models::status::EmailStatus;
use ebic_db::repositories::{
    EmailLogRepo, EmailQueueRepo, NotificationPreferenceRepo, NotificationRepo, PermissionRepo,
    QueueControlRepo, ReportRepo, SubmissionRepo, TemplateRepo,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_user(pool: &PgPool, email: &str, role: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (email, name, role_id) \
         VALUES ($1, $1, (SELECT id FROM roles WHERE name = $2)) RETURNING id",
    )
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn notification(user_id: i64, category: &str) -> CreateNotification {
    CreateNotification {
        user_id,
        category: category.to_string(),
        title: "title".into(),
        message: "message".into(),
        data: None,
        action_url: None,
        priority: "NORMAL".into(),
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_notification_read_flow(pool: PgPool) {
    let user = insert_user(&pool, "a@example.com", "admin").await;
    let other = insert_user(&pool, "b@example.com", "admin").await;

    let first = NotificationRepo::create(&pool, &notification(user, "SYSTEM_ERROR")).await.unwrap();
    NotificationRepo::create(&pool, &notification(user, "NEW_COLLABORATOR")).await.unwrap();

    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 2);
    assert!(!NotificationRepo::mark_read(&pool, first.id, other).await.unwrap());
    assert!(NotificationRepo::mark_read(&pool, first.id, user).await.unwrap());
    assert!(NotificationRepo::mark_read(&pool, first.id, user).await.unwrap());
    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 1);

    let filter = NotificationFilter {
        category: Some("SYSTEM_ERROR".into()),
        ..Default::default()
    };
    let listed = NotificationRepo::list_for_user(&pool, user, &filter, 20, 0).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_read);
    assert_eq!(NotificationRepo::count_for_user(&pool, user, &filter).await.unwrap(), 1);

    assert_eq!(NotificationRepo::mark_all_read(&pool, user).await.unwrap(), 1);
    assert_eq!(NotificationRepo::mark_all_read(&pool, user).await.unwrap(), 0);
    assert!(NotificationRepo::delete(&pool, first.id, user).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_preference_merge_keeps_other_keys(pool: PgPool) {
    let user = insert_user(&pool, "p@example.com", "admin").await;
    NotificationPreferenceRepo::merge(&pool, user, &json!({ "emailSystemErrors": false }))
        .await
        .unwrap();
    let merged = NotificationPreferenceRepo::merge(&pool, user, &json!({ "digestMode": "daily" }))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged, json!({ "emailSystemErrors": false, "digestMode": "daily" }));
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_manage_grant_implies_actions(pool: PgPool) {
    let admin = insert_user(&pool, "admin@example.com", "admin").await;
    let viewer = insert_user(&pool, "viewer@example.com", "viewer").await;

    assert!(PermissionRepo::has_permission(&pool, admin, "dashboard", "read").await.unwrap());
    assert!(!PermissionRepo::has_permission(&pool, viewer, "dashboard", "read").await.unwrap());

    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(admin)
        .execute(&pool)
        .await
        .unwrap();
    assert!(PermissionRepo::list_for_user(&pool, admin).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Templates and email
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_system_templates_cannot_be_deleted(pool: PgPool) {
    let template = TemplateRepo::find_by_slug(&pool, "status_update_approved")
        .await
        .unwrap()
        .unwrap();
    assert!(template.is_system);
    assert!(!TemplateRepo::delete(&pool, template.id).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_email_log_stats_and_cleanup(pool: PgPool) {
    for status in [EmailStatus::Sent, EmailStatus::Failed] {
        EmailLogRepo::create(
            &pool,
            &CreateEmailLog {
                to_address: "x@example.com".into(),
                subject: "s".into(),
                template: "admin_notification".into(),
                status: status.as_str().into(),
                error_message: None,
                message_id: None,
                metadata: json!({}),
            },
        )
        .await
        .unwrap();
    }
    let since = chrono::Utc::now() - chrono::Duration::days(1);
    assert_eq!(EmailLogRepo::count_since(&pool, since, None).await.unwrap(), 2);
    assert_eq!(
        EmailLogRepo::count_since(&pool, since, Some(EmailStatus::Sent)).await.unwrap(),
        1
    );
    assert_eq!(EmailLogRepo::failed_since(&pool, since, 10).await.unwrap().len(), 1);

    // Nothing is old enough to clear yet.
    let cutoff = chrono::Utc::now() - chrono::Duration::days(7);
    assert_eq!(EmailLogRepo::delete_failed_before(&pool, cutoff).await.unwrap(), 0);

    EmailQueueRepo::enqueue(
        &pool,
        &EnqueueEmail {
            template: "admin_notification".into(),
            payload: json!({}),
            priority: 5,
            max_attempts: 2,
        },
    )
    .await
    .unwrap();
    assert_eq!(EmailQueueRepo::counts(&pool).await.unwrap().waiting, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_set_paused_returns_previous(pool: PgPool) {
    assert!(!QueueControlRepo::set_paused(&pool, "email", true).await.unwrap());
    assert!(QueueControlRepo::set_paused(&pool, "email", true).await.unwrap());
    assert!(QueueControlRepo::is_paused(&pool, "email").await.unwrap());
    assert!(QueueControlRepo::set_paused(&pool, "email", false).await.unwrap());
}

// ---------------------------------------------------------------------------
// Reports and submissions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_report_lifecycle(pool: PgPool) {
    let user = insert_user(&pool, "r@example.com", "admin").await;
    let input = CreateReport {
        name: "Q1".into(),
        report_type: ReportType::SubmissionsSummary,
        format: ReportFormat::Csv,
        parameters: None,
    };
    let report = ReportRepo::create(&pool, user, &input).await.unwrap();
    assert_eq!(report.status, ReportStatus::Pending.as_str());

    // Completing a report that is not generating is refused.
    assert!(!ReportRepo::complete(&pool, report.id, "/x").await.unwrap());

    let claimed = ReportRepo::claim_next_pending(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.id, report.id);
    assert!(ReportRepo::claim_next_pending(&pool).await.unwrap().is_none());

    let failed = ReportRepo::fail_stale(&pool, chrono::Utc::now(), INTERRUPTED_MESSAGE)
        .await
        .unwrap();
    assert_eq!(failed, 1);
    let stored = ReportRepo::find_by_id(&pool, report.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "FAILED");
    assert!(stored.file_url.is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_approval_makes_submission_visible(pool: PgPool) {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO collaborators (company_name, email) VALUES ('Acme', 'acme@example.com') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let contact = SubmissionRepo::set_status(
        &pool,
        SubmissionKind::Collaborator,
        id,
        ReviewDecision::Approved,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(contact.name, "Acme");
    assert_eq!(contact.status, "APPROVED");
    assert!(contact.is_visible);
}
