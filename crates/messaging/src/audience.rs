//! Audience resolution for admin notifications.
//!
//! A user is eligible when active and granted `dashboard:read` (or
//! `dashboard:manage`), **or** granted the request's extra permission.

use std::sync::Arc;

use ebic_core::permissions::{actions, check_permission, resources, Permission};
use ebic_db::models::user::UserContact;
use futures::stream::{self, StreamExt};

use crate::error::MessagingError;
use crate::store::{PermissionEngine, UserDirectory};

/// Permission lookups run at most this many at a time.
const LOOKUP_CONCURRENCY: usize = 16;

pub struct AudienceResolver {
    users: Arc<dyn UserDirectory>,
    permissions: Arc<dyn PermissionEngine>,
}

impl AudienceResolver {
    pub fn new(users: Arc<dyn UserDirectory>, permissions: Arc<dyn PermissionEngine>) -> Self {
        Self { users, permissions }
    }

    /// Eligible recipients, ordered by user id.
    ///
    /// Failing to list users aborts the call. A failed permission lookup for
    /// one user is counted in [`Audience::lookup_failures`] and the rest are
    /// still resolved.
    pub async fn resolve(&self, required: Option<&Permission>) -> Result<Audience, MessagingError> {
        let candidates = self.users.active_contacts().await?;

        let lookups: Vec<Lookup> = stream::iter(candidates)
            .map(|contact| async move {
                match self.permissions.user_permissions(contact.id).await {
                    Ok(grants) if is_eligible(&grants, required) => Lookup::Eligible(contact),
                    Ok(_) => Lookup::Ineligible,
                    Err(e) => {
                        tracing::warn!(user_id = contact.id, error = %e, "Permission lookup failed");
                        Lookup::Failed
                    }
                }
            })
            .buffer_unordered(LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut audience = Audience::default();
        for lookup in lookups {
            match lookup {
                Lookup::Eligible(contact) => audience.recipients.push(contact),
                Lookup::Ineligible => {}
                Lookup::Failed => audience.lookup_failures += 1,
            }
        }
        audience.recipients.sort_by_key(|c| c.id);
        Ok(audience)
    }
}

/// Resolved recipients plus the users whose eligibility could not be checked.
#[derive(Debug, Default)]
pub struct Audience {
    pub recipients: Vec<UserContact>,
    pub lookup_failures: usize,
}

enum Lookup {
    Eligible(UserContact),
    Ineligible,
    Failed,
}

/// Baseline dashboard access unioned with the optional extra grant.
pub fn is_eligible(grants: &[Permission], required: Option<&Permission>) -> bool {
    check_permission(grants, resources::DASHBOARD, actions::READ)
        || required.is_some_and(|p| check_permission(grants, &p.resource, &p.action))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn dashboard_manage_implies_read() {
        let grants = vec![Permission::new("dashboard", "manage")];
        assert!(is_eligible(&grants, None));
    }

    #[test]
    fn required_permission_is_an_alternative() {
        let grants = vec![Permission::new("collaborators", "manage")];
        assert!(!is_eligible(&grants, None));
        let required = Permission::new("collaborators", "manage");
        assert!(is_eligible(&grants, Some(&required)));
    }

    #[tokio::test]
    async fn resolve_unions_dashboard_and_required_grant() {
        let store = Arc::new(MemoryStore::new());
        let reader = store.add_user("reader@x.com", "Reader", &[("dashboard", "read")]);
        let reviewer = store.add_user("rev@x.com", "Reviewer", &[("collaborators", "manage")]);
        store.add_user("news@x.com", "News", &[("news", "read")]);
        let inactive = store.add_user("gone@x.com", "Gone", &[("dashboard", "manage")]);
        store.deactivate_user(inactive);

        let resolver = AudienceResolver::new(store.clone(), store.clone());

        let baseline: Vec<_> = resolver
            .resolve(None)
            .await
            .unwrap()
            .recipients
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(baseline, vec![reader]);

        let required = Permission::new("collaborators", "manage");
        let widened: Vec<_> = resolver
            .resolve(Some(&required))
            .await
            .unwrap()
            .recipients
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(widened, vec![reader, reviewer]);
    }

    #[tokio::test]
    async fn failed_lookup_is_counted_not_hidden() {
        let store = Arc::new(MemoryStore::new());
        let first = store.add_user("a@x.com", "A", &[("dashboard", "read")]);
        let broken = store.add_user("b@x.com", "B", &[("dashboard", "read")]);
        let third = store.add_user("c@x.com", "C", &[("dashboard", "read")]);
        store.fail_permission_lookups_for(broken);

        let audience = AudienceResolver::new(store.clone(), store.clone())
            .resolve(None)
            .await
            .unwrap();

        let ids: Vec<_> = audience.recipients.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first, third]);
        assert_eq!(audience.lookup_failures, 1);
    }
}
