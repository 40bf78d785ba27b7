//! Custom permission updates for the QuickSight service

use log::{debug, info};

use crate::aws::{PermissionChange, UpdateUserRequest};
use crate::error::QsgpmResult;
use crate::types::{User, NIL};

impl super::service::QuickSightService {
    /// Bring `user`'s custom permission in line with `desired`.
    ///
    /// Nothing is sent when the assignment already matches, including when both
    /// are absent. An absent `desired` explicitly unapplies the current profile.
    /// Returns whether an update was issued.
    pub async fn update_user_custom_permission(
        &self,
        user: &User,
        desired: Option<&str>,
    ) -> QsgpmResult<bool> {
        debug!(
            "call update_user_custom_permission({}, {})",
            user,
            desired.unwrap_or(NIL)
        );
        if !user.needs_custom_permission_update(desired) {
            debug!("user {} nothing todo", user.user_name);
            return Ok(false);
        }
        let request = UpdateUserRequest {
            aws_account_id: self.aws_account_id.clone(),
            namespace: user.namespace.clone(),
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            permission: PermissionChange::from_desired(desired),
        };
        let output = self.client.update_user(&request).await?;
        info!(
            "update user {} custom permission: {} => {}",
            user.user_name,
            user.custom_permissions_name.as_deref().unwrap_or(NIL),
            output.custom_permissions_name.as_deref().unwrap_or(NIL)
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::aws::PermissionChange;
    use crate::commands::QuickSightService;
    use crate::testing::{iam_user, Call, InMemoryQuickSight, ACCOUNT_ID};
    use crate::types::UserRole;

    #[tokio::test]
    async fn test_no_update_when_permission_matches() {
        let fake = Arc::new(InMemoryQuickSight::new());
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        let plain = iam_user("default", "Reader/a@example.com", UserRole::Reader, None);
        assert!(!service.update_user_custom_permission(&plain, None).await.unwrap());

        let manager = iam_user("default", "Manager/b@example.com", UserRole::Author, Some("manager"));
        assert!(!service
            .update_user_custom_permission(&manager, Some("manager"))
            .await
            .unwrap());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_absent_desired_permission_unapplies() {
        let manager = iam_user("default", "Manager/b@example.com", UserRole::Author, Some("manager"));
        let fake = Arc::new(InMemoryQuickSight::new().with_user(manager.clone()));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        assert!(service.update_user_custom_permission(&manager, None).await.unwrap());
        assert_eq!(
            fake.calls(),
            vec![Call::UpdateUser {
                namespace: "default".to_string(),
                user_name: "Manager/b@example.com".to_string(),
                permission: PermissionChange::Unapply,
            }]
        );
        assert_eq!(fake.user_permission("default", "Manager/b@example.com"), None);
    }

    #[tokio::test]
    async fn test_present_desired_permission_is_applied() {
        let analyst = iam_user("default", "Analyst/c@example.com", UserRole::Author, None);
        let fake = Arc::new(InMemoryQuickSight::new().with_user(analyst.clone()));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        assert!(service
            .update_user_custom_permission(&analyst, Some("analysis"))
            .await
            .unwrap());
        assert_eq!(
            fake.user_permission("default", "Analyst/c@example.com").as_deref(),
            Some("analysis")
        );
    }

    #[tokio::test]
    async fn test_update_failure_propagates() {
        let analyst = iam_user("default", "Analyst/c@example.com", UserRole::Author, None);
        let fake = Arc::new(InMemoryQuickSight::new().failing_on("UpdateUser"));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake);
        let err = service
            .update_user_custom_permission(&analyst, Some("analysis"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "UpdateUser failed: injected failure");
    }
}
