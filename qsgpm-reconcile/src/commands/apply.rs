//! Apply logic for group reconciliation

use log::{debug, info};
use serde::Serialize;

use crate::aws::{GroupRequest, MembershipRequest};
use crate::error::QsgpmResult;
use crate::groups::Groups;

/// Suppressions for the destructive half of [`apply_groups`](super::QuickSightService::apply_groups).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyGroupsOptions {
    pub no_delete_group: bool,
    pub no_delete_group_membership: bool,
}

impl ApplyGroupsOptions {
    /// Create-only mode suppresses both group and membership deletion.
    #[must_use]
    pub fn with_create_only(mut self, create_only: bool) -> Self {
        self.no_delete_group |= create_only;
        self.no_delete_group_membership |= create_only;
        self
    }
}

/// Changes applied to one namespace's groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyGroupsSummary {
    pub groups_created: usize,
    pub memberships_added: usize,
    pub memberships_deleted: usize,
    pub groups_deleted: usize,
}

impl super::service::QuickSightService {
    /// Converge the groups of `namespace` on `desired`.
    ///
    /// Current state is listed fresh, then changes are applied in a fixed
    /// order: create groups, add memberships, delete memberships, delete groups.
    /// The first failing call aborts the remaining steps; nothing already
    /// applied is rolled back.
    pub async fn apply_groups(
        &self,
        namespace: &str,
        desired: &Groups,
        options: ApplyGroupsOptions,
    ) -> QsgpmResult<ApplyGroupsSummary> {
        let current = self.current_groups(namespace).await?;
        let group_diff = current.diff_group(desired);
        let membership_diff = current.diff_membership(desired);
        debug!(
            "namespace {}: {} group(s) to create, {} to keep, {} to delete",
            namespace,
            group_diff.create.len(),
            group_diff.keep.len(),
            group_diff.delete.len()
        );
        let mut summary = ApplyGroupsSummary::default();

        for group_name in &group_diff.create {
            self.client
                .create_group(&self.group_request(namespace, group_name))
                .await?;
            info!("create group {}", group_name);
            summary.groups_created += 1;
        }

        for membership in &membership_diff.add {
            self.client
                .create_group_membership(&self.membership_request(
                    namespace,
                    &membership.group_name,
                    &membership.user_name,
                ))
                .await?;
            info!(
                "create group membership {} in {}",
                membership.user_name, membership.group_name
            );
            summary.memberships_added += 1;
        }

        if options.no_delete_group_membership {
            if !membership_diff.delete.is_empty() {
                debug!(
                    "skip deleting {} group membership(s)",
                    membership_diff.delete.len()
                );
            }
        } else {
            for membership in &membership_diff.delete {
                self.client
                    .delete_group_membership(&self.membership_request(
                        namespace,
                        &membership.group_name,
                        &membership.user_name,
                    ))
                    .await?;
                info!(
                    "delete group membership {} in {}",
                    membership.user_name, membership.group_name
                );
                summary.memberships_deleted += 1;
            }
        }

        if options.no_delete_group {
            if !group_diff.delete.is_empty() {
                debug!("skip deleting {} group(s)", group_diff.delete.len());
            }
        } else {
            for group_name in &group_diff.delete {
                self.client
                    .delete_group(&self.group_request(namespace, group_name))
                    .await?;
                info!("delete group {}", group_name);
                summary.groups_deleted += 1;
            }
        }

        Ok(summary)
    }

    fn group_request(&self, namespace: &str, group_name: &str) -> GroupRequest {
        GroupRequest {
            aws_account_id: self.aws_account_id.clone(),
            namespace: namespace.to_string(),
            group_name: group_name.to_string(),
        }
    }

    fn membership_request(
        &self,
        namespace: &str,
        group_name: &str,
        member_name: &str,
    ) -> MembershipRequest {
        MembershipRequest {
            aws_account_id: self.aws_account_id.clone(),
            namespace: namespace.to_string(),
            group_name: group_name.to_string(),
            member_name: member_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::commands::QuickSightService;
    use crate::testing::{Call, InMemoryQuickSight, ACCOUNT_ID};

    fn desired(entries: &[(&str, &[&str])]) -> Groups {
        entries
            .iter()
            .map(|(name, members)| (*name, members.to_vec()))
            .collect()
    }

    fn create_group(name: &str) -> Call {
        Call::CreateGroup {
            namespace: "default".to_string(),
            group_name: name.to_string(),
        }
    }

    fn add_member(group: &str, member: &str) -> Call {
        Call::CreateGroupMembership {
            namespace: "default".to_string(),
            group_name: group.to_string(),
            member_name: member.to_string(),
        }
    }

    fn delete_member(group: &str, member: &str) -> Call {
        Call::DeleteGroupMembership {
            namespace: "default".to_string(),
            group_name: group.to_string(),
            member_name: member.to_string(),
        }
    }

    fn delete_group(name: &str) -> Call {
        Call::DeleteGroup {
            namespace: "default".to_string(),
            group_name: name.to_string(),
        }
    }

    #[test]
    fn test_create_only_sets_both_suppressions() {
        let options = ApplyGroupsOptions::default().with_create_only(true);
        assert!(options.no_delete_group);
        assert!(options.no_delete_group_membership);

        let options = ApplyGroupsOptions::default().with_create_only(false);
        assert_eq!(options, ApplyGroupsOptions::default());
    }

    #[tokio::test]
    async fn test_apply_adds_group_and_memberships() {
        let fake = Arc::new(InMemoryQuickSight::new().with_group("default", "all", &["alice"]));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        let summary = service
            .apply_groups(
                "default",
                &desired(&[("all", &["alice", "bob"]), ("admins", &["bob"])]),
                ApplyGroupsOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                create_group("admins"),
                add_member("admins", "bob"),
                add_member("all", "bob"),
            ]
        );
        assert_eq!(summary.groups_created, 1);
        assert_eq!(summary.memberships_added, 2);
        assert_eq!(summary.memberships_deleted + summary.groups_deleted, 0);
    }

    #[tokio::test]
    async fn test_apply_deletes_memberships_before_groups() {
        let fake = Arc::new(
            InMemoryQuickSight::new()
                .with_group("default", "all", &["alice", "carol"])
                .with_group("default", "temp", &["carol"]),
        );
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        service
            .apply_groups(
                "default",
                &desired(&[("all", &["alice"])]),
                ApplyGroupsOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                delete_member("all", "carol"),
                delete_member("temp", "carol"),
                delete_group("temp"),
            ]
        );
        assert_eq!(
            fake.groups("default"),
            vec![("all".to_string(), vec!["alice".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_create_only_issues_no_calls_for_removals() {
        let fake = Arc::new(InMemoryQuickSight::new().with_group("default", "temp", &["carol"]));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        let summary = service
            .apply_groups(
                "default",
                &Groups::new(),
                ApplyGroupsOptions::default().with_create_only(true),
            )
            .await
            .unwrap();

        assert!(fake.calls().is_empty());
        assert_eq!(summary, ApplyGroupsSummary::default());
    }

    #[tokio::test]
    async fn test_suppressing_only_group_deletion_still_removes_memberships() {
        let fake = Arc::new(InMemoryQuickSight::new().with_group("default", "temp", &["carol"]));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        service
            .apply_groups(
                "default",
                &Groups::new(),
                ApplyGroupsOptions {
                    no_delete_group: true,
                    no_delete_group_membership: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(fake.calls(), vec![delete_member("temp", "carol")]);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps() {
        let fake = Arc::new(
            InMemoryQuickSight::new()
                .with_group("default", "temp", &["carol"])
                .failing_on("CreateGroupMembership"),
        );
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());

        let result = service
            .apply_groups(
                "default",
                &desired(&[("admins", &["bob"])]),
                ApplyGroupsOptions::default(),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(fake.calls(), vec![create_group("admins")]);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let fake = Arc::new(InMemoryQuickSight::new().with_group("default", "all", &["alice"]));
        let service = QuickSightService::with_client(ACCOUNT_ID, fake.clone());
        let wanted = desired(&[("all", &["bob"]), ("admins", &["bob"])]);

        service
            .apply_groups("default", &wanted, ApplyGroupsOptions::default())
            .await
            .unwrap();
        let calls_after_first = fake.calls().len();
        let summary = service
            .apply_groups("default", &wanted, ApplyGroupsOptions::default())
            .await
            .unwrap();

        assert_eq!(fake.calls().len(), calls_after_first);
        assert_eq!(summary, ApplyGroupsSummary::default());
    }
}
