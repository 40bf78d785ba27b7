//! QuickSight Service Layer
//!
//! This module provides the service that performs every remote step of a
//! reconciliation: listing users and groups, updating custom permissions, and
//! applying group changes. It holds the account id and a [`QuickSightApi`]
//! capability, so the real client and the dry-run decorator are interchangeable.

use std::sync::Arc;

use aws_sdk_quicksight::Client as QuickSightClient;
use aws_sdk_sts::Client as StsClient;
use log::debug;

use crate::aws::paginator::{GroupMembershipsPaginator, GroupsPaginator, Paginator, UsersPaginator};
use crate::aws::sts::caller_account_id;
use crate::aws::{
    AwsQuickSightClient, DryRunClient, ListGroupMembershipsRequest, ListGroupsRequest,
    ListUsersRequest, QuickSightApi,
};
use crate::error::QsgpmResult;
use crate::groups::Groups;

/// Main service struct that holds the QuickSight client and the account it acts on
#[derive(Clone)]
pub struct QuickSightService {
    pub(crate) aws_account_id: String,
    pub(crate) client: Arc<dyn QuickSightApi>,
}

impl QuickSightService {
    /// Create a new service instance backed by the AWS SDK
    ///
    /// The configuration is loaded using the default credential provider chain,
    /// and the account id is resolved once through STS.
    ///
    /// # Errors
    ///
    /// Returns an error if the caller identity cannot be resolved.
    pub async fn new() -> QsgpmResult<Self> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let aws_account_id = caller_account_id(&StsClient::new(&config)).await?;
        debug!("resolved AWS account id {}", aws_account_id);
        Ok(Self::with_client(
            aws_account_id,
            Arc::new(AwsQuickSightClient::new(QuickSightClient::new(&config))),
        ))
    }

    /// Create a service around an existing client.
    pub fn with_client(aws_account_id: impl Into<String>, client: Arc<dyn QuickSightApi>) -> Self {
        Self {
            aws_account_id: aws_account_id.into(),
            client,
        }
    }

    /// The same service with mutations intercepted by [`DryRunClient`].
    #[must_use]
    pub fn dry_run(&self) -> Self {
        Self {
            aws_account_id: self.aws_account_id.clone(),
            client: Arc::new(DryRunClient::new(Arc::clone(&self.client))),
        }
    }

    pub fn aws_account_id(&self) -> &str {
        &self.aws_account_id
    }

    pub fn users_paginator(&self, namespace: &str) -> UsersPaginator<'_> {
        Paginator::new(
            self.client.as_ref(),
            ListUsersRequest {
                aws_account_id: self.aws_account_id.clone(),
                namespace: namespace.to_string(),
                next_token: None,
            },
        )
    }

    pub fn groups_paginator(&self, namespace: &str) -> GroupsPaginator<'_> {
        Paginator::new(
            self.client.as_ref(),
            ListGroupsRequest {
                aws_account_id: self.aws_account_id.clone(),
                namespace: namespace.to_string(),
                next_token: None,
            },
        )
    }

    pub fn group_memberships_paginator(
        &self,
        namespace: &str,
        group_name: &str,
    ) -> GroupMembershipsPaginator<'_> {
        Paginator::new(
            self.client.as_ref(),
            ListGroupMembershipsRequest {
                aws_account_id: self.aws_account_id.clone(),
                namespace: namespace.to_string(),
                group_name: group_name.to_string(),
                next_token: None,
            },
        )
    }

    /// Fetch every group of `namespace` together with its members.
    pub async fn current_groups(&self, namespace: &str) -> QsgpmResult<Groups> {
        let mut groups = Groups::new();
        let mut group_pages = self.groups_paginator(namespace);
        while group_pages.has_more_pages() {
            for group_name in group_pages.next_page().await? {
                debug!("group {} exists", group_name);
                groups.add_group(&group_name);
                let mut member_pages = self.group_memberships_paginator(namespace, &group_name);
                while member_pages.has_more_pages() {
                    for member_name in member_pages.next_page().await? {
                        debug!("group membership {} in {} exists", member_name, group_name);
                        groups.add(&group_name, &member_name);
                    }
                }
            }
        }
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QsgpmError;
    use crate::testing::{iam_user, InMemoryQuickSight, ACCOUNT_ID};
    use crate::types::UserRole;

    #[tokio::test]
    async fn test_users_paginator_walks_all_pages() {
        let fake = InMemoryQuickSight::new()
            .with_user(iam_user("default", "Role/a", UserRole::Reader, None))
            .with_user(iam_user("default", "Role/b", UserRole::Reader, None))
            .with_user(iam_user("default", "Role/c", UserRole::Reader, None));
        let service = QuickSightService::with_client(ACCOUNT_ID, Arc::new(fake));

        let mut pages = service.users_paginator("default");
        let mut names = Vec::new();
        let mut page_count = 0;
        while pages.has_more_pages() {
            names.extend(pages.next_page().await.unwrap().into_iter().map(|u| u.user_name));
            page_count += 1;
        }
        assert_eq!(names, ["Role/a", "Role/b", "Role/c"]);
        assert_eq!(page_count, 2);
        assert!(matches!(pages.next_page().await, Err(QsgpmError::NoMorePages)));
    }

    #[tokio::test]
    async fn test_current_groups_includes_empty_groups() {
        let fake = InMemoryQuickSight::new()
            .with_group("default", "all", &["alice", "bob", "carol"])
            .with_group("default", "empty", &[]);
        let service = QuickSightService::with_client(ACCOUNT_ID, Arc::new(fake));

        let groups = service.current_groups("default").await.unwrap();
        assert_eq!(groups.names(), ["all", "empty"]);
        assert_eq!(groups.get("all").map(crate::groups::Group::len), Some(3));
        assert!(groups.get("empty").is_some_and(crate::groups::Group::is_empty));
    }

    #[tokio::test]
    async fn test_current_groups_propagates_listing_failure() {
        let fake = InMemoryQuickSight::new()
            .with_group("default", "all", &["alice"])
            .failing_on("ListGroupMemberships");
        let service = QuickSightService::with_client(ACCOUNT_ID, Arc::new(fake));
        assert!(service.current_groups("default").await.is_err());
    }
}
