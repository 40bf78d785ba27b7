//! Dry-run decorator: listings go to the wrapped client, mutations are only
//! reported.

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use serde::Serialize;

use super::{
    GroupRequest, ListGroupMembershipsRequest, ListGroupsRequest, ListUsersRequest,
    MembershipRequest, MutationOutput, Page, PermissionChange, QuickSightApi, UpdateUserOutput,
    UpdateUserRequest,
};
use crate::error::QsgpmResult;
use crate::types::User;

/// Request id reported for calls that were never sent.
pub const KNOWN_AFTER_RUN: &str = "<known after run>";

const DRY_RUN_STATUS: i32 = 200;

pub struct DryRunClient {
    inner: Arc<dyn QuickSightApi>,
}

impl DryRunClient {
    pub fn new(inner: Arc<dyn QuickSightApi>) -> Self {
        Self { inner }
    }

    fn report<T: Serialize>(operation: &str, request: &T) -> QsgpmResult<MutationOutput> {
        let input = serde_json::to_string_pretty(request)?;
        info!("**DryRun** {} input:\n{}", operation, input);
        Ok(MutationOutput {
            request_id: KNOWN_AFTER_RUN.to_string(),
            status: DRY_RUN_STATUS,
        })
    }
}

#[async_trait]
impl QuickSightApi for DryRunClient {
    async fn list_users(&self, request: &ListUsersRequest) -> QsgpmResult<Page<User>> {
        self.inner.list_users(request).await
    }

    async fn list_groups(&self, request: &ListGroupsRequest) -> QsgpmResult<Page<String>> {
        self.inner.list_groups(request).await
    }

    async fn list_group_memberships(
        &self,
        request: &ListGroupMembershipsRequest,
    ) -> QsgpmResult<Page<String>> {
        self.inner.list_group_memberships(request).await
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> QsgpmResult<UpdateUserOutput> {
        let output = Self::report("UpdateUser", request)?;
        let custom_permissions_name = match &request.permission {
            PermissionChange::Apply(name) => Some(name.clone()),
            PermissionChange::Unapply => None,
        };
        Ok(UpdateUserOutput {
            request_id: output.request_id,
            status: output.status,
            custom_permissions_name,
        })
    }

    async fn create_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput> {
        Self::report("CreateGroup", request)
    }

    async fn delete_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput> {
        Self::report("DeleteGroup", request)
    }

    async fn create_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput> {
        Self::report("CreateGroupMembership", request)
    }

    async fn delete_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput> {
        Self::report("DeleteGroupMembership", request)
    }
}
