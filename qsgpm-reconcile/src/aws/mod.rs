//! AWS integration: the QuickSight client capability, its SDK and dry-run
//! implementations, request/response shapes, and pagination.

pub(crate) mod dry_run;
pub mod paginator;
pub(crate) mod quicksight_client;
pub(crate) mod sts;

use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::error::QsgpmResult;
use crate::types::{User, UserRole};

pub use dry_run::DryRunClient;
pub use quicksight_client::AwsQuickSightClient;

/// One page of a listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListUsersRequest {
    pub aws_account_id: String,
    pub namespace: String,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListGroupsRequest {
    pub aws_account_id: String,
    pub namespace: String,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListGroupMembershipsRequest {
    pub aws_account_id: String,
    pub namespace: String,
    pub group_name: String,
    pub next_token: Option<String>,
}

/// Target for create-group and delete-group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRequest {
    pub aws_account_id: String,
    pub namespace: String,
    pub group_name: String,
}

/// Target for create-group-membership and delete-group-membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MembershipRequest {
    pub aws_account_id: String,
    pub namespace: String,
    pub group_name: String,
    pub member_name: String,
}

/// What an update-user call does to the custom permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionChange {
    /// Assign the named custom permission profile.
    Apply(String),
    /// Remove whatever profile is assigned.
    Unapply,
}

impl PermissionChange {
    pub fn from_desired(desired: Option<&str>) -> Self {
        desired.map_or(Self::Unapply, |name| Self::Apply(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserRequest {
    pub aws_account_id: String,
    pub namespace: String,
    pub user_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub permission: PermissionChange,
}

// Mirrors the UpdateUser input shape so dry-run output reads like the API call.
impl Serialize for UpdateUserRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UpdateUserRequest", 6)?;
        state.serialize_field("AwsAccountId", &self.aws_account_id)?;
        state.serialize_field("Namespace", &self.namespace)?;
        state.serialize_field("UserName", &self.user_name)?;
        state.serialize_field("Email", &self.email)?;
        state.serialize_field("Role", &self.role)?;
        match &self.permission {
            PermissionChange::Apply(name) => {
                state.serialize_field("CustomPermissionsName", name)?;
            }
            PermissionChange::Unapply => {
                state.serialize_field("UnapplyCustomPermissions", &true)?;
            }
        }
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutput {
    pub request_id: String,
    pub status: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserOutput {
    pub request_id: String,
    pub status: i32,
    /// Custom permission assigned after the update.
    pub custom_permissions_name: Option<String>,
}

/// The QuickSight operations reconciliation needs.
///
/// Implemented by [`AwsQuickSightClient`] against the real service and by
/// [`DryRunClient`], which forwards listings and only reports mutations.
#[async_trait]
pub trait QuickSightApi: Send + Sync {
    async fn list_users(&self, request: &ListUsersRequest) -> QsgpmResult<Page<User>>;

    async fn list_groups(&self, request: &ListGroupsRequest) -> QsgpmResult<Page<String>>;

    async fn list_group_memberships(
        &self,
        request: &ListGroupMembershipsRequest,
    ) -> QsgpmResult<Page<String>>;

    async fn update_user(&self, request: &UpdateUserRequest) -> QsgpmResult<UpdateUserOutput>;

    async fn create_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput>;

    async fn delete_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput>;

    async fn create_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput>;

    async fn delete_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput>;
}
