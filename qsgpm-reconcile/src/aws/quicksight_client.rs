//! AWS QuickSight client wrapper backed by `aws-sdk-quicksight`.

use async_trait::async_trait;
use aws_sdk_quicksight::error::DisplayErrorContext;
use aws_sdk_quicksight::types::{User as SdkUser, UserRole as SdkUserRole};
use aws_sdk_quicksight::Client as QuickSightClient;
use log::warn;

use super::{
    GroupRequest, ListGroupMembershipsRequest, ListGroupsRequest, ListUsersRequest,
    MembershipRequest, MutationOutput, Page, PermissionChange, QuickSightApi, UpdateUserOutput,
    UpdateUserRequest,
};
use crate::error::{QsgpmError, QsgpmResult};
use crate::types::{IdentityType, User, UserRole};

pub struct AwsQuickSightClient {
    client: QuickSightClient,
}

impl AwsQuickSightClient {
    pub fn new(client: QuickSightClient) -> Self {
        Self { client }
    }
}

pub(crate) fn sdk_error<E>(operation: &str, err: E) -> QsgpmError
where
    E: std::error::Error,
{
    QsgpmError::aws(operation, DisplayErrorContext(&err).to_string())
}

fn convert_user(user: &SdkUser, namespace: &str) -> Option<User> {
    let Some(user_name) = user.user_name() else {
        warn!("skipping user without a name in namespace {}", namespace);
        return None;
    };
    Some(User {
        user_name: user_name.to_string(),
        email: user.email().map(str::to_string),
        identity_type: user
            .identity_type()
            .map_or(IdentityType::Other(String::new()), |t| {
                IdentityType::from(t.as_str())
            }),
        role: user
            .role()
            .map_or(UserRole::Other(String::new()), |r| UserRole::from(r.as_str())),
        custom_permissions_name: user.custom_permissions_name().map(str::to_string),
        namespace: namespace.to_string(),
    })
}

fn mutation_output(request_id: Option<&str>, status: i32) -> MutationOutput {
    MutationOutput {
        request_id: request_id.unwrap_or_default().to_string(),
        status,
    }
}

#[async_trait]
impl QuickSightApi for AwsQuickSightClient {
    async fn list_users(&self, request: &ListUsersRequest) -> QsgpmResult<Page<User>> {
        let output = self
            .client
            .list_users()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .set_next_token(request.next_token.clone())
            .send()
            .await
            .map_err(|e| sdk_error("ListUsers", e))?;
        Ok(Page {
            items: output
                .user_list()
                .iter()
                .filter_map(|user| convert_user(user, &request.namespace))
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_groups(&self, request: &ListGroupsRequest) -> QsgpmResult<Page<String>> {
        let output = self
            .client
            .list_groups()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .set_next_token(request.next_token.clone())
            .send()
            .await
            .map_err(|e| sdk_error("ListGroups", e))?;
        Ok(Page {
            items: output
                .group_list()
                .iter()
                .filter_map(|group| group.group_name().map(str::to_string))
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn list_group_memberships(
        &self,
        request: &ListGroupMembershipsRequest,
    ) -> QsgpmResult<Page<String>> {
        let output = self
            .client
            .list_group_memberships()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .group_name(&request.group_name)
            .set_next_token(request.next_token.clone())
            .send()
            .await
            .map_err(|e| sdk_error("ListGroupMemberships", e))?;
        Ok(Page {
            items: output
                .group_member_list()
                .iter()
                .filter_map(|member| member.member_name().map(str::to_string))
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> QsgpmResult<UpdateUserOutput> {
        let builder = self
            .client
            .update_user()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .user_name(&request.user_name)
            .set_email(request.email.clone())
            .role(SdkUserRole::from(request.role.as_str()));
        let builder = match &request.permission {
            PermissionChange::Apply(name) => builder.custom_permissions_name(name),
            PermissionChange::Unapply => builder.unapply_custom_permissions(true),
        };
        let output = builder
            .send()
            .await
            .map_err(|e| sdk_error("UpdateUser", e))?;
        Ok(UpdateUserOutput {
            request_id: output.request_id().unwrap_or_default().to_string(),
            status: output.status(),
            custom_permissions_name: output
                .user()
                .and_then(SdkUser::custom_permissions_name)
                .map(str::to_string),
        })
    }

    async fn create_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput> {
        let output = self
            .client
            .create_group()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .group_name(&request.group_name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateGroup", e))?;
        Ok(mutation_output(output.request_id(), output.status()))
    }

    async fn delete_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput> {
        let output = self
            .client
            .delete_group()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .group_name(&request.group_name)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteGroup", e))?;
        Ok(mutation_output(output.request_id(), output.status()))
    }

    async fn create_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput> {
        let output = self
            .client
            .create_group_membership()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .group_name(&request.group_name)
            .member_name(&request.member_name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateGroupMembership", e))?;
        Ok(mutation_output(output.request_id(), output.status()))
    }

    async fn delete_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput> {
        let output = self
            .client
            .delete_group_membership()
            .aws_account_id(&request.aws_account_id)
            .namespace(&request.namespace)
            .group_name(&request.group_name)
            .member_name(&request.member_name)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteGroupMembership", e))?;
        Ok(mutation_output(output.request_id(), output.status()))
    }
}
