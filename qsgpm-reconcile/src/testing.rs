//! In-memory QuickSight used by unit and integration tests.
//!
//! Listings are paged (two items per page by default) so pagination is
//! exercised, and every mutating call is recorded and applied to the stored
//! state so a second reconciliation pass can observe the result of the first.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::aws::{
    GroupRequest, ListGroupMembershipsRequest, ListGroupsRequest, ListUsersRequest,
    MembershipRequest, MutationOutput, Page, PermissionChange, QuickSightApi, UpdateUserOutput,
    UpdateUserRequest,
};
use crate::error::{QsgpmError, QsgpmResult};
use crate::types::{IdentityType, User, UserRole};

pub const ACCOUNT_ID: &str = "123456789012";

/// A mutating call as observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    UpdateUser {
        namespace: String,
        user_name: String,
        permission: PermissionChange,
    },
    CreateGroup {
        namespace: String,
        group_name: String,
    },
    DeleteGroup {
        namespace: String,
        group_name: String,
    },
    CreateGroupMembership {
        namespace: String,
        group_name: String,
        member_name: String,
    },
    DeleteGroupMembership {
        namespace: String,
        group_name: String,
        member_name: String,
    },
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<String, Vec<User>>,
    groups: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    calls: Vec<Call>,
    fail_on: Option<String>,
}

pub struct InMemoryQuickSight {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for InMemoryQuickSight {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an IAM-federated user, deriving the email from the session name.
pub fn iam_user(namespace: &str, user_name: &str, role: UserRole, permission: Option<&str>) -> User {
    User {
        user_name: user_name.to_string(),
        email: user_name.split_once('/').map(|(_, session)| session.to_string()),
        identity_type: IdentityType::Iam,
        role,
        custom_permissions_name: permission.map(str::to_string),
        namespace: namespace.to_string(),
    }
}

fn page<T: Clone>(items: &[T], token: Option<&str>, page_size: usize) -> QsgpmResult<Page<T>> {
    let start = match token {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| QsgpmError::aws("List", format!("invalid next token {token}")))?,
        None => 0,
    };
    let end = (start + page_size).min(items.len());
    Ok(Page {
        items: items.get(start..end).unwrap_or_default().to_vec(),
        next_token: (end < items.len()).then(|| end.to_string()),
    })
}

impl InMemoryQuickSight {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 2,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_user(self, user: User) -> Self {
        self.lock()
            .users
            .entry(user.namespace.clone())
            .or_default()
            .push(user);
        self
    }

    #[must_use]
    pub fn with_group(self, namespace: &str, group_name: &str, members: &[&str]) -> Self {
        self.lock()
            .groups
            .entry(namespace.to_string())
            .or_default()
            .entry(group_name.to_string())
            .or_default()
            .extend(members.iter().map(|m| (*m).to_string()));
        self
    }

    /// Make the named operation (e.g. `CreateGroup`) fail.
    #[must_use]
    pub fn failing_on(self, operation: &str) -> Self {
        self.lock().fail_on = Some(operation.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Current groups of a namespace, as sorted `(group, members)` pairs.
    pub fn groups(&self, namespace: &str) -> Vec<(String, Vec<String>)> {
        self.lock()
            .groups
            .get(namespace)
            .map(|groups| {
                groups
                    .iter()
                    .map(|(name, members)| (name.clone(), members.iter().cloned().collect()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn user_permission(&self, namespace: &str, user_name: &str) -> Option<String> {
        self.lock()
            .users
            .get(namespace)
            .and_then(|users| users.iter().find(|u| u.user_name == user_name))
            .and_then(|u| u.custom_permissions_name.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(state: &State, operation: &str) -> QsgpmResult<()> {
        if state.fail_on.as_deref() == Some(operation) {
            return Err(QsgpmError::aws(operation, "injected failure"));
        }
        Ok(())
    }

    fn ok() -> MutationOutput {
        MutationOutput {
            request_id: "request-id".to_string(),
            status: 200,
        }
    }
}

#[async_trait]
impl QuickSightApi for InMemoryQuickSight {
    async fn list_users(&self, request: &ListUsersRequest) -> QsgpmResult<Page<User>> {
        let state = self.lock();
        Self::check(&state, "ListUsers")?;
        let users = state.users.get(&request.namespace).cloned().unwrap_or_default();
        page(&users, request.next_token.as_deref(), self.page_size)
    }

    async fn list_groups(&self, request: &ListGroupsRequest) -> QsgpmResult<Page<String>> {
        let state = self.lock();
        Self::check(&state, "ListGroups")?;
        let names: Vec<String> = state
            .groups
            .get(&request.namespace)
            .map(|groups| groups.keys().cloned().collect())
            .unwrap_or_default();
        page(&names, request.next_token.as_deref(), self.page_size)
    }

    async fn list_group_memberships(
        &self,
        request: &ListGroupMembershipsRequest,
    ) -> QsgpmResult<Page<String>> {
        let state = self.lock();
        Self::check(&state, "ListGroupMemberships")?;
        let members: Vec<String> = state
            .groups
            .get(&request.namespace)
            .and_then(|groups| groups.get(&request.group_name))
            .map(|members| members.iter().cloned().collect())
            .ok_or_else(|| {
                QsgpmError::aws("ListGroupMemberships", format!("group {} not found", request.group_name))
            })?;
        page(&members, request.next_token.as_deref(), self.page_size)
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> QsgpmResult<UpdateUserOutput> {
        let mut state = self.lock();
        Self::check(&state, "UpdateUser")?;
        state.calls.push(Call::UpdateUser {
            namespace: request.namespace.clone(),
            user_name: request.user_name.clone(),
            permission: request.permission.clone(),
        });
        let permission = match &request.permission {
            PermissionChange::Apply(name) => Some(name.clone()),
            PermissionChange::Unapply => None,
        };
        if let Some(user) = state
            .users
            .get_mut(&request.namespace)
            .and_then(|users| users.iter_mut().find(|u| u.user_name == request.user_name))
        {
            user.custom_permissions_name.clone_from(&permission);
        }
        Ok(UpdateUserOutput {
            request_id: "request-id".to_string(),
            status: 200,
            custom_permissions_name: permission,
        })
    }

    async fn create_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput> {
        let mut state = self.lock();
        Self::check(&state, "CreateGroup")?;
        state.calls.push(Call::CreateGroup {
            namespace: request.namespace.clone(),
            group_name: request.group_name.clone(),
        });
        let groups = state.groups.entry(request.namespace.clone()).or_default();
        if groups.contains_key(&request.group_name) {
            return Err(QsgpmError::aws("CreateGroup", "group already exists"));
        }
        groups.insert(request.group_name.clone(), BTreeSet::new());
        Ok(Self::ok())
    }

    async fn delete_group(&self, request: &GroupRequest) -> QsgpmResult<MutationOutput> {
        let mut state = self.lock();
        Self::check(&state, "DeleteGroup")?;
        state.calls.push(Call::DeleteGroup {
            namespace: request.namespace.clone(),
            group_name: request.group_name.clone(),
        });
        state
            .groups
            .get_mut(&request.namespace)
            .and_then(|groups| groups.remove(&request.group_name))
            .ok_or_else(|| QsgpmError::aws("DeleteGroup", "group not found"))?;
        Ok(Self::ok())
    }

    async fn create_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput> {
        let mut state = self.lock();
        Self::check(&state, "CreateGroupMembership")?;
        state.calls.push(Call::CreateGroupMembership {
            namespace: request.namespace.clone(),
            group_name: request.group_name.clone(),
            member_name: request.member_name.clone(),
        });
        state
            .groups
            .get_mut(&request.namespace)
            .and_then(|groups| groups.get_mut(&request.group_name))
            .ok_or_else(|| QsgpmError::aws("CreateGroupMembership", "group not found"))?
            .insert(request.member_name.clone());
        Ok(Self::ok())
    }

    async fn delete_group_membership(
        &self,
        request: &MembershipRequest,
    ) -> QsgpmResult<MutationOutput> {
        let mut state = self.lock();
        Self::check(&state, "DeleteGroupMembership")?;
        state.calls.push(Call::DeleteGroupMembership {
            namespace: request.namespace.clone(),
            group_name: request.group_name.clone(),
            member_name: request.member_name.clone(),
        });
        state
            .groups
            .get_mut(&request.namespace)
            .and_then(|groups| groups.get_mut(&request.group_name))
            .ok_or_else(|| QsgpmError::aws("DeleteGroupMembership", "group not found"))?
            .remove(&request.member_name);
        Ok(Self::ok())
    }
}
