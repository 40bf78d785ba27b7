//! In-memory group membership sets and the structural diff between two of them.
//!
//! A [`Groups`] value maps group names to member sets. The driver builds one from
//! the rules ("desired") and one from the remote listing ("current"), then diffs
//! them at two granularities: whole groups first, then individual memberships of
//! the groups that exist on both sides.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// One edge of the membership graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Membership {
    pub group_name: String,
    pub user_name: String,
}

impl Membership {
    pub fn new(group_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            user_name: user_name.into(),
        }
    }
}

/// Result of [`Groups::diff_group`]. Each list is sorted and duplicate-free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDiff {
    pub create: Vec<String>,
    pub keep: Vec<String>,
    pub delete: Vec<String>,
}

/// Result of [`Groups::diff_membership`] and [`Group::diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub add: Vec<Membership>,
    pub stable: Vec<Membership>,
    pub delete: Vec<Membership>,
}

impl MembershipDiff {
    fn extend(&mut self, other: MembershipDiff) {
        self.add.extend(other.add);
        self.stable.extend(other.stable);
        self.delete.extend(other.delete);
    }

    fn sort(&mut self) {
        self.add.sort();
        self.stable.sort();
        self.delete.sort();
    }
}

/// A named group and its member user names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: HashSet<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: HashSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, user_name: &str) -> bool {
        self.members.contains(user_name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Insert a member. Returns `false` if it was already present.
    pub fn add(&mut self, user_name: impl Into<String>) -> bool {
        self.members.insert(user_name.into())
    }

    /// Every membership of this group, sorted by user name.
    pub fn memberships(&self) -> Vec<Membership> {
        let mut memberships: Vec<Membership> = self
            .members
            .iter()
            .map(|user| Membership::new(&self.name, user))
            .collect();
        memberships.sort();
        memberships
    }

    /// Member-level diff from `self` (current) to `desired`.
    ///
    /// # Panics
    ///
    /// Panics if the two groups have different names; diffing unrelated groups
    /// would silently revoke every membership of one of them.
    pub fn diff(&self, desired: &Group) -> MembershipDiff {
        assert_eq!(
            self.name, desired.name,
            "unexpected diff operation between different groups"
        );
        let mut diff = MembershipDiff::default();
        for user in &desired.members {
            let membership = Membership::new(&self.name, user);
            if self.members.contains(user) {
                diff.stable.push(membership);
            } else {
                diff.add.push(membership);
            }
        }
        for user in self.members.difference(&desired.members) {
            diff.delete.push(Membership::new(&self.name, user));
        }
        diff.sort();
        diff
    }
}

/// Group name → [`Group`] for a single namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groups {
    groups: HashMap<String, Group>,
}

impl Groups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Group names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    /// Insert an empty group unless one with this name already exists.
    pub fn add_group(&mut self, name: &str) -> &mut Group {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name))
    }

    /// Add `user_name` to `group_name`, creating the group if needed.
    pub fn add(&mut self, group_name: &str, user_name: &str) {
        self.add_group(group_name).add(user_name);
    }

    /// Add `user_name` to every group in `group_names`.
    pub fn assign<S: AsRef<str>>(&mut self, user_name: &str, group_names: &[S]) {
        for group_name in group_names {
            self.add(group_name.as_ref(), user_name);
        }
    }

    /// Group-level diff from `self` (current) to `desired`.
    pub fn diff_group(&self, desired: &Groups) -> GroupDiff {
        let mut diff = GroupDiff::default();
        for name in desired.groups.keys() {
            if self.groups.contains_key(name) {
                diff.keep.push(name.clone());
            } else {
                diff.create.push(name.clone());
            }
        }
        for name in self.groups.keys() {
            if !desired.groups.contains_key(name) {
                diff.delete.push(name.clone());
            }
        }
        diff.create.sort();
        diff.keep.sort();
        diff.delete.sort();
        diff
    }

    /// Membership-level diff from `self` (current) to `desired`.
    ///
    /// Memberships of groups that will be created are all additions, memberships
    /// of groups that will be deleted are all deletions, and groups present on
    /// both sides are diffed member by member.
    pub fn diff_membership(&self, desired: &Groups) -> MembershipDiff {
        let group_diff = self.diff_group(desired);
        let mut diff = MembershipDiff::default();
        for name in &group_diff.create {
            if let Some(group) = desired.groups.get(name) {
                diff.add.extend(group.memberships());
            }
        }
        for name in &group_diff.delete {
            if let Some(group) = self.groups.get(name) {
                diff.delete.extend(group.memberships());
            }
        }
        for name in &group_diff.keep {
            if let (Some(current), Some(wanted)) = (self.groups.get(name), desired.groups.get(name)) {
                diff.extend(current.diff(wanted));
            }
        }
        diff.sort();
        diff
    }
}

impl<N: AsRef<str>, M: AsRef<str>> FromIterator<(N, Vec<M>)> for Groups {
    fn from_iter<I: IntoIterator<Item = (N, Vec<M>)>>(iter: I) -> Self {
        let mut groups = Groups::new();
        for (name, members) in iter {
            let group = groups.add_group(name.as_ref());
            for member in members {
                group.add(member.as_ref());
            }
        }
        groups
    }
}
