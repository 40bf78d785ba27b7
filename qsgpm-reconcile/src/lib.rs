//! This crate provides the core business logic for qsgpm:
//! - Rule configuration: loading, default merging, and first-match lookups
//! - Group membership sets and the group/membership diff
//! - The QuickSight service layer and the dry-run decorator
//! - The reconciliation driver that ties them together per namespace
//!

pub mod aws;
pub mod commands;
pub mod config;
mod error;
pub mod groups;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
mod types;

// Re-exports for a small, focused public API
pub use aws::{DryRunClient, PermissionChange, QuickSightApi};
pub use commands::{
    App, ApplyGroupsOptions, ApplyGroupsSummary, NamespaceReport, QuickSightService, RunOption,
    RunReport,
};
pub use config::{Config, ConfigFile, Rule, RuleConfig, UserConfig, UserMatcher};
pub use error::{QsgpmError, QsgpmResult};
pub use groups::{Group, GroupDiff, Groups, Membership, MembershipDiff};
pub use types::{IdentityType, User, UserRole};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_and_diff_compose() {
        let config = Config::from_yaml(
            "groups: [all]\nrules:\n  - user: { role: admin }\n    groups: [admins]\n",
        )
        .expect("should compile");
        let admin = testing::iam_user("default", "Admin/root@example.com", UserRole::Admin, None);

        let mut desired = Groups::new();
        if let Some(names) = config.group_names(&admin) {
            desired.assign(&admin.user_name, names);
        }
        let diff = Groups::new().diff_group(&desired);
        assert_eq!(diff.create, ["admins", "all"]);
    }
}
