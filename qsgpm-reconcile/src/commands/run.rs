//! Reconciliation driver: one sequential pass over every configured namespace

use log::{debug, info};
use serde::Serialize;

use super::apply::{ApplyGroupsOptions, ApplyGroupsSummary};
use super::service::QuickSightService;
use crate::config::Config;
use crate::error::QsgpmResult;
use crate::groups::Groups;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOption {
    pub dry_run: bool,
}

/// What one namespace's pass did (or, in dry-run mode, would have done).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceReport {
    pub namespace: String,
    pub users: usize,
    pub permission_updates: usize,
    #[serde(flatten)]
    pub groups: ApplyGroupsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub namespaces: Vec<NamespaceReport>,
}

pub struct App {
    service: QuickSightService,
    config: Config,
}

impl App {
    /// Build an app backed by the AWS SDK.
    pub async fn new(config: Config) -> QsgpmResult<Self> {
        Ok(Self::with_service(QuickSightService::new().await?, config))
    }

    pub fn with_service(service: QuickSightService, config: Config) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reconcile every namespace in order. The first failure stops the run;
    /// namespaces after the failing one are not touched.
    pub async fn run(&self, option: RunOption) -> QsgpmResult<RunReport> {
        let service = if option.dry_run {
            self.service.dry_run()
        } else {
            self.service.clone()
        };
        let mut report = RunReport {
            dry_run: option.dry_run,
            namespaces: Vec::with_capacity(self.config.namespaces().len()),
        };
        for namespace in self.config.namespaces() {
            debug!("namespace: {}", namespace);
            let namespace_report = self.reconcile_namespace(&service, namespace).await?;
            info!(
                "namespace {}: {} user(s), {} permission update(s), {} group(s) created, {} membership(s) added, {} membership(s) deleted, {} group(s) deleted",
                namespace_report.namespace,
                namespace_report.users,
                namespace_report.permission_updates,
                namespace_report.groups.groups_created,
                namespace_report.groups.memberships_added,
                namespace_report.groups.memberships_deleted,
                namespace_report.groups.groups_deleted
            );
            report.namespaces.push(namespace_report);
        }
        Ok(report)
    }

    async fn reconcile_namespace(
        &self,
        service: &QuickSightService,
        namespace: &str,
    ) -> QsgpmResult<NamespaceReport> {
        let mut report = NamespaceReport {
            namespace: namespace.to_string(),
            ..NamespaceReport::default()
        };
        let mut desired = Groups::new();
        let mut pages = service.users_paginator(namespace);
        while pages.has_more_pages() {
            for user in pages.next_page().await? {
                report.users += 1;
                if let Some(group_names) = self.config.group_names(&user) {
                    desired.assign(&user.user_name, group_names);
                }
                let permission = self.config.custom_permission_name(&user);
                if service.update_user_custom_permission(&user, permission).await? {
                    report.permission_updates += 1;
                }
            }
        }
        report.groups = service
            .apply_groups(
                namespace,
                &desired,
                ApplyGroupsOptions::default().with_create_only(self.config.create_only),
            )
            .await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{iam_user, InMemoryQuickSight, ACCOUNT_ID};
    use crate::types::UserRole;

    const CONFIG: &str = "groups: [all]\nrules:\n  - user: { role: admin }\n    groups: [admins]\n    custom_permission: full\n";

    fn fake() -> Arc<InMemoryQuickSight> {
        Arc::new(
            InMemoryQuickSight::new()
                .with_user(iam_user("default", "Admin/root@example.com", UserRole::Admin, None))
                .with_group("default", "temp", &["Admin/root@example.com"]),
        )
    }

    fn app(fake: &Arc<InMemoryQuickSight>) -> App {
        App::with_service(
            QuickSightService::with_client(ACCOUNT_ID, fake.clone()),
            Config::from_yaml(CONFIG).expect("config should compile"),
        )
    }

    #[tokio::test]
    async fn test_dry_run_leaves_call_log_empty() {
        let fake = fake();
        let report = app(&fake).run(RunOption { dry_run: true }).await.unwrap();

        assert!(fake.calls().is_empty());
        assert!(report.dry_run);
        let namespace = &report.namespaces[0];
        assert_eq!(namespace.namespace, "default");
        assert_eq!(namespace.users, 1);
        assert_eq!(namespace.permission_updates, 1);
        assert_eq!(namespace.groups.groups_created, 2);
        assert_eq!(namespace.groups.groups_deleted, 1);
    }

    #[tokio::test]
    async fn test_run_reports_each_namespace_once() {
        let fake = fake();
        let report = app(&fake).run(RunOption::default()).await.unwrap();

        assert!(!report.dry_run);
        assert_eq!(report.namespaces.len(), 1);
        assert_eq!(report.namespaces[0].permission_updates, 1);
        assert_eq!(
            fake.user_permission("default", "Admin/root@example.com").as_deref(),
            Some("full")
        );
    }
}
