//! Compiled rules and the first-match lookups the driver runs per user.

use log::warn;
use semver::{Version, VersionReq};

use crate::error::{QsgpmError, QsgpmResult};
use crate::types::{IdentityType, User, UserRole};

/// Conjunction of user filters. An unset filter matches every user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserMatcher {
    pub identity_type: Option<IdentityType>,
    pub session_name_suffix: Option<String>,
    pub email_suffix: Option<String>,
    pub namespace: Option<String>,
    pub iam_role_name: Option<String>,
    pub role: Option<UserRole>,
}

impl UserMatcher {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(identity_type) = &self.identity_type {
            if &user.identity_type != identity_type {
                return false;
            }
        }
        if let Some(suffix) = &self.session_name_suffix {
            if !user.session_name().ends_with(suffix.as_str()) {
                return false;
            }
        }
        if let Some(suffix) = &self.email_suffix {
            if !user.email.as_deref().unwrap_or_default().ends_with(suffix.as_str()) {
                return false;
            }
        }
        if let Some(namespace) = &self.namespace {
            if &user.namespace != namespace {
                return false;
            }
        }
        if let Some(role_name) = &self.iam_role_name {
            if user.iam_role_name() != role_name.as_str() {
                return false;
            }
        }
        if let Some(role) = &self.role {
            if &user.role != role {
                return false;
            }
        }
        true
    }
}

/// One validated rule with global defaults already merged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub(crate) matcher: UserMatcher,
    pub(crate) groups: Vec<String>,
    pub(crate) custom_permission: Option<String>,
}

impl Rule {
    pub fn matcher(&self) -> &UserMatcher {
        &self.matcher
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn custom_permission(&self) -> Option<&str> {
        self.custom_permission.as_deref()
    }

    pub fn custom_permission_name(&self, user: &User) -> Option<&str> {
        let name = self.custom_permission.as_deref()?;
        self.matcher.matches(user).then_some(name)
    }

    pub fn group_names(&self, user: &User) -> Option<&[String]> {
        if self.groups.is_empty() || !self.matcher.matches(user) {
            return None;
        }
        Some(&self.groups)
    }
}

/// The `required_version` constraint as written and as parsed.
#[derive(Debug, Clone)]
pub(crate) struct VersionConstraint {
    pub(crate) raw: String,
    pub(crate) req: VersionReq,
}

/// Fully validated configuration. Immutable once compiled.
#[derive(Debug, Clone)]
pub struct Config {
    pub create_only: bool,
    pub(crate) required_version: Option<VersionConstraint>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) namespaces: Vec<String>,
}

impl Config {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Namespaces to reconcile, sorted.
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Permission of the first matching rule that declares one.
    pub fn custom_permission_name(&self, user: &User) -> Option<&str> {
        self.rules
            .iter()
            .find_map(|rule| rule.custom_permission_name(user))
    }

    /// Groups of the first matching rule that declares any.
    pub fn group_names(&self, user: &User) -> Option<&[String]> {
        self.rules.iter().find_map(|rule| rule.group_names(user))
    }

    /// Check that `version` satisfies `required_version`.
    ///
    /// Versions that do not parse (for example a development build named
    /// `current`) are let through with a warning.
    pub fn validate_version(&self, version: &str) -> QsgpmResult<()> {
        let Some(constraint) = &self.required_version else {
            warn!("required_version is empty. Skip checking required_version.");
            return Ok(());
        };
        let core = version.split('-').next().unwrap_or_default();
        let parsed = match Version::parse(core.trim_start_matches('v')) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "Invalid version format \"{}\". Skip checking required_version.",
                    version
                );
                return Ok(());
            }
        };
        if constraint.req.matches(&parsed) {
            Ok(())
        } else {
            Err(QsgpmError::VersionMismatch {
                version: version.to_string(),
                constraint: constraint.raw.clone(),
            })
        }
    }
}
