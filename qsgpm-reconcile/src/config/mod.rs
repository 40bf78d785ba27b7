//! YAML configuration: file model, environment expansion, and compilation into
//! an immutable [`Config`].
//!
//! Compilation merges the global `user`, `groups` and `custom_permission`
//! defaults into every rule, validates enumerated values, and parses
//! `required_version`. Nothing is mutated in place; the file model is read once
//! and a new rule list is produced.

mod rules;
mod template;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use log::debug;
use semver::VersionReq;
use serde::Deserialize;

pub use rules::{Config, Rule, UserMatcher};

use crate::error::{QsgpmError, QsgpmResult};
use crate::types::{IdentityType, UserRole};
use rules::VersionConstraint;

/// Namespace reconciled when the configuration names none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Top level of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub required_version: Option<String>,
    #[serde(default)]
    pub create_only: bool,
    #[serde(default)]
    pub user: Option<UserConfig>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub custom_permission: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default)]
    pub user: Option<UserConfig>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub custom_permission: Option<String>,
}

/// User filters as written in the file. Enumerations are still raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    #[serde(default)]
    pub identity_type: Option<String>,
    #[serde(default)]
    pub session_name_suffix: Option<String>,
    #[serde(default)]
    pub email_suffix: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub iam_role_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// First non-empty value.
fn coalesce(first: Option<&String>, second: Option<&String>) -> Option<String> {
    first
        .filter(|value| !value.is_empty())
        .or_else(|| second.filter(|value| !value.is_empty()))
        .cloned()
}

impl UserConfig {
    /// Fill fields unset on `self` from `defaults`. Fields set on `self` always win.
    #[must_use]
    pub fn merge(&self, defaults: &UserConfig) -> UserConfig {
        UserConfig {
            identity_type: coalesce(self.identity_type.as_ref(), defaults.identity_type.as_ref()),
            session_name_suffix: coalesce(
                self.session_name_suffix.as_ref(),
                defaults.session_name_suffix.as_ref(),
            ),
            email_suffix: coalesce(self.email_suffix.as_ref(), defaults.email_suffix.as_ref()),
            namespace: coalesce(self.namespace.as_ref(), defaults.namespace.as_ref()),
            iam_role_name: coalesce(self.iam_role_name.as_ref(), defaults.iam_role_name.as_ref()),
            role: coalesce(self.role.as_ref(), defaults.role.as_ref()),
        }
    }

    /// Validate enumerations and produce a matcher.
    pub fn compile(&self) -> QsgpmResult<UserMatcher> {
        let non_empty = |value: &Option<String>| coalesce(value.as_ref(), None);
        Ok(UserMatcher {
            identity_type: non_empty(&self.identity_type)
                .map(|value| IdentityType::parse_canonical(&value))
                .transpose()?,
            session_name_suffix: non_empty(&self.session_name_suffix),
            email_suffix: non_empty(&self.email_suffix),
            namespace: non_empty(&self.namespace),
            iam_role_name: non_empty(&self.iam_role_name),
            role: non_empty(&self.role)
                .map(|value| UserRole::parse_canonical(&value))
                .transpose()?,
        })
    }
}

/// Deduplicate keeping the first occurrence of each name.
fn dedup_names<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .into_iter()
        .filter(|name| !name.is_empty() && seen.insert(name.as_str()))
        .cloned()
        .collect()
}

impl ConfigFile {
    /// Parse YAML after expanding `{{ env ... }}` placeholders.
    pub fn from_yaml(source: &str) -> QsgpmResult<Self> {
        let expanded = template::expand_env(source)?;
        serde_yaml::from_str(&expanded).map_err(|e| {
            let location = e
                .location()
                .map(|loc| format!(" at line {}, column {}", loc.line(), loc.column()))
                .unwrap_or_default();
            QsgpmError::config(format!("invalid config YAML{location}: {e}"))
        })
    }

    /// Read and parse a configuration file.
    pub fn read(path: &Path) -> QsgpmResult<Self> {
        if path.as_os_str().is_empty() {
            return Err(QsgpmError::config("no config"));
        }
        let source = fs::read_to_string(path).map_err(|e| {
            QsgpmError::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&source)
    }

    /// Merge defaults into every rule and validate the result.
    pub fn compile(&self) -> QsgpmResult<Config> {
        let required_version = match self.required_version.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(VersionConstraint {
                raw: raw.to_string(),
                req: VersionReq::parse(raw).map_err(|e| {
                    QsgpmError::config(format!("required_version has invalid format: {e}"))
                })?,
            }),
            _ => None,
        };

        let defaults = self.user.clone().unwrap_or_default();
        defaults.compile().map_err(|e| e.context("user"))?;

        let mut namespaces = BTreeSet::new();
        namespaces.extend(defaults.namespace.clone());

        let mut rules = Vec::with_capacity(self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            let user = rule.user.clone().unwrap_or_default().merge(&defaults);
            let matcher = user
                .compile()
                .map_err(|e| e.context("user").context(&format!("rules[{i}]")))?;
            namespaces.extend(user.namespace);
            rules.push(Rule {
                matcher,
                groups: dedup_names(rule.groups.iter().chain(&self.groups)),
                custom_permission: coalesce(
                    rule.custom_permission.as_ref(),
                    self.custom_permission.as_ref(),
                ),
            });
            debug!("rules[{}]: {:?}", i, rules[i]);
        }

        let mut namespaces: Vec<String> = namespaces
            .iter()
            .map(|namespace| namespace.trim())
            .filter(|namespace| !namespace.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if namespaces.is_empty() {
            namespaces.push(DEFAULT_NAMESPACE.to_string());
        }

        Ok(Config {
            create_only: self.create_only,
            required_version,
            rules,
            namespaces,
        })
    }
}

impl Config {
    /// Read, parse and compile the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> QsgpmResult<Self> {
        ConfigFile::read(path.as_ref())?.compile()
    }

    /// Parse and compile configuration held in memory.
    pub fn from_yaml(source: &str) -> QsgpmResult<Self> {
        ConfigFile::from_yaml(source)?.compile()
    }
}
