//! Domain value types: QuickSight users and the enumerations rules match on.

use std::fmt;

use serde::Serialize;

use crate::error::{QsgpmError, QsgpmResult};

/// Placeholder rendered for absent optional values in log lines.
pub(crate) const NIL: &str = "<nil>";

/// Render `["A", "B", "C"]` as `A, B or C`.
fn join_choices(values: &[&str]) -> String {
    match values.split_last() {
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => String::new(),
    }
}

/// How a QuickSight user authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum IdentityType {
    /// Federated through an IAM role; the user name is `<role>/<session>`.
    Iam,
    /// Native QuickSight user.
    Quicksight,
    /// A value the service returned that rules cannot match on.
    Other(String),
}

impl IdentityType {
    pub const CANONICAL: [&'static str; 2] = ["IAM", "QUICKSIGHT"];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Iam => "IAM",
            Self::Quicksight => "QUICKSIGHT",
            Self::Other(value) => value,
        }
    }

    /// Parse a configured identity type, ignoring case. Only canonical values are accepted.
    pub fn parse_canonical(value: &str) -> QsgpmResult<Self> {
        match Self::from(value.to_ascii_uppercase().as_str()) {
            Self::Other(_) => Err(QsgpmError::config(format!(
                "given IdentityType: {} is not one of {}",
                value,
                join_choices(&Self::CANONICAL)
            ))),
            known => Ok(known),
        }
    }
}

impl From<&str> for IdentityType {
    fn from(value: &str) -> Self {
        match value {
            "IAM" => Self::Iam,
            "QUICKSIGHT" => Self::Quicksight,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<IdentityType> for String {
    fn from(value: IdentityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// QuickSight user role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum UserRole {
    Admin,
    Author,
    Reader,
    RestrictedAuthor,
    RestrictedReader,
    Other(String),
}

impl UserRole {
    pub const CANONICAL: [&'static str; 5] = [
        "ADMIN",
        "AUTHOR",
        "READER",
        "RESTRICTED_AUTHOR",
        "RESTRICTED_READER",
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "ADMIN",
            Self::Author => "AUTHOR",
            Self::Reader => "READER",
            Self::RestrictedAuthor => "RESTRICTED_AUTHOR",
            Self::RestrictedReader => "RESTRICTED_READER",
            Self::Other(value) => value,
        }
    }

    /// Parse a configured role, ignoring case. Only canonical values are accepted.
    pub fn parse_canonical(value: &str) -> QsgpmResult<Self> {
        match Self::from(value.to_ascii_uppercase().as_str()) {
            Self::Other(_) => Err(QsgpmError::config(format!(
                "given Role: {} is not one of {}",
                value,
                join_choices(&Self::CANONICAL)
            ))),
            known => Ok(known),
        }
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        match value {
            "ADMIN" => Self::Admin,
            "AUTHOR" => Self::Author,
            "READER" => Self::Reader,
            "RESTRICTED_AUTHOR" => Self::RestrictedAuthor,
            "RESTRICTED_READER" => Self::RestrictedReader,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<UserRole> for String {
    fn from(value: UserRole) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A QuickSight user as listed from one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_name: String,
    pub email: Option<String>,
    pub identity_type: IdentityType,
    pub role: UserRole,
    pub custom_permissions_name: Option<String>,
    pub namespace: String,
}

impl User {
    fn federated_parts(&self) -> Option<(&str, &str)> {
        if self.identity_type != IdentityType::Iam {
            return None;
        }
        self.user_name.split_once('/')
    }

    /// Session name of an IAM-federated user (`Role/session` → `session`).
    pub fn session_name(&self) -> &str {
        self.federated_parts().map_or("", |(_, session)| session)
    }

    /// IAM role embedded in a federated user name (`Role/session` → `Role`).
    pub fn iam_role_name(&self) -> &str {
        self.federated_parts().map_or("", |(role, _)| role)
    }

    /// Whether the assigned custom permission differs from `desired`.
    /// Both absent counts as equal.
    pub fn needs_custom_permission_update(&self, desired: Option<&str>) -> bool {
        self.custom_permissions_name.as_deref() != desired
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user<{} {}, CustomPermission:{}>",
            self.identity_type,
            self.user_name,
            self.custom_permissions_name.as_deref().unwrap_or(NIL)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iam_user(user_name: &str, role: UserRole) -> User {
        crate::testing::iam_user("default", user_name, role, None)
    }

    #[test]
    fn test_session_and_role_name_for_iam_user() {
        let user = iam_user("Manager/hoge@example.com", UserRole::Author);
        assert_eq!(user.session_name(), "hoge@example.com");
        assert_eq!(user.iam_role_name(), "Manager");
    }

    #[test]
    fn test_session_name_splits_on_first_slash_only() {
        let user = iam_user("Role/path/session", UserRole::Reader);
        assert_eq!(user.iam_role_name(), "Role");
        assert_eq!(user.session_name(), "path/session");
    }

    #[test]
    fn test_derived_names_empty_for_native_user() {
        let mut user = iam_user("Manager/hoge@example.com", UserRole::Author);
        user.identity_type = IdentityType::Quicksight;
        assert_eq!(user.session_name(), "");
        assert_eq!(user.iam_role_name(), "");
    }

    #[test]
    fn test_derived_names_empty_without_slash() {
        let user = iam_user("plainuser", UserRole::Author);
        assert_eq!(user.session_name(), "");
        assert_eq!(user.iam_role_name(), "");
    }

    #[test]
    fn test_needs_custom_permission_update() {
        let mut user = iam_user("Manager/hoge@example.com", UserRole::Author);
        assert!(!user.needs_custom_permission_update(None));
        assert!(user.needs_custom_permission_update(Some("manager")));

        user.custom_permissions_name = Some("manager".to_string());
        assert!(!user.needs_custom_permission_update(Some("manager")));
        assert!(user.needs_custom_permission_update(Some("analysis")));
        assert!(user.needs_custom_permission_update(None));
    }

    #[test]
    fn test_parse_canonical_is_case_insensitive() {
        assert_eq!(IdentityType::parse_canonical("iam").ok(), Some(IdentityType::Iam));
        assert_eq!(
            UserRole::parse_canonical("restricted_reader").ok(),
            Some(UserRole::RestrictedReader)
        );
    }

    #[test]
    fn test_parse_canonical_error_lists_choices() {
        let err = IdentityType::parse_canonical("Hoge").unwrap_err();
        assert_eq!(
            err.to_string(),
            "given IdentityType: Hoge is not one of IAM or QUICKSIGHT"
        );
        let err = UserRole::parse_canonical("Auther").unwrap_err();
        assert_eq!(
            err.to_string(),
            "given Role: Auther is not one of ADMIN, AUTHOR, READER, RESTRICTED_AUTHOR or RESTRICTED_READER"
        );
    }

    #[test]
    fn test_unknown_service_values_are_preserved() {
        assert_eq!(
            UserRole::from("ADMIN_PRO"),
            UserRole::Other("ADMIN_PRO".to_string())
        );
        assert_eq!(UserRole::from("ADMIN_PRO").as_str(), "ADMIN_PRO");
    }

    #[test]
    fn test_display() {
        let user = iam_user("Manager/hoge@example.com", UserRole::Author);
        assert_eq!(
            user.to_string(),
            "user<IAM Manager/hoge@example.com, CustomPermission:<nil>>"
        );
    }
}
