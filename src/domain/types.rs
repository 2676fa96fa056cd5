//! Shared domain enumerations aligned with persisted database enums.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account privilege level. Variants are declared in ascending order so the
/// derived `Ord` matches the privilege hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Contributor,
    Admin,
    Superadmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Contributor => "CONTRIBUTOR",
            Role::Admin => "ADMIN",
            Role::Superadmin => "SUPERADMIN",
        }
    }

    /// Whether this role carries at least the privileges of `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "content_status", rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    Rejected,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "DRAFT",
            ContentStatus::Published => "PUBLISHED",
            ContentStatus::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "media_type", rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Pdf,
    Doc,
    Link,
    Other,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "IMAGE",
            MediaType::Video => "VIDEO",
            MediaType::Audio => "AUDIO",
            MediaType::Pdf => "PDF",
            MediaType::Doc => "DOC",
            MediaType::Link => "LINK",
            MediaType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type `{0}`")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(MediaType::Image),
            "VIDEO" => Ok(MediaType::Video),
            "AUDIO" => Ok(MediaType::Audio),
            "PDF" => Ok(MediaType::Pdf),
            "DOC" => Ok(MediaType::Doc),
            "LINK" => Ok(MediaType::Link),
            "OTHER" => Ok(MediaType::Other),
            _ => Err(UnknownMediaType(value.to_string())),
        }
    }
}

/// Which workflow states a read path may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Public callers only ever see published content.
    PublishedOnly,
    /// Staff sessions see every status.
    All,
}

impl Visibility {
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(role) if role.satisfies(Role::Contributor) => Visibility::All,
            _ => Visibility::PublishedOnly,
        }
    }

    pub fn admits(self, status: ContentStatus) -> bool {
        match self {
            Visibility::All => true,
            Visibility::PublishedOnly => status == ContentStatus::Published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_order_follows_privilege() {
        assert!(Role::Superadmin.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Contributor));
        assert!(Role::Contributor.satisfies(Role::Viewer));
        assert!(!Role::Viewer.satisfies(Role::Contributor));
        assert!(!Role::Admin.satisfies(Role::Superadmin));
    }

    #[test]
    fn media_type_parses_case_insensitively() {
        assert_eq!("video".parse::<MediaType>(), Ok(MediaType::Video));
        assert_eq!(" PDF ".parse::<MediaType>(), Ok(MediaType::Pdf));
        assert!("podcast".parse::<MediaType>().is_err());
    }

    #[test]
    fn enums_serialize_in_upper_case() {
        let json = serde_json::to_string(&ContentStatus::Published).unwrap();
        assert_eq!(json, "\"PUBLISHED\"");
        let role: Role = serde_json::from_str("\"SUPERADMIN\"").unwrap();
        assert_eq!(role, Role::Superadmin);
    }

    #[test]
    fn visibility_depends_on_staff_role() {
        assert_eq!(Visibility::for_role(None), Visibility::PublishedOnly);
        assert_eq!(
            Visibility::for_role(Some(Role::Viewer)),
            Visibility::PublishedOnly
        );
        assert_eq!(Visibility::for_role(Some(Role::Contributor)), Visibility::All);
        assert!(!Visibility::PublishedOnly.admits(ContentStatus::Draft));
    }
}
