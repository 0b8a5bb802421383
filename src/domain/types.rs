//! Shared domain enumerations aligned with persisted database enums.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of a blog article.
///
/// Transitions only move forward: `inactive → active → published`. The single
/// way out of `published` is a remote deletion, which demotes the blog to
/// `deactivated`; that path goes through the reconciler, never through
/// [`BlogStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "blog_status", rename_all = "snake_case")]
pub enum BlogStatus {
    Inactive,
    Active,
    Published,
    Deactivated,
}

impl BlogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BlogStatus::Inactive => "inactive",
            BlogStatus::Active => "active",
            BlogStatus::Published => "published",
            BlogStatus::Deactivated => "deactivated",
        }
    }

    /// Statuses a direct update may move to from `self`.
    pub fn allowed_transitions(self) -> &'static [BlogStatus] {
        match self {
            BlogStatus::Inactive => &[BlogStatus::Active],
            BlogStatus::Active => &[BlogStatus::Published],
            BlogStatus::Published | BlogStatus::Deactivated => &[],
        }
    }

    pub fn can_transition_to(self, next: BlogStatus) -> bool {
        self == next || self.allowed_transitions().contains(&next)
    }
}

impl Display for BlogStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlogStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(BlogStatus::Inactive),
            "active" => Ok(BlogStatus::Active),
            "published" => Ok(BlogStatus::Published),
            "deactivated" => Ok(BlogStatus::Deactivated),
            _ => Err(()),
        }
    }
}

/// External social-media platform a blog can be syndicated to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "social_platform", rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    Linkedin,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Facebook, Platform::Instagram, Platform::Linkedin];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Linkedin => "linkedin",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::Linkedin => "LinkedIn",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "linkedin" => Ok(Platform::Linkedin),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_only_moves_forward() {
        assert!(BlogStatus::Inactive.can_transition_to(BlogStatus::Active));
        assert!(BlogStatus::Active.can_transition_to(BlogStatus::Published));
        assert!(!BlogStatus::Inactive.can_transition_to(BlogStatus::Published));
        assert!(!BlogStatus::Active.can_transition_to(BlogStatus::Inactive));
    }

    #[test]
    fn published_rejects_every_direct_transition() {
        for next in [
            BlogStatus::Inactive,
            BlogStatus::Active,
            BlogStatus::Deactivated,
        ] {
            assert!(!BlogStatus::Published.can_transition_to(next), "{next}");
        }
    }

    #[test]
    fn platform_parsing_is_case_insensitive() {
        assert_eq!("Facebook".parse::<Platform>(), Ok(Platform::Facebook));
        assert_eq!(" linkedin ".parse::<Platform>(), Ok(Platform::Linkedin));
        assert!("twitter".parse::<Platform>().is_err());
    }
}
