//! Account types shared between the gateway and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RoleCategory;

/// Role given to every profile created on first sign-in.
pub const DEFAULT_ROLE: &str = "user";

/// Status tags stored on profiles.
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const PENDING: &str = "Pending";
    pub const ACCEPTED: &str = "accepted";
    pub const DECLINED: &str = "declined";
}

/// Identity-provider account. Owned by the provider, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Provider-supplied avatar token, if the user picked one
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Application-owned profile record, one per principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Document id in the profile collection
    pub id: String,
    /// Principal id this profile belongs to
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: Vec<String>,
}

impl Profile {
    pub fn role_category(&self) -> RoleCategory {
        RoleCategory::classify(&self.role)
    }

    /// Whether the profile carries the given status tag (case-insensitive).
    pub fn has_status(&self, tag: &str) -> bool {
        self.status.iter().any(|s| s.eq_ignore_ascii_case(tag))
    }

    pub fn is_pending(&self) -> bool {
        self.has_status(status::PENDING)
    }
}

/// Authenticated-user view assembled from a principal and its profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub principal_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub status: Vec<String>,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Merge a principal with its profile. Identity fields come from the
    /// principal, application fields from the profile.
    pub fn new(principal: &Principal, profile: &Profile) -> Self {
        Self {
            principal_id: principal.id.clone(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            role: profile.role.clone(),
            status: profile.status.clone(),
            avatar: profile.avatar.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn role_category(&self) -> RoleCategory {
        RoleCategory::classify(&self.role)
    }
}
