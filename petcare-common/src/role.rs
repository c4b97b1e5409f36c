//! Role categories used for landing-page routing.

use serde::{Deserialize, Serialize};

/// Closed set of role categories a free-text profile role maps onto.
///
/// Profiles store their role as free text ("Admin", "Clinic-Assistant",
/// "pet training", ...). Routing only ever looks at the category, so new
/// role strings fall into `User` until they are added here explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    /// Administrators of the whole application
    Admin,
    /// Clinics, pet trainers and pet-boarding operators
    Boarding,
    /// Regular pet owners
    User,
}

/// Substrings that put a role into the boarding category.
const BOARDING_MARKERS: [&str; 3] = ["clinic", "pet training", "pet-boarding"];

impl RoleCategory {
    /// All category variants for iteration.
    pub const ALL: [RoleCategory; 3] = [
        RoleCategory::Admin,
        RoleCategory::Boarding,
        RoleCategory::User,
    ];

    /// Classify a free-text role.
    ///
    /// The role is trimmed and lower-cased first. `admin` must match
    /// exactly; boarding roles match on substring, except `petboarding`
    /// which must match exactly.
    pub fn classify(role: &str) -> Self {
        let role = role.trim().to_lowercase();

        if role == "admin" {
            return RoleCategory::Admin;
        }

        if role == "petboarding" || BOARDING_MARKERS.iter().any(|m| role.contains(m)) {
            return RoleCategory::Boarding;
        }

        RoleCategory::User
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, RoleCategory::Admin)
    }
}

impl std::fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleCategory::Admin => write!(f, "admin"),
            RoleCategory::Boarding => write!(f, "boarding"),
            RoleCategory::User => write!(f, "user"),
        }
    }
}
