//! Authorization policy — role → capability set
//!
//! A fixed, closed table known at build time. Every call site asks
//! [`allows`] instead of branching on role names itself.
//!
//! | role    | capabilities                                                        |
//! |---------|---------------------------------------------------------------------|
//! | admin   | `all` (wildcard)                                                    |
//! | tutor   | view_schedules, manage_attendance, view_reviews, manage_profile     |
//! | student | view_schedules, book_sessions, write_reviews, manage_profile        |

use serde::{Deserialize, Serialize};

use crate::session::{Actor, Role, SessionSnapshot};

/// A named permission token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Wildcard: grants every other capability
    All,
    ViewSchedules,
    ManageAttendance,
    ViewReviews,
    ManageProfile,
    BookSessions,
    WriteReviews,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ViewSchedules => "view_schedules",
            Self::ManageAttendance => "manage_attendance",
            Self::ViewReviews => "view_reviews",
            Self::ManageProfile => "manage_profile",
            Self::BookSessions => "book_sessions",
            Self::WriteReviews => "write_reviews",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "view_schedules" => Some(Self::ViewSchedules),
            "manage_attendance" => Some(Self::ManageAttendance),
            "view_reviews" => Some(Self::ViewReviews),
            "manage_profile" => Some(Self::ManageProfile),
            "book_sessions" => Some(Self::BookSessions),
            "write_reviews" => Some(Self::WriteReviews),
            _ => None,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ADMIN: &[Capability] = &[Capability::All];

const TUTOR: &[Capability] = &[
    Capability::ViewSchedules,
    Capability::ManageAttendance,
    Capability::ViewReviews,
    Capability::ManageProfile,
];

const STUDENT: &[Capability] = &[
    Capability::ViewSchedules,
    Capability::BookSessions,
    Capability::WriteReviews,
    Capability::ManageProfile,
];

/// The capability set granted to `role`
pub fn permissions(role: Role) -> &'static [Capability] {
    match role {
        Role::Admin => ADMIN,
        Role::Tutor => TUTOR,
        Role::Student => STUDENT,
    }
}

/// `capability ∈ permissions[role] OR all ∈ permissions[role]`
pub fn allows(role: Role, capability: Capability) -> bool {
    let granted = permissions(role);
    granted.contains(&Capability::All) || granted.contains(&capability)
}

/// String form, for roles and tokens read from the store or a request
///
/// An unknown role has the empty set and is denied everything. An unknown
/// capability token is still granted by the `all` wildcard.
pub fn allows_token(role: &str, capability: &str) -> bool {
    let Some(role) = Role::parse(role) else {
        return false;
    };
    if permissions(role).contains(&Capability::All) {
        return true;
    }
    Capability::parse(capability).is_some_and(|c| allows(role, c))
}

/// Membership of `role` in an allowed-roles set
pub fn role_in(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// `false` for an actor whose stored role is not one of the three
pub fn actor_allows(actor: &Actor, capability: Capability) -> bool {
    actor.role().is_some_and(|role| allows(role, capability))
}

/// `false` while initializing or signed out
pub fn snapshot_allows(snapshot: &SessionSnapshot, capability: Capability) -> bool {
    !snapshot.initializing
        && snapshot
            .authorized_role()
            .is_some_and(|role| allows(role, capability))
}
