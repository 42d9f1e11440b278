//! Application destinations and the access rule attached to each

use crate::session::Role;

/// Who may see a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not
    Public,
    /// Signed-out visitors only; signed-in actors go to the landing page
    GuestOnly,
    /// Signed-in actors; an empty role list admits every role
    Protected(&'static [Role]),
    /// Never rendered: landing page when signed in, sign-in otherwise
    Fallback,
}

const ANY_ROLE: &[Role] = &[];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    ForgotPassword,
    Dashboard,
    Admin,
    Tutors,
    TutorProfile(String),
    Schedule,
    Profile,
    Notifications,
    Messages,
    Root,
    Unknown(String),
}

impl Route {
    /// Match a request path; query strings and trailing slashes are ignored
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Root,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["forgot-password"] => Self::ForgotPassword,
            ["dashboard"] => Self::Dashboard,
            ["admin"] => Self::Admin,
            ["tutors"] => Self::Tutors,
            ["tutors", id] => Self::TutorProfile((*id).to_string()),
            ["schedule"] => Self::Schedule,
            ["profile"] => Self::Profile,
            ["notifications"] => Self::Notifications,
            ["messages"] => Self::Messages,
            _ => Self::Unknown(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::ForgotPassword => "/forgot-password".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::Admin => "/admin".into(),
            Self::Tutors => "/tutors".into(),
            Self::TutorProfile(id) => format!("/tutors/{id}"),
            Self::Schedule => "/schedule".into(),
            Self::Profile => "/profile".into(),
            Self::Notifications => "/notifications".into(),
            Self::Messages => "/messages".into(),
            Self::Root => "/".into(),
            Self::Unknown(path) => path.clone(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Self::Login | Self::Register | Self::ForgotPassword => Access::GuestOnly,
            Self::Tutors | Self::TutorProfile(_) => Access::Public,
            Self::Admin => Access::Protected(ADMIN_ONLY),
            Self::Dashboard
            | Self::Schedule
            | Self::Profile
            | Self::Notifications
            | Self::Messages => Access::Protected(ANY_ROLE),
            Self::Root | Self::Unknown(_) => Access::Fallback,
        }
    }
}

/// Which dashboard `/dashboard` shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Admin,
    Tutor,
    Student,
}

impl Dashboard {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::Tutor => Self::Tutor,
            Role::Student => Self::Student,
        }
    }
}
