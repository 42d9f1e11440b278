//! Entity collections exposed by the record store
//!
//! One REST collection per entity kind. Every collection stores records
//! keyed by a numeric-string `id`.

// ─── Entity Names (constants) ───

pub const ENTITY_USERS: &str = "users";
pub const ENTITY_TUTORS: &str = "tutors";
pub const ENTITY_STUDENTS: &str = "students";
pub const ENTITY_SCHEDULES: &str = "schedules";
pub const ENTITY_ATTENDANCE: &str = "attendance";
pub const ENTITY_REVIEWS: &str = "reviews";
pub const ENTITY_NOTIFICATIONS: &str = "notifications";
pub const ENTITY_MESSAGES: &str = "messages";
pub const ENTITY_SUBJECTS: &str = "subjects";
pub const ENTITY_LOCATIONS: &str = "locations";

/// Collection receiving password reset requests
pub const ENTITY_PASSWORD_RESETS: &str = "password_resets";

// ─── Field Names ───

pub const FIELD_ID: &str = "id";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_PASSWORD: &str = "password";
pub const FIELD_ROLE: &str = "role";
pub const FIELD_CREATED_AT: &str = "createdAt";

/// All entity collections served by the record store
pub fn all_entities() -> &'static [&'static str] {
    &[
        ENTITY_USERS,
        ENTITY_TUTORS,
        ENTITY_STUDENTS,
        ENTITY_SCHEDULES,
        ENTITY_ATTENDANCE,
        ENTITY_REVIEWS,
        ENTITY_NOTIFICATIONS,
        ENTITY_MESSAGES,
        ENTITY_SUBJECTS,
        ENTITY_LOCATIONS,
    ]
}

/// True if `name` is a usable collection name (single path segment)
pub fn is_valid_entity_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
