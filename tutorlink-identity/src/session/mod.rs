//! Session module — who is signed in, and how that survives a restart
//!
//! One actor per application instance owns the current [`Actor`]; the
//! durable slot holds its serialized copy between runs.

pub mod actor;
pub mod slot;
pub mod types;

pub use actor::{SessionActor, SessionHandle};
pub use slot::{DurableSlot, FileSlot, MemorySlot};
pub use types::{
    is_plausible_email, Actor, Outcome, ProfilePatch, Registration, Role, SessionSnapshot,
    UserInfo, MIN_PASSWORD_LEN,
};
