//! # Tutorlink Identity
//!
//! Identity and authorization core for Tutorlink: who is signed in, what
//! they may do, which screens they may reach, and how new records get
//! their sequential ids.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                tutorlink-identity                │
//! ├───────────────────────┬──────────────────────────┤
//! │     SessionActor      │   RouteGuard / Policy    │
//! │  (login, register,    │  (role → capabilities,   │
//! │   profile, restore)   │   render or redirect)    │
//! ├─────────────┬─────────┴──────────────────────────┤
//! │ DurableSlot │          IdAllocator               │
//! │ (file or    │  snapshot: visible max + 1         │
//! │  memory)    │  serialized: mutex + high-water    │
//! ├─────────────┴────────────────────────────────────┤
//! │                   RecordStore                    │
//! │     HttpRecordStore (reqwest)  │  MemoryStore    │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tutorlink_identity::{IdentityConfig, Route, RouteGuard, SessionActor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IdentityConfig::from_env()?;
//!     let guard = RouteGuard::new(&config);
//!     let session = SessionActor::connect(config).await?;
//!
//!     session.login("lan@example.com", "secret1").await?;
//!
//!     // Where does /admin take this actor?
//!     let navigation = guard.resolve_route(&session, &Route::parse("/admin")).await?;
//!     println!("{navigation:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Single-writer session**: every mutator is a message to one actor
//! - **Restart survival**: the actor is mirrored into a durable slot
//! - **Central policy**: one role → capability table, `all` as wildcard
//! - **Pure guard**: `decide(snapshot, allowed_roles)` has no hidden state
//! - **Two allocators**: the racy `max + 1` scheme and a serialized one
//! - **Railway Programming**: All operations return `Result<T, IdentityError>`

pub mod allocator;
pub mod config;
pub mod error;
pub mod guard;
pub mod policy;
pub mod routes;
pub mod schema;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use allocator::{create_with_next_id, IdAllocator, SerializedIdAllocator, SnapshotIdAllocator};
pub use config::IdentityConfig;
pub use error::{IdentityError, Result};
pub use guard::{decide, GuardDecision, Navigation, RouteGuard};
pub use policy::{allows, Capability};
pub use routes::{Access, Dashboard, Route};
pub use session::{
    Actor, DurableSlot, FileSlot, MemorySlot, Outcome, ProfilePatch, Registration, Role,
    SessionActor, SessionHandle, SessionSnapshot, UserInfo,
};
pub use store::{MemoryRecordStore, RecordStore};

#[cfg(feature = "http")]
pub use store::HttpRecordStore;
