//! SessionActor — Tokio actor owning "who is signed in"
//!
//! Every mutator is a message processed sequentially through an mpsc
//! channel, so the actor is the only writer of session state and one
//! session's operations complete in the order they were issued. Readers
//! never go through the mailbox: the current [`SessionSnapshot`] is
//! published on a `watch` channel that every [`SessionHandle`] holds.
//!
//! The durable slot is written before the new snapshot is published, so a
//! mutator that returns `Ok` has left memory and slot in agreement, and one
//! that fails has changed neither.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tutorlink_identity::session::{ProfilePatch, Registration, Role, SessionActor};
//! use tutorlink_identity::IdentityConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = SessionActor::connect(IdentityConfig::from_env()?).await?;
//!
//!     // Register → becomes the current actor
//!     let actor = handle
//!         .register(Registration::new("lan@example.com", "secret1", "Lan Tran", Role::Tutor))
//!         .await?;
//!
//!     // Profile edits replace the actor wholesale
//!     handle.update_profile(ProfilePatch::new().bio("Maths, grades 6-9")).await?;
//!
//!     handle.logout().await;
//!     assert!(handle.current_actor().is_none());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocator::{create_with_next_id, IdAllocator};
use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};
use crate::policy::{self, Capability};
use crate::schema;
use crate::store::{with_timeout, RecordStore};

use super::slot::DurableSlot;
use super::types::*;

// ─── Actor Messages ───

enum SessionMsg {
    Restore {
        reply: oneshot::Sender<Option<Actor>>,
    },
    Login {
        email: String,
        password: String,
        reply: oneshot::Sender<Result<Actor>>,
    },
    Register {
        registration: Registration,
        reply: oneshot::Sender<Result<Actor>>,
    },
    Logout {
        reply: oneshot::Sender<()>,
    },
    RequestPasswordReset {
        email: String,
        reply: oneshot::Sender<Outcome>,
    },
    CompletePasswordReset {
        token: String,
        new_password: String,
        reply: oneshot::Sender<Outcome>,
    },
    UpdateProfile {
        patch: ProfilePatch,
        reply: oneshot::Sender<Result<Actor>>,
    },
}

// ─── Actor ───

/// Session actor, the single writer of session state
pub struct SessionActor {
    session_id: Uuid,
    store: Arc<dyn RecordStore>,
    allocator: Arc<dyn IdAllocator>,
    slot: Arc<dyn DurableSlot>,
    timeout: Duration,
    state: watch::Sender<SessionSnapshot>,
    rx: mpsc::Receiver<SessionMsg>,
}

impl SessionActor {
    /// Spawn the actor in the `{actor: none, initializing: true}` state
    ///
    /// Nothing is read from the slot until [`SessionHandle::restore`] runs;
    /// use [`SessionActor::start`] to do both.
    pub fn spawn(
        store: Arc<dyn RecordStore>,
        allocator: Arc<dyn IdAllocator>,
        slot: Arc<dyn DurableSlot>,
        config: &IdentityConfig,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
        let (state, state_rx) = watch::channel(SessionSnapshot::initial());
        let session_id = Uuid::new_v4();

        let actor = Self {
            session_id,
            store,
            allocator,
            slot,
            timeout: config.request_timeout,
            state,
            rx,
        };

        tokio::spawn(actor.run());
        info!(session_id = %session_id, "SessionActor spawned");
        SessionHandle {
            tx,
            state: state_rx,
            session_id,
        }
    }

    /// Spawn and restore from the durable slot before returning
    pub async fn start(
        store: Arc<dyn RecordStore>,
        allocator: Arc<dyn IdAllocator>,
        slot: Arc<dyn DurableSlot>,
        config: &IdentityConfig,
    ) -> SessionHandle {
        let handle = Self::spawn(store, allocator, slot, config);
        handle.restore().await;
        handle
    }

    /// HTTP record store, snapshot allocator and file slot, all from `config`
    #[cfg(feature = "http")]
    pub async fn connect(config: IdentityConfig) -> Result<SessionHandle> {
        use crate::allocator::SnapshotIdAllocator;
        use crate::store::HttpRecordStore;

        use super::slot::FileSlot;

        config.validate()?;
        let store: Arc<dyn RecordStore> = Arc::new(HttpRecordStore::new(&config)?);
        let allocator = Arc::new(SnapshotIdAllocator::new(store.clone(), config.request_timeout));
        let slot = Arc::new(FileSlot::from_config(&config));
        Ok(Self::start(store, allocator, slot, &config).await)
    }

    /// Main event loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                SessionMsg::Restore { reply } => {
                    let _ = reply.send(self.handle_restore());
                }
                SessionMsg::Login { email, password, reply } => {
                    let _ = reply.send(self.handle_login(&email, &password).await);
                }
                SessionMsg::Register { registration, reply } => {
                    let _ = reply.send(self.handle_register(registration).await);
                }
                SessionMsg::Logout { reply } => {
                    self.handle_logout();
                    let _ = reply.send(());
                }
                SessionMsg::RequestPasswordReset { email, reply } => {
                    let _ = reply.send(self.handle_request_reset(email).await);
                }
                SessionMsg::CompletePasswordReset { token, new_password, reply } => {
                    let _ = reply.send(self.handle_complete_reset(&token, new_password).await);
                }
                SessionMsg::UpdateProfile { patch, reply } => {
                    let _ = reply.send(self.handle_update_profile(patch).await);
                }
            }
        }
        info!(session_id = %self.session_id, "SessionActor stopped");
    }

    // ─── Handler Implementations ───

    fn handle_restore(&mut self) -> Option<Actor> {
        let restored = match self.slot.read() {
            Ok(Some(raw)) if raw.trim().is_empty() => None,
            Ok(Some(raw)) => match decode_persisted(&raw) {
                Ok(actor) => Some(actor),
                Err(e) => {
                    warn!(session_id = %self.session_id, error = %e, "Discarding persisted session");
                    if let Err(e) = self.slot.delete() {
                        warn!(session_id = %self.session_id, error = %e, "Could not clear session slot");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Session slot unreadable");
                None
            }
        };

        self.state.send_replace(SessionSnapshot::settled(restored.clone()));
        info!(
            session_id = %self.session_id,
            user_id = restored.as_ref().map(|a| a.id.as_str()),
            "Session restored"
        );
        restored
    }

    async fn handle_login(&mut self, email: &str, password: &str) -> Result<Actor> {
        let filters = [(schema::FIELD_EMAIL, email), (schema::FIELD_PASSWORD, password)];
        let matches = with_timeout(self.timeout, self.store.list(schema::ENTITY_USERS, &filters))
            .await
            .map_err(|e| {
                warn!(session_id = %self.session_id, error = %e, "Login request failed");
                IdentityError::AuthServiceUnavailable(e.server_message())
            })?;

        if matches.len() > 1 {
            warn!(
                session_id = %self.session_id,
                matches = matches.len(),
                "Several accounts matched; taking the first"
            );
        }

        let first = matches
            .into_iter()
            .next()
            .ok_or(IdentityError::InvalidCredentials)?;
        let actor = Actor::from_record(first).map_err(|e| {
            IdentityError::AuthServiceUnavailable(format!("unreadable account record: {e}"))
        })?;

        let actor = self.commit(actor)?;
        info!(session_id = %self.session_id, user_id = %actor.id, role = %actor.role_name, "Login successful");
        Ok(actor)
    }

    async fn handle_register(&mut self, registration: Registration) -> Result<Actor> {
        registration.validate()?;

        let id = self.allocator.next_id(schema::ENTITY_USERS).await?;
        let record = registration.into_record(&id)?;

        let created = with_timeout(self.timeout, self.store.create(schema::ENTITY_USERS, record))
            .await
            .map_err(|e| {
                warn!(session_id = %self.session_id, id = %id, error = %e, "Registration rejected");
                IdentityError::RegistrationFailed(e.server_message())
            })?;
        let actor = Actor::from_record(created)
            .map_err(|e| IdentityError::RegistrationFailed(e.to_string()))?;

        let actor = self.commit(actor)?;
        info!(session_id = %self.session_id, user_id = %actor.id, role = %actor.role_name, "User registered");
        Ok(actor)
    }

    fn handle_logout(&mut self) {
        if let Err(e) = self.slot.delete() {
            // An empty value restores as signed out.
            warn!(session_id = %self.session_id, error = %e, "Could not clear session slot; writing tombstone");
            if let Err(e) = self.slot.write("") {
                warn!(session_id = %self.session_id, error = %e, "Session slot left stale");
            }
        }
        self.state.send_replace(SessionSnapshot::settled(None));
        info!(session_id = %self.session_id, "Logged out");
    }

    async fn handle_request_reset(&self, email: String) -> Outcome {
        if !is_plausible_email(&email) {
            return Outcome::failed("Invalid email address");
        }

        let request = json!({
            "email": email,
            "requestedAt": Utc::now().to_rfc3339(),
        });
        let submitted = with_timeout(
            self.timeout,
            create_with_next_id(
                self.store.as_ref(),
                self.allocator.as_ref(),
                schema::ENTITY_PASSWORD_RESETS,
                request,
            ),
        )
        .await;

        match submitted {
            Ok(_) => {
                info!(session_id = %self.session_id, "Password reset requested");
                Outcome::ok("Password reset email sent")
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Password reset request failed");
                Outcome::failed(format!("Could not send reset email: {}", e.server_message()))
            }
        }
    }

    async fn handle_complete_reset(&self, token: &str, new_password: String) -> Outcome {
        if token.trim().is_empty() {
            return Outcome::failed("Reset token is missing");
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Outcome::failed(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            ));
        }

        let patch = json!({ (schema::FIELD_PASSWORD): new_password });
        match with_timeout(self.timeout, self.store.update(schema::ENTITY_USERS, token, patch)).await {
            Ok(_) => {
                info!(session_id = %self.session_id, "Password reset completed");
                Outcome::ok("Password has been reset")
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Password reset failed");
                Outcome::failed(format!("Password reset failed: {}", e.server_message()))
            }
        }
    }

    async fn handle_update_profile(&mut self, patch: ProfilePatch) -> Result<Actor> {
        let current = self
            .state
            .borrow()
            .actor
            .clone()
            .ok_or(IdentityError::NoActiveSession)?;

        let body = serde_json::to_value(&patch)?;
        let updated = with_timeout(
            self.timeout,
            self.store.update(schema::ENTITY_USERS, &current.id, body),
        )
        .await
        .map_err(|e| {
            warn!(session_id = %self.session_id, user_id = %current.id, error = %e, "Profile update rejected");
            IdentityError::UpdateFailed(e.server_message())
        })?;
        let actor =
            Actor::from_record(updated).map_err(|e| IdentityError::UpdateFailed(e.to_string()))?;

        let actor = self.commit(actor)?;
        info!(session_id = %self.session_id, user_id = %actor.id, "Profile updated");
        Ok(actor)
    }

    // ─── Helpers ───

    /// Persist, then publish. A slot failure leaves memory untouched.
    fn commit(&self, actor: Actor) -> Result<Actor> {
        let raw = serde_json::to_string(&actor)?;
        self.slot
            .write(&raw)
            .map_err(|e| IdentityError::SessionPersistence(e.to_string()))?;
        self.state.send_replace(SessionSnapshot::settled(Some(actor.clone())));
        debug!(session_id = %self.session_id, user_id = %actor.id, "Session committed");
        Ok(actor)
    }
}

fn decode_persisted(raw: &str) -> Result<Actor> {
    serde_json::from_str(raw).map_err(|e| IdentityError::MalformedPersistedSession(e.to_string()))
}

// ─── Handle (client-facing API) ───

/// Cheap, cloneable handle to a session actor
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionMsg>,
    state: watch::Receiver<SessionSnapshot>,
    session_id: Uuid,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn current_actor(&self) -> Option<Actor> {
        self.state.borrow().actor.clone()
    }

    pub fn is_initializing(&self) -> bool {
        self.state.borrow().initializing
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.clone()
    }

    /// Wait until the slot has been consulted, then return the settled state
    pub async fn initialized(&self) -> Result<SessionSnapshot> {
        let mut rx = self.state.clone();
        let snapshot = rx.wait_for(|s| !s.initializing).await.map_err(|_| {
            IdentityError::ActorUnavailable("SessionActor stopped while initializing".into())
        })?;
        Ok((*snapshot).clone())
    }

    /// Whether the current actor may exercise `capability`
    pub fn can(&self, capability: Capability) -> bool {
        policy::snapshot_allows(&self.state.borrow(), capability)
    }

    /// Load the actor from the durable slot; never fails
    pub async fn restore(&self) -> Option<Actor> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(SessionMsg::Restore { reply }).await.is_err() {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Actor> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::Login {
                email: email.into(),
                password: password.into(),
                reply,
            })
            .await
            .map_err(|_| IdentityError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| IdentityError::ActorUnavailable("SessionActor dropped".into()))?
    }

    pub async fn register(&self, registration: Registration) -> Result<Actor> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::Register { registration, reply })
            .await
            .map_err(|_| IdentityError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| IdentityError::ActorUnavailable("SessionActor dropped".into()))?
    }

    /// Clear the actor and the durable slot; never fails
    pub async fn logout(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(SessionMsg::Logout { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn request_password_reset(&self, email: impl Into<String>) -> Outcome {
        let (reply, rx) = oneshot::channel();
        let msg = SessionMsg::RequestPasswordReset {
            email: email.into(),
            reply,
        };
        if self.tx.send(msg).await.is_err() {
            return Outcome::failed("Session service unavailable");
        }
        rx.await
            .unwrap_or_else(|_| Outcome::failed("Session service unavailable"))
    }

    pub async fn complete_password_reset(
        &self,
        token: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Outcome {
        let (reply, rx) = oneshot::channel();
        let msg = SessionMsg::CompletePasswordReset {
            token: token.into(),
            new_password: new_password.into(),
            reply,
        };
        if self.tx.send(msg).await.is_err() {
            return Outcome::failed("Session service unavailable");
        }
        rx.await
            .unwrap_or_else(|_| Outcome::failed("Session service unavailable"))
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Actor> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionMsg::UpdateProfile { patch, reply })
            .await
            .map_err(|_| IdentityError::ActorUnavailable("SessionActor".into()))?;
        rx.await
            .map_err(|_| IdentityError::ActorUnavailable("SessionActor dropped".into()))?
    }
}
