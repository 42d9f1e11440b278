//! Route guard — render, wait, or redirect
//!
//! [`decide`] is a pure function of the session snapshot and the allowed
//! roles. [`RouteGuard`] adds the configured redirect targets, the route
//! table, and the one suspension point: waiting for the session to settle.

use tracing::debug;

use crate::config::IdentityConfig;
use crate::error::Result;
use crate::policy;
use crate::routes::{Access, Dashboard, Route};
use crate::session::{Role, SessionHandle, SessionSnapshot};

/// Outcome of guarding a protected destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not restored yet; show a placeholder and evaluate again
    Pending,
    RedirectToSignIn,
    RedirectToDefault,
    Render,
}

/// 1. initializing → pending (never a redirect)
/// 2. no authorized actor → sign-in
/// 3. role outside a non-empty `allowed` → default landing page
/// 4. otherwise render
pub fn decide(snapshot: &SessionSnapshot, allowed: &[Role]) -> GuardDecision {
    if snapshot.initializing {
        return GuardDecision::Pending;
    }
    let Some(role) = snapshot.authorized_role() else {
        return GuardDecision::RedirectToSignIn;
    };
    if !allowed.is_empty() && !policy::role_in(role, allowed) {
        return GuardDecision::RedirectToDefault;
    }
    GuardDecision::Render
}

/// Where a navigation ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Pending,
    Render(Route),
    /// `/dashboard`, resolved to the actor's role
    Dashboard(Dashboard),
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    sign_in_path: String,
    default_landing_path: String,
}

impl RouteGuard {
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            sign_in_path: config.sign_in_path.clone(),
            default_landing_path: config.default_landing_path.clone(),
        }
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn default_landing_path(&self) -> &str {
        &self.default_landing_path
    }

    pub fn evaluate(&self, snapshot: &SessionSnapshot, allowed: &[Role]) -> GuardDecision {
        decide(snapshot, allowed)
    }

    /// Apply the access rule of `route`
    pub fn navigate(&self, snapshot: &SessionSnapshot, route: &Route) -> Navigation {
        if snapshot.initializing {
            return Navigation::Pending;
        }

        let navigation = match route.access() {
            Access::Public => Navigation::Render(route.clone()),
            Access::GuestOnly if snapshot.is_authenticated() => {
                Navigation::Redirect(self.default_landing_path.clone())
            }
            Access::GuestOnly => Navigation::Render(route.clone()),
            Access::Protected(allowed) => match decide(snapshot, allowed) {
                GuardDecision::Pending => Navigation::Pending,
                GuardDecision::RedirectToSignIn => Navigation::Redirect(self.sign_in_path.clone()),
                GuardDecision::RedirectToDefault => {
                    Navigation::Redirect(self.default_landing_path.clone())
                }
                GuardDecision::Render => match (route, snapshot.authorized_role()) {
                    (Route::Dashboard, Some(role)) => {
                        Navigation::Dashboard(Dashboard::for_role(role))
                    }
                    _ => Navigation::Render(route.clone()),
                },
            },
            Access::Fallback if snapshot.is_authenticated() => {
                Navigation::Redirect(self.default_landing_path.clone())
            }
            Access::Fallback => Navigation::Redirect(self.sign_in_path.clone()),
        };

        debug!(path = %route.path(), ?navigation, "Route guarded");
        navigation
    }

    /// Wait for the session to settle, then decide
    pub async fn resolve(&self, handle: &SessionHandle, allowed: &[Role]) -> Result<GuardDecision> {
        let snapshot = handle.initialized().await?;
        Ok(decide(&snapshot, allowed))
    }

    pub async fn resolve_route(&self, handle: &SessionHandle, route: &Route) -> Result<Navigation> {
        let snapshot = handle.initialized().await?;
        Ok(self.navigate(&snapshot, route))
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(&IdentityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Actor;
    use serde_json::json;

    fn signed_in(role: &str) -> SessionSnapshot {
        let actor = Actor::from_record(json!({ "id": "1", "email": "a@b.co", "role": role })).unwrap();
        SessionSnapshot::settled(Some(actor))
    }

    #[test]
    fn test_decide_steps_in_order() {
        assert_eq!(decide(&SessionSnapshot::initial(), &[Role::Admin]), GuardDecision::Pending);
        assert_eq!(decide(&SessionSnapshot::settled(None), &[]), GuardDecision::RedirectToSignIn);
        assert_eq!(decide(&signed_in("tutor"), &[Role::Admin]), GuardDecision::RedirectToDefault);
        assert_eq!(decide(&signed_in("tutor"), &[]), GuardDecision::Render);
        assert_eq!(decide(&signed_in("admin"), &[Role::Admin]), GuardDecision::Render);
    }

    #[test]
    fn test_unknown_role_is_sent_to_sign_in() {
        assert_eq!(decide(&signed_in("owner"), &[]), GuardDecision::RedirectToSignIn);
    }

    #[test]
    fn test_navigate_guest_only() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.navigate(&signed_in("student"), &Route::Login),
            Navigation::Redirect("/dashboard".into())
        );
        assert_eq!(
            guard.navigate(&SessionSnapshot::settled(None), &Route::Login),
            Navigation::Render(Route::Login)
        );
    }

    #[test]
    fn test_navigate_fallback() {
        let guard = RouteGuard::default();
        let unknown = Route::parse("/nowhere");
        assert_eq!(
            guard.navigate(&SessionSnapshot::settled(None), &unknown),
            Navigation::Redirect("/login".into())
        );
        assert_eq!(
            guard.navigate(&signed_in("tutor"), &Route::Root),
            Navigation::Redirect("/dashboard".into())
        );
    }

    #[test]
    fn test_dashboard_follows_role() {
        let guard = RouteGuard::default();
        assert_eq!(
            guard.navigate(&signed_in("admin"), &Route::Dashboard),
            Navigation::Dashboard(Dashboard::Admin)
        );
        assert_eq!(
            guard.navigate(&signed_in("tutor"), &Route::Dashboard),
            Navigation::Dashboard(Dashboard::Tutor)
        );
        assert_eq!(
            guard.navigate(&SessionSnapshot::settled(None), &Route::Dashboard),
            Navigation::Redirect("/login".into())
        );
    }

    #[test]
    fn test_configured_targets() {
        let config = IdentityConfig::default()
            .with_sign_in_path("/auth/sign-in")
            .with_default_landing_path("/home");
        let guard = RouteGuard::new(&config);
        assert_eq!(
            guard.navigate(&SessionSnapshot::settled(None), &Route::Profile),
            Navigation::Redirect("/auth/sign-in".into())
        );
        assert_eq!(
            guard.navigate(&signed_in("student"), &Route::Admin),
            Navigation::Redirect("/home".into())
        );
    }
}
