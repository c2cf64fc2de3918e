use tracing::debug;

use super::routes::{RouteAccess, RouteTable, HOME_PATH, LOGIN_PATH, REDIRECT_PARAM};
use crate::auth::{Session, SessionHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: &'static str,
    /// Where to go after signing in.
    pub return_to: Option<String>,
}

impl Redirect {
    fn to_login(target: &str) -> Self {
        Self {
            path: LOGIN_PATH,
            return_to: Some(target.to_string()),
        }
    }

    fn home() -> Self {
        Self {
            path: HOME_PATH,
            return_to: None,
        }
    }

    /// Full location, e.g. `/login?redirect=%2Fmy-library`.
    pub fn location(&self) -> String {
        match &self.return_to {
            Some(target) => format!(
                "{}?{}={}",
                self.path,
                REDIRECT_PARAM,
                urlencoding::encode(target)
            ),
            None => self.path.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(Redirect),
}

impl Navigation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Navigation::Allow)
    }

    pub fn location(&self) -> Option<String> {
        match self {
            Navigation::Allow => None,
            Navigation::Redirect(redirect) => Some(redirect.location()),
        }
    }
}

/// Decide a navigation to `target` (path plus optional query) guarded by
/// `access`. The first matching rule wins:
///
/// 1. needs auth, not signed in → login, remembering `target`
/// 2. needs admin, not an admin → home
/// 3. guest-only, signed in → home
/// 4. allow
pub fn evaluate(access: RouteAccess, session: &Session, target: &str) -> Navigation {
    if access.requires_auth() && !session.is_authenticated() {
        Navigation::Redirect(Redirect::to_login(target))
    } else if access.requires_admin() && !session.is_admin() {
        Navigation::Redirect(Redirect::home())
    } else if access.is_guest_only() && session.is_authenticated() {
        Navigation::Redirect(Redirect::home())
    } else {
        Navigation::Allow
    }
}

/// Checks every route transition against the route table and session.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    routes: RouteTable,
    session: SessionHandle,
}

impl NavigationGuard {
    pub fn new(routes: RouteTable, session: SessionHandle) -> Self {
        Self { routes, session }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn check(&self, target: &str) -> Navigation {
        let access = self.routes.access_for(target);
        let decision = evaluate(access, &self.session.read(), target);
        debug!(target, ?access, ?decision, "Navigation checked");
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;

    fn profile(is_admin: bool) -> Profile {
        Profile {
            id: 1,
            email: "a@example.com".to_string(),
            username: "a".to_string(),
            is_admin,
            two_factor_enabled: false,
            email_verified: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn signed_in(is_admin: bool) -> Session {
        let mut session = Session::new();
        session.authenticate("T".to_string(), profile(is_admin));
        session
    }

    #[test]
    fn test_auth_route_redirects_anonymous_to_login() {
        let decision = evaluate(RouteAccess::RequiresAuth, &Session::new(), "/my-library");
        assert_eq!(
            decision,
            Navigation::Redirect(Redirect {
                path: LOGIN_PATH,
                return_to: Some("/my-library".to_string()),
            })
        );
        assert_eq!(
            decision.location().as_deref(),
            Some("/login?redirect=%2Fmy-library")
        );
    }

    #[test]
    fn test_admin_route_anonymous_goes_to_login_first() {
        let decision = evaluate(RouteAccess::RequiresAdmin, &Session::new(), "/admin");
        assert_eq!(decision.location().as_deref(), Some("/login?redirect=%2Fadmin"));
    }

    #[test]
    fn test_admin_route_non_admin_goes_home_not_login() {
        let decision = evaluate(RouteAccess::RequiresAdmin, &signed_in(false), "/admin");
        assert_eq!(decision.location().as_deref(), Some("/"));
    }

    #[test]
    fn test_admin_route_admin_allowed() {
        assert!(evaluate(RouteAccess::RequiresAdmin, &signed_in(true), "/admin").is_allowed());
    }

    #[test]
    fn test_guest_route() {
        assert!(evaluate(RouteAccess::GuestOnly, &Session::new(), "/login").is_allowed());
        let decision = evaluate(RouteAccess::GuestOnly, &signed_in(false), "/login");
        assert_eq!(decision.location().as_deref(), Some("/"));
    }

    #[test]
    fn test_awaiting_second_factor_is_not_signed_in() {
        let mut session = Session::new();
        session.await_second_factor(42);
        assert!(!evaluate(RouteAccess::RequiresAuth, &session, "/profile").is_allowed());
        assert!(evaluate(RouteAccess::GuestOnly, &session, "/login").is_allowed());
    }

    #[test]
    fn test_public_route_always_allowed() {
        assert!(evaluate(RouteAccess::Public, &Session::new(), "/books").is_allowed());
        assert!(evaluate(RouteAccess::Public, &signed_in(false), "/books").is_allowed());
    }

    #[test]
    fn test_guard_preserves_query_in_return_target() {
        let guard = NavigationGuard::new(RouteTable::default(), SessionHandle::new());
        let decision = guard.check("/favorites?page=2");
        assert_eq!(
            decision,
            Navigation::Redirect(Redirect {
                path: LOGIN_PATH,
                return_to: Some("/favorites?page=2".to_string()),
            })
        );
    }

    #[test]
    fn test_guard_reads_live_session() {
        let session = SessionHandle::new();
        let guard = NavigationGuard::new(RouteTable::default(), session.clone());
        assert!(!guard.check("/profile").is_allowed());

        session.write().authenticate("T".to_string(), profile(false));
        assert!(guard.check("/profile").is_allowed());
        assert!(!guard.check("/admin/authors").is_allowed());
    }
}
