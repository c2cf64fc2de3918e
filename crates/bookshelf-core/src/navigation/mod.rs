//! Route access policy and the hook the gateway uses to redirect.
//!
//! - `RouteTable`: declared routes and their access requirement
//! - `evaluate` / `NavigationGuard`: allow or redirect a transition
//! - `Navigator`: host-provided callback that performs a redirect

pub mod guard;
pub mod routes;

pub use guard::{evaluate, Navigation, NavigationGuard, Redirect};
pub use routes::{Route, RouteAccess, RouteTable, HOME_PATH, LOGIN_PATH};

/// Performs a client-side redirect. Injected by the hosting application so
/// the gateway never navigates on its own.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, location: &str) {
        self(location)
    }
}
