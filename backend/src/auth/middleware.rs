//! Middleware for protecting admin pages.
//!
//! The guard runs before a page is entered: public pages render directly,
//! admin pages need a valid session and otherwise redirect to the login page.

use adapters::SessionStore;

use super::routes::AdminRoute;
use super::service::SessionManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(AdminRoute),
    Redirect(String),
}

pub struct RouteGuard;

impl RouteGuard {
    pub fn enter<P, F>(manager: &mut SessionManager<P, F>, route: AdminRoute) -> Navigation
    where
        P: SessionStore,
        F: SessionStore,
    {
        if route == AdminRoute::Login {
            // An operator who is already signed in goes straight to the dashboard.
            return if manager.is_authenticated().is_auth {
                Navigation::Redirect(AdminRoute::Dashboard.path().to_string())
            } else {
                Navigation::Render(route)
            };
        }

        if !route.is_protected() {
            return Navigation::Render(route);
        }

        let mut target = None;
        if manager.require_auth(|path| target = Some(path.to_string())) {
            Navigation::Render(route)
        } else {
            Navigation::Redirect(target.unwrap_or_else(|| AdminRoute::Login.path().to_string()))
        }
    }
}
