//! Defines the site's page routes and which of them need a session.
//!
//! The public marketing pages are open to everyone; every page under
//! `/admin` sits behind the login guard.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRoute {
    Home,
    Portfolio,
    Careers,
    Blog,
    Contact,
    Login,
    Dashboard,
    ManageBlogs,
    ManageCareers,
    ManagePortfolio,
    ManageClients,
    ManageContacts,
    ManageTeam,
}

impl AdminRoute {
    pub const ALL: [AdminRoute; 13] = [
        AdminRoute::Home,
        AdminRoute::Portfolio,
        AdminRoute::Careers,
        AdminRoute::Blog,
        AdminRoute::Contact,
        AdminRoute::Login,
        AdminRoute::Dashboard,
        AdminRoute::ManageBlogs,
        AdminRoute::ManageCareers,
        AdminRoute::ManagePortfolio,
        AdminRoute::ManageClients,
        AdminRoute::ManageContacts,
        AdminRoute::ManageTeam,
    ];

    pub fn path(self) -> &'static str {
        match self {
            AdminRoute::Home => "/",
            AdminRoute::Portfolio => "/portfolio",
            AdminRoute::Careers => "/careers",
            AdminRoute::Blog => "/blog",
            AdminRoute::Contact => "/contact",
            AdminRoute::Login => "/login",
            AdminRoute::Dashboard => "/admin/dashboard",
            AdminRoute::ManageBlogs => "/admin/blogs",
            AdminRoute::ManageCareers => "/admin/careers",
            AdminRoute::ManagePortfolio => "/admin/portfolio",
            AdminRoute::ManageClients => "/admin/clients",
            AdminRoute::ManageContacts => "/admin/contacts",
            AdminRoute::ManageTeam => "/admin/team",
        }
    }

    /// Resolves a request path, ignoring a trailing slash. `/admin` alone
    /// lands on the dashboard.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            "/admin" => "/admin/dashboard",
            other => other,
        };
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn is_protected(self) -> bool {
        self.path().starts_with("/admin")
    }
}

impl fmt::Display for AdminRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
