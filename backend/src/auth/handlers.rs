//! Handler functions for authentication-related commands.
//!
//! These functions take the parsed command input, call the session manager,
//! and print the result for the operator. Output goes to any `Write` so the
//! binary can use stdout and tests can use a buffer.

use std::io::{BufRead, Write};

use adapters::SessionStore;

use super::middleware::{Navigation, RouteGuard};
use super::models::{format_login_time, AuthStatus, LoginOutcome};
use super::routes::AdminRoute;
use super::service::SessionManager;
use crate::errors::AppError;

/// Reads a password line verbatim: only the line ending is dropped, so
/// surrounding spaces stay part of the password.
pub fn read_password<R: BufRead>(mut input: R) -> Result<String, AppError> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}

pub fn login<P, F, W>(
    manager: &mut SessionManager<P, F>,
    email: &str,
    password: &str,
    out: &mut W,
) -> Result<bool, AppError>
where
    P: SessionStore,
    F: SessionStore,
    W: Write,
{
    match manager.login(email, password) {
        LoginOutcome::Success { user, .. } => {
            writeln!(out, "Logged in as {} <{}> ({})", user.name, user.email, user.role)?;
            Ok(true)
        }
        LoginOutcome::Failure { error, .. } => {
            writeln!(out, "Login failed: {error}")?;
            Ok(false)
        }
    }
}

pub fn logout<P, F, W>(manager: &mut SessionManager<P, F>, out: &mut W) -> Result<(), AppError>
where
    P: SessionStore,
    F: SessionStore,
    W: Write,
{
    manager.logout();
    writeln!(out, "Logged out")?;
    Ok(())
}

pub fn status<P, F, W>(
    manager: &mut SessionManager<P, F>,
    json: bool,
    out: &mut W,
) -> Result<AuthStatus, AppError>
where
    P: SessionStore,
    F: SessionStore,
    W: Write,
{
    let status = manager.is_authenticated();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
        return Ok(status);
    }

    match &status.user {
        Some(user) => {
            let expires = user.login_time + manager.settings().ttl;
            writeln!(out, "Authenticated as {} <{}> ({})", user.name, user.email, user.role)?;
            writeln!(out, "  session stamped {}", format_login_time(user.login_time))?;
            writeln!(out, "  expires after   {}", format_login_time(expires))?;
        }
        None => writeln!(out, "Not authenticated")?,
    }
    Ok(status)
}

/// Runs the route guard for `path` and reports where the operator ends up.
pub fn open<P, F, W>(
    manager: &mut SessionManager<P, F>,
    path: &str,
    out: &mut W,
) -> Result<Option<Navigation>, AppError>
where
    P: SessionStore,
    F: SessionStore,
    W: Write,
{
    let Some(route) = AdminRoute::from_path(path) else {
        writeln!(out, "No page at {path}")?;
        return Ok(None);
    };

    let navigation = RouteGuard::enter(manager, route);
    match &navigation {
        Navigation::Render(route) => writeln!(out, "Rendering {route}")?,
        Navigation::Redirect(target) => writeln!(out, "Redirecting to {target}")?,
    }
    Ok(Some(navigation))
}
