//! Kayease admin back office: operator session management.
//!
//! The crate wires the `adapters` storage backends into the session manager,
//! guards the admin pages, and exposes the pieces the `kayease-admin` binary
//! drives from the command line.

pub mod auth;
pub mod config;
pub mod errors;
pub mod services;
