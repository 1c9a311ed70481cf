//! SSO identity core.
//!
//! Verifies user credentials, issues signed session tokens scoped to a calling
//! application, registers users and manages per-user role assignments.
//!
//! The security-relevant decisions live in [`auth::IdentityService`]. Storage,
//! configuration and the HTTP transport are collaborators wired around it.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod storage;
