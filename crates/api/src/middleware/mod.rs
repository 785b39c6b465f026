//! Authentication extractor.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//!
//! Note-level checks do not live here: they run inside the workflow
//! functions through `naoty_core::access`.

pub mod auth;
