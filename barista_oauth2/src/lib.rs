//! Bearer token verification for resource servers that trust an external
//! identity provider
//!
//! The pieces, from the leaves up:
//!
//! * [`KeyProvider`] fetches the issuer's JSON Web Key Set on first use,
//!   caches it as an immutable snapshot, and refreshes it when a token names
//!   a key it has not seen (at most once per cooldown).
//! * [`Authority`] verifies a token's header, signature, and standard
//!   claims, then enforces a required permission.
//! * [`check_permission`] is the pure permission check on its own.
//!
//! Every failure is an [`AuthError`] that knows its HTTP status and the
//! code that may be shown to clients.
//!
//! # Feature flags
//!
//! `reqwest` is pulled in without a TLS backend. Enable `rustls-tls` or
//! `default-tls` if nothing else in the dependency tree picks one, or the
//! key set cannot be fetched over HTTPS.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod authority;
mod claims;
mod error;
pub mod permission;
mod provider;

pub use authority::Authority;
pub use claims::Claims;
pub use error::{AuthError, FetchError};
pub use permission::{check_permission, HasPermissions, Permission, PermissionRef, Permissions};
pub use provider::{KeyProvider, KeyProviderBuilder};
