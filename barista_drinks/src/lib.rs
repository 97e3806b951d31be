//! A drinks menu API guarded by bearer tokens
//!
//! Anyone may read the short menu. The detailed menu and every change to it
//! require a token from the configured issuer that grants the matching
//! permission:
//!
//! | route                | permission          |
//! |----------------------|---------------------|
//! | `GET /drinks`        | none                |
//! | `GET /drinks-detail` | `get:drinks-detail` |
//! | `POST /drinks`       | `post:drinks`       |
//! | `PATCH /drinks/:id`  | `patch:drinks`      |
//! | `DELETE /drinks/:id` | `delete:drinks`     |
//!
//! Failures are reported as `{"success": false, "error": <status>, "message": ...}`.

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

pub mod config;
mod error;
mod routes;
pub mod store;

pub use config::Config;
pub use error::ApiError;
pub use routes::app;
pub use store::DrinkStore;
