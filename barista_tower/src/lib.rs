//! Tower middleware that admits a request only when its bearer token grants
//! a required permission
//!
//! An [`Authorizer`] wraps a [`barista_oauth2::Authority`] and an error
//! responder. Each call to [`Authorizer::require()`] yields a layer for one
//! permission; [`Authorizer::wrap()`] applies it to a service directly.
//!
//! ```
//! use axum::{routing::get, Extension, Router};
//! use barista::{jwa, jwt, Jwks};
//! use barista_oauth2::{Authority, Claims, KeyProvider, Permission};
//! use barista_tower::Authorizer;
//!
//! let validator = jwt::CoreValidator::default()
//!     .add_approved_algorithm(jwa::Algorithm::RS256)
//!     .add_allowed_audience(jwt::Audience::from_static("drinks"))
//!     .require_issuer(jwt::Issuer::from_static("https://barista.eu.auth0.com/"));
//!
//! // Usually `KeyProvider::from_url`, pointed at the issuer's JWKS
//! let authority = Authority::new(KeyProvider::from_jwks(Jwks::default()), validator);
//!
//! let authorizer = Authorizer::new(authority).with_json_error_handler::<axum::body::Body>();
//!
//! let app: Router = Router::new().route(
//!     "/drinks-detail",
//!     get(drinks_detail).route_layer(authorizer.require(Permission::from_static("get:drinks-detail"))),
//! );
//!
//! async fn drinks_detail(Extension(claims): Extension<Claims>) -> String {
//!     format!("{claims:?}")
//! }
//! ```
//!
//! On success the verified [`Claims`][barista_oauth2::Claims] are available
//! from the request extensions. On failure the inner service is never
//! called; the configured [`OnAuthError`] responder answers instead.

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

use std::{fmt, marker::PhantomData};

use barista_oauth2::{AuthError, PermissionRef};
use http::{header, HeaderValue, Response};
use serde::Serialize;

mod authorizer;
pub mod util;
mod verify;

pub use authorizer::Authorizer;
pub use verify::{OnAuthError, VerifyPermission};

/// Responds with the status, a `www-authenticate` challenge and an empty
/// body
pub struct TerseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

/// Responds with the status, a `www-authenticate` challenge and a JSON body
///
/// ```json
/// {"success": false, "error": 401, "code": "token_expired", "message": "Token expired."}
/// ```
///
/// `code` is the [public code][AuthError::public_code], so key lookup and
/// provider failures are not told apart.
pub struct JsonErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

macro_rules! marker_impls {
    ($($ty:ident)*) => {
        $(
            impl<ResBody> $ty<ResBody> {
                /// Instantiates a new instance over a given body type
                #[inline]
                pub fn new() -> Self {
                    Self { _ty: PhantomData }
                }
            }

            impl<ResBody> fmt::Debug for $ty<ResBody> {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str(stringify!($ty))
                }
            }

            impl<ResBody> Default for $ty<ResBody> {
                #[inline]
                fn default() -> Self {
                    Self::new()
                }
            }

            impl<ResBody> Clone for $ty<ResBody> {
                #[inline]
                fn clone(&self) -> Self {
                    Self::new()
                }
            }

            impl<ResBody> Copy for $ty<ResBody> {}
        )*
    }
}

marker_impls!(TerseErrorHandler JsonErrorHandler);

impl<ResBody> OnAuthError for TerseErrorHandler<ResBody>
where
    ResBody: Default,
{
    type Body = ResBody;

    fn on_auth_error(&self, error: &AuthError, required: &PermissionRef) -> Response<Self::Body> {
        util::challenge(error, required, ResBody::default())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: u16,
    code: &'a str,
    message: &'a str,
}

impl<ResBody> OnAuthError for JsonErrorHandler<ResBody>
where
    ResBody: From<String>,
{
    type Body = ResBody;

    fn on_auth_error(&self, error: &AuthError, required: &PermissionRef) -> Response<Self::Body> {
        let status = error.status_code();
        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            code: error.public_code(),
            message: error.message(),
        };

        // only static strings and integers; serialization cannot fail
        let json = serde_json::to_string(&body).unwrap_or_default();

        let mut resp = util::challenge(error, required, ResBody::from(json));
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        resp
    }
}
