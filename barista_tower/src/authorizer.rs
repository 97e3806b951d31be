use std::fmt;

use barista_oauth2::{Authority, Permission};
use tower_http::auth::{AsyncRequireAuthorization, AsyncRequireAuthorizationLayer};
use tower_layer::Layer;

use crate::{JsonErrorHandler, OnAuthError, TerseErrorHandler, VerifyPermission};

/// Builder for layers that verify a bearer token and require a permission
///
/// The error handler decides how refusals are rendered; attach one with
/// [`with_json_error_handler()`][Self::with_json_error_handler],
/// [`with_terse_error_handler()`][Self::with_terse_error_handler] or
/// [`with_error_handler()`][Self::with_error_handler] before building
/// layers.
pub struct Authorizer<OnError> {
    authority: Authority,
    on_error: OnError,
}

impl<OnError> Clone for Authorizer<OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for Authorizer<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("authority", &self.authority)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl Authorizer<()> {
    /// Constructs an authorizer backed by `authority`
    #[inline]
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            on_error: (),
        }
    }

    /// Attaches a custom error handler to generate responses
    /// in the event of a verification failure
    #[inline]
    pub fn with_error_handler<OnError>(self, on_error: OnError) -> Authorizer<OnError> {
        Authorizer {
            authority: self.authority,
            on_error,
        }
    }

    /// Attaches the [`JsonErrorHandler`]
    #[inline]
    pub fn with_json_error_handler<ResBody: From<String>>(
        self,
    ) -> Authorizer<JsonErrorHandler<ResBody>> {
        self.with_error_handler(JsonErrorHandler::new())
    }

    /// Attaches the [`TerseErrorHandler`]
    ///
    /// Responses carry the status code and challenge with an empty body.
    #[inline]
    pub fn with_terse_error_handler<ResBody: Default>(
        self,
    ) -> Authorizer<TerseErrorHandler<ResBody>> {
        self.with_error_handler(TerseErrorHandler::new())
    }
}

impl<OnError> Authorizer<OnError> {
    /// The authority verifying tokens
    #[inline]
    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

impl<OnError> Authorizer<OnError>
where
    OnError: OnAuthError + Clone,
{
    /// The request authorizer for `permission`
    pub fn verifier(&self, permission: Permission) -> VerifyPermission<OnError> {
        VerifyPermission::new(self.authority.clone(), permission, self.on_error.clone())
    }

    /// A layer admitting only requests whose token grants `permission`
    ///
    /// The verified [`Claims`][barista_oauth2::Claims] are made available
    /// through [`Request::extensions`][http::Request::extensions].
    pub fn require(
        &self,
        permission: Permission,
    ) -> AsyncRequireAuthorizationLayer<VerifyPermission<OnError>> {
        AsyncRequireAuthorizationLayer::new(self.verifier(permission))
    }

    /// Wraps `inner` so that it is called only for requests whose token
    /// grants `permission`
    pub fn wrap<S>(
        &self,
        permission: Permission,
        inner: S,
    ) -> AsyncRequireAuthorization<S, VerifyPermission<OnError>> {
        self.require(permission).layer(inner)
    }
}
