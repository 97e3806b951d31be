use std::{fmt, future::Future, pin::Pin};

use barista::Jwt;
use barista_oauth2::{AuthError, Authority, Permission, PermissionRef};
use http::{header, HeaderMap, Request, Response};
use tower_http::auth::AsyncAuthorizeRequest;

/// Handler for responding to authentication and authorization failures
pub trait OnAuthError {
    /// The body type returned on an error
    type Body;

    /// Response when a request is refused for `error` while `required` was
    /// being enforced
    fn on_auth_error(&self, error: &AuthError, required: &PermissionRef) -> Response<Self::Body>;
}

macro_rules! delegate_impls {
    ($($ty:ty)*) => {
        $(
            impl<T> OnAuthError for $ty
            where
                T: OnAuthError + ?Sized,
            {
                type Body = T::Body;

                fn on_auth_error(
                    &self,
                    error: &AuthError,
                    required: &PermissionRef,
                ) -> Response<Self::Body> {
                    T::on_auth_error(self, error, required)
                }
            }
        )*
    }
}

delegate_impls!(
    &'_ T
    Box<T>
    std::sync::Arc<T>
);

/// Verifies the bearer token of a request and requires one permission
///
/// Implements [`AsyncAuthorizeRequest`], so it slots into
/// [`AsyncRequireAuthorizationLayer`][tower_http::auth::AsyncRequireAuthorizationLayer].
/// Usually obtained from [`Authorizer`][crate::Authorizer].
pub struct VerifyPermission<OnError> {
    authority: Authority,
    permission: Permission,
    on_error: OnError,
}

impl<OnError> VerifyPermission<OnError> {
    /// Constructs a verifier requiring `permission`
    #[inline]
    pub fn new(authority: Authority, permission: Permission, on_error: OnError) -> Self {
        Self {
            authority,
            permission,
            on_error,
        }
    }

    /// The permission this verifier requires
    #[inline]
    pub fn permission(&self) -> &PermissionRef {
        &self.permission
    }
}

impl<OnError> Clone for VerifyPermission<OnError>
where
    OnError: Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            permission: self.permission.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for VerifyPermission<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifyPermission")
            .field("authority", &self.authority)
            .field("permission", &self.permission)
            .field("on_error", &self.on_error)
            .finish()
    }
}

type AuthorizeFuture<ReqBody, ResBody> =
    Pin<Box<dyn Future<Output = Result<Request<ReqBody>, Response<ResBody>>> + Send + 'static>>;

impl<ReqBody, OnError> AsyncAuthorizeRequest<ReqBody> for VerifyPermission<OnError>
where
    ReqBody: Send + 'static,
    OnError: OnAuthError + Clone + Send + 'static,
{
    type RequestBody = ReqBody;
    type ResponseBody = OnError::Body;
    type Future = AuthorizeFuture<ReqBody, OnError::Body>;

    fn authorize(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let authority = self.authority.clone();
        let permission = self.permission.clone();
        let on_error = self.on_error.clone();

        Box::pin(async move {
            let verified = match extract_bearer(request.headers()) {
                Ok(token) => authority.verify_token(&token, &permission).await,
                Err(err) => Err(err),
            };

            match verified {
                Ok(claims) => {
                    tracing::trace!(%permission, "request authorized");
                    request.extensions_mut().insert(claims);
                    Ok(request)
                }
                Err(err) => {
                    tracing::debug!(
                        %permission,
                        code = err.code(),
                        http.status_code = err.status_code().as_u16(),
                        "request refused"
                    );
                    Err(on_error.on_auth_error(&err, &permission))
                }
            }
        })
    }
}

/// Reads the token from a single `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively and must be followed by exactly
/// one space and a non-empty token that contains no further spaces.
pub(crate) fn extract_bearer(headers: &HeaderMap) -> Result<Jwt, AuthError> {
    let mut values = headers.get_all(header::AUTHORIZATION).iter();

    let value = values.next().ok_or(AuthError::MissingCredentials)?;
    if values.next().is_some() {
        return Err(AuthError::invalid_header(
            "Authorization header must be a bearer token.",
        ));
    }

    let value = value
        .to_str()
        .map_err(|_| AuthError::invalid_header("Authorization header must be a bearer token."))?;

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::invalid_header(
            "Authorization header must start with \"Bearer\".",
        ));
    }
    if token.is_empty() {
        return Err(AuthError::invalid_header("Token not found."));
    }
    if token.contains(' ') {
        return Err(AuthError::invalid_header(
            "Authorization header must be a bearer token.",
        ));
    }

    Ok(Jwt::new(token.to_owned()))
}
