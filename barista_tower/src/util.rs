//! Utilities for generating HTTP responses on authorization failures

use barista_oauth2::{AuthError, PermissionRef};
use http::{header, HeaderValue, Response, StatusCode};

const BEARER: &str = "Bearer";
const INVALID_TOKEN: &str = r#"Bearer error="invalid_token""#;
const INSUFFICIENT_SCOPE: &str = r#"Bearer error="insufficient_scope""#;

/// Build a `401 Unauthorized` response with the appropriate `www-authenticate`
/// header
///
/// The description provided will be escaped to keep it header-friendly.
///
/// ```http
/// HTTP/1.1 401 Unauthorized
/// www-authenticate: Bearer error="invalid_token" error_description="{description}"
/// ```
///
/// `error_description` is omitted if `description` is empty.
pub fn unauthorized<Body: Default>(description: &str) -> Response<Body> {
    let mut resp = Response::new(Body::default());
    *resp.status_mut() = StatusCode::UNAUTHORIZED;
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, invalid_token(description));
    resp
}

/// Build a `403 Forbidden` response with the appropriate `www-authenticate`
/// header
///
/// ```http
/// HTTP/1.1 403 Forbidden
/// www-authenticate: Bearer error="insufficient_scope" error_description="{description}" scope="{permission}"
/// ```
///
/// `error_description` is omitted if `description` is empty, and `scope` if
/// no permission is given.
pub fn forbidden<Body: Default>(
    description: &str,
    permission: Option<&PermissionRef>,
) -> Response<Body> {
    let mut resp = Response::new(Body::default());
    *resp.status_mut() = StatusCode::FORBIDDEN;
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        insufficient_scope(description, permission),
    );
    resp
}

/// The challenge matching `error`, with `body`
///
/// `insufficient_scope` failures are answered with a `403` naming
/// `required`; everything else with a `401`. A request without credentials
/// gets a bare `Bearer` challenge carrying no error code (RFC 6750 §3.1).
pub fn challenge<Body>(error: &AuthError, required: &PermissionRef, body: Body) -> Response<Body> {
    let value = if error.is_insufficient_scope() {
        insufficient_scope("", Some(required))
    } else if error.is_missing_credentials() {
        HeaderValue::from_static(BEARER)
    } else {
        invalid_token("")
    };

    let mut resp = Response::new(body);
    *resp.status_mut() = error.status_code();
    resp.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    resp
}

fn invalid_token(description: &str) -> HeaderValue {
    if description.is_empty() {
        HeaderValue::from_static(INVALID_TOKEN)
    } else {
        HeaderValue::try_from(format!(
            r#"{INVALID_TOKEN} error_description="{}""#,
            description.escape_default()
        ))
        .unwrap_or_else(|_| HeaderValue::from_static(INVALID_TOKEN))
    }
}

// A permission is printable ASCII without `\` or `"`, so it never needs
// escaping inside the quoted `scope` parameter.
fn insufficient_scope(description: &str, permission: Option<&PermissionRef>) -> HeaderValue {
    let mut value = String::from(INSUFFICIENT_SCOPE);
    if !description.is_empty() {
        value.push_str(&format!(
            r#" error_description="{}""#,
            description.escape_default()
        ));
    }
    if let Some(permission) = permission {
        value.push_str(&format!(r#" scope="{permission}""#));
    }

    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static(INSUFFICIENT_SCOPE))
}
