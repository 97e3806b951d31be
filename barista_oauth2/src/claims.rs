use barista::{
    clock::UnixTime,
    jwt::{self, Audiences, CoreClaims},
};
use serde::{Deserialize, Serialize};

use crate::{HasPermissions, Permissions};

/// The claims of a verified access token
///
/// Alongside the registered claims, this carries the Auth0-style
/// `permissions` array (absent when the issuer did not include it) and the
/// `azp` and `scope` claims when present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<jwt::Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<jwt::Subject>,
    #[serde(default, skip_serializing_if = "Audiences::is_empty")]
    aud: Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    azp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    permissions: Option<Permissions>,
}

impl Claims {
    /// Empty claims
    pub const fn new() -> Self {
        Self {
            iss: None,
            sub: None,
            aud: Audiences::empty(),
            exp: None,
            iat: None,
            nbf: None,
            azp: None,
            scope: None,
            permissions: None,
        }
    }

    /// Sets `iss`
    pub fn with_issuer(mut self, iss: impl Into<jwt::Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets `sub`
    pub fn with_subject(mut self, sub: impl Into<jwt::Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets `aud` to a single audience
    pub fn with_audience(mut self, aud: impl Into<jwt::Audience>) -> Self {
        self.aud = Audiences::single(aud);
        self
    }

    /// Sets `aud` to several audiences
    pub fn with_audiences(mut self, aud: impl Into<Audiences>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets `exp`
    pub fn with_expiration(mut self, exp: UnixTime) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Sets `iat`
    pub fn with_issued_at(mut self, iat: UnixTime) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Sets `nbf`
    pub fn with_not_before(mut self, nbf: UnixTime) -> Self {
        self.nbf = Some(nbf);
        self
    }

    /// Sets `permissions`
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Issued-at time
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.iat
    }

    /// Authorized party
    #[must_use]
    pub fn azp(&self) -> Option<&str> {
        self.azp.as_deref()
    }

    /// Space-delimited OAuth2 scope, as issued
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl CoreClaims for Claims {
    fn nbf(&self) -> Option<UnixTime> {
        self.nbf
    }

    fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    fn aud(&self) -> &Audiences {
        &self.aud
    }

    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.iss.as_deref()
    }

    fn sub(&self) -> Option<&jwt::SubjectRef> {
        self.sub.as_deref()
    }
}

impl HasPermissions for Claims {
    fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }
}
