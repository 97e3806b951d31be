use barista::{error as jose, jwk};
use http::StatusCode;
use thiserror::Error;

use crate::Permission;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failure to fetch or decode the issuer's key set
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or its body could not be read
    #[error("error requesting JWKS")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with something other than success
    #[error("JWKS endpoint responded with status {0}")]
    Status(reqwest::StatusCode),

    /// The body is not a JSON Web Key Set
    #[error("error decoding JWKS")]
    Decode(#[from] serde_json::Error),

    /// The previous fetch failed and the next is held back by the cooldown
    #[error("JWKS fetch failed recently; next attempt allowed in {retry_in:?}")]
    RecentlyFailed {
        /// Time left until another fetch may be attempted
        retry_in: std::time::Duration,
    },
}

/// Why a request was refused
///
/// The [`Display`][std::fmt::Display] output and the error sources are meant
/// for logs. What may be shown to a client is limited to
/// [`status_code()`][Self::status_code], [`public_code()`][Self::public_code]
/// and [`message()`][Self::message].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The request carries no credentials at all
    ///
    /// Reported with the `invalid_header` code.
    #[error("no authorization header")]
    MissingCredentials,

    /// The header or the token's shape is unacceptable
    #[error("invalid header: {reason}")]
    InvalidHeader {
        /// Client-safe description
        reason: &'static str,
        /// Underlying parse or key error
        #[source]
        source: Option<BoxError>,
    },

    /// The signature does not match the token
    #[error("invalid signature")]
    InvalidSignature {
        /// Underlying verification error
        #[source]
        source: jose::JwkVerifyError,
    },

    /// The token's `exp` is in the past
    #[error("token expired")]
    TokenExpired,

    /// The claims are missing, undecodable, or not meant for this service
    #[error("invalid claims: {reason}")]
    InvalidClaims {
        /// Client-safe description
        reason: &'static str,
        /// Underlying decode or validation error
        #[source]
        source: Option<BoxError>,
    },

    /// The token is valid but does not carry the required permission
    #[error("permission `{required}` not granted")]
    InsufficientScope {
        /// The permission that was required
        required: Permission,
    },

    /// No key in the current set carries the token's `kid`
    #[error("no signing key with id `{kid}`")]
    KeyNotFound {
        /// The key id named by the token
        kid: jwk::KeyId,
    },

    /// The key set could not be fetched
    #[error("key provider unreachable")]
    ProviderUnreachable(#[source] FetchError),
}

impl AuthError {
    /// A header failure with a client-safe `reason`
    pub fn invalid_header(reason: &'static str) -> Self {
        Self::InvalidHeader {
            reason,
            source: None,
        }
    }

    /// A header failure with a client-safe `reason`, caused by `source`
    pub fn invalid_header_from(reason: &'static str, source: impl Into<BoxError>) -> Self {
        Self::InvalidHeader {
            reason,
            source: Some(source.into()),
        }
    }

    /// A claims failure with a client-safe `reason`
    pub fn invalid_claims(reason: &'static str) -> Self {
        Self::InvalidClaims {
            reason,
            source: None,
        }
    }

    /// A claims failure with a client-safe `reason`, caused by `source`
    pub fn invalid_claims_from(reason: &'static str, source: impl Into<BoxError>) -> Self {
        Self::InvalidClaims {
            reason,
            source: Some(source.into()),
        }
    }

    /// The machine-readable code for this failure
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials | Self::InvalidHeader { .. } => "invalid_header",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims { .. } => "invalid_claims",
            Self::InsufficientScope { .. } => "insufficient_scope",
            Self::KeyNotFound { .. } => "key_not_found",
            Self::ProviderUnreachable(_) => "provider_unreachable",
        }
    }

    /// The code that may be shown to clients
    ///
    /// Key lookups and provider outages are indistinguishable from the
    /// outside; both report `unauthorized`.
    #[must_use]
    pub fn public_code(&self) -> &'static str {
        match self {
            Self::KeyNotFound { .. } | Self::ProviderUnreachable(_) => "unauthorized",
            _ => self.code(),
        }
    }

    /// A short, client-safe description
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Authorization header is expected.",
            Self::InvalidHeader { reason, .. } | Self::InvalidClaims { reason, .. } => *reason,
            Self::InvalidSignature { .. } => "Token signature is invalid.",
            Self::TokenExpired => "Token expired.",
            Self::InsufficientScope { .. } => "Permission not found.",
            Self::KeyNotFound { .. } | Self::ProviderUnreachable(_) => "Unable to verify token.",
        }
    }

    /// The HTTP status this failure maps to
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InsufficientScope { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether the request did not attempt to authenticate at all
    #[must_use]
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingCredentials)
    }

    /// Whether the token itself was acceptable but lacked a permission
    #[must_use]
    pub fn is_insufficient_scope(&self) -> bool {
        matches!(self, Self::InsufficientScope { .. })
    }
}

impl From<jose::JwtVerifyError> for AuthError {
    fn from(err: jose::JwtVerifyError) -> Self {
        use jose::{ClaimsRejected, JwtVerifyError as E};

        const UNPARSEABLE: &str = "Unable to parse authentication token.";

        match err {
            E::MalformedToken(e) => Self::invalid_header_from(UNPARSEABLE, e),
            E::MalformedTokenHeader(e) => Self::invalid_header_from(UNPARSEABLE, e),
            E::MalformedTokenSignature(e) => Self::invalid_header_from(UNPARSEABLE, e),
            E::MalformedTokenPayload(e) => {
                Self::invalid_claims_from("Unable to parse token claims.", e)
            }
            E::JwkVerifyError(e) if e.is_signature_mismatch() => {
                Self::InvalidSignature { source: e }
            }
            E::JwkVerifyError(e) => {
                Self::invalid_header_from("Signing key cannot verify this token.", e)
            }
            E::ClaimsRejected(ClaimsRejected::TokenExpired) => Self::TokenExpired,
            E::ClaimsRejected(c @ ClaimsRejected::InvalidAlgorithm) => {
                Self::invalid_header_from("Token algorithm is not accepted.", c)
            }
            E::ClaimsRejected(c @ ClaimsRejected::TokenNotYetValid) => {
                Self::invalid_claims_from("Token is not yet valid.", c)
            }
            E::ClaimsRejected(c @ ClaimsRejected::MissingRequiredClaim(_)) => {
                Self::invalid_claims_from("Token is missing a required claim.", c)
            }
            E::ClaimsRejected(c) => Self::invalid_claims_from(
                "Incorrect claims. Please check the audience and issuer.",
                c,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn only_missing_permission_is_forbidden() {
        let forbidden = AuthError::InsufficientScope {
            required: Permission::from_static("post:drinks"),
        };
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(forbidden.code(), "insufficient_scope");

        let unauthorized = [
            AuthError::invalid_header("x"),
            AuthError::TokenExpired,
            AuthError::invalid_claims("x"),
            AuthError::KeyNotFound {
                kid: jwk::KeyId::from_static("k1"),
            },
        ];
        for err in unauthorized {
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED, "{err}");
        }
    }

    #[test]
    fn key_miss_is_presented_as_unauthorized() {
        let err = AuthError::KeyNotFound {
            kid: jwk::KeyId::from_static("k1"),
        };
        assert_eq!(err.code(), "key_not_found");
        assert_eq!(err.public_code(), "unauthorized");
        assert_eq!(err.message(), "Unable to verify token.");
    }

    #[test]
    fn missing_credentials_report_as_header_failure() {
        let err = AuthError::MissingCredentials;
        assert_eq!(err.code(), "invalid_header");
        assert_eq!(err.message(), "Authorization header is expected.");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(err.is_missing_credentials());
        assert!(!AuthError::invalid_header("x").is_missing_credentials());
    }

    #[test]
    fn public_code_matches_code_for_token_failures() {
        let err = AuthError::TokenExpired;
        assert_eq!(err.public_code(), err.code());
    }

    #[test]
    fn expired_claims_become_token_expired() {
        let err = AuthError::from(jose::JwtVerifyError::from(
            jose::ClaimsRejected::TokenExpired,
        ));
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn unapproved_algorithm_is_a_header_failure() {
        let err = AuthError::from(jose::JwtVerifyError::from(
            jose::ClaimsRejected::InvalidAlgorithm,
        ));
        assert_eq!(err.code(), "invalid_header");
        assert!(err.source().is_some());
    }

    #[test]
    fn audience_and_issuer_failures_share_a_message() {
        let aud = AuthError::from(jose::JwtVerifyError::from(
            jose::ClaimsRejected::InvalidAudience,
        ));
        let iss = AuthError::from(jose::JwtVerifyError::from(
            jose::ClaimsRejected::InvalidIssuer,
        ));
        assert_eq!(aud.code(), "invalid_claims");
        assert_eq!(aud.message(), iss.message());
    }
}
