//! Error types raised while parsing keys and tokens or checking signatures

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The token names an algorithm that the key cannot service
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key cannot be used with algorithm '{alg}'")]
pub struct IncompatibleAlgorithm {
    alg: crate::jwa::Algorithm,
}

impl IncompatibleAlgorithm {
    /// The algorithm that was requested
    #[must_use]
    pub fn algorithm(&self) -> crate::jwa::Algorithm {
        self.alg
    }
}

#[inline]
pub(crate) fn incompatible_algorithm(
    alg: impl Into<crate::jwa::Algorithm>,
) -> IncompatibleAlgorithm {
    IncompatibleAlgorithm { alg: alg.into() }
}

/// The algorithm name is not one of the supported asymmetric signature algorithms
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("'{alg}' is not a supported signature algorithm")]
pub struct UnknownAlgorithm {
    alg: String,
}

#[inline]
pub(crate) fn unknown_algorithm(alg: impl Into<String>) -> UnknownAlgorithm {
    UnknownAlgorithm { alg: alg.into() }
}

/// The key is restricted to a use other than signature verification
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("key is not intended for signatures")]
pub struct JwkUsageMismatch {
    _p: (),
}

pub(crate) const fn jwk_usage_mismatch() -> JwkUsageMismatch {
    JwkUsageMismatch { _p: () }
}

/// The token does not split into exactly three dot-separated segments
#[derive(Clone, Copy, Debug, Error)]
#[error("token is not made of three dot-separated segments")]
pub struct MalformedJwt {
    _p: (),
}

pub(crate) fn malformed_jwt() -> MalformedJwt {
    MalformedJwt { _p: () }
}

/// The header segment is not base64url-encoded JSON describing the token
#[derive(Debug, Error)]
#[error("malformed token header")]
pub struct MalformedJwtHeader {
    #[from]
    source: BoxError,
}

pub(crate) fn malformed_jwt_header(source: impl Into<BoxError>) -> MalformedJwtHeader {
    MalformedJwtHeader {
        source: source.into(),
    }
}

/// The payload segment is not base64url-encoded JSON claims
#[derive(Debug, Error)]
#[error("malformed token payload")]
pub struct MalformedJwtPayload {
    #[from]
    source: BoxError,
}

pub(crate) fn malformed_jwt_payload(source: impl Into<BoxError>) -> MalformedJwtPayload {
    MalformedJwtPayload {
        source: source.into(),
    }
}

/// The signature segment is not valid base64url
#[derive(Debug, Error)]
#[error("malformed token signature")]
pub struct MalformedJwtSignature {
    #[from]
    source: BoxError,
}

pub(crate) fn malformed_jwt_signature(source: impl Into<BoxError>) -> MalformedJwtSignature {
    MalformedJwtSignature {
        source: source.into(),
    }
}

/// The signature was not produced by the key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch {
    _p: (),
}

pub(crate) const fn signature_mismatch() -> SignatureMismatch {
    SignatureMismatch { _p: () }
}

/// The key material is unusable
#[derive(Debug, Error)]
#[error("key rejected")]
pub struct KeyRejected {
    #[from]
    source: BoxError,
}

pub(crate) fn key_rejected(source: impl Into<BoxError>) -> KeyRejected {
    KeyRejected {
        source: source.into(),
    }
}

/// Unexpected failure inside the cryptography backend
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: BoxError,
}

pub(crate) fn unexpected(source: impl Into<BoxError>) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// An error occurring while creating a signature
#[cfg(feature = "private-keys")]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key cannot produce signatures for the requested algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// An unexpected error
    #[error(transparent)]
    Unexpected(#[from] Unexpected),
}

/// An error occurring while verifying a signature with a JWK
#[derive(Debug, Error)]
pub enum JwkVerifyError {
    /// The key cannot verify tokens signed with this algorithm
    #[error(transparent)]
    IncompatibleAlgorithm(#[from] IncompatibleAlgorithm),

    /// The key cannot be used for signature verification
    #[error(transparent)]
    JwkUsageMismatch(#[from] JwkUsageMismatch),

    /// The signature is invalid
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatch),
}

impl JwkVerifyError {
    /// Whether the key and the token disagree on the algorithm
    #[must_use]
    pub fn is_incompatible_alg(&self) -> bool {
        matches!(self, Self::IncompatibleAlgorithm(_))
    }

    /// Whether the key is reserved for another use
    #[must_use]
    pub fn is_usage_mismatch(&self) -> bool {
        matches!(self, Self::JwkUsageMismatch(_))
    }

    /// Whether the signature itself failed to verify
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }
}

/// An error occurring while verifying a JWT
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The JWT was rejected by the JWK
    #[error("token rejected by JWK")]
    JwkVerifyError(#[from] JwkVerifyError),

    /// The JWT does not have a discernible header, payload, and signature
    #[error(transparent)]
    MalformedToken(#[from] MalformedJwt),

    /// The JWT header is malformed
    #[error(transparent)]
    MalformedTokenHeader(#[from] MalformedJwtHeader),

    /// The JWT payload is malformed
    #[error(transparent)]
    MalformedTokenPayload(#[from] MalformedJwtPayload),

    /// The JWT signature is malformed
    #[error(transparent)]
    MalformedTokenSignature(#[from] MalformedJwtSignature),

    /// The JWT was rejected by the claims validator
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

/// An error occurring while assembling and signing a JWT
#[cfg(feature = "private-keys")]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
#[derive(Debug, Error)]
pub enum JwtSigningError {
    /// The key refused to sign
    #[error(transparent)]
    SigningError(#[from] SigningError),

    /// The header could not be serialized
    #[error(transparent)]
    MalformedJwtHeader(#[from] MalformedJwtHeader),

    /// The payload could not be serialized
    #[error(transparent)]
    MalformedJwtPayload(#[from] MalformedJwtPayload),
}

/// An error occurring when validating the header and claims of a JWT
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ClaimsRejected {
    /// The token algorithm is not on the approved list
    #[error("algorithm not approved")]
    InvalidAlgorithm,

    /// None of the token audiences are acceptable
    #[error("invalid audience")]
    InvalidAudience,

    /// The token issuer is not acceptable
    #[error("invalid issuer")]
    InvalidIssuer,

    /// The token is expired according to the `exp` claim
    #[error("token expired")]
    TokenExpired,

    /// The token is not yet valid according to the `nbf` claim
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// A required claim is missing
    #[error("required {0} claim missing")]
    MissingRequiredClaim(&'static str),
}
