//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][].
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use std::convert::TryFrom;

use aliri_braid::braid;
use serde::{Deserialize, Serialize, Serializer};

use crate::{error, jwa, jws::Verifier};

/// The identifier an issuer assigns to one of its signing keys
///
/// Tokens name the key that signed them through the `kid` header, and the
/// published key set carries the same identifier on each key.
#[braid(serde, ref_doc = "A borrowed reference to a key identifier ([`KeyId`])")]
pub struct KeyId;

/// A published public key, along with the metadata that restricts its use
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "JwkDto")]
#[must_use]
pub struct Jwk {
    key_id: Option<KeyId>,
    usage: Option<jwa::Usage>,
    algorithm: Option<jwa::Algorithm>,
    key: Key,
}

impl Jwk {
    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The intended usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<jwa::Usage> {
        self.usage
    }

    /// The only algorithm this key may be used with, if restricted
    #[must_use]
    pub fn algorithm(&self) -> Option<jwa::Algorithm> {
        self.algorithm
    }

    /// The key material
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Whether the key could verify signatures made with `alg`
    ///
    /// Takes the key type, its curve, and any declared `alg` into account.
    #[must_use]
    pub fn is_compatible(&self, alg: jwa::Algorithm) -> bool {
        self.algorithm.map_or(true, |a| a == alg) && self.key.can_verify(alg)
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: impl Into<KeyId>) -> Self {
        Self {
            key_id: Some(kid.into()),
            ..self
        }
    }

    /// Sets the key's usage
    pub fn with_usage(self, usage: jwa::Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    /// Restricts the key to `alg`, along with the usage that implies
    pub fn with_algorithm(self, alg: jwa::Algorithm) -> Self {
        Self {
            algorithm: Some(alg),
            usage: Some(alg.to_usage()),
            ..self
        }
    }
}

impl From<jwa::rsa::PublicKey> for Jwk {
    fn from(key: jwa::rsa::PublicKey) -> Self {
        Key::Rsa(key).into()
    }
}

impl From<jwa::ec::PublicKey> for Jwk {
    fn from(key: jwa::ec::PublicKey) -> Self {
        Key::EllipticCurve(key).into()
    }
}

impl From<Key> for Jwk {
    fn from(key: Key) -> Self {
        Self {
            key_id: None,
            usage: None,
            algorithm: None,
            key,
        }
    }
}

impl Verifier for Jwk {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        self.is_compatible(alg)
    }

    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        if matches!(self.usage, Some(u) if u != alg.to_usage()) {
            return Err(error::jwk_usage_mismatch().into());
        }

        if matches!(self.algorithm, Some(key_alg) if key_alg != alg) {
            return Err(error::incompatible_algorithm(alg).into());
        }

        self.key.verify(alg, data, signature)
    }
}

#[derive(Deserialize)]
struct JwkDto {
    #[serde(rename = "kid", default)]
    key_id: Option<KeyId>,
    #[serde(rename = "use", default)]
    usage: Option<jwa::Usage>,
    #[serde(rename = "alg", default)]
    algorithm: Option<jwa::Algorithm>,
    #[serde(flatten)]
    key: Key,
}

impl TryFrom<JwkDto> for Jwk {
    type Error = error::IncompatibleAlgorithm;

    fn try_from(dto: JwkDto) -> Result<Self, Self::Error> {
        if let Some(alg) = dto.algorithm {
            if !dto.key.can_verify(alg) {
                return Err(error::incompatible_algorithm(alg));
            }
        }

        Ok(Self {
            key_id: dto.key_id,
            usage: dto.usage,
            algorithm: dto.algorithm,
            key: dto.key,
        })
    }
}

#[derive(Serialize)]
struct JwkDtoRef<'a> {
    #[serde(rename = "kid", skip_serializing_if = "Option::is_none")]
    key_id: Option<&'a KeyIdRef>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    usage: Option<jwa::Usage>,
    #[serde(rename = "alg", skip_serializing_if = "Option::is_none")]
    algorithm: Option<jwa::Algorithm>,
    #[serde(flatten)]
    key: &'a Key,
}

impl Serialize for Jwk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        JwkDtoRef {
            key_id: self.key_id(),
            usage: self.usage,
            algorithm: self.algorithm,
            key: &self.key,
        }
        .serialize(serializer)
    }
}

/// Public key material, discriminated by the `kty` member
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum Key {
    /// RSA
    #[serde(rename = "RSA")]
    Rsa(jwa::rsa::PublicKey),

    /// Elliptic curve
    #[serde(rename = "EC")]
    EllipticCurve(jwa::ec::PublicKey),
}

impl Verifier for Key {
    type Algorithm = jwa::Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: jwa::Algorithm) -> bool {
        match self {
            Self::Rsa(k) => k.can_verify(alg),
            Self::EllipticCurve(k) => k.can_verify(alg),
        }
    }

    fn verify(&self, alg: jwa::Algorithm, data: &[u8], signature: &[u8]) -> Result<(), Self::Error> {
        match self {
            Self::Rsa(k) => k.verify(alg, data, signature),
            Self::EllipticCurve(k) => k.verify(alg, data, signature),
        }
    }
}
