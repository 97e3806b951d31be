//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for this standard can be found in [RFC7518][].
//!
//! Only the asymmetric signature families are available:
//!
//! * [`rsa`]: `RS256`, `RS384`, `RS512`, `PS256`, `PS384`, `PS512`
//! * [`ec`]: `ES256`, `ES384`
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::{convert::TryFrom, fmt, str::FromStr};

use serde::{Deserialize, Serialize, Serializer};

use crate::error;

pub mod ec;
pub mod rsa;

/// A supported signature algorithm
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
    PS512,
    /// ECDSA using P-256 and SHA-256
    ES256,
    /// ECDSA using P-384 and SHA-384
    ES384,
}

impl Algorithm {
    /// Every supported algorithm
    pub const ALL: [Algorithm; 8] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
    ];

    /// The registered name of the algorithm
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
        }
    }

    /// The key usage this algorithm requires
    #[must_use]
    pub const fn to_usage(self) -> Usage {
        Usage::Signing
    }

    /// Whether this algorithm is verified with an RSA key
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(
            self,
            Self::RS256 | Self::RS384 | Self::RS512 | Self::PS256 | Self::PS384 | Self::PS512
        )
    }

    /// The curve required of an elliptic curve key, if this is an ECDSA algorithm
    #[must_use]
    pub const fn curve(self) -> Option<ec::Curve> {
        match self {
            Self::ES256 => Some(ec::Curve::P256),
            Self::ES384 => Some(ec::Curve::P384),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.as_str() == value)
            .ok_or_else(|| error::unknown_algorithm(value))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = error::UnknownAlgorithm;

    #[inline]
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// The intended use of a key
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Usage {
    /// Signing and signature verification
    #[serde(rename = "sig")]
    Signing,

    /// Encryption and decryption
    #[serde(rename = "enc")]
    Encryption,
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Signing => "sig",
            Self::Encryption => "enc",
        })
    }
}
