//! Elliptic curve public keys and the `ES*` signature algorithms

use std::{convert::TryFrom, fmt};

use ring::signature::{EcdsaVerificationAlgorithm, UnparsedPublicKey};
use serde::{Deserialize, Serialize};

use crate::{b64::Base64Url, error, jwa::Algorithm, jws};

/// A named curve
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Curve {
    /// NIST P-256
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384
    #[serde(rename = "P-384")]
    P384,
}

impl Curve {
    /// The size of a single coordinate, in bytes
    #[must_use]
    pub const fn coordinate_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
        }
    }

    fn verification_algorithm(self) -> &'static EcdsaVerificationAlgorithm {
        match self {
            Self::P256 => &ring::signature::ECDSA_P256_SHA256_FIXED,
            Self::P384 => &ring::signature::ECDSA_P384_SHA384_FIXED,
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
        })
    }
}

/// An elliptic curve public key, as published in a JWK
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto", into = "PublicKeyDto")]
pub struct PublicKey {
    curve: Curve,
    x: Base64Url,
    y: Base64Url,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyDto {
    crv: Curve,
    x: Base64Url,
    y: Base64Url,
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_coordinates(dto.crv, dto.x, dto.y)
    }
}

impl From<PublicKey> for PublicKeyDto {
    fn from(key: PublicKey) -> Self {
        Self {
            crv: key.curve,
            x: key.x,
            y: key.y,
        }
    }
}

impl PublicKey {
    /// Builds a public key from the affine coordinates of its point
    ///
    /// # Errors
    ///
    /// Either coordinate does not have the length the curve requires.
    pub fn from_coordinates(
        curve: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let x = x.into();
        let y = y.into();
        let size = curve.coordinate_size();

        if x.len() != size || y.len() != size {
            return Err(error::key_rejected(format!(
                "{curve} coordinates must be {size} bytes"
            )));
        }

        Ok(Self { curve, x, y })
    }

    /// The curve this key lives on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The uncompressed SEC1 encoding of the point
    fn point(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(1 + self.x.len() + self.y.len());
        point.push(0x04);
        point.extend_from_slice(self.x.as_slice());
        point.extend_from_slice(self.y.as_slice());
        point
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Algorithm) -> bool {
        alg.curve() == Some(self.curve)
    }

    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), Self::Error> {
        if !self.can_verify(alg) {
            return Err(error::incompatible_algorithm(alg).into());
        }

        UnparsedPublicKey::new(self.curve.verification_algorithm(), self.point())
            .verify(data, signature)
            .map_err(|_| error::signature_mismatch())?;

        Ok(())
    }
}

#[cfg(feature = "private-keys")]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
pub use private::PrivateKey;

#[cfg(feature = "private-keys")]
mod private {
    use std::{fmt, sync::Arc};

    use ring::{
        rand::SystemRandom,
        signature::{EcdsaKeyPair, EcdsaSigningAlgorithm, KeyPair},
    };

    use super::{Curve, PublicKey};
    use crate::{b64::Base64Url, error, jwa::Algorithm, jws};

    fn signing_algorithm(curve: Curve) -> &'static EcdsaSigningAlgorithm {
        match curve {
            Curve::P256 => &ring::signature::ECDSA_P256_SHA256_FIXED_SIGNING,
            Curve::P384 => &ring::signature::ECDSA_P384_SHA384_FIXED_SIGNING,
        }
    }

    /// An elliptic curve key pair able to mint signatures
    #[derive(Clone)]
    pub struct PrivateKey {
        public_key: PublicKey,
        pair: Arc<EcdsaKeyPair>,
    }

    impl PrivateKey {
        /// Generates a fresh key pair on `curve`
        ///
        /// # Errors
        ///
        /// The system random number generator failed.
        pub fn generate(curve: Curve) -> Result<Self, error::Unexpected> {
            let alg = signing_algorithm(curve);
            let rng = SystemRandom::new();

            let pkcs8 = EcdsaKeyPair::generate_pkcs8(alg, &rng)
                .map_err(|e| error::unexpected(e.to_string()))?;
            let pair = EcdsaKeyPair::from_pkcs8(alg, pkcs8.as_ref(), &rng)
                .map_err(|e| error::unexpected(e.to_string()))?;

            let point = pair.public_key().as_ref();
            let size = curve.coordinate_size();
            let public_key = PublicKey::from_coordinates(
                curve,
                Base64Url::from_raw(&point[1..=size]),
                Base64Url::from_raw(&point[1 + size..]),
            )
            .map_err(error::unexpected)?;

            Ok(Self {
                public_key,
                pair: Arc::new(pair),
            })
        }

        /// The matching public key
        #[must_use]
        pub fn public_key(&self) -> &PublicKey {
            &self.public_key
        }
    }

    impl fmt::Debug for PrivateKey {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.debug_struct("ec::PrivateKey")
                .field("public_key", &self.public_key)
                .finish_non_exhaustive()
        }
    }

    impl jws::Signer for PrivateKey {
        type Algorithm = Algorithm;
        type Error = error::SigningError;

        fn can_sign(&self, alg: Algorithm) -> bool {
            alg.curve() == Some(self.public_key.curve)
        }

        fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
            if !self.can_sign(alg) {
                return Err(error::incompatible_algorithm(alg).into());
            }

            let rng = SystemRandom::new();
            let signature = self
                .pair
                .sign(&rng, data)
                .map_err(|e| error::unexpected(e.to_string()))?;

            Ok(signature.as_ref().to_vec())
        }
    }
}
