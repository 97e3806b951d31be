//! RSA public keys and the `RS*`/`PS*` signature algorithms

use std::{convert::TryFrom, fmt};

use ring::signature::{RsaParameters, RsaPublicKeyComponents};
use serde::{Deserialize, Serialize};

use crate::{b64::Base64Url, error, jwa::Algorithm, jws};

/// Smallest accepted modulus, in bytes (2048 bits)
const MIN_MODULUS_LEN: usize = 256;
/// Largest accepted modulus, in bytes (8192 bits)
const MAX_MODULUS_LEN: usize = 1024;

fn verification_params(alg: Algorithm) -> Option<&'static RsaParameters> {
    use ring::signature as sig;

    match alg {
        Algorithm::RS256 => Some(&sig::RSA_PKCS1_2048_8192_SHA256),
        Algorithm::RS384 => Some(&sig::RSA_PKCS1_2048_8192_SHA384),
        Algorithm::RS512 => Some(&sig::RSA_PKCS1_2048_8192_SHA512),
        Algorithm::PS256 => Some(&sig::RSA_PSS_2048_8192_SHA256),
        Algorithm::PS384 => Some(&sig::RSA_PSS_2048_8192_SHA384),
        Algorithm::PS512 => Some(&sig::RSA_PSS_2048_8192_SHA512),
        _ => None,
    }
}

/// An RSA public key, as published in a JWK
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto", into = "PublicKeyDto")]
pub struct PublicKey {
    modulus: Base64Url,
    exponent: Base64Url,
}

#[derive(Serialize, Deserialize)]
struct PublicKeyDto {
    n: Base64Url,
    e: Base64Url,
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_components(dto.n, dto.e)
    }
}

impl From<PublicKey> for PublicKeyDto {
    fn from(key: PublicKey) -> Self {
        Self {
            n: key.modulus,
            e: key.exponent,
        }
    }
}

fn strip_leading_zeros(value: Base64Url) -> Base64Url {
    match value.as_slice().iter().position(|&b| b != 0) {
        Some(0) | None => value,
        Some(idx) => Base64Url::from_raw(&value.as_slice()[idx..]),
    }
}

impl PublicKey {
    /// Builds a public key from its big-endian modulus and exponent
    ///
    /// # Errors
    ///
    /// The modulus is outside of the 2048 to 8192 bit range, or the
    /// exponent is empty or implausibly large.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = strip_leading_zeros(modulus.into());
        let exponent = strip_leading_zeros(exponent.into());

        if !(MIN_MODULUS_LEN..=MAX_MODULUS_LEN).contains(&modulus.len()) {
            return Err(error::key_rejected(format!(
                "RSA modulus of {} bytes is outside of the supported range",
                modulus.len()
            )));
        }

        if exponent.is_empty() || exponent.len() > 8 || exponent.as_slice() == [0] {
            return Err(error::key_rejected("RSA exponent is not usable"));
        }

        Ok(Self { modulus, exponent })
    }

    /// The modulus (`n`)
    #[must_use]
    pub fn modulus(&self) -> &Base64Url {
        &self.modulus
    }

    /// The public exponent (`e`)
    #[must_use]
    pub fn exponent(&self) -> &Base64Url {
        &self.exponent
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("rsa::PublicKey")
            .field("bits", &(self.modulus.len() * 8))
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl jws::Verifier for PublicKey {
    type Algorithm = Algorithm;
    type Error = error::JwkVerifyError;

    fn can_verify(&self, alg: Algorithm) -> bool {
        alg.is_rsa()
    }

    fn verify(&self, alg: Algorithm, data: &[u8], signature: &[u8]) -> Result<(), Self::Error> {
        let params = verification_params(alg).ok_or_else(|| error::incompatible_algorithm(alg))?;

        let components = RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        components
            .verify(params, data, signature)
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
        signature::{RsaEncoding, RsaKeyPair},
    };

    use crate::{error, jwa::Algorithm, jws};

    fn signing_params(alg: Algorithm) -> Option<&'static dyn RsaEncoding> {
        use ring::signature as sig;

        match alg {
            Algorithm::RS256 => Some(&sig::RSA_PKCS1_SHA256),
            Algorithm::RS384 => Some(&sig::RSA_PKCS1_SHA384),
            Algorithm::RS512 => Some(&sig::RSA_PKCS1_SHA512),
            Algorithm::PS256 => Some(&sig::RSA_PSS_SHA256),
            Algorithm::PS384 => Some(&sig::RSA_PSS_SHA384),
            Algorithm::PS512 => Some(&sig::RSA_PSS_SHA512),
            _ => None,
        }
    }

    /// An RSA key pair able to mint signatures
    #[derive(Clone)]
    pub struct PrivateKey {
        pair: Arc<RsaKeyPair>,
    }

    impl PrivateKey {
        /// Imports a key pair from a PKCS#8 DER document
        ///
        /// # Errors
        ///
        /// The document is not a PKCS#8 RSA private key of a usable size.
        pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, error::KeyRejected> {
            let pair = RsaKeyPair::from_pkcs8(der).map_err(|e| error::key_rejected(e.to_string()))?;
            Ok(Self {
                pair: Arc::new(pair),
            })
        }
    }

    impl fmt::Debug for PrivateKey {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("rsa::PrivateKey(<redacted>)")
        }
    }

    impl jws::Signer for PrivateKey {
        type Algorithm = Algorithm;
        type Error = error::SigningError;

        fn can_sign(&self, alg: Algorithm) -> bool {
            alg.is_rsa()
        }

        fn sign(&self, alg: Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error> {
            let params = signing_params(alg).ok_or_else(|| error::incompatible_algorithm(alg))?;

            let rng = SystemRandom::new();
            let mut signature = vec![0; self.pair.public().modulus_len()];
            self.pair
                .sign(params, &rng, data, &mut signature)
                .map_err(|e| error::unexpected(e.to_string()))?;

            Ok(signature)
        }
    }
}
