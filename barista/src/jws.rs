//! Signature traits from the JSON Web Signature (JWS) standard
//!
//! The specifications for this standard can be found in [RFC7515][].
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::error::Error as StdError;

/// A type that can verify signatures
pub trait Verifier {
    /// The algorithm family this verifier understands
    type Algorithm;

    /// The error raised when verification fails
    type Error: StdError + Send + Sync + 'static;

    /// Whether this verifier could possibly accept a signature made with
    /// `alg`
    fn can_verify(&self, alg: Self::Algorithm) -> bool;

    /// Checks that `signature` was produced over `data` with `alg` by the
    /// holder of the matching private key
    ///
    /// # Errors
    ///
    /// The algorithm is incompatible with this verifier, or the signature
    /// does not match.
    fn verify(&self, alg: Self::Algorithm, data: &[u8], signature: &[u8])
        -> Result<(), Self::Error>;
}

impl<T: Verifier + ?Sized> Verifier for &T {
    type Algorithm = T::Algorithm;
    type Error = T::Error;

    #[inline]
    fn can_verify(&self, alg: Self::Algorithm) -> bool {
        T::can_verify(self, alg)
    }

    #[inline]
    fn verify(
        &self,
        alg: Self::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), Self::Error> {
        T::verify(self, alg, data, signature)
    }
}

/// A type that can produce signatures
#[cfg(feature = "private-keys")]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
pub trait Signer {
    /// The algorithm family this signer understands
    type Algorithm;

    /// The error raised when signing fails
    type Error: StdError + Send + Sync + 'static;

    /// Whether this signer can produce signatures with `alg`
    fn can_sign(&self, alg: Self::Algorithm) -> bool;

    /// Signs `data` with `alg`
    ///
    /// # Errors
    ///
    /// The algorithm is incompatible with this signer, or the
    /// cryptography backend failed.
    fn sign(&self, alg: Self::Algorithm, data: &[u8]) -> Result<Vec<u8>, Self::Error>;
}
