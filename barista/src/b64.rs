//! Byte buffers that travel as unpadded, URL-safe base64
//!
//! Every binary value in the JOSE family (key moduli, curve coordinates,
//! token segments, signatures) uses the same encoding. [`Base64Url`] holds
//! the decoded bytes and only pays for the encoding when it is formatted or
//! serialized.
//!
//! ```
//! use barista::b64::Base64Url;
//!
//! let data = Base64Url::from_encoded("AQAB").unwrap();
//! assert_eq!(data.as_slice(), &[1, 0, 1]);
//! assert_eq!(format!("{:?}", data), "`AQAB`");
//! ```

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The value was not valid unpadded base64url
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid base64url data")]
pub struct InvalidBase64Data {
    #[from]
    source: base64::DecodeError,
}

/// Owned bytes that are encoded as base64url without padding
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Wraps raw bytes
    pub fn from_raw(raw: impl Into<Vec<u8>>) -> Self {
        Self(raw.into())
    }

    /// Decodes an encoded value
    ///
    /// # Errors
    ///
    /// Returns an error if the data contains characters outside of the
    /// URL-safe alphabet, has trailing padding, or has an impossible length.
    pub fn from_encoded(enc: impl AsRef<[u8]>) -> Result<Self, InvalidBase64Data> {
        Ok(Self(URL_SAFE_NO_PAD.decode(enc)?))
    }

    /// The raw bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the raw bytes
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The length of the decoded value, in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of characters this value occupies when encoded
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        Self::calc_encoded_len(self.0.len())
    }

    /// The number of characters `len` raw bytes occupy when encoded
    #[must_use]
    pub const fn calc_encoded_len(len: usize) -> usize {
        (len * 4 + 2) / 3
    }

    /// Appends the encoded form of this value to `buf`
    pub fn encode_into(&self, buf: &mut String) {
        URL_SAFE_NO_PAD.encode_string(&self.0, buf);
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&'_ [u8]> for Base64Url {
    #[inline]
    fn from(buf: &[u8]) -> Self {
        Self(buf.to_vec())
    }
}

impl AsRef<[u8]> for Base64Url {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", self)
    }
}

impl Serialize for Base64Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Base64Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let enc = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::from_encoded(enc.as_bytes()).map_err(serde::de::Error::custom)
    }
}
