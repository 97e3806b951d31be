use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{jwa, jwk, Jwk};

/// A JSON Web Key Set (JWKS)
///
/// Deserializes from either the standard `{"keys": [...]}` document or a
/// bare array of keys. Keys that cannot be understood (symmetric keys,
/// unsupported curves, undersized moduli) are skipped rather than failing
/// the whole set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "JwksDto")]
pub struct Jwks {
    keys: Vec<Jwk>,
}

impl Jwks {
    /// Adds a key to the set
    pub fn add_key(&mut self, key: Jwk) {
        self.keys.push(key);
    }

    /// A view of the keys in this set
    #[must_use]
    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// The number of usable keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no usable keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether any key carries this identifier
    #[must_use]
    pub fn contains(&self, kid: &jwk::KeyIdRef) -> bool {
        self.get_key_by_id(kid).is_some()
    }

    /// The first key carrying this identifier
    #[must_use]
    pub fn get_key_by_id(&self, kid: &jwk::KeyIdRef) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.key_id() == Some(kid))
    }

    /// Gets the best key with this identifier for verifying `alg`
    ///
    /// Only keys whose `kid` matches exactly are considered. Among those, a
    /// key that declares `alg` beats one that merely could serve it. If no
    /// key with the identifier is compatible, the first one is returned so
    /// that verification reports the mismatch.
    #[must_use]
    pub fn get_key(&self, kid: &jwk::KeyIdRef, alg: jwa::Algorithm) -> Option<&Jwk> {
        let alg_usage = alg.to_usage();

        let best = self
            .keys
            .iter()
            .filter(|k| k.key_id() == Some(kid))
            .fold(None, |best: Option<(&Jwk, u8)>, k| {
                if !k.is_compatible(alg) {
                    return best;
                }

                let mut score = 1;
                if k.algorithm() == Some(alg) {
                    score += 2;
                }
                if k.usage() == Some(alg_usage) {
                    score += 1;
                }

                match best {
                    Some((_, best_score)) if best_score >= score => best,
                    _ => Some((k, score)),
                }
            });

        best.map(|(k, _)| k).or_else(|| self.get_key_by_id(kid))
    }

    /// The identifiers of every key in the set
    pub fn key_ids(&self) -> impl Iterator<Item = &jwk::KeyIdRef> {
        self.keys.iter().filter_map(Jwk::key_id)
    }
}

impl FromIterator<Jwk> for Jwks {
    fn from_iter<I: IntoIterator<Item = Jwk>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JwksDto {
    Set { keys: KeyList },
    Bare(KeyList),
}

impl From<JwksDto> for Jwks {
    fn from(dto: JwksDto) -> Self {
        match dto {
            JwksDto::Set { keys } | JwksDto::Bare(keys) => Self { keys: keys.0 },
        }
    }
}

struct KeyList(Vec<Jwk>);

impl<'de> Deserialize<'de> for KeyList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(KeyListVisitor).map(KeyList)
    }
}

struct KeyListVisitor;

impl<'de> de::Visitor<'de> for KeyListVisitor {
    type Value = Vec<Jwk>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of JWK objects")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        let mut index = 0_usize;

        while let Some(value) = seq.next_element()? {
            match value {
                MaybeJwk::Jwk(jwk) => values.push(jwk),
                MaybeJwk::Unknown(key) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        jwks.idx = index,
                        jwk.kid = ?key.kid,
                        jwk.kty = ?key.kty,
                        jwk.alg = ?key.alg,
                        "skipping unusable JWK"
                    );
                    let _ = key;
                }
                MaybeJwk::Opaque(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(jwks.idx = index, "skipping non-object JWK entry");
                }
            }
            index += 1;
        }

        let _ = index;
        Ok(values)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeJwk {
    Jwk(Jwk),
    Unknown(JwkLike),
    Opaque(de::IgnoredAny),
}

#[allow(dead_code)]
#[derive(Deserialize)]
struct JwkLike {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    kty: Option<String>,
    #[serde(default)]
    alg: Option<String>,
}
