//! Permissions granted by an access token, and the check that enforces them

use std::{fmt, str::FromStr};

use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AuthError;

/// An invalid permission string
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InvalidPermission {
    /// The permission was the empty string
    #[error("permission cannot be empty")]
    EmptyString,
    /// The permission contained a byte that is not allowed in a scope token
    #[error("invalid permission byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// Index of the offending byte
        position: usize,
        /// The offending byte
        value: u8,
    },
}

aliri_braid::from_infallible!(InvalidPermission);

/// A single permission, such as `get:drinks-detail`
///
/// Permissions follow the grammar of an OAuth2 scope token
/// ([RFC 6749, Section 3.3][RFC6749 3.3]): printable ASCII except ` `
/// (space), `"` (double quote) and `\` (backslash). Comparison is exact and
/// case-sensitive.
///
///   [RFC6749 3.3]: https://datatracker.ietf.org/doc/html/rfc6749#section-3.3
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to a [`Permission`]"
)]
pub struct Permission;

impl aliri_braid::Validator for Permission {
    type Error = InvalidPermission;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            Err(InvalidPermission::EmptyString)
        } else if let Some((position, &value)) = s
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, &b)| b <= 0x20 || b == 0x22 || b == 0x5C || 0x7F <= b)
        {
            Err(InvalidPermission::InvalidByte { position, value })
        } else {
            Ok(())
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PermissionsDto {
    Array(Vec<Permission>),
    String(String),
}

impl TryFrom<PermissionsDto> for Permissions {
    type Error = InvalidPermission;

    fn try_from(dto: PermissionsDto) -> Result<Self, Self::Error> {
        match dto {
            PermissionsDto::Array(arr) => Ok(arr.into_iter().collect()),
            PermissionsDto::String(s) => s.parse(),
        }
    }
}

/// The ordered permissions carried by a token
///
/// Order is preserved as issued, but membership is all that matters.
/// Deserializes from a JSON array of strings or, for issuers that flatten
/// them, a single space-delimited string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PermissionsDto")]
pub struct Permissions(Vec<Permission>);

impl Permissions {
    /// No permissions at all
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Adds a permission, ignoring duplicates
    pub fn insert(&mut self, permission: Permission) {
        if !self.contains(&permission) {
            self.0.push(permission);
        }
    }

    /// Adds a permission, builder style
    #[must_use]
    pub fn and(mut self, permission: Permission) -> Self {
        self.insert(permission);
        self
    }

    /// Whether `permission` is granted
    #[must_use]
    pub fn contains(&self, permission: &PermissionRef) -> bool {
        self.0.iter().any(|p| p.as_str() == permission.as_str())
    }

    /// Iterates over the permissions in issued order
    pub fn iter(&self) -> impl Iterator<Item = &PermissionRef> {
        self.0.iter().map(|p| &**p)
    }

    /// The number of distinct permissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no permission is granted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut p = Self::empty();
        for permission in iter {
            p.insert(permission);
        }
        p
    }
}

impl FromStr for Permissions {
    type Err = InvalidPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(|p| Permission::new(p.to_owned()))
            .collect()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.iter();
        if let Some(first) = iter.next() {
            f.write_str(first.as_str())?;
            for p in iter {
                f.write_str(" ")?;
                f.write_str(p.as_str())?;
            }
        }
        Ok(())
    }
}

/// Claims that may carry a `permissions` claim
pub trait HasPermissions {
    /// The granted permissions, or `None` when the claim is absent
    fn permissions(&self) -> Option<&Permissions>;
}

impl<T: HasPermissions + ?Sized> HasPermissions for &T {
    fn permissions(&self) -> Option<&Permissions> {
        T::permissions(self)
    }
}

/// Checks that `claims` grant `required`
///
/// # Errors
///
/// * [`AuthError::InvalidClaims`] when the claims carry no `permissions`
///   claim at all
/// * [`AuthError::InsufficientScope`] when `required` is not among them
pub fn check_permission<C>(claims: &C, required: &PermissionRef) -> Result<(), AuthError>
where
    C: HasPermissions + ?Sized,
{
    let permissions = claims
        .permissions()
        .ok_or_else(|| AuthError::invalid_claims("Permissions not included in token."))?;

    if permissions.contains(required) {
        Ok(())
    } else {
        tracing::debug!(
            permission.required = %required,
            permission.granted = %permissions,
            "token lacks required permission"
        );
        Err(AuthError::InsufficientScope {
            required: required.to_owned(),
        })
    }
}
