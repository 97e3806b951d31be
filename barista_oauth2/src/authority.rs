use std::sync::Arc;

use barista::{
    jwt::{self, CoreHeaders, HasAlgorithm},
    JwtRef,
};

use crate::{check_permission, AuthError, Claims, KeyProvider, PermissionRef};

#[derive(Debug)]
struct Inner {
    provider: KeyProvider,
    validator: jwt::CoreValidator,
}

/// Verifies access tokens issued by a trusted authority
///
/// The validator decides which algorithms, audiences and issuer are
/// acceptable; the provider supplies the keys.
#[derive(Debug, Clone)]
#[must_use]
pub struct Authority {
    inner: Arc<Inner>,
}

impl Authority {
    /// Constructs an authority from a key provider and a claims validator
    pub fn new(provider: KeyProvider, validator: jwt::CoreValidator) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                validator,
            }),
        }
    }

    /// The key provider backing this authority
    pub fn key_provider(&self) -> &KeyProvider {
        &self.inner.provider
    }

    /// The validator applied to every token
    pub fn validator(&self) -> &jwt::CoreValidator {
        &self.inner.validator
    }

    /// Verifies `token` and checks that it grants `required`
    ///
    /// Claims are returned only once the signature, the standard claims and
    /// the permission have all been checked.
    ///
    /// # Errors
    ///
    /// Any failure along the way, as an [`AuthError`].
    pub async fn verify_token(
        &self,
        token: &JwtRef,
        required: &PermissionRef,
    ) -> Result<Claims, AuthError> {
        let claims = self.authenticate(token).await?;
        check_permission(&claims, required)?;
        tracing::trace!(permission = %required, "access granted");
        Ok(claims)
    }

    /// Verifies `token` without requiring any permission
    ///
    /// # Errors
    ///
    /// The token is malformed, signed by an unknown key or with an
    /// unapproved algorithm, has a bad signature, or carries unacceptable
    /// claims.
    pub async fn authenticate(&self, token: &JwtRef) -> Result<Claims, AuthError> {
        let result = self.authenticate_inner(token).await;
        if let Err(err) = &result {
            let error: &dyn std::error::Error = err;
            tracing::debug!(error, code = err.code(), "token rejected");
        }
        result
    }

    async fn authenticate_inner(&self, token: &JwtRef) -> Result<Claims, AuthError> {
        let decomposed = token.decompose::<jwt::BasicHeaders>()?;
        let alg = decomposed.alg();

        self.inner
            .validator
            .check_algorithm(alg)
            .map_err(barista::error::JwtVerifyError::from)?;

        let kid = decomposed
            .kid()
            .map(ToOwned::to_owned)
            .ok_or_else(|| AuthError::invalid_header("Token header must name a signing key."))?;

        let key = self.inner.provider.signing_key_for(&kid, alg).await?;

        let validated = decomposed.verify::<Claims, _>(&key, &self.inner.validator)?;
        tracing::trace!(%kid, %alg, "token verified");

        Ok(validated.into_claims())
    }
}
