#![allow(dead_code)]

use barista::{
    clock::{Clock, System, UnixTime},
    jwa, jwk, jws,
    jwt::{self, BasicHeaders, CoreValidator},
    Jwk, Jwks, Jwt,
};
use barista_oauth2::{Claims, Permission, Permissions};
use color_eyre::Result;

pub const PRIMARY_KEY_ID: &str = "barista-primary";
pub const ROTATED_KEY_ID: &str = "barista-rotated";
pub const AUDIENCE: &str = "drinks";
pub const ISSUER: &str = "https://barista.eu.auth0.com/";

pub const PRIMARY_JWK: &str = include_str!("../../../barista/data/rsa/primary-jwk.json");
pub const ROTATED_JWK: &str = include_str!("../../../barista/data/rsa/rotated-jwk.json");
pub const PRIMARY_PKCS8: &[u8] = include_bytes!("../../../barista/data/rsa/primary-pkcs8.der");
pub const ROTATED_PKCS8: &[u8] = include_bytes!("../../../barista/data/rsa/rotated-pkcs8.der");

pub fn now() -> UnixTime {
    System.now()
}

pub fn validator() -> CoreValidator {
    CoreValidator::default()
        .add_approved_algorithm(jwa::Algorithm::RS256)
        .add_allowed_audience(jwt::Audience::from_static(AUDIENCE))
        .require_issuer(jwt::Issuer::from_static(ISSUER))
}

/// Claims for `permissions` that expire in an hour
pub fn claims(permissions: &[&'static str]) -> Claims {
    let now = now();
    Claims::new()
        .with_issuer(jwt::Issuer::from_static(ISSUER))
        .with_subject(jwt::Subject::from_static("auth0|barista"))
        .with_audience(jwt::Audience::from_static(AUDIENCE))
        .with_issued_at(now)
        .with_expiration(UnixTime(now.0 + 3600))
        .with_permissions(
            permissions
                .iter()
                .copied()
                .map(Permission::from_static)
                .collect::<Permissions>(),
        )
}

pub fn sign_with<S>(signer: &S, headers: &BasicHeaders, claims: &Claims) -> Result<Jwt>
where
    S: jws::Signer<Algorithm = jwa::Algorithm>,
    barista::error::SigningError: From<S::Error>,
{
    Ok(Jwt::try_from_parts_with_signature(headers, claims, signer)?)
}

pub fn sign_primary(claims: &Claims) -> Result<Jwt> {
    let key = jwa::rsa::PrivateKey::from_pkcs8_der(PRIMARY_PKCS8)?;
    let headers = BasicHeaders::with_key_id(jwa::Algorithm::RS256, jwk::KeyId::from_static(PRIMARY_KEY_ID));
    sign_with(&key, &headers, claims)
}

pub fn sign_rotated(claims: &Claims) -> Result<Jwt> {
    let key = jwa::rsa::PrivateKey::from_pkcs8_der(ROTATED_PKCS8)?;
    let headers = BasicHeaders::with_key_id(jwa::Algorithm::RS256, jwk::KeyId::from_static(ROTATED_KEY_ID));
    sign_with(&key, &headers, claims)
}

pub fn primary_jwks() -> Result<Jwks> {
    let key: Jwk = serde_json::from_str(PRIMARY_JWK)?;
    Ok(std::iter::once(key).collect())
}

pub fn rotated_jwks() -> Result<Jwks> {
    let primary: Jwk = serde_json::from_str(PRIMARY_JWK)?;
    let rotated: Jwk = serde_json::from_str(ROTATED_JWK)?;
    Ok([primary, rotated].into_iter().collect())
}

/// A token with an arbitrary header and a junk signature
pub fn forge(header: &serde_json::Value, claims: &Claims) -> Result<Jwt> {
    use barista::b64::Base64Url;

    let h = Base64Url::from_raw(serde_json::to_vec(header)?);
    let p = Base64Url::from_raw(serde_json::to_vec(claims)?);
    let s = Base64Url::from_raw(b"not a signature".to_vec());
    Ok(Jwt::new(format!("{h}.{p}.{s}")))
}
