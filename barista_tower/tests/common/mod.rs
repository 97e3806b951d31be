#![allow(dead_code)]

use barista::{
    clock::{Clock, System, UnixTime},
    jwa, jwk,
    jwt::{self, BasicHeaders, CoreValidator},
    Jwk, Jwt,
};
use barista_oauth2::{Authority, Claims, KeyProvider, Permission, Permissions};
use color_eyre::Result;

pub const PRIMARY_KEY_ID: &str = "barista-primary";
pub const AUDIENCE: &str = "drinks";
pub const ISSUER: &str = "https://barista.eu.auth0.com/";

const PRIMARY_JWK: &str = include_str!("../../../barista/data/rsa/primary-jwk.json");
const PRIMARY_PKCS8: &[u8] = include_bytes!("../../../barista/data/rsa/primary-pkcs8.der");

pub fn authority() -> Result<Authority> {
    let key: Jwk = serde_json::from_str(PRIMARY_JWK)?;
    let validator = CoreValidator::default()
        .add_approved_algorithm(jwa::Algorithm::RS256)
        .add_allowed_audience(jwt::Audience::from_static(AUDIENCE))
        .require_issuer(jwt::Issuer::from_static(ISSUER));

    Ok(Authority::new(
        KeyProvider::from_jwks(std::iter::once(key).collect()),
        validator,
    ))
}

pub fn claims(permissions: &[&'static str], lifetime: i64) -> Claims {
    let now = System.now();
    let exp = if lifetime >= 0 {
        UnixTime(now.0 + lifetime.unsigned_abs())
    } else {
        UnixTime(now.0 - lifetime.unsigned_abs())
    };

    Claims::new()
        .with_issuer(jwt::Issuer::from_static(ISSUER))
        .with_audience(jwt::Audience::from_static(AUDIENCE))
        .with_subject(jwt::Subject::from_static("auth0|barista"))
        .with_issued_at(now)
        .with_expiration(exp)
        .with_permissions(
            permissions
                .iter()
                .copied()
                .map(Permission::from_static)
                .collect::<Permissions>(),
        )
}

pub fn sign(claims: &Claims) -> Result<Jwt> {
    let key = jwa::rsa::PrivateKey::from_pkcs8_der(PRIMARY_PKCS8)?;
    let headers = BasicHeaders::with_key_id(
        jwa::Algorithm::RS256,
        jwk::KeyId::from_static(PRIMARY_KEY_ID),
    );
    Ok(Jwt::try_from_parts_with_signature(&headers, claims, &key)?)
}

pub fn bearer(permissions: &[&'static str]) -> Result<String> {
    let token = sign(&claims(permissions, 3600))?;
    Ok(format!("Bearer {}", token.as_str()))
}
