use axum::{body::Body, http::Request, Router};
use barista::{
    clock::{Clock, System, UnixTime},
    jwa, jwk,
    jwt::{self, BasicHeaders, CoreValidator},
    Jwk, Jwt,
};
use barista_drinks::{app, Config, DrinkStore};
use clap::Parser;
use barista_oauth2::{Authority, Claims, KeyProvider, Permission, Permissions};
use color_eyre::Result;
use http_body_util::BodyExt;

const AUDIENCE: &str = "drinks";
const ISSUER: &str = "https://barista.eu.auth0.com/";

const PRIMARY_JWK: &str = include_str!("../../../barista/data/rsa/primary-jwk.json");
const PRIMARY_PKCS8: &[u8] = include_bytes!("../../../barista/data/rsa/primary-pkcs8.der");

/// The API over an empty menu, trusting the committed primary key
pub fn service() -> Result<Router> {
    service_with(&[])
}

/// As [`service`], with extra command line flags
pub fn service_with(flags: &[&str]) -> Result<Router> {
    let args = [
        "barista",
        "--auth0-domain",
        "barista.eu.auth0.com",
        "--api-audience",
        AUDIENCE,
    ];
    let config = Config::try_parse_from(args.iter().chain(flags))?;

    let key: Jwk = serde_json::from_str(PRIMARY_JWK)?;
    let validator = CoreValidator::default()
        .add_approved_algorithm(jwa::Algorithm::RS256)
        .add_allowed_audience(jwt::Audience::from_static(AUDIENCE))
        .require_issuer(jwt::Issuer::from_static(ISSUER));
    let authority = Authority::new(
        KeyProvider::from_jwks(std::iter::once(key).collect()),
        validator,
    );

    Ok(app(authority, DrinkStore::new(), config.cors()))
}

/// An `Authorization` value for a live token granting `permissions`
pub fn bearer(permissions: &[&'static str]) -> Result<String> {
    let now = System.now();
    let claims = Claims::new()
        .with_issuer(jwt::Issuer::from_static(ISSUER))
        .with_audience(jwt::Audience::from_static(AUDIENCE))
        .with_subject(jwt::Subject::from_static("auth0|manager"))
        .with_issued_at(now)
        .with_expiration(UnixTime(now.0 + 3600))
        .with_permissions(
            permissions
                .iter()
                .copied()
                .map(Permission::from_static)
                .collect::<Permissions>(),
        );

    let key = jwa::rsa::PrivateKey::from_pkcs8_der(PRIMARY_PKCS8)?;
    let headers = BasicHeaders::with_key_id(
        jwa::Algorithm::RS256,
        jwk::KeyId::from_static("barista-primary"),
    );
    let token = Jwt::try_from_parts_with_signature(&headers, &claims, &key)?;
    Ok(format!("Bearer {}", token.as_str()))
}

/// A request with an optional bearer token and JSON body
pub fn request(
    method: &str,
    uri: &str,
    authorization: Option<&str>,
    body: Option<serde_json::Value>,
) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json)?)
        }
        None => Body::empty(),
    };
    Ok(builder.body(body)?)
}

pub async fn json(resp: axum::response::Response) -> Result<serde_json::Value> {
    let bytes = resp.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
