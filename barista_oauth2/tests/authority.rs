mod common;

use barista::{clock::UnixTime, jwa, jwk, jwt};
use barista_oauth2::{AuthError, Authority, KeyProvider, PermissionRef};
use color_eyre::Result;
use http::StatusCode;
use serde_json::json;

use common::*;

fn authority() -> Result<Authority> {
    Ok(Authority::new(
        KeyProvider::from_jwks(primary_jwks()?),
        validator(),
    ))
}

fn required(p: &'static str) -> &'static PermissionRef {
    PermissionRef::from_static(p)
}

#[tokio::test]
async fn grants_permission_carried_by_token() -> Result<()> {
    let claims = claims(&["get:drinks-detail"]);
    let token = sign_primary(&claims)?;

    let verified = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await?;
    assert_eq!(verified, claims);
    Ok(())
}

#[tokio::test]
async fn missing_permission_is_forbidden() -> Result<()> {
    let token = sign_primary(&claims(&["get:drinks-detail"]))?;

    let err = authority()?
        .verify_token(&token, required("post:drinks"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "insufficient_scope");
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn verification_is_repeatable() -> Result<()> {
    let authority = authority()?;
    let token = sign_primary(&claims(&["get:drinks-detail"]))?;

    let first = authority.verify_token(&token, required("get:drinks-detail")).await?;
    let second = authority.verify_token(&token, required("get:drinks-detail")).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn token_from_unknown_key_is_never_accepted() -> Result<()> {
    let token = sign_rotated(&claims(&["get:drinks-detail"]))?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "key_not_found");
    assert_eq!(err.public_code(), "unauthorized");
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn key_id_collision_fails_signature_check() -> Result<()> {
    let key = jwa::rsa::PrivateKey::from_pkcs8_der(ROTATED_PKCS8)?;
    let headers = jwt::BasicHeaders::with_key_id(
        jwa::Algorithm::RS256,
        jwk::KeyId::from_static(PRIMARY_KEY_ID),
    );
    let token = sign_with(&key, &headers, &claims(&["get:drinks-detail"]))?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidSignature { .. }));
    Ok(())
}

#[tokio::test]
async fn unsecured_and_symmetric_algorithms_are_header_failures() -> Result<()> {
    let authority = authority()?;
    let claims = claims(&["get:drinks-detail"]);

    for alg in ["none", "HS256", "HS512", "RS1"] {
        let token = forge(&json!({ "alg": alg, "kid": PRIMARY_KEY_ID }), &claims)?;
        let err = authority
            .verify_token(&token, required("get:drinks-detail"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_header", "alg {alg}");
    }
    Ok(())
}

#[tokio::test]
async fn unapproved_algorithm_is_a_header_failure() -> Result<()> {
    let key = jwa::rsa::PrivateKey::from_pkcs8_der(PRIMARY_PKCS8)?;
    let headers = jwt::BasicHeaders::with_key_id(
        jwa::Algorithm::RS512,
        jwk::KeyId::from_static(PRIMARY_KEY_ID),
    );
    let token = sign_with(&key, &headers, &claims(&["get:drinks-detail"]))?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_header");
    assert_eq!(err.message(), "Token algorithm is not accepted.");
    Ok(())
}

#[tokio::test]
async fn missing_key_id_is_a_header_failure() -> Result<()> {
    let key = jwa::rsa::PrivateKey::from_pkcs8_der(PRIMARY_PKCS8)?;
    let headers = jwt::BasicHeaders::new(jwa::Algorithm::RS256);
    let token = sign_with(&key, &headers, &claims(&["get:drinks-detail"]))?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_header");
    Ok(())
}

#[tokio::test]
async fn garbage_is_a_header_failure() -> Result<()> {
    let authority = authority()?;
    for raw in ["", "abc", "a.b", "a.b.c.d", "!!!.e30.c2ln"] {
        let token = barista::Jwt::new(raw.to_owned());
        let err = authority
            .verify_token(&token, required("get:drinks-detail"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_header", "token {raw:?}");
    }
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected_despite_valid_signature() -> Result<()> {
    let past = UnixTime(now().0 - 60);
    let token = sign_primary(&claims(&["get:drinks-detail"]).with_expiration(past))?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn foreign_audience_is_invalid_claims() -> Result<()> {
    let claims = claims(&["get:drinks-detail"]).with_audience(jwt::Audience::from_static("coffee"));
    let token = sign_primary(&claims)?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_claims");
    Ok(())
}

#[tokio::test]
async fn foreign_issuer_is_invalid_claims() -> Result<()> {
    let claims = claims(&["get:drinks-detail"])
        .with_issuer(jwt::Issuer::from_static("https://evil.example.com/"));
    let token = sign_primary(&claims)?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_claims");
    Ok(())
}

#[tokio::test]
async fn absent_permissions_claim_is_invalid_claims() -> Result<()> {
    let now = now();
    let claims = barista_oauth2::Claims::new()
        .with_issuer(jwt::Issuer::from_static(ISSUER))
        .with_audience(jwt::Audience::from_static(AUDIENCE))
        .with_expiration(UnixTime(now.0 + 3600));
    let token = sign_primary(&claims)?;

    let err = authority()?
        .verify_token(&token, required("get:drinks-detail"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_claims");
    Ok(())
}

#[tokio::test]
async fn authenticate_skips_permission_check() -> Result<()> {
    let claims = claims(&[]);
    let token = sign_primary(&claims)?;

    let verified = authority()?.authenticate(&token).await?;
    assert_eq!(verified, claims);
    Ok(())
}

#[tokio::test]
async fn elliptic_curve_keys_are_supported() -> Result<()> {
    let key = jwa::ec::PrivateKey::generate(jwa::ec::Curve::P256)?;
    let public = barista::Jwk::from(key.public_key().clone())
        .with_key_id(jwk::KeyId::from_static("barista-ec"));

    let authority = Authority::new(
        KeyProvider::from_jwks(std::iter::once(public).collect()),
        validator().add_approved_algorithm(jwa::Algorithm::ES256),
    );

    let headers =
        jwt::BasicHeaders::with_key_id(jwa::Algorithm::ES256, jwk::KeyId::from_static("barista-ec"));
    let token = sign_with(&key, &headers, &claims(&["get:drinks-detail"]))?;

    authority
        .verify_token(&token, required("get:drinks-detail"))
        .await?;
    Ok(())
}
