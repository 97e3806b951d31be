mod common;

use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use barista_oauth2::{Claims, Permission};
use barista_tower::{Authorizer, JsonErrorHandler, TerseErrorHandler};
use bytes::Bytes;
use color_eyre::Result;
use http::{header, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};

use common::*;

type Body = Full<Bytes>;

/// A handler that echoes the subject of the verified claims and counts calls
fn handler(
    calls: Arc<AtomicUsize>,
) -> impl Service<Request<Body>, Response = Response<Body>, Error = Infallible> + Clone {
    service_fn(move |req: Request<Body>| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let sub = req
                .extensions()
                .get::<Claims>()
                .and_then(|c| barista::jwt::CoreClaims::sub(c).map(|s| s.as_str().to_owned()))
                .unwrap_or_default();
            Ok::<_, Infallible>(Response::new(Body::from(sub)))
        }
    })
}

fn request(authorization: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::get("/drinks-detail");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    Ok(builder.body(Body::default())?)
}

async fn body_json(resp: Response<Body>) -> Result<serde_json::Value> {
    let bytes = resp.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn admits_token_with_permission() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer = Authorizer::new(authority()?).with_json_error_handler::<Body>();
    let svc = authorizer.wrap(
        Permission::from_static("get:drinks-detail"),
        handler(calls.clone()),
    );

    let resp = svc
        .oneshot(request(Some(&bearer(&["get:drinks-detail"])?))?)
        .await?;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await?.to_bytes();
    assert_eq!(&body[..], b"auth0|barista");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn basic_scheme_is_refused_before_handler() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer = Authorizer::new(authority()?).with_json_error_handler::<Body>();
    let svc = authorizer.wrap(
        Permission::from_static("get:drinks-detail"),
        handler(calls.clone()),
    );

    let resp = svc.oneshot(request(Some("Basic abc"))?).await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers()[header::WWW_AUTHENTICATE],
        r#"Bearer error="invalid_token""#
    );
    let json = body_json(resp).await?;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], 401);
    assert_eq!(json["code"], "invalid_header");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn missing_header_is_refused() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer = Authorizer::new(authority()?).with_json_error_handler::<Body>();
    let svc = authorizer.wrap(
        Permission::from_static("get:drinks-detail"),
        handler(calls.clone()),
    );

    let resp = svc.oneshot(request(None)?).await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let json = body_json(resp).await?;
    assert_eq!(json["code"], "invalid_header");
    assert_eq!(json["message"], "Authorization header is expected.");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn missing_permission_is_forbidden() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer = Authorizer::new(authority()?).with_json_error_handler::<Body>();
    let svc = authorizer.wrap(
        Permission::from_static("post:drinks"),
        handler(calls.clone()),
    );

    let resp = svc
        .oneshot(request(Some(&bearer(&["get:drinks-detail"])?))?)
        .await?;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        resp.headers()[header::WWW_AUTHENTICATE],
        r#"Bearer error="insufficient_scope" scope="post:drinks""#
    );
    let json = body_json(resp).await?;
    assert_eq!(json["code"], "insufficient_scope");
    assert_eq!(json["error"], 403);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refused() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer = Authorizer::new(authority()?).with_json_error_handler::<Body>();
    let svc = authorizer.wrap(
        Permission::from_static("get:drinks-detail"),
        handler(calls.clone()),
    );

    let token = sign(&claims(&["get:drinks-detail"], -60))?;
    let resp = svc
        .oneshot(request(Some(&format!("Bearer {}", token.as_str())))?)
        .await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await?;
    assert_eq!(json["code"], "token_expired");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn terse_handler_sends_empty_body() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer = Authorizer::new(authority()?).with_terse_error_handler::<Body>();
    let svc = authorizer.wrap(
        Permission::from_static("get:drinks-detail"),
        handler(calls.clone()),
    );

    let resp = svc.oneshot(request(Some("Bearer not-a-token"))?).await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    let body = resp.into_body().collect().await?.to_bytes();
    assert!(body.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn layer_composes_with_service_builder() -> Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let authorizer =
        Authorizer::new(authority()?).with_error_handler(JsonErrorHandler::<Body>::new());

    let mut svc = ServiceBuilder::new()
        .layer(authorizer.require(Permission::from_static("get:drinks-detail")))
        .service(handler(calls.clone()));

    let header = bearer(&["get:drinks-detail"])?;
    for _ in 0..2 {
        let resp = svc.ready().await?.call(request(Some(&header))?).await?;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn verifier_reports_its_permission() -> Result<()> {
    let authorizer = Authorizer::new(authority()?).with_error_handler(TerseErrorHandler::<Body>::new());
    let verifier = authorizer.verifier(Permission::from_static("delete:drinks"));
    assert_eq!(verifier.permission().as_str(), "delete:drinks");
    Ok(())
}
