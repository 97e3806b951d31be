use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    handler::Handler,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Extension, Json, Router,
};
use barista::jwt::CoreClaims;
use barista_oauth2::{Authority, Claims, Permission};
use barista_tower::{Authorizer, JsonErrorHandler};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::ApiError,
    store::{Drink, DrinkPatch, DrinkStore, NewDrink, ShortDrink},
};

#[derive(Serialize)]
struct Drinks<T> {
    success: bool,
    drinks: Vec<T>,
}

impl<T> Drinks<T> {
    fn ok(drinks: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            drinks,
        })
    }
}

#[derive(Serialize)]
struct Deleted {
    success: bool,
    delete: u64,
}

/// Builds the drinks API
///
/// Reads are public apart from `/drinks-detail`; every other route requires
/// its own permission from the bearer token. `cors` answers preflight
/// requests before they reach the permission checks.
pub fn app(authority: Authority, store: DrinkStore, cors: CorsLayer) -> Router {
    let auth: Authorizer<JsonErrorHandler<Body>> =
        Authorizer::new(authority).with_json_error_handler();
    let require = |permission: &'static str| auth.require(Permission::from_static(permission));

    Router::new()
        .route(
            "/drinks",
            get(list_drinks).post(create_drink.layer(require("post:drinks"))),
        )
        .route(
            "/drinks-detail",
            get(drinks_detail.layer(require("get:drinks-detail"))),
        )
        .route(
            "/drinks/:id",
            patch(update_drink.layer(require("patch:drinks")))
                .delete(delete_drink.layer(require("delete:drinks"))),
        )
        .fallback(not_found)
        .layer(middleware::map_response(method_not_allowed_as_json))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn list_drinks(State(store): State<DrinkStore>) -> Response {
    let drinks = store.list().await;
    let short: Vec<ShortDrink> = drinks.iter().map(Drink::short).collect();
    Drinks::ok(short).into_response()
}

async fn drinks_detail(State(store): State<DrinkStore>) -> Json<Drinks<Drink>> {
    Drinks::ok(store.list().await)
}

async fn create_drink(
    State(store): State<DrinkStore>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<NewDrink>, JsonRejection>,
) -> Result<Json<Drinks<Drink>>, ApiError> {
    let Json(drink) = body.map_err(|rejection| {
        tracing::debug!(%rejection, "unreadable drink");
        ApiError::Unprocessable
    })?;

    let drink = store.insert(drink).await?;
    tracing::info!(drink.id = drink.id, sub = ?claims.sub(), "drink created");
    Ok(Drinks::ok(vec![drink]))
}

async fn update_drink(
    State(store): State<DrinkStore>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<DrinkPatch>, JsonRejection>,
) -> Result<Json<Drinks<Drink>>, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;
    if store.get(id).await.is_none() {
        return Err(ApiError::NotFound);
    }
    let Json(patch) = body.map_err(|rejection| {
        tracing::debug!(%rejection, "unreadable drink patch");
        ApiError::Unprocessable
    })?;

    let drink = store.update(id, patch).await?;
    tracing::info!(drink.id = id, sub = ?claims.sub(), "drink updated");
    Ok(Drinks::ok(vec![drink]))
}

async fn delete_drink(
    State(store): State<DrinkStore>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Deleted>, ApiError> {
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;

    store.remove(id).await?;
    tracing::info!(drink.id = id, sub = ?claims.sub(), "drink deleted");
    Ok(Json(Deleted {
        success: true,
        delete: id,
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

// The router answers unsupported methods with a bare 405; give it the API's
// error body while keeping the `allow` header.
async fn method_not_allowed_as_json(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = ApiError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}
