use axum::Router;

pub mod orders;
pub mod products;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .nest("/products", products::public_router())
        .nest("/users", users::public_router())
}

/// Endpoints behind the bearer-token middleware.
pub fn protected_router() -> Router {
    Router::new()
        .nest("/products", products::protected_router())
        .nest("/users", users::protected_router())
        .nest("/orders", orders::router())
}

/// Parse a path id; anything malformed is reported as the missing resource.
pub(crate) fn parse_id<T: std::str::FromStr>(
    raw: &str,
    not_found: &str,
) -> Result<T, crate::app::errors::ApiError> {
    raw.parse()
        .map_err(|_| crate::app::errors::ApiError::not_found(not_found))
}
