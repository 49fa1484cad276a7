//! Catalog browsing, admin product creation and customer reviews.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use uuid::Uuid;

use storefront_auth::Permission;
use storefront_core::AggregateId;
use storefront_products::{
    AddReview, CatalogFilter, CreateProduct, Product, ProductCommand, ProductId,
};

use crate::app::errors::ApiError;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::app::dto;
use crate::authz;
use crate::context::PrincipalContext;

const PRODUCT_NOT_FOUND: &str = "Product not found";

pub fn public_router() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/featured", get(featured_products))
        .route("/:id", get(get_product))
}

pub fn protected_router() -> Router {
    Router::new()
        .route("/", post(create_product))
        .route("/:id/reviews", post(create_review))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<CatalogFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(services.product_repo.list(filter).await?))
}

pub async fn featured_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(services.product_repo.featured().await?))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = ProductId::new(parse_id::<AggregateId>(&id, PRODUCT_NOT_FOUND)?);
    services
        .product_repo
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(PRODUCT_NOT_FOUND))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    authz::require(&principal, Permission::CATALOG_WRITE)?;
    let Json(body) = body?;

    let product_id = ProductId::new(AggregateId::new());
    let cmd = ProductCommand::CreateProduct(CreateProduct {
        product_id,
        created_by: principal.user_id(),
        details: body.into_details(),
        occurred_at: Utc::now(),
    });

    let product = services
        .products
        .dispatch(*product_id.0.as_uuid(), cmd, || Product::empty(product_id))
        .await?;

    Ok((StatusCode::CREATED, Json(product)).into_response())
}

pub async fn create_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::ReviewRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    authz::require(&principal, Permission::REVIEWS_WRITE)?;
    let product_id = ProductId::new(parse_id::<AggregateId>(&id, PRODUCT_NOT_FOUND)?);
    let Json(body) = body?;
    let rating = body.rating()?;

    // Reviews carry the reviewer's current display name.
    let reviewer = services
        .user_repo
        .get(principal.user_id())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Not authorized, user not found".to_string()))?;

    let cmd = ProductCommand::AddReview(AddReview {
        product_id,
        review_id: Uuid::now_v7(),
        user: principal.user_id(),
        user_name: reviewer.name().to_string(),
        rating,
        comment: body.comment,
        occurred_at: Utc::now(),
    });

    services
        .products
        .dispatch(*product_id.0.as_uuid(), cmd, || Product::empty(product_id))
        .await
        .map_err(|e| ApiError::from_dispatch(e, PRODUCT_NOT_FOUND))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "Review added" })),
    )
        .into_response())
}
