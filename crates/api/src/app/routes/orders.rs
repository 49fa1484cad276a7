//! Order placement, history, payment and delivery.
//!
//! Orders are visible to their owner and to admins; anyone else gets a 404
//! so order ids cannot be enumerated.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;

use storefront_auth::Permission;
use storefront_core::AggregateId;
use storefront_orders::{
    MarkDelivered, MarkPaid, Order, OrderCommand, OrderDraft, OrderId, PaymentResult, PlaceOrder,
};

use crate::app::errors::ApiError;
use crate::app::routes::parse_id;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

const ORDER_NOT_FOUND: &str = "Order not found";

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order))
        .route("/myorders", get(my_orders))
        .route("/:id", get(get_order))
        .route("/:id/pay", put(pay_order))
        .route("/:id/deliver", put(deliver_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    authz::require(&principal, Permission::ORDERS_PLACE)?;
    let Json(draft) = body?;

    // Client totals are stored as submitted; mismatches are only reported.
    let submitted = draft.prices();
    let audit = services
        .pricing
        .audit(&draft.order_items, &submitted)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if let Some(expected) = audit {
        tracing::warn!(
            user_id = %principal.user_id(),
            submitted = ?submitted,
            expected = ?expected,
            "order totals differ from server-side pricing"
        );
    }

    let order_id = OrderId::new(AggregateId::new());
    let cmd = OrderCommand::PlaceOrder(PlaceOrder {
        order_id,
        user: principal.user_id(),
        order_items: draft.order_items,
        shipping_address: draft.shipping_address,
        payment_method: draft.payment_method,
        prices: submitted,
        occurred_at: Utc::now(),
    });

    let order = services
        .orders
        .dispatch(*order_id.0.as_uuid(), cmd, || Order::empty(order_id))
        .await?;

    Ok((StatusCode::CREATED, Json(order)).into_response())
}

pub async fn my_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Vec<Order>>, ApiError> {
    authz::require(&principal, Permission::ORDERS_READ_OWN)?;
    Ok(Json(services.order_repo.for_user(principal.user_id()).await?))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = load_visible(&services, &principal, &id, Permission::ORDERS_READ_OWN).await?;
    Ok(Json(order))
}

pub async fn pay_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Json<PaymentResult>>,
) -> Result<Json<Order>, ApiError> {
    let order = load_visible(&services, &principal, &id, Permission::ORDERS_PAY_OWN).await?;
    let order_id = order.id_typed();

    let cmd = OrderCommand::MarkPaid(MarkPaid {
        order_id,
        payment_result: body.map(|Json(result)| result).unwrap_or_default(),
        occurred_at: Utc::now(),
    });
    let order = services
        .orders
        .dispatch(*order_id.0.as_uuid(), cmd, || Order::empty(order_id))
        .await
        .map_err(|e| ApiError::from_dispatch(e, ORDER_NOT_FOUND))?;

    tracing::info!(order_id = %order_id.0, "order paid");
    Ok(Json(order))
}

pub async fn deliver_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    authz::require(&principal, Permission::ORDERS_DELIVER)?;
    let order_id = OrderId::new(parse_id::<AggregateId>(&id, ORDER_NOT_FOUND)?);

    let cmd = OrderCommand::MarkDelivered(MarkDelivered {
        order_id,
        occurred_at: Utc::now(),
    });
    let order = services
        .orders
        .dispatch(*order_id.0.as_uuid(), cmd, || Order::empty(order_id))
        .await
        .map_err(|e| ApiError::from_dispatch(e, ORDER_NOT_FOUND))?;

    tracing::info!(order_id = %order_id.0, "order delivered");
    Ok(Json(order))
}

/// Load an order the caller may act on: its owner holding `own_permission`,
/// or anyone allowed to read every order.
async fn load_visible(
    services: &AppServices,
    principal: &PrincipalContext,
    raw_id: &str,
    own_permission: &'static str,
) -> Result<Order, ApiError> {
    let order_id = OrderId::new(parse_id::<AggregateId>(raw_id, ORDER_NOT_FOUND)?);
    let order = services
        .order_repo
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found(ORDER_NOT_FOUND))?;

    let visible = authz::allows(principal, Permission::ORDERS_READ_ANY)
        || (order.is_owned_by(principal.user_id()) && authz::allows(principal, own_permission));
    if !visible {
        return Err(ApiError::not_found(ORDER_NOT_FOUND));
    }
    Ok(order)
}
