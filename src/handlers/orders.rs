use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::OrderService;
use crate::domain::order::{Order, OrderLineInput, OrderStatus};
use crate::domain::ports::Store;
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub customer_email: String,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    /// Decimal price captured when the order was placed, e.g. "9.99"
    pub unit_price: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_email: String,
    pub status: String,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            customer_email: order.customer_email,
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            items: order
                .items
                .into_iter()
                .map(|i| OrderItemResponse {
                    product_id: i.product_id,
                    product_name: i.product_name,
                    unit_price: i.unit_price.to_string(),
                    quantity: i.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// CREATED, PAID or CANCELLED (case-insensitive)
    pub status: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Places an order. Stock is debited, the order stored and an `OrderCreated`
/// event queued in one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Unknown product"),
        (status = 409, description = "Out of stock, inactive product or concurrent update"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn place_order<S: Store>(
    service: web::Data<OrderService<S>>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let lines: Vec<OrderLineInput> = body
        .items
        .into_iter()
        .map(|l| OrderLineInput {
            product_id: l.product_id,
            quantity: l.quantity,
        })
        .collect();

    let service = service.into_inner();
    let order = web::block(move || service.place_order(&body.customer_email, lines)).await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order<S: Store>(
    service: web::Data<OrderService<S>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let service = service.into_inner();
    let order = web::block(move || service.get_order(id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Lists orders, newest first, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Orders", body = Vec<OrderResponse>),
        (status = 400, description = "Unknown status"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders<S: Store>(
    service: web::Data<OrderService<S>>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let status = query
        .into_inner()
        .status
        .map(|s| s.parse::<OrderStatus>())
        .transpose()?;

    let service = service.into_inner();
    let orders = web::block(move || service.list_orders(status)).await??;

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// POST /orders/{id}/pay
#[utoipa::path(
    post,
    path = "/orders/{id}/pay",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order paid", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not in CREATED state"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn pay_order<S: Store>(
    service: web::Data<OrderService<S>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let service = service.into_inner();
    let order = web::block(move || service.pay(id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not in CREATED state"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn cancel_order<S: Store>(
    service: web::Data<OrderService<S>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let service = service.into_inner();
    let order = web::block(move || service.cancel(id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::json;

    use super::*;
    use crate::handlers::routes;
    use crate::handlers::test_support::TestState;
    use crate::infrastructure::InMemoryStore;

    #[actix_web::test]
    async fn place_pay_and_cancel_flow() {
        let state = TestState::new();
        let product_id = state.seed_product("3.99", 5);
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({
                "customerEmail": "a@example.com",
                "items": [{ "productId": product_id, "quantity": 2 }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let order: OrderResponse = test::read_body_json(resp).await;
        assert_eq!(order.status, "CREATED");
        assert_eq!(order.items[0].unit_price, "3.99");
        assert_eq!(order.items[0].quantity, 2);

        let req = test::TestRequest::post()
            .uri(&format!("/orders/{}/pay", order.id))
            .to_request();
        let paid: OrderResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(paid.status, "PAID");

        let req = test::TestRequest::post()
            .uri(&format!("/orders/{}/cancel", order.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri("/orders?status=paid")
            .to_request();
        let listed: Vec<OrderResponse> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, order.id);
    }

    #[actix_web::test]
    async fn out_of_stock_is_a_conflict() {
        let state = TestState::new();
        let product_id = state.seed_product("1.00", 1);
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({
                "customerEmail": "a@example.com",
                "items": [{ "productId": product_id, "quantity": 2 }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("out of stock"));
    }

    #[actix_web::test]
    async fn bad_requests_return_400_and_unknown_ids_404() {
        let state = TestState::new();
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({ "customerEmail": "a@example.com", "items": [] }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({
                "customerEmail": format!("{}@example.com", "a".repeat(255)),
                "items": [{ "productId": Uuid::new_v4(), "quantity": 1 }]
            }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(json!({ "items": "nope" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get()
            .uri("/orders?status=SHIPPED")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get()
            .uri(&format!("/orders/{}", Uuid::new_v4()))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
