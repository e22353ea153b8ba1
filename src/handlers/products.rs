use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::catalog_service::CatalogService;
use crate::domain::inventory::Inventory;
use crate::domain::ports::Store;
use crate::domain::product::{NewProduct, ProductUpdate, ProductView};
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub initial_stock: i32,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<String>,
    pub active: Option<bool>,
}

/// Exactly one of `delta` and `setTo` must be present.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub delta: Option<i32>,
    pub set_to: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub active: bool,
    pub available: i32,
    pub reserved: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductView> for ProductResponse {
    fn from(view: ProductView) -> Self {
        let p = view.product;
        Self {
            id: p.id,
            name: p.name,
            price: p.price.to_string(),
            active: p.active,
            available: view.available,
            reserved: view.reserved,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryResponse {
    pub product_id: Uuid,
    pub available: i32,
    pub reserved: i32,
    pub version: i64,
}

impl From<Inventory> for InventoryResponse {
    fn from(inv: Inventory) -> Self {
        Self {
            product_id: inv.product_id,
            available: inv.available,
            reserved: inv.reserved,
            version: inv.version,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsParams {
    /// Only products with this active flag
    pub active: Option<bool>,
}

fn parse_price(raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid price '{}': {}", raw, e)))
}

/// POST /products
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn create_product<S: Store>(
    service: web::Data<CatalogService<S>>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let new_product = NewProduct {
        price: parse_price(&body.price)?,
        name: body.name,
        initial_stock: body.initial_stock,
        active: body.active,
    };

    let service = service.into_inner();
    let view = web::block(move || service.create_product(new_product)).await??;
    Ok(HttpResponse::Created().json(ProductResponse::from(view)))
}

/// GET /products
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Products", body = Vec<ProductResponse>),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn list_products<S: Store>(
    service: web::Data<CatalogService<S>>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let active = query.into_inner().active;
    let service = service.into_inner();
    let views = web::block(move || service.list_products(active)).await??;

    let body: Vec<ProductResponse> = views.into_iter().map(ProductResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn get_product<S: Store>(
    service: web::Data<CatalogService<S>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let service = service.into_inner();
    let view = web::block(move || service.get_product(id)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(view)))
}

/// PATCH /products/{id}
///
/// Only the supplied fields change. Placed orders keep the name and price
/// they were placed with.
#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn update_product<S: Store>(
    service: web::Data<CatalogService<S>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let update = ProductUpdate {
        price: body.price.as_deref().map(parse_price).transpose()?,
        name: body.name,
        active: body.active,
    };

    let service = service.into_inner();
    let view = web::block(move || service.update_product(id, update)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(view)))
}

/// POST /products/{id}/stock
#[utoipa::path(
    post,
    path = "/products/{id}/stock",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = InventoryResponse),
        (status = 400, description = "Neither or both of delta and setTo given"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock or concurrent update"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "products"
)]
pub async fn adjust_stock<S: Store>(
    service: web::Data<CatalogService<S>>,
    path: web::Path<Uuid>,
    body: web::Json<AdjustStockRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let AdjustStockRequest { delta, set_to } = body.into_inner();

    let service = service.into_inner();
    let inventory = web::block(move || service.adjust_stock(id, delta, set_to)).await??;
    Ok(HttpResponse::Ok().json(InventoryResponse::from(inventory)))
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
    async fn create_then_fetch_product() {
        let state = TestState::new();
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/products")
            .set_json(json!({ "name": "Milk", "price": "3.99", "initialStock": 4 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ProductResponse = test::read_body_json(resp).await;
        assert!(created.active);
        assert_eq!(created.available, 4);

        let req = test::TestRequest::get()
            .uri(&format!("/products/{}", created.id))
            .to_request();
        let fetched: ProductResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(fetched.price, "3.99");
        assert_eq!(fetched.name, "Milk");
    }

    #[actix_web::test]
    async fn invalid_product_fields_are_rejected() {
        let state = TestState::new();
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;

        for body in [
            json!({ "name": "Milk", "price": "abc", "initialStock": 1 }),
            json!({ "name": "Milk", "price": "0", "initialStock": 1 }),
            json!({ "name": "Milk", "price": "0.50", "initialStock": 1 }),
            json!({ "name": "Milk", "price": "3.999", "initialStock": 1 }),
            json!({ "name": "x".repeat(256), "price": "1.00", "initialStock": 1 }),
            json!({ "name": " ", "price": "1.00", "initialStock": 1 }),
            json!({ "name": "Milk", "price": "1.00", "initialStock": -1 }),
        ] {
            let req = test::TestRequest::post()
                .uri("/products")
                .set_json(body)
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::BAD_REQUEST
            );
        }
    }

    #[actix_web::test]
    async fn patch_and_filter_by_active() {
        let state = TestState::new();
        let id = state.seed_product("1.00", 1);
        state.seed_product("2.00", 1);
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri(&format!("/products/{id}"))
            .set_json(json!({ "active": false, "price": "1.50" }))
            .to_request();
        let updated: ProductResponse = test::call_and_read_body_json(&app, req).await;
        assert!(!updated.active);
        assert_eq!(updated.price, "1.50");

        let req = test::TestRequest::get()
            .uri("/products?active=false")
            .to_request();
        let inactive: Vec<ProductResponse> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].id, id);
    }

    #[actix_web::test]
    async fn stock_adjustment_rules() {
        let state = TestState::new();
        let id = state.seed_product("1.00", 3);
        let app = test::init_service(
            App::new()
                .app_data(state.orders.clone())
                .app_data(state.catalog.clone())
                .configure(routes::<InMemoryStore>),
        )
        .await;
        let uri = format!("/products/{id}/stock");

        let req = test::TestRequest::post()
            .uri(&uri)
            .set_json(json!({ "delta": 2 }))
            .to_request();
        let inv: InventoryResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!((inv.available, inv.version), (5, 1));

        let cases = [
            (json!({ "delta": 1, "setTo": 1 }), StatusCode::BAD_REQUEST),
            (json!({}), StatusCode::BAD_REQUEST),
            (json!({ "delta": -6 }), StatusCode::CONFLICT),
        ];
        for (body, status) in cases {
            let req = test::TestRequest::post()
                .uri(&uri)
                .set_json(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status);
        }

        let req = test::TestRequest::post()
            .uri(&format!("/products/{}/stock", Uuid::new_v4()))
            .set_json(json!({ "setTo": 1 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
