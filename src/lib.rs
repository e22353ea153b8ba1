pub mod application;
pub mod config;
pub mod consumer;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod outbox;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::catalog_service::CatalogService;
use application::order_service::OrderService;
use domain::ports::Store;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::pay_order,
        handlers::orders::cancel_order,
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::adjust_stock,
    ),
    components(schemas(
        handlers::orders::PlaceOrderRequest,
        handlers::orders::OrderLineRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderItemResponse,
        handlers::products::CreateProductRequest,
        handlers::products::UpdateProductRequest,
        handlers::products::AdjustStockRequest,
        handlers::products::ProductResponse,
        handlers::products::InventoryResponse,
    )),
    tags(
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "products", description = "Catalog and stock"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server<S: Store>(
    store: Arc<S>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let orders = web::Data::new(OrderService::with_shared(Arc::clone(&store)));
    let catalog = web::Data::new(CatalogService::with_shared(store));
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(orders.clone())
            .app_data(catalog.clone())
            .wrap(Logger::default())
            .configure(handlers::routes::<S>)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/orders",
            "/orders/{id}",
            "/orders/{id}/pay",
            "/orders/{id}/cancel",
            "/products",
            "/products/{id}",
            "/products/{id}/stock",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
