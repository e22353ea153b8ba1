pub mod orders;
pub mod products;

use actix_web::web;

use crate::domain::ports::Store;
use crate::errors::AppError;

/// Registers every route. The `OrderService<S>` and `CatalogService<S>` app
/// data must be provided by the caller.
pub fn routes<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(orders::place_order::<S>))
            .route("", web::get().to(orders::list_orders::<S>))
            .route("/{id}", web::get().to(orders::get_order::<S>))
            .route("/{id}/pay", web::post().to(orders::pay_order::<S>))
            .route("/{id}/cancel", web::post().to(orders::cancel_order::<S>)),
    )
    .service(
        web::scope("/products")
            .route("", web::post().to(products::create_product::<S>))
            .route("", web::get().to(products::list_products::<S>))
            .route("/{id}", web::get().to(products::get_product::<S>))
            .route("/{id}", web::patch().to(products::update_product::<S>))
            .route("/{id}/stock", web::post().to(products::adjust_stock::<S>)),
    );
}
