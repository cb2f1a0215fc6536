pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::order_service::OrderService;
use application::product_service::ProductService;
use domain::ports::UnitOfWork;
use infrastructure::DieselUnitOfWork;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
    ),
    components(schemas(
        handlers::orders::CreateOrderRequest,
        handlers::orders::CreateOrderItemRequest,
        handlers::orders::UpdateOrderRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderItemResponse,
        handlers::orders::ListOrdersResponse,
        handlers::products::CreateProductRequest,
        handlers::products::UpdateProductRequest,
        handlers::products::ProductResponse,
        handlers::products::DeleteProductResponse,
        domain::order::PaymentMethod,
        domain::order::OrderStatus,
        domain::product::Category,
    )),
    tags(
        (name = "orders", description = "Order lifecycle and stock reservation"),
        (name = "products", description = "Product catalog"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Register services, extractor error handlers and the `/orders` and
/// `/products` routes on top of `uow`.
pub fn configure(cfg: &mut web::ServiceConfig, uow: Arc<dyn UnitOfWork>) {
    cfg.app_data(web::Data::new(OrderService::new(uow.clone())))
        .app_data(web::Data::new(ProductService::new(uow)))
        .app_data(handlers::json_config())
        .app_data(handlers::path_config())
        .app_data(handlers::query_config())
        .service(
            web::scope("/orders")
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::orders::create_order))
                        .route(web::get().to(handlers::orders::list_orders)),
                )
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(handlers::orders::get_order))
                        .route(web::patch().to(handlers::orders::update_order)),
                ),
        )
        .service(
            web::scope("/products")
                .service(
                    web::resource("")
                        .route(web::post().to(handlers::products::create_product))
                        .route(web::get().to(handlers::products::list_products)),
                )
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(handlers::products::get_product))
                        .route(web::patch().to(handlers::products::update_product))
                        .route(web::delete().to(handlers::products::delete_product)),
                ),
        );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let uow: Arc<dyn UnitOfWork> = Arc::new(DieselUnitOfWork::new(pool));
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        let uow = uow.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| configure(cfg, uow))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use utoipa::openapi::RefOr;

    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in ["/orders", "/orders/{id}", "/products", "/products/{id}"] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {}",
                expected
            );
        }
    }

    #[test]
    fn order_update_documents_its_failure_modes() {
        let doc = ApiDoc::openapi();
        let patch = doc
            .paths
            .paths
            .get("/orders/{id}")
            .and_then(|item| item.patch.as_ref())
            .expect("PATCH /orders/{id} is documented");

        let description = |code: &str| match patch.responses.responses.get(code) {
            Some(RefOr::T(response)) => response.description.clone(),
            _ => String::new(),
        };
        assert_eq!(description("400"), "Malformed request");
        assert_eq!(description("404"), "Order not found");
        assert_eq!(description("409"), "Insufficient stock to reopen");
    }
}
