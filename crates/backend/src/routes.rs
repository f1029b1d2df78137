use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;

/// Конфигурация всех роутов приложения
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // A001 Inbound order
        .route(
            "/api/a001/inbound-orders",
            get(handlers::a001_inbound_order::list_all)
                .post(handlers::a001_inbound_order::create),
        )
        .route(
            "/api/a001/inbound-orders/:id",
            get(handlers::a001_inbound_order::get_by_id),
        )
        .route(
            "/api/a001/inbound-orders/:id/transition",
            post(handlers::a001_inbound_order::transition),
        )
        // A002 Pallet
        .route(
            "/api/a002/pallets",
            get(handlers::a002_pallet::list_all).post(handlers::a002_pallet::create),
        )
        .route(
            "/api/a002/pallets/summary",
            get(handlers::a002_pallet::summary),
        )
        .route(
            "/api/a002/pallets/:id",
            get(handlers::a002_pallet::get_by_id)
                .put(handlers::a002_pallet::update)
                .delete(handlers::a002_pallet::delete),
        )
        .route(
            "/api/a002/pallets/:id/add-quantity",
            post(handlers::a002_pallet::add_quantity),
        )
        .route(
            "/api/a002/pallets/:id/status",
            post(handlers::a002_pallet::set_status),
        )
        // A003 Customer order
        .route(
            "/api/a003/customer-orders",
            get(handlers::a003_customer_order::list_all)
                .post(handlers::a003_customer_order::create),
        )
        .route(
            "/api/a003/customer-orders/:id",
            get(handlers::a003_customer_order::get_by_id),
        )
        .route(
            "/api/a003/customer-orders/:id/availability",
            get(handlers::a003_customer_order::availability),
        )
}
