use super::handlers::{api, pages};
use axum::{routing::get, Router};

/// Creates the catalog router: HTML pages and the JSON API
pub fn catalog_routes() -> Router {
    Router::new()
        // HTML pages
        .route("/", get(pages::show_catalog))
        .route("/catalog", get(pages::show_catalog))
        .route(
            "/catalog/category/new",
            get(pages::new_category).post(pages::create_category),
        )
        .route("/catalog/category/:category_id", get(pages::show_category))
        .route(
            "/catalog/category/:category_id/edit",
            get(pages::edit_category).post(pages::update_category),
        )
        .route(
            "/catalog/category/:category_id/delete",
            get(pages::delete_category).post(pages::destroy_category),
        )
        .route(
            "/catalog/category/:category_id/item/new",
            get(pages::new_item).post(pages::create_item),
        )
        .route("/catalog/item/:item_id", get(pages::show_item))
        .route(
            "/catalog/item/:item_id/edit",
            get(pages::edit_item).post(pages::update_item),
        )
        .route(
            "/catalog/item/:item_id/delete",
            get(pages::delete_item).post(pages::destroy_item),
        )
        // JSON API
        .route("/api/catalog/categories", get(api::categories_handler))
        .route(
            "/api/catalog/category",
            get(api::category_handler)
                .post(api::category_handler)
                .put(api::category_handler)
                .delete(api::category_handler),
        )
        .route("/api/catalog/items", get(api::items_handler))
        .route(
            "/api/catalog/item",
            get(api::item_handler)
                .post(api::item_handler)
                .put(api::item_handler)
                .delete(api::item_handler),
        )
        .route("/api/catalog/users", get(api::users_handler))
}
