// src/catalog/handlers/api.rs
//! JSON catalog API

use axum::{
    extract::{Extension, Json},
    http::Method,
};
use serde_json::{json, Value};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::super::authorization::{self, Resource};
use super::super::models::{
    CategoryCommand, CategoryRequest, ItemChanges, ItemCommand, ItemRequest, NewItem,
};
use super::super::repository;
use super::super::validators::{validate_category_name, ItemValidator};
use crate::auth::Principal;
use crate::common::{ApiError, AppState, Validator};

/// GET /api/catalog/categories
pub async fn categories_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.db.acquire().await?;
    let categories = repository::list_categories(&mut conn).await?;

    if categories.is_empty() {
        return Err(ApiError::NotFound("Cannot find any Categories".to_string()));
    }

    Ok(Json(json!({ "categories": categories })))
}

/// GET|POST|PUT|DELETE /api/catalog/category
pub async fn category_handler(
    Extension(state): Extension<Arc<AppState>>,
    principal: Principal,
    method: Method,
    payload: Option<Json<CategoryRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let command = CategoryCommand::from_request(&method, request)?;

    debug!(user_id = principal.id, command = ?command, "Category API request");

    let mut tx = state.db.begin().await?;
    let response = run_category_command(&mut tx, &principal, command).await?;
    tx.commit().await?;

    Ok(Json(response))
}

async fn run_category_command(
    conn: &mut SqliteConnection,
    principal: &Principal,
    command: CategoryCommand,
) -> Result<Value, ApiError> {
    match command {
        CategoryCommand::Get { id } => {
            let category = repository::find_category(conn, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Cannot get category ID {}", id)))?;
            Ok(json!({ "category": category }))
        }
        CategoryCommand::Create { name } => {
            let validation = validate_category_name(Some(&name));
            if !validation.is_valid {
                return Err(ApiError::from(validation));
            }

            if repository::find_owned_category_by_name(conn, principal.id, &name)
                .await?
                .is_some()
            {
                return Err(ApiError::Restricted(format!(
                    "Your already have category {}",
                    name
                )));
            }

            let category = repository::create_category(conn, &name, principal.id).await?;
            Ok(json!({ "category": category }))
        }
        CategoryCommand::Rename { id, name } => {
            let validation = validate_category_name(Some(&name));
            if !validation.is_valid {
                return Err(ApiError::from(validation));
            }

            let mut category = repository::find_category(conn, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Cannot edit category ID {}", id)))?;

            authorization::ensure_can_mutate(
                conn,
                principal,
                Resource::Category(&category),
                "You can only edit your own categories",
            )
            .await?;

            repository::rename_category(conn, id, &name).await?;
            category.category_name = name;
            Ok(json!({ "category": category }))
        }
        CategoryCommand::Delete { id } => {
            let category = repository::find_category(conn, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("cannot delete category ID {}", id)))?;

            authorization::ensure_can_mutate(
                conn,
                principal,
                Resource::Category(&category),
                "you can only delete your own categories",
            )
            .await?;

            repository::delete_category(conn, id).await?;
            Ok(json!({ "message": format!("Category ID {} deleted", id) }))
        }
    }
}

/// GET /api/catalog/items
pub async fn items_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let mut conn = state.db.acquire().await?;
    let items = repository::list_items(&mut conn).await?;

    if items.is_empty() {
        return Err(ApiError::NotFound("Cannot find any Items".to_string()));
    }

    Ok(Json(json!({ "items": items })))
}

/// GET|POST|PUT|DELETE /api/catalog/item
pub async fn item_handler(
    Extension(state): Extension<Arc<AppState>>,
    principal: Principal,
    method: Method,
    payload: Option<Json<ItemRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let command = ItemCommand::from_request(&method, request)?;

    debug!(user_id = principal.id, command = ?command, "Item API request");

    let mut tx = state.db.begin().await?;
    let response = run_item_command(&mut tx, &principal, command).await?;
    tx.commit().await?;

    Ok(Json(response))
}

async fn run_item_command(
    conn: &mut SqliteConnection,
    principal: &Principal,
    command: ItemCommand,
) -> Result<Value, ApiError> {
    match command {
        ItemCommand::Get { id } => {
            let item = repository::find_item(conn, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Cannot find Item ID {}", id)))?;
            Ok(json!({ "item": item }))
        }
        ItemCommand::Create(new_item) => create_item(conn, principal, new_item).await,
        ItemCommand::Update { id, changes } => update_item(conn, principal, id, changes).await,
        ItemCommand::Delete { id } => {
            let item = repository::find_item(conn, id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("Cannot find item ID {}", id)))?;

            authorization::ensure_can_mutate(
                conn,
                principal,
                Resource::Item(&item),
                "You can only delete your own items",
            )
            .await?;

            repository::delete_item(conn, id).await?;
            info!(item_id = id, user_id = principal.id, "Deleted item");
            Ok(json!({ "message": format!("Deleted item with ID {}", id) }))
        }
    }
}

async fn create_item(
    conn: &mut SqliteConnection,
    principal: &Principal,
    new_item: NewItem,
) -> Result<Value, ApiError> {
    let validation = ItemValidator.validate(&new_item);
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }

    let category = repository::find_category(conn, new_item.category_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Category ID not valid: {}", new_item.category_id))
        })?;

    authorization::ensure_can_mutate(
        conn,
        principal,
        Resource::Category(&category),
        "You can only add items to your own categories",
    )
    .await?;

    let item = repository::create_item(conn, &new_item).await?;
    Ok(json!({ "item": item }))
}

async fn update_item(
    conn: &mut SqliteConnection,
    principal: &Principal,
    item_id: i64,
    changes: ItemChanges,
) -> Result<Value, ApiError> {
    let mut item = repository::find_item(conn, item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not valid category or item ID".to_string()))?;

    authorization::ensure_can_mutate(
        conn,
        principal,
        Resource::Item(&item),
        "You can only edit your own items",
    )
    .await?;

    if let Some(category_id) = changes.category_id {
        let target = repository::find_category(conn, category_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Not valid category or item ID".to_string()))?;

        if !authorization::can_mutate(conn, principal, Resource::Category(&target)).await? {
            warn!(
                user_id = principal.id,
                item_id = item_id,
                category_id = category_id,
                "Refused to move item into another user's category"
            );
            return Err(ApiError::Restricted(
                "You must choose one of your own categories for the item".to_string(),
            ));
        }
    }

    changes.apply(&mut item);

    let validation = ItemValidator.validate(&NewItem::from(&item));
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }

    repository::update_item(conn, &item).await?;

    Ok(json!({ "item": item }))
}

/// GET /api/catalog/users
pub async fn users_handler(
    Extension(state): Extension<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Value>, ApiError> {
    debug!(user_id = principal.id, "Listing users");

    let mut conn = state.db.acquire().await?;
    let users = repository::list_users(&mut conn).await?;

    if users.is_empty() {
        return Err(ApiError::NotFound("Cannot find any Users".to_string()));
    }

    Ok(Json(json!({ "users": users })))
}
