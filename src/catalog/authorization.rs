//! Ownership checks for catalog mutations
//!
//! A category is owned by its creator. An item is owned by whoever owns its
//! category; that owner is looked up, never cached on the item.

use sqlx::SqliteConnection;
use tracing::debug;

use super::models::{Category, Item};
use super::repository;
use crate::auth::Principal;
use crate::common::ApiError;

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Category(&'a Category),
    Item(&'a Item),
}

pub async fn effective_owner(
    conn: &mut SqliteConnection,
    resource: Resource<'_>,
) -> Result<i64, ApiError> {
    match resource {
        Resource::Category(category) => Ok(category.user_id),
        Resource::Item(item) => {
            let category = repository::find_category(conn, item.category_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Cannot find category ID {}", item.category_id))
                })?;
            Ok(category.user_id)
        }
    }
}

pub fn is_owner(principal: &Principal, owner_id: i64) -> bool {
    principal.id == owner_id
}

pub async fn can_mutate(
    conn: &mut SqliteConnection,
    principal: &Principal,
    resource: Resource<'_>,
) -> Result<bool, ApiError> {
    let owner_id = effective_owner(conn, resource).await?;
    let allowed = is_owner(principal, owner_id);

    debug!(
        user_id = principal.id,
        owner_id = owner_id,
        allowed = allowed,
        "Ownership check"
    );

    Ok(allowed)
}

/// `can_mutate`, turning a refusal into `ApiError::Restricted(message)`
pub async fn ensure_can_mutate(
    conn: &mut SqliteConnection,
    principal: &Principal,
    resource: Resource<'_>,
    message: &str,
) -> Result<(), ApiError> {
    if can_mutate(conn, principal, resource).await? {
        Ok(())
    } else {
        Err(ApiError::Restricted(message.to_string()))
    }
}
