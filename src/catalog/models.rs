use axum::http::Method;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Category {
    pub category_id: i64,
    pub category_name: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Item {
    pub item_id: i64,
    pub item_name: String,
    pub item_description: Option<String>,
    pub item_price: Option<String>, // opaque text, e.g. "$290"
    pub item_date: String,          // RFC 3339, UTC, microsecond precision
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<String>,
}

impl From<&Item> for NewItem {
    fn from(item: &Item) -> Self {
        Self {
            category_id: item.category_id,
            name: item.item_name.clone(),
            description: item.item_description.clone(),
            price: item.item_price.clone(),
        }
    }
}

/// Fields to overwrite on an item; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
}

impl ItemChanges {
    pub fn apply(self, item: &mut Item) {
        if let Some(category_id) = self.category_id {
            item.category_id = category_id;
        }
        if let Some(name) = self.name {
            item.item_name = name;
        }
        if let Some(description) = self.description {
            item.item_description = Some(description);
        }
        if let Some(price) = self.price {
            item.item_price = Some(price);
        }
    }
}

// ============================================================================
// API payloads
// ============================================================================

/// Body of /api/catalog/category
#[derive(Debug, Default, Deserialize)]
pub struct CategoryRequest {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryCommand {
    Get { id: i64 },
    Create { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
}

impl CategoryCommand {
    pub fn from_request(method: &Method, request: CategoryRequest) -> Result<Self, ApiError> {
        let name = non_blank(request.name);

        let command = match (method.as_str(), request.id, name) {
            ("GET", Some(id), _) => CategoryCommand::Get { id },
            ("POST", _, Some(name)) => CategoryCommand::Create { name },
            ("PUT", Some(id), Some(name)) => CategoryCommand::Rename { id, name },
            ("DELETE", Some(id), _) => CategoryCommand::Delete { id },
            _ => {
                return Err(ApiError::BadRequest(
                    "No valid key/value data for category request".to_string(),
                ))
            }
        };

        Ok(command)
    }
}

/// Body of /api/catalog/item
#[derive(Debug, Default, Deserialize)]
pub struct ItemRequest {
    pub category_id: Option<i64>,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemCommand {
    Get { id: i64 },
    Create(NewItem),
    Update { id: i64, changes: ItemChanges },
    Delete { id: i64 },
}

impl ItemCommand {
    pub fn from_request(method: &Method, request: ItemRequest) -> Result<Self, ApiError> {
        let name = non_blank(request.name);
        let price = non_blank(request.price);
        let description = non_blank(request.description);

        let command = match (method.as_str(), request.id, request.category_id, name) {
            ("GET", Some(id), _, _) => ItemCommand::Get { id },
            ("POST", _, Some(category_id), Some(name)) => ItemCommand::Create(NewItem {
                category_id,
                name,
                description,
                price,
            }),
            ("PUT", Some(id), category_id, name) => ItemCommand::Update {
                id,
                changes: ItemChanges {
                    category_id,
                    name,
                    description,
                    price,
                },
            },
            ("DELETE", Some(id), _, _) => ItemCommand::Delete { id },
            _ => {
                return Err(ApiError::BadRequest(
                    "Cannot find relevant Key/Value pairs".to_string(),
                ))
            }
        };

        Ok(command)
    }
}

// ============================================================================
// HTML forms
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    pub category_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemForm {
    pub item_name: Option<String>,
    pub item_description: Option<String>,
    pub item_price: Option<String>,
    /// Select value; empty when unchanged
    pub category_id: Option<String>,
}

impl ItemForm {
    pub fn into_changes(self) -> Result<ItemChanges, ApiError> {
        let category_id = match non_blank(self.category_id) {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| ApiError::ValidationError("Invalid category".to_string()))?,
            ),
            None => None,
        };

        Ok(ItemChanges {
            category_id,
            name: non_blank(self.item_name),
            description: non_blank(self.item_description),
            price: non_blank(self.item_price),
        })
    }
}

/// Blank strings count as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
