//! Queries over the `user`, `category` and `item` tables
//!
//! Every function takes a connection so handlers can run a whole request
//! inside one transaction.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use super::models::{Category, Item, NewItem};
use crate::auth::models::{NewUser, User};

const USER_COLUMNS: &str = "user_id, user_name, user_email, user_picture, password_hash";
const ITEM_COLUMNS: &str =
    "item_id, item_name, item_description, item_price, item_date, category_id";

// ============================================================================
// Users
// ============================================================================

pub async fn find_user(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM user WHERE user_id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn find_user_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM user WHERE user_email = ?",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(&mut *conn)
    .await
}

/// Display names are not unique; the oldest account wins.
pub async fn find_user_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM user WHERE user_name = ? ORDER BY user_id LIMIT 1",
        USER_COLUMNS
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn create_user(conn: &mut SqliteConnection, new_user: &NewUser) -> Result<User, sqlx::Error> {
    let user_id = sqlx::query(
        "INSERT INTO user (user_name, user_email, user_picture, password_hash) VALUES (?, ?, ?, ?)",
    )
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.picture)
    .bind(&new_user.password_hash)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    info!(user_id = user_id, "Created user");

    find_user(conn, user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

pub async fn list_users(conn: &mut SqliteConnection) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM user ORDER BY user_id", USER_COLUMNS))
        .fetch_all(&mut *conn)
        .await
}

// ============================================================================
// Categories
// ============================================================================

pub async fn list_categories(conn: &mut SqliteConnection) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT category_id, category_name, user_id FROM category ORDER BY category_name ASC, category_id ASC",
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn list_categories_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT category_id, category_name, user_id FROM category WHERE user_id = ? ORDER BY category_name ASC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn find_category(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT category_id, category_name, user_id FROM category WHERE category_id = ?",
    )
    .bind(category_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn find_owned_category_by_name(
    conn: &mut SqliteConnection,
    user_id: i64,
    name: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT category_id, category_name, user_id FROM category WHERE user_id = ? AND category_name = ? LIMIT 1",
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn create_category(
    conn: &mut SqliteConnection,
    name: &str,
    user_id: i64,
) -> Result<Category, sqlx::Error> {
    let category_id = sqlx::query("INSERT INTO category (category_name, user_id) VALUES (?, ?)")
        .bind(name)
        .bind(user_id)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    info!(category_id = category_id, user_id = user_id, "Created category");

    find_category(conn, category_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// The owner column is never written after insert.
pub async fn rename_category(
    conn: &mut SqliteConnection,
    category_id: i64,
    name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE category SET category_name = ? WHERE category_id = ?")
        .bind(name)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Deletes the category and every item in it. Callers run this inside a
/// transaction so the two statements land together.
pub async fn delete_category(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<u64, sqlx::Error> {
    let items = sqlx::query("DELETE FROM item WHERE category_id = ?")
        .bind(category_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM category WHERE category_id = ?")
        .bind(category_id)
        .execute(&mut *conn)
        .await?;

    info!(category_id = category_id, items_deleted = items, "Deleted category");

    Ok(items)
}

// ============================================================================
// Items
// ============================================================================

pub async fn list_items(conn: &mut SqliteConnection) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!("SELECT {} FROM item ORDER BY item_id", ITEM_COLUMNS))
        .fetch_all(&mut *conn)
        .await
}

/// Newest items first
pub async fn latest_items(conn: &mut SqliteConnection, limit: i64) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!(
        "SELECT {} FROM item ORDER BY item_date DESC, item_id DESC LIMIT ?",
        ITEM_COLUMNS
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

pub async fn items_in_category(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<Vec<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!(
        "SELECT {} FROM item WHERE category_id = ? ORDER BY item_name ASC",
        ITEM_COLUMNS
    ))
    .bind(category_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn find_item(conn: &mut SqliteConnection, item_id: i64) -> Result<Option<Item>, sqlx::Error> {
    sqlx::query_as::<_, Item>(&format!("SELECT {} FROM item WHERE item_id = ?", ITEM_COLUMNS))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Insert timestamp: the wall clock, but never earlier than the newest stored item.
async fn next_item_date(conn: &mut SqliteConnection) -> Result<String, sqlx::Error> {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string();
    let latest: Option<String> = sqlx::query_scalar("SELECT MAX(item_date) FROM item")
        .fetch_one(&mut *conn)
        .await?;

    Ok(match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    })
}

pub async fn create_item(conn: &mut SqliteConnection, new_item: &NewItem) -> Result<Item, sqlx::Error> {
    let item_date = next_item_date(conn).await?;

    let item_id = sqlx::query(
        r#"
        INSERT INTO item (item_name, item_description, item_price, item_date, category_id)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new_item.name)
    .bind(&new_item.description)
    .bind(&new_item.price)
    .bind(&item_date)
    .bind(new_item.category_id)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    info!(item_id = item_id, category_id = new_item.category_id, "Created item");

    find_item(conn, item_id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Writes every mutable column; `item_date` is left as inserted.
pub async fn update_item(conn: &mut SqliteConnection, item: &Item) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE item
        SET item_name = ?, item_description = ?, item_price = ?, category_id = ?
        WHERE item_id = ?
        "#,
    )
    .bind(&item.item_name)
    .bind(&item.item_description)
    .bind(&item.item_price)
    .bind(item.category_id)
    .bind(item.item_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_item(conn: &mut SqliteConnection, item_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM item WHERE item_id = ?")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
