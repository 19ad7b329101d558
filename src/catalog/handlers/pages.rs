// src/catalog/handlers/pages.rs
//! Browser-facing catalog pages
//!
//! GET renders a page or a confirmation form, POST performs the change and
//! redirects with a flash message.

use axum::{
    extract::{Extension, Form, Path},
    response::Response,
};
use std::sync::Arc;
use tracing::info;

use super::super::authorization::{self, Resource};
use super::super::models::{non_blank, Category, CategoryForm, Item, ItemForm, NewItem};
use super::super::repository;
use super::super::validators::{validate_category_name, ItemValidator};
use super::super::views::{self, category_url, item_url};
use super::page::{Page, PageOutcome};
use crate::auth::session::SessionCookie;
use crate::auth::Principal;
use crate::common::{ApiError, AppState, Validator};

const LATEST_ITEMS: i64 = 10;

// ============================================================================
// Shared lookups
// ============================================================================

async fn load_category(page: &mut Page, category_id: i64) -> Result<Category, ApiError> {
    repository::find_category(page.conn(), category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cannot find category ID {}", category_id)))
}

async fn load_item(page: &mut Page, item_id: i64) -> Result<(Item, Category), ApiError> {
    let item = repository::find_item(page.conn(), item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cannot find item ID {}", item_id)))?;
    let category = load_category(page, item.category_id).await?;
    Ok((item, category))
}

async fn is_creator(
    page: &mut Page,
    principal: Option<&Principal>,
    resource: Resource<'_>,
) -> Result<bool, ApiError> {
    match principal {
        Some(principal) => authorization::can_mutate(page.conn(), principal, resource).await,
        None => Ok(false),
    }
}

/// Signed-in user, or a flash-and-redirect outcome for anonymous visitors
async fn require_login(page: &mut Page, message: &str) -> Result<Result<Principal, PageOutcome>, ApiError> {
    Ok(match page.principal().await? {
        Some(principal) => Ok(principal),
        None => Err(page.bounce(message, "/catalog")),
    })
}

// ============================================================================
// Catalog and category pages
// ============================================================================

/// GET / and /catalog
pub async fn show_catalog(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = render_catalog(&mut page).await;
    page.finish(outcome).await
}

async fn render_catalog(page: &mut Page) -> Result<PageOutcome, ApiError> {
    let categories = repository::list_categories(page.conn()).await?;
    let latest = repository::latest_items(page.conn(), LATEST_ITEMS).await?;
    let chrome = page.chrome();
    Ok(PageOutcome::Html(views::catalog_page(&chrome, &categories, &latest)))
}

/// GET /catalog/category/:category_id
pub async fn show_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = render_category(&mut page, category_id).await;
    page.finish(outcome).await
}

async fn render_category(page: &mut Page, category_id: i64) -> Result<PageOutcome, ApiError> {
    let category = load_category(page, category_id).await?;
    let categories = repository::list_categories(page.conn()).await?;
    let items = repository::items_in_category(page.conn(), category_id).await?;

    let principal = page.principal().await?;
    let creator = is_creator(page, principal.as_ref(), Resource::Category(&category)).await?;

    let chrome = page.chrome();
    Ok(PageOutcome::Html(views::category_page(
        &chrome,
        &category,
        &categories,
        &items,
        creator,
    )))
}

/// GET /catalog/category/new
pub async fn new_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = render_new_category(&mut page).await;
    page.finish(outcome).await
}

async fn render_new_category(page: &mut Page) -> Result<PageOutcome, ApiError> {
    if let Err(outcome) = require_login(page, "You need to log in to add a new category").await? {
        return Ok(outcome);
    }
    let chrome = page.chrome();
    Ok(PageOutcome::Html(views::new_category_form(&chrome)))
}

/// POST /catalog/category/new
pub async fn create_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Form(form): Form<CategoryForm>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = submit_new_category(&mut page, form).await;
    page.finish(outcome).await
}

async fn submit_new_category(page: &mut Page, form: CategoryForm) -> Result<PageOutcome, ApiError> {
    let principal = match require_login(page, "You need to log in to add a new category").await? {
        Ok(principal) => principal,
        Err(outcome) => return Ok(outcome),
    };

    let Some(name) = non_blank(form.category_name) else {
        return Ok(page.bounce("You did not create a new Category", "/catalog"));
    };

    let validation = validate_category_name(Some(&name));
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }

    let category = repository::create_category(page.conn(), &name, principal.id).await?;
    info!(
        category_id = category.category_id,
        user_id = principal.id,
        "Category created from web form"
    );

    Ok(page.bounce("New Category created!", category_url(&category)))
}

/// GET /catalog/category/:category_id/edit
pub async fn edit_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = category_edit(&mut page, category_id, None).await;
    page.finish(outcome).await
}

/// POST /catalog/category/:category_id/edit
pub async fn update_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = category_edit(&mut page, category_id, Some(form)).await;
    page.finish(outcome).await
}

async fn category_edit(
    page: &mut Page,
    category_id: i64,
    form: Option<CategoryForm>,
) -> Result<PageOutcome, ApiError> {
    let principal = match require_login(page, "You need to log in to edit a category").await? {
        Ok(principal) => principal,
        Err(outcome) => return Ok(outcome),
    };

    let mut category = load_category(page, category_id).await?;
    if !authorization::can_mutate(page.conn(), &principal, Resource::Category(&category)).await? {
        return Ok(page.bounce(
            "You can only edit your own categories",
            category_url(&category),
        ));
    }

    let new_name = form.and_then(|f| non_blank(f.category_name));
    let Some(name) = new_name else {
        let chrome = page.chrome();
        return Ok(PageOutcome::Html(views::edit_category_form(&chrome, &category)));
    };

    let validation = validate_category_name(Some(&name));
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }

    repository::rename_category(page.conn(), category_id, &name).await?;
    category.category_name = name;

    Ok(page.bounce("Category edited", category_url(&category)))
}

/// GET /catalog/category/:category_id/delete
pub async fn delete_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = category_delete(&mut page, category_id, false).await;
    page.finish(outcome).await
}

/// POST /catalog/category/:category_id/delete
pub async fn destroy_category(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = category_delete(&mut page, category_id, true).await;
    page.finish(outcome).await
}

async fn category_delete(
    page: &mut Page,
    category_id: i64,
    confirmed: bool,
) -> Result<PageOutcome, ApiError> {
    let principal = match require_login(page, "You need to log in to delete a category").await? {
        Ok(principal) => principal,
        Err(outcome) => return Ok(outcome),
    };

    let category = load_category(page, category_id).await?;
    if !authorization::can_mutate(page.conn(), &principal, Resource::Category(&category)).await? {
        return Ok(page.bounce(
            "You can only delete your own categories",
            category_url(&category),
        ));
    }

    if !confirmed {
        let items = repository::items_in_category(page.conn(), category_id).await?;
        let chrome = page.chrome();
        return Ok(PageOutcome::Html(views::delete_category_form(
            &chrome,
            &category,
            items.len(),
        )));
    }

    repository::delete_category(page.conn(), category_id).await?;
    Ok(page.bounce("Category and all its items deleted!", "/catalog"))
}

// ============================================================================
// Item pages
// ============================================================================

/// GET /catalog/item/:item_id
pub async fn show_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(item_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = render_item(&mut page, item_id).await;
    page.finish(outcome).await
}

async fn render_item(page: &mut Page, item_id: i64) -> Result<PageOutcome, ApiError> {
    let (item, category) = load_item(page, item_id).await?;
    let principal = page.principal().await?;
    let creator = is_creator(page, principal.as_ref(), Resource::Item(&item)).await?;

    let chrome = page.chrome();
    Ok(PageOutcome::Html(views::item_page(&chrome, &item, &category, creator)))
}

/// GET /catalog/category/:category_id/item/new
pub async fn new_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = item_add(&mut page, category_id, None).await;
    page.finish(outcome).await
}

/// POST /catalog/category/:category_id/item/new
pub async fn create_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(category_id): Path<i64>,
    Form(form): Form<ItemForm>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = item_add(&mut page, category_id, Some(form)).await;
    page.finish(outcome).await
}

async fn item_add(
    page: &mut Page,
    category_id: i64,
    form: Option<ItemForm>,
) -> Result<PageOutcome, ApiError> {
    let principal = match require_login(page, "You need to log in to add a new item").await? {
        Ok(principal) => principal,
        Err(outcome) => return Ok(outcome),
    };

    let category = load_category(page, category_id).await?;
    if !authorization::can_mutate(page.conn(), &principal, Resource::Category(&category)).await? {
        return Ok(page.bounce(
            "You can only add items in your own categories",
            category_url(&category),
        ));
    }

    let Some(form) = form else {
        let chrome = page.chrome();
        return Ok(PageOutcome::Html(views::new_item_form(&chrome, &category)));
    };

    let changes = form.into_changes()?;
    let Some(name) = changes.name else {
        return Ok(page.bounce("You did not add a new Item", "/catalog"));
    };

    let new_item = NewItem {
        category_id,
        name,
        description: changes.description,
        price: changes.price,
    };

    let validation = ItemValidator.validate(&new_item);
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }

    let item = repository::create_item(page.conn(), &new_item).await?;
    Ok(page.bounce("New Item added!", item_url(item.item_id)))
}

/// GET /catalog/item/:item_id/edit
pub async fn edit_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(item_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = item_edit(&mut page, item_id, None).await;
    page.finish(outcome).await
}

/// POST /catalog/item/:item_id/edit
pub async fn update_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(item_id): Path<i64>,
    Form(form): Form<ItemForm>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = item_edit(&mut page, item_id, Some(form)).await;
    page.finish(outcome).await
}

async fn item_edit(
    page: &mut Page,
    item_id: i64,
    form: Option<ItemForm>,
) -> Result<PageOutcome, ApiError> {
    let principal = match require_login(page, "You need to log in to edit an item").await? {
        Ok(principal) => principal,
        Err(outcome) => return Ok(outcome),
    };

    let (mut item, category) = load_item(page, item_id).await?;
    if !authorization::can_mutate(page.conn(), &principal, Resource::Item(&item)).await? {
        return Ok(page.bounce(
            "You can only edit items in your own categories",
            category_url(&category),
        ));
    }

    let Some(form) = form else {
        let own = repository::list_categories_for_user(page.conn(), principal.id).await?;
        let chrome = page.chrome();
        return Ok(PageOutcome::Html(views::edit_item_form(&chrome, &item, &own)));
    };

    let changes = form.into_changes()?;

    if let Some(target_id) = changes.category_id.filter(|id| *id != item.category_id) {
        let owned = match repository::find_category(page.conn(), target_id).await? {
            Some(target) => {
                authorization::can_mutate(page.conn(), &principal, Resource::Category(&target)).await?
            }
            None => false,
        };
        if !owned {
            return Ok(page.bounce(
                "You must choose one of your own categories for the item",
                item_url(item_id),
            ));
        }
    }

    changes.apply(&mut item);

    let validation = ItemValidator.validate(&NewItem::from(&item));
    if !validation.is_valid {
        return Err(ApiError::from(validation));
    }

    repository::update_item(page.conn(), &item).await?;
    info!(item_id = item_id, user_id = principal.id, "Item edited from web form");

    Ok(page.bounce("Item edited", item_url(item_id)))
}

/// GET /catalog/item/:item_id/delete
pub async fn delete_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(item_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = item_delete(&mut page, item_id, false).await;
    page.finish(outcome).await
}

/// POST /catalog/item/:item_id/delete
pub async fn destroy_item(
    Extension(state): Extension<Arc<AppState>>,
    SessionCookie(cookie): SessionCookie,
    Path(item_id): Path<i64>,
) -> Result<Response, ApiError> {
    let mut page = Page::open(&state, cookie).await?;
    let outcome = item_delete(&mut page, item_id, true).await;
    page.finish(outcome).await
}

async fn item_delete(page: &mut Page, item_id: i64, confirmed: bool) -> Result<PageOutcome, ApiError> {
    let principal = match require_login(page, "You need to log in to delete an item").await? {
        Ok(principal) => principal,
        Err(outcome) => return Ok(outcome),
    };

    let (item, category) = load_item(page, item_id).await?;
    if !authorization::can_mutate(page.conn(), &principal, Resource::Item(&item)).await? {
        return Ok(page.bounce(
            "You can only delete items in your own categories",
            category_url(&category),
        ));
    }

    if !confirmed {
        let chrome = page.chrome();
        return Ok(PageOutcome::Html(views::delete_item_form(&chrome, &item, &category)));
    }

    repository::delete_item(page.conn(), item_id).await?;
    Ok(page.bounce("Item deleted", category_url(&category)))
}
