//! Server-rendered HTML pages
//!
//! Plain `format!` templates. Every user-supplied value goes through
//! `escape_html` before it is interpolated.

use super::models::{Category, Item};
use crate::common::escape_html;

/// Header data shared by every page
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub user_name: Option<String>,
    pub user_picture: Option<String>,
    pub flashes: Vec<String>,
}

impl Chrome {
    pub fn logged_in(&self) -> bool {
        self.user_name.is_some()
    }
}

pub fn category_url(category: &Category) -> String {
    format!("/catalog/category/{}", category.category_id)
}

pub fn item_url(item_id: i64) -> String {
    format!("/catalog/item/{}", item_id)
}

fn layout(title: &str, chrome: &Chrome, body: &str) -> String {
    let account = match &chrome.user_name {
        Some(name) => {
            let avatar = chrome
                .user_picture
                .as_deref()
                .map(|src| {
                    format!(
                        r#"<img class="avatar" src="{}" alt="" width="32" height="32"> "#,
                        escape_html(src)
                    )
                })
                .unwrap_or_default();
            format!(
                r#"{}<span>{}</span> <a href="/oauth/disconnect">Logout</a>"#,
                avatar,
                escape_html(name)
            )
        }
        None => r#"<a href="/login">Login</a>"#.to_string(),
    };

    let flashes = if chrome.flashes.is_empty() {
        String::new()
    } else {
        let entries: String = chrome
            .flashes
            .iter()
            .map(|m| format!("<li>{}</li>", escape_html(m)))
            .collect();
        format!(r#"<ul class="flashes">{}</ul>"#, entries)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<header><a href="/catalog">Catalog</a> <nav>{account}</nav></header>
{flashes}
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        account = account,
        flashes = flashes,
        body = body,
    )
}

fn category_list(categories: &[Category]) -> String {
    let entries: String = categories
        .iter()
        .map(|c| {
            format!(
                r#"<li><a href="{}">{}</a></li>"#,
                category_url(c),
                escape_html(&c.category_name)
            )
        })
        .collect();
    format!(r#"<ul class="categories">{}</ul>"#, entries)
}

fn category_name(categories: &[Category], category_id: i64) -> &str {
    categories
        .iter()
        .find(|c| c.category_id == category_id)
        .map(|c| c.category_name.as_str())
        .unwrap_or("")
}

pub fn catalog_page(chrome: &Chrome, categories: &[Category], latest: &[Item]) -> String {
    let add = if chrome.logged_in() {
        r#"<p><a href="/catalog/category/new">Add Category</a></p>"#
    } else {
        ""
    };

    let items: String = latest
        .iter()
        .map(|item| {
            format!(
                r#"<li><a href="{}">{}</a> <small>({})</small></li>"#,
                item_url(item.item_id),
                escape_html(&item.item_name),
                escape_html(category_name(categories, item.category_id))
            )
        })
        .collect();

    let body = format!(
        r#"<section><h2>Categories</h2>{add}{categories}</section>
<section><h2>Latest Items</h2><ul class="items">{items}</ul></section>"#,
        add = add,
        categories = category_list(categories),
        items = items,
    );

    layout("Catalog", chrome, &body)
}

pub fn category_page(
    chrome: &Chrome,
    category: &Category,
    categories: &[Category],
    items: &[Item],
    creator: bool,
) -> String {
    let actions = if creator {
        let base = category_url(category);
        format!(
            r#"<p><a href="{base}/item/new">Add Item</a> | <a href="{base}/edit">Edit Category</a> | <a href="{base}/delete">Delete Category</a></p>"#,
            base = base
        )
    } else {
        String::new()
    };

    let entries: String = items
        .iter()
        .map(|item| {
            format!(
                r#"<li><a href="{}">{}</a></li>"#,
                item_url(item.item_id),
                escape_html(&item.item_name)
            )
        })
        .collect();

    let body = format!(
        r#"<section><h2>Categories</h2>{categories}</section>
<section><h2>{name} ({count} items)</h2>{actions}<ul class="items">{entries}</ul></section>"#,
        categories = category_list(categories),
        name = escape_html(&category.category_name),
        count = items.len(),
        actions = actions,
        entries = entries,
    );

    layout(&category.category_name, chrome, &body)
}

pub fn item_page(chrome: &Chrome, item: &Item, category: &Category, creator: bool) -> String {
    let actions = if creator {
        let base = item_url(item.item_id);
        format!(
            r#"<p><a href="{base}/edit">Edit Item</a> | <a href="{base}/delete">Delete Item</a></p>"#,
            base = base
        )
    } else {
        String::new()
    };

    let body = format!(
        r#"<article>
<h2>{name}</h2>
<p>Category: <a href="{category_url}">{category}</a></p>
<p>Price: {price}</p>
<p>{description}</p>
{actions}
</article>"#,
        name = escape_html(&item.item_name),
        category_url = category_url(category),
        category = escape_html(&category.category_name),
        price = escape_html(item.item_price.as_deref().unwrap_or("")),
        description = escape_html(item.item_description.as_deref().unwrap_or("")),
        actions = actions,
    );

    layout(&item.item_name, chrome, &body)
}

pub fn new_category_form(chrome: &Chrome) -> String {
    let body = r#"<h2>New Category</h2>
<form method="post" action="/catalog/category/new">
<label>Name <input type="text" name="category_name"></label>
<button type="submit">Create</button>
<a href="/catalog">Cancel</a>
</form>"#;
    layout("New Category", chrome, body)
}

pub fn edit_category_form(chrome: &Chrome, category: &Category) -> String {
    let body = format!(
        r#"<h2>Edit Category</h2>
<form method="post" action="{url}/edit">
<label>Name <input type="text" name="category_name" value="{name}"></label>
<button type="submit">Save</button>
<a href="{url}">Cancel</a>
</form>"#,
        url = category_url(category),
        name = escape_html(&category.category_name),
    );
    layout("Edit Category", chrome, &body)
}

pub fn delete_category_form(chrome: &Chrome, category: &Category, item_count: usize) -> String {
    let body = format!(
        r#"<h2>Delete {name}?</h2>
<p>This also deletes its {count} items.</p>
<form method="post" action="{url}/delete">
<button type="submit">Delete</button>
<a href="{url}">Cancel</a>
</form>"#,
        name = escape_html(&category.category_name),
        count = item_count,
        url = category_url(category),
    );
    layout("Delete Category", chrome, &body)
}

pub fn new_item_form(chrome: &Chrome, category: &Category) -> String {
    let body = format!(
        r#"<h2>New Item in {name}</h2>
<form method="post" action="{url}/item/new">
<label>Name <input type="text" name="item_name"></label>
<label>Description <textarea name="item_description"></textarea></label>
<label>Price <input type="text" name="item_price"></label>
<button type="submit">Add</button>
<a href="{url}">Cancel</a>
</form>"#,
        name = escape_html(&category.category_name),
        url = category_url(category),
    );
    layout("New Item", chrome, &body)
}

/// `categories` are the ones the item may be moved into
pub fn edit_item_form(chrome: &Chrome, item: &Item, categories: &[Category]) -> String {
    let options: String = categories
        .iter()
        .map(|c| {
            let selected = if c.category_id == item.category_id {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                c.category_id,
                selected,
                escape_html(&c.category_name)
            )
        })
        .collect();

    let body = format!(
        r#"<h2>Edit {name}</h2>
<form method="post" action="{url}/edit">
<label>Name <input type="text" name="item_name" value="{name}"></label>
<label>Description <textarea name="item_description">{description}</textarea></label>
<label>Price <input type="text" name="item_price" value="{price}"></label>
<label>Category <select name="category_id">{options}</select></label>
<button type="submit">Save</button>
<a href="{url}">Cancel</a>
</form>"#,
        name = escape_html(&item.item_name),
        url = item_url(item.item_id),
        description = escape_html(item.item_description.as_deref().unwrap_or("")),
        price = escape_html(item.item_price.as_deref().unwrap_or("")),
        options = options,
    );
    layout("Edit Item", chrome, &body)
}

pub fn delete_item_form(chrome: &Chrome, item: &Item, category: &Category) -> String {
    let body = format!(
        r#"<h2>Delete {name}?</h2>
<form method="post" action="{url}/delete">
<button type="submit">Delete</button>
<a href="{category_url}">Cancel</a>
</form>"#,
        name = escape_html(&item.item_name),
        url = item_url(item.item_id),
        category_url = category_url(category),
    );
    layout("Delete Item", chrome, &body)
}

/// Login page with the Google code client.
///
/// The script posts the one-time code to `/oauth/google?state=...` with an
/// `X-Requested-With` header and swaps in the welcome fragment on success.
pub fn login_page(chrome: &Chrome, state: &str, client_id: Option<&str>) -> String {
    let body = match client_id {
        Some(client_id) => format!(
            r#"<h2>Login</h2>
<button id="signin">Sign in with Google</button>
<div id="result"></div>
<script src="https://accounts.google.com/gsi/client" async defer></script>
<script>
const STATE = "{state}";
document.getElementById("signin").addEventListener("click", () => {{
  const client = google.accounts.oauth2.initCodeClient({{
    client_id: "{client_id}",
    scope: "openid email profile",
    ux_mode: "popup",
    callback: (response) => {{
      if (!response.code) {{ return; }}
      fetch("/oauth/google?state=" + encodeURIComponent(STATE), {{
        method: "POST",
        headers: {{
          "Content-Type": "application/octet-stream; charset=utf-8",
          "X-Requested-With": "XMLHttpRequest"
        }},
        body: response.code
      }})
        .then((r) => r.text())
        .then((html) => {{
          document.getElementById("result").innerHTML = html + "Redirecting...";
          setTimeout(() => {{ window.location.href = "/catalog"; }}, 4000);
        }});
    }}
  }});
  client.requestCode();
}});
</script>"#,
            state = escape_html(state),
            client_id = escape_html(client_id),
        ),
        None => "<h2>Login</h2>\n<p>No identity provider is configured.</p>".to_string(),
    };

    layout("Login", chrome, &body)
}

/// Fragment returned to the login page script after a successful connect
pub fn welcome_fragment(name: &str, picture: Option<&str>, token: &str) -> String {
    let image = picture
        .map(|src| {
            format!(
                r#"<img src="{}" alt="" style="width: 300px; height: 300px; border-radius: 150px;">"#,
                escape_html(src)
            )
        })
        .unwrap_or_default();

    format!(
        "<h1>Welcome, {}!</h1>{}<h2>Temporary API Token:</h2><p>{}</p>",
        escape_html(name),
        image,
        escape_html(token)
    )
}
