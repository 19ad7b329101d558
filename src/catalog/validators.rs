// src/catalog/validators.rs

use super::models::NewItem;
use crate::auth::models::RegisterUserRequest;
use crate::common::{ValidationResult, Validator};

const MAX_NAME_LENGTH: usize = 250;
const MAX_CATEGORY_NAME_LENGTH: usize = 80;
const MAX_ITEM_NAME_LENGTH: usize = 80;
const MAX_PRICE_LENGTH: usize = 20;

/// Length limits for a registration. Missing fields are answered by the
/// handler with its own fixed message.
pub struct RegistrationValidator;

impl Validator<RegisterUserRequest> for RegistrationValidator {
    fn validate(&self, data: &RegisterUserRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.max_len("name", data.name.as_deref(), MAX_NAME_LENGTH);
        result.max_len("email", data.email.as_deref(), MAX_NAME_LENGTH);

        result
    }
}

/// Validates a category name
pub fn validate_category_name(name: Option<&str>) -> ValidationResult {
    let mut result = ValidationResult::new();
    result.require("category_name", name, "Category name is required");
    result.max_len("category_name", name, MAX_CATEGORY_NAME_LENGTH);
    result
}

pub struct ItemValidator;

impl Validator<NewItem> for ItemValidator {
    fn validate(&self, data: &NewItem) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.require("item_name", Some(&data.name), "Item name is required");
        result.max_len("item_name", Some(&data.name), MAX_ITEM_NAME_LENGTH);
        result.max_len("item_price", data.price.as_deref(), MAX_PRICE_LENGTH);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_accepts_any_email_text() {
        let request = RegisterUserRequest {
            name: Some("Ann".to_string()),
            email: Some("ann-at-example".to_string()),
            password: Some("pw".to_string()),
        };
        assert!(RegistrationValidator.validate(&request).is_valid);
    }

    #[test]
    fn test_registration_limits_name_length() {
        let request = RegisterUserRequest {
            name: Some("n".repeat(MAX_NAME_LENGTH + 1)),
            email: Some("ann@example.com".to_string()),
            password: Some("pw".to_string()),
        };
        let result = RegistrationValidator.validate(&request);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "name");
    }

    #[test]
    fn test_item_limits() {
        let item = NewItem {
            category_id: 1,
            name: "Burton Custom".to_string(),
            description: None,
            price: Some("$".repeat(MAX_PRICE_LENGTH + 1)),
        };
        let result = ItemValidator.validate(&item);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "item_price");
    }
}
