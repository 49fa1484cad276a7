use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_auth::UserAccount;
use storefront_core::UserId;
use storefront_products::ProductDetails;

use crate::app::errors::ApiError;

/// Admin product creation. Missing or blank fields fall back to sample values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub count_in_stock: Option<i64>,
    pub featured: Option<bool>,
}

impl CreateProductRequest {
    pub fn into_details(self) -> ProductDetails {
        fn text(value: Option<String>, fallback: String) -> String {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        }

        let defaults = ProductDetails::default();
        ProductDetails {
            name: text(self.name, defaults.name),
            description: text(self.description, defaults.description),
            price: self.price.unwrap_or(defaults.price),
            images: self.images.unwrap_or(defaults.images),
            brand: text(self.brand, defaults.brand),
            category: text(self.category, defaults.category),
            count_in_stock: self.count_in_stock.unwrap_or(defaults.count_in_stock),
            featured: self.featured.unwrap_or(defaults.featured),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReviewRequest {
    /// Accepts a JSON number or a numeric string.
    pub rating: JsonValue,
    pub comment: String,
}

impl ReviewRequest {
    /// Whole-star rating. Range checks are left to the product aggregate.
    pub fn rating(&self) -> Result<i64, ApiError> {
        let parsed = match &self.rating {
            JsonValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            JsonValue::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| ApiError::bad_request("Rating must be a whole number between 1 and 5"))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UpdateProfileRequest {
    /// Blank fields mean "leave unchanged".
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }
        Self {
            name: clean(self.name),
            email: clean(self.email),
            password: clean(self.password),
        }
    }
}

/// Account view returned by register, login and profile endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserResponse {
    pub fn new(account: &UserAccount, token: Option<String>) -> Self {
        Self {
            id: account.user_id(),
            name: account.name().to_string(),
            email: account.email().to_string(),
            is_admin: account.is_admin(),
            token,
        }
    }
}
