use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace account as returned by `/profile/` and `/register/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub hostel_block: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Product listed for sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub seller: u64,
    #[serde(default)]
    pub seller_name: Option<String>,
    #[serde(default)]
    pub seller_email: Option<String>,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request for an item a buyer is looking for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WantedItem {
    pub id: u64,
    pub user: u64,
    #[serde(default)]
    pub user_email: Option<String>,
    pub title: String,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub max_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Task posted by a student or staff member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gig {
    pub id: u64,
    pub poster: u64,
    #[serde(default)]
    pub poster_name: Option<String>,
    #[serde(default)]
    pub poster_email: Option<String>,
    #[serde(default)]
    pub poster_verified: bool,
    pub title: String,
    pub description: String,
    pub budget: Decimal,
    pub contact_phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Shared study notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub preview_pages: Option<u32>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file attached to a multipart request
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `/token/` and `/token/refresh/` responses.
///
/// The refresh endpoint only includes `refresh` when rotation is enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostel_block: Option<String>,
    #[serde(skip)]
    pub profile_picture: Option<FileUpload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    #[serde(skip)]
    pub image: Option<FileUpload>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip)]
    pub image: Option<FileUpload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewWantedItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WantedItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewGig {
    pub title: String,
    pub description: String,
    pub budget: Decimal,
    pub contact_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_pages: Option<u32>,
    #[serde(skip)]
    pub file: Option<FileUpload>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_pages: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_parses_decimal_strings() {
        let item: Item = serde_json::from_value(json!({
            "id": 7,
            "seller": 3,
            "seller_name": "Asha Rao",
            "seller_email": "asha@campus.edu",
            "title": "Desk lamp",
            "description": "Barely used",
            "price": "450.00",
            "category": "Electronics",
            "image": null,
            "created_at": "2024-03-01T10:15:30.123456Z"
        }))
        .unwrap();

        assert_eq!(item.price, Decimal::new(45000, 2));
        assert_eq!(item.image, None);
    }

    #[test]
    fn test_wanted_item_allows_open_price_range() {
        let wanted: WantedItem = serde_json::from_value(json!({
            "id": 1,
            "user": 2,
            "user_email": "ravi@campus.ac.in",
            "title": "Cycle",
            "min_price": null,
            "max_price": "2000.00",
            "created_at": "2024-03-01T10:15:30Z"
        }))
        .unwrap();

        assert_eq!(wanted.min_price, None);
        assert_eq!(wanted.max_price, Some(Decimal::new(200000, 2)));
    }

    #[test]
    fn test_register_request_omits_unset_fields() {
        let request = RegisterRequest {
            email: "new@campus.edu".into(),
            password: "correct horse".into(),
            first_name: Some("New".into()),
            last_name: None,
            hostel_block: None,
            profile_picture: Some(FileUpload::new("me.png", vec![1, 2, 3])),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"email": "new@campus.edu", "password": "correct horse", "first_name": "New"})
        );
    }

    #[test]
    fn test_user_full_name_trims_missing_parts() {
        let user = User {
            id: 1,
            email: "a@campus.edu".into(),
            first_name: "Asha".into(),
            last_name: String::new(),
            hostel_block: String::new(),
            profile_picture: None,
            is_verified: true,
        };
        assert_eq!(user.full_name(), "Asha");
    }
}
