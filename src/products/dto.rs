use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo::ProductRow;

/// Display-safe seller projection attached to listed products.
#[derive(Debug, Serialize)]
pub struct SellerInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub hostel_block: Option<String>,
    pub hostel_type: Option<String>,
    pub seller: SellerInfo,
    pub seller_name: String,
    pub seller_mobile: String,
    pub image_url: Option<String>,
    pub is_sold: bool,
    pub likes: Vec<Uuid>,
    pub saved_by: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            category: row.category,
            hostel_block: row.hostel_block,
            hostel_type: row.hostel_type,
            seller: SellerInfo {
                id: row.seller,
                name: row.seller_display_name,
                email: row.seller_email,
            },
            seller_name: row.seller_name,
            seller_mobile: row.seller_mobile,
            image_url: row.image_url,
            is_sold: row.is_sold,
            likes: row.likes,
            saved_by: row.saved_by,
            created_at: row.created_at,
        }
    }
}

/// Owner-editable patch. Submitted non-empty values replace stored ones,
/// omitted or empty fields are retained.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub hostel_block: Option<String>,
    pub hostel_type: Option<String>,
    pub image_url: Option<String>,
}

fn submitted(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl UpdateProductRequest {
    pub fn title(&self) -> Option<&str> {
        submitted(&self.title)
    }
    pub fn description(&self) -> Option<&str> {
        submitted(&self.description)
    }
    pub fn category(&self) -> Option<&str> {
        submitted(&self.category)
    }
    pub fn hostel_block(&self) -> Option<&str> {
        submitted(&self.hostel_block)
    }
    pub fn hostel_type(&self) -> Option<&str> {
        submitted(&self.hostel_type)
    }
    pub fn image_url(&self) -> Option<&str> {
        submitted(&self.image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            title: "Study lamp".into(),
            description: "Barely used".into(),
            price: 500,
            category: "Electronics".into(),
            hostel_block: Some("C Block".into()),
            hostel_type: Some("Male".into()),
            seller: Uuid::new_v4(),
            seller_name: "Ravi".into(),
            seller_mobile: "9876543210".into(),
            image_url: None,
            is_sold: false,
            created_at: OffsetDateTime::now_utc(),
            seller_display_name: "Ravi".into(),
            seller_email: "ravi@campus.edu".into(),
            likes: vec![],
            saved_by: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn response_carries_seller_projection_and_sets() {
        let row = sample_row();
        let seller_id = row.seller;
        let saved = row.saved_by.clone();
        let resp = ProductResponse::from(row);
        assert_eq!(resp.seller.id, seller_id);
        assert_eq!(resp.seller.email, "ravi@campus.edu");
        assert_eq!(resp.saved_by, saved);
        assert!(resp.likes.is_empty());
    }

    #[test]
    fn response_serializes_without_leaking_internals() {
        let json = serde_json::to_string(&ProductResponse::from(sample_row())).unwrap();
        assert!(json.contains("Study lamp"));
        assert!(json.contains("\"is_sold\":false"));
        assert!(json.contains("\"price\":500"));
    }

    #[test]
    fn patch_treats_empty_strings_as_absent() {
        let patch = UpdateProductRequest {
            title: Some("".into()),
            description: Some("  New text  ".into()),
            ..Default::default()
        };
        assert_eq!(patch.title(), None);
        assert_eq!(patch.description(), Some("New text"));
        assert_eq!(patch.category(), None);
    }
}
