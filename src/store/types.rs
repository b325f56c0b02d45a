//! Catalog, order and admin payloads

use chrono::NaiveDateTime;
use foodnova_cart::CartItem;
use serde::{Deserialize, Serialize};

/// Default payment method for new orders
pub const DEFAULT_PAYMENT_METHOD: &str = "etransfer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCreate {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub stock_qty: i64,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.stock_qty > 0
    }

    /// Cart line for this product
    pub fn to_cart_item(&self, qty: u32) -> CartItem {
        CartItem::product(self.id, &self.name, self.price, self.image_url.clone(), qty)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: i64,
    pub stock_qty: i64,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
}

/// Partial product update. Unset fields are left alone by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_qty: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Pack as listed on the storefront
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub variant_count: i64,
    #[serde(default)]
    pub min_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pack {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub variants: Vec<PackVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackVariant {
    pub id: i64,
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub items: Vec<PackVariantItem>,
}

impl PackVariant {
    /// Cart line for this variant, named `"{pack} - {variant}"`
    pub fn to_cart_item(&self, pack_name: &str, qty: u32) -> CartItem {
        CartItem::pack_variant(
            self.id,
            format!("{} - {}", pack_name, self.name),
            self.price,
            qty,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackVariantItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackCreate {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub variants: Vec<PackVariantCreate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PackUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackVariantCreate {
    pub name: String,
    pub price: i64,
    pub items: Vec<PackVariantItemCreate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PackVariantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackVariantItemCreate {
    pub product_id: i64,
    pub qty: i64,
}

/// Acknowledgement returned by admin mutations
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemCreate {
    pub product_id: Option<i64>,
    pub pack_variant_id: Option<i64>,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderCreate {
    pub items: Vec<OrderItemCreate>,
    pub delivery_address: String,
    pub phone: String,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: Option<i64>,
    pub name_snapshot: String,
    pub unit_price: i64,
    pub qty: i64,
    pub line_total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub total_amount: i64,
    pub delivery_address: String,
    pub phone: String,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub has_receipt: bool,
    #[serde(default)]
    pub receipt_status: Option<String>,
}

/// Order as it appears in a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub status: String,
    pub total_amount: i64,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusUpdate {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Receipt {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub file_url: String,
    #[serde(with = "timestamp")]
    pub uploaded_at: NaiveDateTime,
    pub status: String,
    #[serde(default)]
    pub admin_note: Option<String>,
}

/// `approved` or `rejected`, with an optional note for the customer
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptStatusUpdate {
    pub status: String,
    pub admin_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub method: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub status: String,
    #[serde(default, with = "timestamp::option")]
    pub verified_at: Option<NaiveDateTime>,
}

/// `verified` or `failed`
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusUpdate {
    pub status: String,
}

fn default_true() -> bool {
    true
}

/// Server timestamps arrive either naive (`2024-05-01T12:30:00.123456`) or
/// with an offset. Offsets are normalised to UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer};

    pub(super) fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Ok(dt.naive_utc()),
            Err(_) => raw.parse::<NaiveDateTime>(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
