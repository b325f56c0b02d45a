use serde::{Deserialize, Serialize};

/// Largest quantity a single line can hold. Larger requests are clamped.
pub const MAX_QTY: u32 = 9_999;

/// One line in the cart: either a plain product or a pack variant. Exactly
/// one of the two ids is set; see [`is_valid`](Self::is_valid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Option<i64>,
    pub pack_variant_id: Option<i64>,
    pub name: String,
    /// Unit price in whole naira
    pub price: i64,
    pub image_url: Option<String>,
    pub qty: u32,
}

impl CartItem {
    /// A plain product line
    pub fn product(
        product_id: i64,
        name: impl Into<String>,
        price: i64,
        image_url: Option<String>,
        qty: u32,
    ) -> Self {
        Self {
            product_id: Some(product_id),
            pack_variant_id: None,
            name: name.into(),
            price,
            image_url,
            qty,
        }
    }

    /// A pack variant line. Pack lines carry no image.
    pub fn pack_variant(pack_variant_id: i64, name: impl Into<String>, price: i64, qty: u32) -> Self {
        Self {
            product_id: None,
            pack_variant_id: Some(pack_variant_id),
            name: name.into(),
            price,
            image_url: None,
            qty,
        }
    }

    /// Exactly one of `product_id` and `pack_variant_id` is set.
    pub fn is_valid(&self) -> bool {
        self.product_id.is_some() != self.pack_variant_id.is_some()
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            product_id: self.product_id,
            pack_variant_id: self.pack_variant_id,
        }
    }

    /// `price * qty`, saturating at the bounds of `i64`
    pub fn line_total(&self) -> i64 {
        self.price.saturating_mul(i64::from(self.qty))
    }

    pub fn to_order_line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            pack_variant_id: self.pack_variant_id,
            qty: self.qty,
        }
    }
}

/// Identity of a cart line. Two items with the same key are the same line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub product_id: Option<i64>,
    pub pack_variant_id: Option<i64>,
}

/// What the order endpoint needs from each cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Option<i64>,
    pub pack_variant_id: Option<i64>,
    pub qty: u32,
}

impl OrderLine {
    pub fn key(&self) -> ItemKey {
        ItemKey {
            product_id: self.product_id,
            pack_variant_id: self.pack_variant_id,
        }
    }
}
