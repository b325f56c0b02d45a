//! Catalog and order endpoints
//!
//! Thin typed wrappers: every call goes through the [`HttpGateway`], so
//! credentials are attached and refreshed the same way everywhere.

mod admin;
mod format;
mod types;

use std::sync::Arc;

use foodnova_auth::{ApiRequest, HttpGateway};
use log::debug;

use crate::error::Result;

pub use admin::AdminClient;
pub use format::format_price;
pub use types::*;

/// Client for the storefront endpoints
#[derive(Debug, Clone)]
pub struct StoreClient {
    gateway: Arc<HttpGateway>,
}

impl StoreClient {
    pub fn new(gateway: Arc<HttpGateway>) -> Self {
        Self { gateway }
    }

    /// Active products, optionally limited to one category
    pub async fn get_products(&self, category_id: Option<i64>) -> Result<Vec<Product>> {
        let mut request = ApiRequest::get("/products");
        if let Some(id) = category_id {
            request = request.query("category_id", id);
        }
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        Ok(self.gateway.execute(ApiRequest::get("/categories")).await?)
    }

    pub async fn get_packs(&self) -> Result<Vec<PackSummary>> {
        Ok(self.gateway.execute(ApiRequest::get("/packs")).await?)
    }

    /// Pack with its variants and their contents
    pub async fn get_pack(&self, pack_id: i64) -> Result<Pack> {
        let request = ApiRequest::get(format!("/packs/{}", pack_id));
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn create_order(&self, order: &OrderCreate) -> Result<Order> {
        debug!("Creating order with {} lines", order.items.len());
        let request = ApiRequest::post("/orders").json(order)?;
        Ok(self.gateway.execute(request).await?)
    }

    /// Orders belonging to the signed-in user
    pub async fn get_my_orders(&self) -> Result<Vec<OrderSummary>> {
        Ok(self.gateway.execute(ApiRequest::get("/orders/my")).await?)
    }

    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        let request = ApiRequest::get(format!("/orders/{}", order_id));
        Ok(self.gateway.execute(request).await?)
    }

    /// Uploads a payment receipt as the multipart field `file`.
    pub async fn upload_receipt(
        &self,
        order_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Receipt> {
        let request = ApiRequest::post(format!("/orders/{}/receipt", order_id)).multipart(
            "file",
            file_name,
            bytes,
            mime_for(file_name),
        );
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn get_receipt(&self, order_id: i64) -> Result<Receipt> {
        let request = ApiRequest::get(format!("/orders/{}/receipt", order_id));
        Ok(self.gateway.execute(request).await?)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
