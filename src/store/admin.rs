use std::sync::Arc;

use foodnova_auth::{ApiRequest, HttpGateway};

use super::types::*;
use crate::error::Result;

/// Client for the `/admin` endpoints. The server rejects callers without the
/// admin role.
#[derive(Debug, Clone)]
pub struct AdminClient {
    gateway: Arc<HttpGateway>,
}

impl AdminClient {
    pub fn new(gateway: Arc<HttpGateway>) -> Self {
        Self { gateway }
    }

    pub async fn get_orders(&self) -> Result<Vec<OrderSummary>> {
        Ok(self.gateway.execute(ApiRequest::get("/admin/orders")).await?)
    }

    pub async fn get_order(&self, order_id: i64) -> Result<Order> {
        let request = ApiRequest::get(format!("/admin/orders/{}", order_id));
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn update_order_status(&self, order_id: i64, status: &str) -> Result<Order> {
        let request = ApiRequest::patch(format!("/admin/orders/{}", order_id)).json(
            &OrderStatusUpdate {
                status: status.to_string(),
            },
        )?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn get_products(&self) -> Result<Vec<Product>> {
        Ok(self.gateway.execute(ApiRequest::get("/admin/products")).await?)
    }

    pub async fn create_product(&self, product: &ProductCreate) -> Result<Product> {
        let request = ApiRequest::post("/admin/products").json(product)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn update_product(&self, product_id: i64, update: &ProductUpdate) -> Result<Product> {
        let request = ApiRequest::patch(format!("/admin/products/{}", product_id)).json(update)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn delete_product(&self, product_id: i64) -> Result<()> {
        let request = ApiRequest::delete(format!("/admin/products/{}", product_id));
        Ok(self.gateway.execute_empty(request).await?)
    }

    pub async fn update_receipt(
        &self,
        receipt_id: i64,
        update: &ReceiptStatusUpdate,
    ) -> Result<Receipt> {
        let request = ApiRequest::patch(format!("/admin/receipts/{}", receipt_id)).json(update)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn update_payment(
        &self,
        payment_id: i64,
        update: &PaymentStatusUpdate,
    ) -> Result<Payment> {
        let request = ApiRequest::patch(format!("/admin/payments/{}", payment_id)).json(update)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .gateway
            .execute(ApiRequest::get("/admin/categories"))
            .await?)
    }

    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let request = ApiRequest::post("/admin/categories").json(&CategoryCreate {
            name: name.to_string(),
        })?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn delete_category(&self, category_id: i64) -> Result<()> {
        let request = ApiRequest::delete(format!("/admin/categories/{}", category_id));
        Ok(self.gateway.execute_empty(request).await?)
    }

    /// All packs, including inactive ones, with variants expanded
    pub async fn get_packs(&self) -> Result<Vec<Pack>> {
        Ok(self.gateway.execute(ApiRequest::get("/admin/packs")).await?)
    }

    pub async fn create_pack(&self, pack: &PackCreate) -> Result<MessageResponse> {
        let request = ApiRequest::post("/admin/packs").json(pack)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn update_pack(&self, pack_id: i64, update: &PackUpdate) -> Result<MessageResponse> {
        let request = ApiRequest::patch(format!("/admin/packs/{}", pack_id)).json(update)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn delete_pack(&self, pack_id: i64) -> Result<MessageResponse> {
        let request = ApiRequest::delete(format!("/admin/packs/{}", pack_id));
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn add_variant(
        &self,
        pack_id: i64,
        variant: &PackVariantCreate,
    ) -> Result<MessageResponse> {
        let request = ApiRequest::post(format!("/admin/packs/{}/variants", pack_id)).json(variant)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn update_variant(
        &self,
        variant_id: i64,
        update: &PackVariantUpdate,
    ) -> Result<MessageResponse> {
        let request =
            ApiRequest::patch(format!("/admin/packs/variants/{}", variant_id)).json(update)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn delete_variant(&self, variant_id: i64) -> Result<MessageResponse> {
        let request = ApiRequest::delete(format!("/admin/packs/variants/{}", variant_id));
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn add_variant_item(
        &self,
        variant_id: i64,
        item: &PackVariantItemCreate,
    ) -> Result<MessageResponse> {
        let request =
            ApiRequest::post(format!("/admin/packs/variants/{}/items", variant_id)).json(item)?;
        Ok(self.gateway.execute(request).await?)
    }

    pub async fn delete_variant_item(&self, item_id: i64) -> Result<MessageResponse> {
        let request = ApiRequest::delete(format!("/admin/packs/variants/items/{}", item_id));
        Ok(self.gateway.execute(request).await?)
    }
}
