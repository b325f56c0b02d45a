//! Turning the cart into an order

use log::{info, warn};

use crate::error::{Error, Result};
use crate::store::{Order, OrderCreate, OrderItemCreate, DEFAULT_PAYMENT_METHOD};
use crate::Foodnova;

/// Delivery and payment details collected at checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub delivery_address: String,
    pub phone: String,
    pub payment_method: String,
}

impl CheckoutDetails {
    /// Details with the default payment method
    pub fn new(delivery_address: &str, phone: &str) -> Self {
        Self {
            delivery_address: delivery_address.to_string(),
            phone: phone.to_string(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        }
    }

    pub fn with_payment_method(mut self, value: &str) -> Self {
        self.payment_method = value.to_string();
        self
    }
}

impl Foodnova {
    /// Places an order for everything in the cart.
    ///
    /// The submitted lines leave the cart only once the server has accepted
    /// the order. Items added while the request was in flight stay in the
    /// cart. On failure it is left exactly as it was; [`Error::message_or`] with
    /// [`ORDER_FAILED_MESSAGE`](crate::error::ORDER_FAILED_MESSAGE) gives the
    /// text to show.
    pub async fn checkout(&self, details: CheckoutDetails) -> Result<Order> {
        let lines = self.cart().order_lines();
        if lines.is_empty() {
            return Err(Error::EmptyCart);
        }

        let order = OrderCreate {
            items: lines
                .iter()
                .map(|line| OrderItemCreate {
                    product_id: line.product_id,
                    pack_variant_id: line.pack_variant_id,
                    qty: line.qty,
                })
                .collect(),
            delivery_address: details.delivery_address,
            phone: details.phone,
            payment_method: details.payment_method,
        };

        match self.store().create_order(&order).await {
            Ok(created) => {
                info!("Placed order {} for {}", created.id, created.total_amount);
                self.cart().remove_ordered(&lines);
                Ok(created)
            }
            Err(err) => {
                warn!("Checkout failed: {}", err);
                Err(err)
            }
        }
    }
}
