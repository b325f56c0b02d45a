//! FoodNova cart for Rust
//!
//! [`CartStore`] keeps an ordered list of [`CartItem`]s, one per
//! [`ItemKey`], and persists it through a `foodnova_storage::Storage`.
//! Cart operations are local and cannot fail; storage problems are logged.
//!
//! ```
//! use foodnova_cart::{CartItem, CartStore};
//! use foodnova_storage::Storage;
//!
//! let cart = CartStore::load(Storage::in_memory());
//! cart.add_item(CartItem::product(1, "Suya", 500, None, 1));
//! cart.add_item(CartItem::product(1, "Suya", 500, None, 2));
//!
//! assert_eq!(cart.len(), 1);
//! assert_eq!(cart.total_amount(), 1500);
//! ```

mod item;
mod store;

pub use item::{CartItem, ItemKey, OrderLine, MAX_QTY};
pub use store::{CartStore, CART_KEY};
