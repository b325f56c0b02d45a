use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use foodnova_storage::Storage;
use log::{debug, error, warn};

use crate::item::{CartItem, ItemKey, OrderLine, MAX_QTY};

/// Storage key holding the JSON-encoded item sequence
pub const CART_KEY: &str = "cart";

#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartItem>,
    is_open: bool,
}

/// Ordered, persisted cart.
///
/// The item sequence is read from storage once, in [`CartStore::load`], and
/// written back after every mutation that changes it. Totals are computed
/// from the sequence on each call.
#[derive(Debug)]
pub struct CartStore {
    storage: Storage,
    state: RwLock<CartState>,
}

impl CartStore {
    /// Hydrates the cart from `storage`. Never writes.
    ///
    /// A missing entry gives an empty cart. An entry that fails to decode is
    /// logged and also gives an empty cart; the stored value is left in place
    /// until the first mutation replaces it. Stored lines go through the same
    /// rules as [`add_item`](Self::add_item): lines without exactly one id or
    /// with zero quantity are dropped, repeated keys are merged and quantities
    /// are capped at [`MAX_QTY`].
    pub fn load(storage: Storage) -> Self {
        let items = match storage.get_json::<Vec<CartItem>>(CART_KEY) {
            Ok(Some(items)) => normalize(items),
            Ok(None) => Vec::new(),
            Err(err) => {
                error!("Failed to load cart: {}", err);
                Vec::new()
            }
        };
        debug!("Hydrated cart with {} items", items.len());

        Self {
            storage,
            state: RwLock::new(CartState {
                items,
                is_open: false,
            }),
        }
    }

    /// Adds `item`, merging it into an existing line with the same key.
    ///
    /// On merge only the quantity changes; the existing line keeps its name,
    /// price and image. The merged quantity is capped at [`MAX_QTY`].
    /// Items that do not carry exactly one id are rejected.
    pub fn add_item(&self, item: CartItem) {
        if !item.is_valid() {
            warn!("Ignoring cart item {:?} without exactly one id", item.name);
            return;
        }
        if item.qty == 0 {
            debug!("Ignoring cart item with zero quantity");
            return;
        }
        self.mutate(|items| {
            merge(items, item);
            true
        });
    }

    /// Sets the quantity of the line at `index`. Anything below 1 removes it,
    /// anything above [`MAX_QTY`] is capped.
    pub fn update_qty(&self, index: usize, qty: i64) {
        if qty < 1 {
            self.remove_item(index);
            return;
        }
        let qty = u32::try_from(qty).map_or(MAX_QTY, |qty| qty.min(MAX_QTY));
        self.mutate(|items| match items.get_mut(index) {
            Some(item) => {
                item.qty = qty;
                true
            }
            None => false,
        });
    }

    pub fn remove_item(&self, index: usize) {
        self.mutate(|items| {
            if index < items.len() {
                items.remove(index);
                true
            } else {
                false
            }
        });
    }

    pub fn clear_cart(&self) {
        self.mutate(|items| {
            items.clear();
            true
        });
    }

    /// Takes `lines` out of the cart, as after a placed order.
    ///
    /// Each line's quantity is subtracted from the cart line with the same
    /// key; lines that reach zero are removed. Anything added since `lines`
    /// were read stays in the cart.
    pub fn remove_ordered(&self, lines: &[OrderLine]) {
        let mut ordered: HashMap<ItemKey, u32> = HashMap::new();
        for line in lines {
            let qty = ordered.entry(line.key()).or_default();
            *qty = qty.saturating_add(line.qty);
        }
        self.mutate(|items| {
            let before = items.len();
            let mut changed = false;
            items.retain_mut(|item| match ordered.get(&item.key()) {
                Some(&qty) => {
                    changed = true;
                    item.qty = item.qty.saturating_sub(qty);
                    item.qty > 0
                }
                None => true,
            });
            debug!("Removed {} ordered lines", before - items.len());
            changed
        });
    }

    /// Snapshot of the current lines, in insertion order
    pub fn items(&self) -> Vec<CartItem> {
        self.read().items.clone()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().items.is_empty()
    }

    /// Sum of quantities
    pub fn total_items(&self) -> u64 {
        self.read().items.iter().map(|item| u64::from(item.qty)).sum()
    }

    /// Sum of `price * qty`, saturating at the bounds of `i64`
    pub fn total_amount(&self) -> i64 {
        self.read()
            .items
            .iter()
            .map(CartItem::line_total)
            .fold(0, i64::saturating_add)
    }

    /// Lines in the shape the order endpoint takes
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.read()
            .items
            .iter()
            .map(CartItem::to_order_line)
            .collect()
    }

    /// Whether the cart drawer is showing. Not persisted.
    pub fn is_open(&self) -> bool {
        self.read().is_open
    }

    pub fn set_open(&self, open: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .is_open = open;
    }

    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate(&self, apply: impl FnOnce(&mut Vec<CartItem>) -> bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !apply(&mut state.items) {
            debug!("Nothing changed in cart");
            return;
        }
        // persisted under the lock so storage sees writes in mutation order
        if let Err(err) = self.storage.set_json(CART_KEY, &state.items) {
            warn!("Failed to save cart: {}", err);
        }
    }
}

/// Adds `item` to the line with the same key, or appends it.
fn merge(items: &mut Vec<CartItem>, mut item: CartItem) {
    let key = item.key();
    match items.iter_mut().find(|existing| existing.key() == key) {
        Some(existing) => existing.qty = existing.qty.saturating_add(item.qty).min(MAX_QTY),
        None => {
            item.qty = item.qty.min(MAX_QTY);
            items.push(item);
        }
    }
}

fn normalize(stored: Vec<CartItem>) -> Vec<CartItem> {
    let count = stored.len();
    let mut items = Vec::with_capacity(count);
    for item in stored {
        if item.is_valid() && item.qty > 0 {
            merge(&mut items, item);
        }
    }
    if items.len() != count {
        warn!("Dropped or merged {} stored cart lines", count - items.len());
    }
    items
}
