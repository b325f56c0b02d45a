use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use foodnova_cart::{CartItem, CartStore, MAX_QTY};
use foodnova_storage::{
    FileStorage, MemoryStorage, Namespace, Result, Storage, StorageBackend, StorageError,
};

/// Memory backend that counts writes and can be told to fail them
#[derive(Default)]
struct CountingBackend {
    inner: MemoryStorage,
    writes: AtomicUsize,
    fail_writes: bool,
}

impl CountingBackend {
    fn with_cart(raw: &str) -> Self {
        Self {
            inner: MemoryStorage::with_entries([("foodnova:cart", raw)]),
            ..Default::default()
        }
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl StorageBackend for CountingBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StorageError::Poisoned);
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key)
    }
}

fn storage(backend: &Arc<CountingBackend>) -> Storage {
    Storage::new(backend.clone(), Namespace::default())
}

const SAVED: &str = r#"[
    {"product_id": 1, "pack_variant_id": null, "name": "Suya", "price": 500, "image_url": "/suya.jpg", "qty": 2},
    {"product_id": null, "pack_variant_id": 4, "name": "Party Pack - Small", "price": 8000, "image_url": null, "qty": 1}
]"#;

#[test]
fn test_hydration_restores_saved_cart_without_writing() {
    let backend = Arc::new(CountingBackend::with_cart(SAVED));

    let cart = CartStore::load(storage(&backend));

    assert_eq!(cart.len(), 2);
    assert_eq!(cart.items()[0].image_url.as_deref(), Some("/suya.jpg"));
    assert_eq!(cart.total_items(), 3);
    assert_eq!(cart.total_amount(), 9000);
    assert_eq!(backend.writes(), 0);
}

#[test]
fn test_hydration_drops_invalid_lines() {
    let backend = Arc::new(CountingBackend::with_cart(
        r#"[
            {"product_id": 1, "pack_variant_id": null, "name": "Suya", "price": 500, "image_url": null, "qty": 2},
            {"product_id": null, "pack_variant_id": null, "name": "Ghost", "price": 100, "image_url": null, "qty": 1},
            {"product_id": 2, "pack_variant_id": 4, "name": "Both", "price": 100, "image_url": null, "qty": 1},
            {"product_id": 3, "pack_variant_id": null, "name": "Chapman", "price": 800, "image_url": null, "qty": 0},
            {"product_id": 1, "pack_variant_id": null, "name": "Suya again", "price": 900, "image_url": null, "qty": 4294967295}
        ]"#,
    ));

    let cart = CartStore::load(storage(&backend));

    let items = cart.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Suya");
    assert_eq!(items[0].qty, MAX_QTY);
    assert_eq!(backend.writes(), 0);
}

#[test]
fn test_first_mutation_writes_through() {
    let backend = Arc::new(CountingBackend::with_cart(SAVED));
    let cart = CartStore::load(storage(&backend));

    cart.add_item(CartItem::product(1, "Suya", 500, None, 1));

    assert_eq!(backend.writes(), 1);
    let stored: Vec<CartItem> = storage(&backend).get_json("cart").unwrap().unwrap();
    assert_eq!(stored, cart.items());
    assert_eq!(stored[0].qty, 3);
}

#[test]
fn test_out_of_range_mutations_do_not_write() {
    let backend = Arc::new(CountingBackend::default());
    let cart = CartStore::load(storage(&backend));

    cart.remove_item(0);
    cart.update_qty(2, 4);

    assert_eq!(backend.writes(), 0);
}

#[test]
fn test_corrupt_cart_is_not_overwritten_on_load() {
    let backend = Arc::new(CountingBackend::with_cart("{not json"));

    let cart = CartStore::load(storage(&backend));

    assert!(cart.is_empty());
    assert_eq!(backend.writes(), 0);
    assert_eq!(
        storage(&backend).get("cart").unwrap().as_deref(),
        Some("{not json")
    );
}

#[test]
fn test_failed_write_keeps_memory_state() {
    let backend = Arc::new(CountingBackend {
        fail_writes: true,
        ..Default::default()
    });
    let cart = CartStore::load(storage(&backend));

    cart.add_item(CartItem::pack_variant(4, "Party Pack - Small", 8000, 2));

    assert_eq!(backend.writes(), 1);
    assert_eq!(cart.total_amount(), 16000);
}

#[test]
fn test_cart_survives_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let storage = Storage::new(Arc::new(FileStorage::new(&path)), Namespace::default());
        let cart = CartStore::load(storage);
        cart.add_item(CartItem::product(1, "Suya", 500, None, 1));
        cart.add_item(CartItem::product(2, "Chapman", 800, None, 2));
        cart.remove_item(0);
    }

    let storage = Storage::new(Arc::new(FileStorage::new(&path)), Namespace::default());
    let cart = CartStore::load(storage);

    assert_eq!(cart.len(), 1);
    assert_eq!(cart.items()[0].name, "Chapman");
    assert_eq!(cart.total_amount(), 1600);
}
