//! Error handling tests for the cart store.

use async_trait::async_trait;
use cart_store::{
    AmountUpdate, CartConfig, CartError, CartStore, DurableStore, FileDurableStore,
    FileStoreConfig, InMemoryStockService, MemoryDurableStore, NoticeKind, Product, ProductId,
    RecordingNotifier, Result, StockRecord, StockService, DEFAULT_CART_KEY,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Stock service whose metadata lookups describe the wrong product.
struct MislabeledStock;

#[async_trait]
impl StockService for MislabeledStock {
    async fn get_stock(&self, product_id: ProductId) -> Result<StockRecord> {
        Ok(StockRecord::new(product_id, 5))
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Product> {
        Ok(Product::new(ProductId(product_id.0 + 1)))
    }
}

fn store_with(stock: Arc<dyn StockService>) -> (CartStore, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let store = CartStore::open(
        CartConfig::default(),
        stock,
        notifier.clone(),
        Arc::new(MemoryDurableStore::new()),
    );
    (store, notifier)
}

#[tokio::test]
async fn test_mismatched_metadata_is_add_failure() {
    let (store, notifier) = store_with(Arc::new(MislabeledStock));

    let err = store.add_product(ProductId(1)).await.unwrap_err();

    assert!(matches!(err, CartError::MalformedResponse(_)));
    assert!(store.cart().is_empty());
    assert_eq!(notifier.kinds(), vec![NoticeKind::AddFailed]);
}

#[tokio::test]
async fn test_metadata_failure_leaves_cart_unchanged() {
    let stock = Arc::new(
        InMemoryStockService::new().with_product(Product::new(ProductId(1)), 5),
    );
    let (store, notifier) = store_with(stock.clone());
    store.add_product(ProductId(1)).await.unwrap();

    // Stock answers, metadata does not
    stock.set_stock(ProductId(2), 5);
    assert!(store.add_product(ProductId(2)).await.is_err());

    assert_eq!(store.cart().len(), 1);
    assert_eq!(notifier.kinds(), vec![NoticeKind::AddFailed]);
}

#[tokio::test]
async fn test_update_with_unreachable_stock() {
    let stock = Arc::new(
        InMemoryStockService::new().with_product(Product::new(ProductId(1)), 5),
    );
    let (store, notifier) = store_with(stock.clone());
    store.add_product(ProductId(1)).await.unwrap();

    stock.set_unavailable(ProductId(1), true);
    let err = store
        .update_product_amount(AmountUpdate::new(1u64, 3))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(store.cart().amount_of(ProductId(1)), 1);
    assert_eq!(notifier.kinds(), vec![NoticeKind::AmountChangeFailed]);
}

#[tokio::test]
async fn test_negative_stock_rejects_everything() {
    let stock = Arc::new(
        InMemoryStockService::new().with_product(Product::new(ProductId(1)), -1),
    );
    let (store, notifier) = store_with(stock);

    assert!(matches!(
        store.add_product(ProductId(1)).await,
        Err(CartError::StockExceeded { available: -1, .. })
    ));
    assert_eq!(notifier.kinds(), vec![NoticeKind::StockExceeded]);
}

#[tokio::test]
async fn test_update_beyond_u32_rejected() {
    let stock = Arc::new(
        InMemoryStockService::new().with_product(Product::new(ProductId(1)), i64::MAX),
    );
    let (store, notifier) = store_with(stock);
    store.add_product(ProductId(1)).await.unwrap();

    let err = store
        .update_product_amount(AmountUpdate::new(1u64, i64::from(u32::MAX) + 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::InvalidTransition { .. }));
    assert_eq!(store.cart().amount_of(ProductId(1)), 1);
    assert_eq!(notifier.kinds(), vec![NoticeKind::AmountChangeFailed]);
}

#[test]
fn test_corrupt_slot_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let config = FileStoreConfig {
        path: dir.path().join("cart"),
        create_if_missing: true,
    };

    let slot = {
        let durable = FileDurableStore::open(config.clone()).unwrap();
        durable
            .set(DEFAULT_CART_KEY, r#"[{"id":1,"amount":2}]"#)
            .unwrap();
        durable.slot_path(DEFAULT_CART_KEY)
    };

    let mut bytes = fs::read(&slot).unwrap();
    let last_payload = bytes.len() - 5;
    bytes[last_payload] ^= 0x01;
    fs::write(&slot, bytes).unwrap();

    let durable = Arc::new(FileDurableStore::open(config).unwrap());
    assert!(matches!(
        durable.get(DEFAULT_CART_KEY),
        Err(CartError::Corruption(_))
    ));

    let store = CartStore::open(
        CartConfig::default(),
        Arc::new(InMemoryStockService::new()),
        Arc::new(RecordingNotifier::new()),
        durable,
    );
    assert!(store.cart().is_empty());
}

#[test]
fn test_truncated_slot_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let config = FileStoreConfig {
        path: dir.path().join("cart"),
        create_if_missing: true,
    };

    let slot = {
        let durable = FileDurableStore::open(config.clone()).unwrap();
        durable
            .set(DEFAULT_CART_KEY, r#"[{"id":1,"amount":2}]"#)
            .unwrap();
        durable.slot_path(DEFAULT_CART_KEY)
    };

    let bytes = fs::read(&slot).unwrap();
    fs::write(&slot, &bytes[..bytes.len() - 3]).unwrap();

    let store = CartStore::open(
        CartConfig::default(),
        Arc::new(InMemoryStockService::new()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(FileDurableStore::open(config).unwrap()),
    );
    assert!(store.cart().is_empty());
}

#[test]
fn test_concurrent_store_access() {
    let dir = TempDir::new().unwrap();
    let config = FileStoreConfig {
        path: dir.path().join("cart"),
        create_if_missing: true,
    };

    let _first = FileDurableStore::open(config.clone()).unwrap();
    assert!(matches!(
        FileDurableStore::open(config),
        Err(CartError::Locked)
    ));
}

#[test]
fn test_flush_reports_storage_failure() {
    let durable = Arc::new(
        MemoryDurableStore::new().with_slot(DEFAULT_CART_KEY, r#"[{"id":1,"amount":2}]"#),
    );
    let store = CartStore::open(
        CartConfig::default(),
        Arc::new(InMemoryStockService::new()),
        Arc::new(RecordingNotifier::new()),
        durable.clone(),
    );

    durable.set_fail_writes(true);
    assert!(matches!(store.flush(), Err(CartError::Persistence(_))));

    durable.set_fail_writes(false);
    store.flush().unwrap();
    assert_eq!(durable.write_count(), 1);
}
