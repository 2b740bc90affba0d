//! Flat-file order database.
//!
//! All orders live in one pretty-printed JSON array. Every operation reads the
//! whole file and writes it back through a temp file + rename, under an
//! in-process mutex. Separate processes sharing the file are not coordinated.

use super::{Order, OrderRepository};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

pub struct JsonFileOrderStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileOrderStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<Order>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse order database {}", self.path.display()))
    }

    async fn write_all(&self, orders: &[Order]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(orders).context("Failed to serialize orders")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for JsonFileOrderStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<Order>> {
        let _guard = self.lock.lock().await;
        let orders = self.read_all().await?;
        Ok(orders.into_iter().find(|order| order.code == code))
    }

    async fn update(&self, order: &Order) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut orders = self.read_all().await?;

        let Some(slot) = orders.iter_mut().find(|existing| existing.code == order.code) else {
            return Ok(false);
        };
        *slot = order.clone();

        self.write_all(&orders).await?;
        debug!(order = %order.code, status = ?order.status, "Order updated");
        Ok(true)
    }

    async fn create(&self, order: Order) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut orders = self.read_all().await?;

        if orders.iter().any(|existing| existing.code == order.code) {
            bail!("Order {} already exists", order.code);
        }

        let code = order.code.clone();
        orders.push(order);
        self.write_all(&orders).await?;
        debug!(order = %code, "Order created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderStatus;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileOrderStore {
        JsonFileOrderStore::new(dir.path().join("db").join("orders.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.get_by_code("ORDER-1").await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.create(Order::pending("ORDER-1", Utc::now())).await.unwrap();
        store.create(Order::pending("ORDER-2", Utc::now())).await.unwrap();

        let mut order = store.get_by_code("ORDER-1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        order.status = OrderStatus::Active;
        order.payment_id = "P1".to_string();
        assert!(store.update(&order).await.unwrap());

        let reloaded = JsonFileOrderStore::new(store.path());
        assert_eq!(reloaded.get_by_code("ORDER-1").await.unwrap(), Some(order));
        assert_eq!(
            reloaded.get_by_code("ORDER-2").await.unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_update_unknown_order_returns_false() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.update(&Order::pending("nope", Utc::now())).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.create(Order::pending("ORDER-1", Utc::now())).await.unwrap();
        assert!(store.create(Order::pending("ORDER-1", Utc::now())).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(store.get_by_code("ORDER-1").await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_creates_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(Order::pending(format!("ORDER-{}", i), Utc::now()))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..10 {
            assert!(store.get_by_code(&format!("ORDER-{}", i)).await.unwrap().is_some());
        }
    }
}
