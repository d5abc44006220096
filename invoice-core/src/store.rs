use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{InvoiceError, Result};
use crate::record::InvoiceRecord;

/// Durable home of invoice records. The PDF is never stored; it is
/// regenerated from the record on demand.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Insert a new record and return its id.
    async fn create(&self, record: InvoiceRecord) -> Result<String>;

    async fn update(&self, id: &str, record: InvoiceRecord) -> Result<()>;

    async fn list(&self) -> Result<Vec<InvoiceRecord>>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Process-local store, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    records: RwLock<BTreeMap<String, InvoiceRecord>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn create(&self, mut record: InvoiceRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        record.id = Some(id.clone());
        info!(id = %id, invoice_number = %record.invoice_number, "invoice created");
        self.records.write().await.insert(id.clone(), record);
        Ok(id)
    }

    async fn update(&self, id: &str, mut record: InvoiceRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let slot = records.get_mut(id).ok_or_else(|| InvoiceError::NotFound(id.to_string()))?;
        record.id = Some(id.to_string());
        *slot = record;
        info!(id, "invoice updated");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<InvoiceRecord>> {
        let records = self.records.read().await;
        debug!(count = records.len(), "listing invoices");
        Ok(records.values().cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records
            .write()
            .await
            .remove(id)
            .map(|_| info!(id, "invoice deleted"))
            .ok_or_else(|| InvoiceError::NotFound(id.to_string()))
    }
}

/// Fail with [`InvoiceError::Timeout`] when `fut` does not finish in time.
pub async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| InvoiceError::Timeout {
            operation,
            secs: limit.as_secs(),
        })?
}
