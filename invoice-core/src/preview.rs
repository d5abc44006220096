use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{InvoiceError, Result};
use crate::form::SubmittedInvoice;
use crate::record::InvoiceRecord;
use crate::render::{generate_invoice_pdf, RenderOptions};
use crate::store::{with_timeout, InvoiceStore};

pub const PDF_MIME: &str = "application/pdf";

// -------------------------------------------------------
// Object references
// -------------------------------------------------------

/// Bytes behind an object reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

#[derive(Debug, Default)]
struct Registry {
    next: u64,
    blobs: HashMap<String, Blob>,
}

/// Table of live object references. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create(&self, bytes: Vec<u8>, mime: &str) -> ObjectUrl {
        let mut registry = self.lock();
        registry.next += 1;
        let url = format!("blob:invoice/{}", registry.next);
        registry.blobs.insert(
            url.clone(),
            Blob {
                bytes: bytes.into(),
                mime: mime.to_string(),
            },
        );
        ObjectUrl {
            url,
            registry: self.clone(),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.lock().blobs.get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.lock().blobs.len()
    }

    fn revoke(&self, url: &str) {
        self.lock().blobs.remove(url);
    }
}

/// A live object reference. Dropping it revokes the reference.
pub struct ObjectUrl {
    url: String,
    registry: BlobRegistry,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.url).finish()
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
        debug!(url = %self.url, "object reference revoked");
    }
}

// -------------------------------------------------------
// Downloads
// -------------------------------------------------------

/// Where a "save as" ends up.
pub trait DownloadSink: Send + Sync {
    fn save(&self, filename: &str, blob: &Blob) -> Result<()>;
}

/// Writes downloads as files under one directory.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryDownloads { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectoryDownloads {
    fn save(&self, filename: &str, blob: &Blob) -> Result<()> {
        let path = self.dir.join(filename);
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, &blob.bytes))
            .map_err(|e| InvoiceError::Download(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), bytes = blob.bytes.len(), "download saved");
        Ok(())
    }
}

/// `invoice-{number}.pdf`, with path separators replaced.
pub fn download_filename(invoice_number: &str) -> String {
    let safe: String = invoice_number
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    format!("invoice-{safe}.pdf")
}

// -------------------------------------------------------
// Notifications
// -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sends notices to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(message = %notice.message, "notice"),
            NoticeLevel::Error => error!(message = %notice.message, "notice"),
        }
    }
}

/// Keeps every notice, for inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

// -------------------------------------------------------
// Renderer
// -------------------------------------------------------

/// Collaborators a preview talks to.
#[derive(Clone)]
pub struct PreviewServices {
    pub registry: BlobRegistry,
    pub store: Arc<dyn InvoiceStore>,
    pub downloads: Arc<dyn DownloadSink>,
    pub notifier: Arc<dyn Notifier>,
    pub store_timeout: Duration,
}

/// Read-only view of a submitted invoice with an inline PDF preview.
///
/// Holds exactly one live object reference for the preview; it is
/// replaced on every data change and revoked when the renderer is
/// dropped. Failures are reported through the notifier and leave the
/// previous state in place.
pub struct PreviewRenderer {
    invoice: SubmittedInvoice,
    options: RenderOptions,
    services: PreviewServices,
    preview: ObjectUrl,
}

impl PreviewRenderer {
    pub fn mount(invoice: SubmittedInvoice, options: RenderOptions, services: PreviewServices) -> Result<Self> {
        let preview = render_preview(&invoice, &options, &services)?;
        Ok(PreviewRenderer {
            invoice,
            options,
            services,
            preview,
        })
    }

    /// Swap in new data. The old preview reference is revoked once the
    /// new one exists.
    pub fn set_data(&mut self, invoice: SubmittedInvoice) -> Result<()> {
        let preview = render_preview(&invoice, &self.options, &self.services)?;
        self.preview = preview;
        self.invoice = invoice;
        Ok(())
    }

    pub fn invoice(&self) -> &SubmittedInvoice {
        &self.invoice
    }

    pub fn preview_url(&self) -> &str {
        self.preview.as_str()
    }

    pub fn preview_blob(&self) -> Option<Blob> {
        self.services.registry.resolve(self.preview.as_str())
    }

    /// Render a fresh copy and hand it to the download sink under its own
    /// object reference, released before returning. Returns the filename.
    pub fn request_download(&self) -> Result<String> {
        let filename = download_filename(&self.invoice.invoice_number);
        let result = self.download(&filename);
        if let Err(e) = &result {
            self.notify(NoticeLevel::Error, format!("Failed to download invoice: {e}"));
        }
        result.map(|_| filename)
    }

    fn download(&self, filename: &str) -> Result<()> {
        let bytes = generate_invoice_pdf(&self.invoice, &self.options)?;
        let url = self.services.registry.create(bytes, PDF_MIME);
        let blob = self
            .services
            .registry
            .resolve(url.as_str())
            .ok_or_else(|| InvoiceError::Download(format!("{} was revoked", url.as_str())))?;
        self.services.downloads.save(filename, &blob)
    }

    /// Create the record, or update it when the invoice already has an id.
    /// Returns the id.
    pub async fn request_save(&mut self) -> Result<String> {
        let record = InvoiceRecord::from(&*self.invoice);
        let store = Arc::clone(&self.services.store);
        let limit = self.services.store_timeout;
        let result = match self.invoice.id.clone() {
            Some(id) => with_timeout("update", limit, store.update(&id, record))
                .await
                .map(|_| id),
            None => with_timeout("save", limit, store.create(record)).await,
        };
        match result {
            Ok(id) => {
                let updated = self.invoice.id.is_some();
                self.invoice.set_id(id.clone());
                let message = if updated { "Invoice updated" } else { "Invoice saved" };
                self.notify(NoticeLevel::Success, message.to_string());
                Ok(id)
            }
            Err(e) => {
                self.notify(NoticeLevel::Error, format!("Failed to save invoice: {e}"));
                Err(e)
            }
        }
    }

    /// Save, then download. A failed save skips the download.
    pub async fn request_save_and_download(&mut self) -> Result<String> {
        self.request_save().await?;
        self.request_download()
    }

    fn notify(&self, level: NoticeLevel, message: String) {
        self.services.notifier.notify(Notice { level, message });
    }
}

fn render_preview(invoice: &SubmittedInvoice, options: &RenderOptions, services: &PreviewServices) -> Result<ObjectUrl> {
    match generate_invoice_pdf(invoice, options) {
        Ok(bytes) => Ok(services.registry.create(bytes, PDF_MIME)),
        Err(e) => {
            services.notifier.notify(Notice {
                level: NoticeLevel::Error,
                message: format!("Failed to generate preview: {e}"),
            });
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_reference_revokes_it() {
        let registry = BlobRegistry::new();
        let a = registry.create(vec![1, 2, 3], PDF_MIME);
        let b = registry.create(vec![4], PDF_MIME);
        assert_ne!(a.as_str(), b.as_str());
        assert_eq!(registry.live_count(), 2);

        let url = a.as_str().to_string();
        assert_eq!(&*registry.resolve(&url).unwrap().bytes, &[1, 2, 3]);
        drop(a);
        assert!(registry.resolve(&url).is_none());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn filenames_follow_the_invoice_number() {
        assert_eq!(download_filename("INV-1705311000000"), "invoice-INV-1705311000000.pdf");
        assert_eq!(download_filename("2024/07"), "invoice-2024-07.pdf");
    }

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::default();
        notifier.notify(Notice {
            level: NoticeLevel::Success,
            message: "one".into(),
        });
        notifier.notify(Notice {
            level: NoticeLevel::Error,
            message: "two".into(),
        });
        let messages: Vec<_> = notifier.notices().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["one", "two"]);
    }
}
