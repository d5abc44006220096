//! Course invoicing: the invoice entity and its totals, the form that
//! builds one, persistence and lookup collaborators, the PDF layout and
//! the preview that owns the rendered document's object reference.

pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod money;
pub mod preview;
pub mod record;
pub mod render;
pub mod store;

pub use config::{CurrencyConfig, InvoiceDefaults, Settings};
pub use error::{InvoiceError, Result, ValidationError};
pub use form::{AmountsDisplay, ContactField, Field, InvoiceForm, ItemDraft, SubmittedInvoice};
pub use lookup::{Course, CourseCatalog, StaticCatalog, StaticDirectory, Student, StudentDirectory};
pub use model::{compute_totals, line_amount, ContactInfo, CourseTag, InvoiceData, InvoiceItem, InvoiceStatus, ItemEdit, Totals};
pub use preview::{
    BlobRegistry, DirectoryDownloads, DownloadSink, Notice, NoticeLevel, Notifier, ObjectUrl, PreviewRenderer,
    PreviewServices, RecordingNotifier, TracingNotifier,
};
pub use record::{ContactRecord, InvoiceRecord};
pub use render::{generate_invoice_pdf, RenderOptions};
pub use store::{InvoiceStore, MemoryInvoiceStore};
