/// Invoice walkthrough: fill the form from the course catalog and the
/// student directory, submit it, preview it, then save and download.
///
/// Run with:
///   cargo run --example render_invoice -p invoice-demos
///
/// Writes demos/output/invoice-<number>.pdf. Settings come from an
/// optional invoicing.toml and INVOICING__* variables; set
/// INVOICING__PDF__FONT to a .ttf path to embed a TrueType face.
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use invoice_core::logging::init_tracing;
use invoice_core::{
    BlobRegistry, ContactField, Course, DirectoryDownloads, Field, InvoiceForm, MemoryInvoiceStore, PreviewRenderer,
    PreviewServices, RenderOptions, Settings, StaticCatalog, StaticDirectory, Student, TracingNotifier,
};
use rust_decimal::Decimal;
use tracing::info;

const OUTPUT_DIR: &str = "demos/output";

fn catalog() -> StaticCatalog {
    StaticCatalog::new(vec![
        Course {
            id: "rust-101".into(),
            title: "Rust Fundamentals".into(),
            price: Decimal::new(49_000, 2),
            code: Some("RS-101".into()),
        },
        Course {
            id: "async-201".into(),
            title: "Async Services in Practice".into(),
            price: Decimal::new(72_500, 2),
            code: Some("AS-201".into()),
        },
    ])
}

fn directory() -> StaticDirectory {
    StaticDirectory::new(vec![Student {
        id: "stu-7".into(),
        email: "marta.lopez@example.com".into(),
        full_name: "Marta Lopez".into(),
        phone: Some("+1 415 555 0134".into()),
    }])
}

#[tokio::main]
async fn main() -> invoice_core::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log_level);

    let today = Local::now().date_naive();
    let mut form = InvoiceForm::load(&settings.defaults, today, Utc::now(), &catalog(), &directory()).await;

    form.select_client("stu-7")?;
    form.set_field(Field::Client(ContactField::Address), "88 Harbor Street")?;
    form.set_field(Field::Client(ContactField::City), "Oakland")?;

    form.select_course("rust-101")?;
    form.add_item()?;
    form.select_course("async-201")?;
    form.set_item_quantity("2");
    form.add_item()?;
    form.set_item_description("Private mentoring session");
    form.set_item_rate("95");
    form.add_item()?;
    form.set_field(Field::Status, "sent")?;

    let amounts = form.amounts(&settings.currency);
    info!(subtotal = %amounts.subtotal, tax = %amounts.tax, total = %amounts.total, "form totals");

    let submitted = form.submit()?;
    info!(number = %submitted.invoice_number, total = %submitted.total(), "invoice submitted");

    let services = PreviewServices {
        registry: BlobRegistry::new(),
        store: Arc::new(MemoryInvoiceStore::new()),
        downloads: Arc::new(DirectoryDownloads::new(OUTPUT_DIR)),
        notifier: Arc::new(TracingNotifier),
        store_timeout: Duration::from_secs(settings.store.timeout_secs),
    };
    let registry = services.registry.clone();
    let mut preview = PreviewRenderer::mount(submitted, RenderOptions::from_settings(&settings, today)?, services)?;
    info!(url = preview.preview_url(), live = registry.live_count(), "preview mounted");

    let filename = preview.request_save_and_download().await?;
    println!("Written to {}/{}", OUTPUT_DIR, filename);

    drop(preview);
    info!(live = registry.live_count(), "preview released");
    Ok(())
}
