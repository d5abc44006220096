use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use invoice_core::{
    ContactField, Course, CourseCatalog, Field, InvoiceData, InvoiceDefaults, InvoiceError, InvoiceForm, InvoiceRecord,
    InvoiceStore, MemoryInvoiceStore, StaticCatalog, StaticDirectory, Student, StudentDirectory, ValidationError,
};
use rust_decimal_macros::dec;

struct Unreachable;

#[async_trait]
impl CourseCatalog for Unreachable {
    async fn list_courses(&self) -> invoice_core::Result<Vec<Course>> {
        Err(InvoiceError::Store("connection refused".into()))
    }
}

#[async_trait]
impl StudentDirectory for Unreachable {
    async fn list_students(&self) -> invoice_core::Result<Vec<Student>> {
        Err(InvoiceError::Store("connection refused".into()))
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn catalog() -> StaticCatalog {
    StaticCatalog::new(vec![
        Course {
            id: "c-a".into(),
            title: "Course A".into(),
            price: dec!(100),
            code: Some("CA-1".into()),
        },
        Course {
            id: "c-b".into(),
            title: "Course B".into(),
            price: dec!(300),
            code: None,
        },
    ])
}

fn directory() -> StaticDirectory {
    StaticDirectory::new(vec![Student {
        id: "s-1".into(),
        email: "ana@example.com".into(),
        full_name: "Ana Silva".into(),
        phone: None,
    }])
}

async fn loaded_form() -> InvoiceForm {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    InvoiceForm::load(&InvoiceDefaults::default(), today(), now, &catalog(), &directory()).await
}

#[tokio::test]
async fn course_scenario_totals() {
    let mut form = loaded_form().await;
    assert_eq!(form.courses().len(), 2);

    form.select_course("c-a").unwrap();
    form.set_item_quantity("2");
    let first = form.add_item().unwrap().id().to_string();
    form.select_course("c-b").unwrap();
    form.add_item().unwrap();
    form.set_field(Field::TaxRate, "10").unwrap();

    let invoice = form.invoice();
    assert_eq!(invoice.items()[0].amount(), dec!(200));
    assert_eq!(invoice.items()[1].amount(), dec!(300));
    assert_eq!((invoice.subtotal(), invoice.tax(), invoice.total()), (dec!(500), dec!(50), dec!(550)));

    assert!(form.remove_item(&first).unwrap());
    let invoice = form.invoice();
    assert_eq!((invoice.subtotal(), invoice.tax(), invoice.total()), (dec!(300), dec!(30), dec!(330)));
}

#[tokio::test]
async fn lookup_failures_leave_empty_lists() {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    let form = InvoiceForm::load(&InvoiceDefaults::default(), today(), now, &Unreachable, &Unreachable).await;
    assert!(form.courses().is_empty());
    assert!(form.students().is_empty());
    assert_eq!(form.invoice().tax_rate(), dec!(8.5));
}

#[tokio::test]
async fn submit_gating_then_success() {
    let mut form = loaded_form().await;
    form.select_course("c-a").unwrap();
    form.add_item().unwrap();
    assert_eq!(form.submit(), Err(ValidationError::MissingClientName));

    form.select_client("s-1").unwrap();
    let submitted = form.submit().unwrap();
    assert_eq!(submitted.client_info.email, "ana@example.com");
    assert_eq!(submitted.items().len(), 1);

    // The snapshot does not follow later edits.
    form.set_field(Field::Client(ContactField::Name), "Someone Else").unwrap();
    assert_eq!(submitted.client_info.name, "Ana Silva");
}

#[tokio::test]
async fn saved_invoice_reopens_for_editing() {
    let store = MemoryInvoiceStore::new();
    let mut form = loaded_form().await;
    form.select_client("s-1").unwrap();
    form.select_course("c-b").unwrap();
    form.add_item().unwrap();
    let submitted = form.submit().unwrap();

    let id = store.create(InvoiceRecord::from(&*submitted)).await.unwrap();
    let stored = store.list().await.unwrap().remove(0);
    assert_eq!(stored.id.as_deref(), Some(id.as_str()));

    let mut editing = InvoiceForm::edit(InvoiceData::try_from(stored).unwrap());
    assert_eq!(editing.invoice().id.as_deref(), Some(id.as_str()));
    assert_eq!(editing.invoice().total(), dec!(325.50));
    editing.set_field(Field::Status, "sent").unwrap();
    editing.set_field(Field::Notes, "Second reminder").unwrap();

    let record = InvoiceRecord::from(editing.invoice());
    store.update(&id, record).await.unwrap();
    let updated = store.list().await.unwrap().remove(0);
    assert_eq!(updated.notes, "Second reminder");
    assert_eq!(updated.status.as_str(), "sent");
}

#[test]
fn record_round_trip_is_lossless() {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    let mut invoice = InvoiceData::draft(&InvoiceDefaults::default(), today(), now);
    invoice.id = Some("abc".into());
    invoice.client_info.name = "Ana Silva".into();
    invoice.company_info.logo = Some("data:image/png;base64,AAAA".into());
    let mut form = InvoiceForm::edit(invoice);
    form.set_item_description("Mentoring");
    form.set_item_rate("45.25");
    form.set_item_quantity("3");
    form.add_item().unwrap();
    let invoice = form.invoice().clone();

    let json = serde_json::to_string(&InvoiceRecord::from(&invoice)).unwrap();
    let record: InvoiceRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(InvoiceData::try_from(record).unwrap(), invoice);
}
