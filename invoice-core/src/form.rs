use std::ops::Deref;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::{CurrencyConfig, InvoiceDefaults};
use crate::error::ValidationError;
use crate::lookup::{Course, CourseCatalog, Student, StudentDirectory};
use crate::model::{line_amount, ContactInfo, CourseTag, InvoiceData, InvoiceItem, ItemEdit};
use crate::money::{format_money, parse_quantity, parse_rate};

/// Invoice-level fields editable through [`InvoiceForm::set_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    InvoiceNumber,
    IssueDate,
    DueDate,
    TaxRate,
    Notes,
    Terms,
    Status,
    Company(ContactField),
    Client(ContactField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Address,
    City,
    State,
    ZipCode,
    Country,
    Website,
    Logo,
}

impl ContactField {
    fn apply(self, contact: &mut ContactInfo, value: &str) {
        let slot = match self {
            ContactField::Name => &mut contact.name,
            ContactField::Email => &mut contact.email,
            ContactField::Phone => &mut contact.phone,
            ContactField::Address => &mut contact.address,
            ContactField::City => &mut contact.city,
            ContactField::State => &mut contact.state,
            ContactField::ZipCode => &mut contact.zip_code,
            ContactField::Country => &mut contact.country,
            ContactField::Website => &mut contact.website,
            ContactField::Logo => {
                contact.logo = Some(value.trim()).filter(|v| !v.is_empty()).map(str::to_string);
                return;
            }
        };
        *slot = value.to_string();
    }
}

/// The "current item" being typed before it is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub description: String,
    pub quantity: u32,
    pub rate: Decimal,
    pub course: Option<CourseTag>,
}

impl Default for ItemDraft {
    fn default() -> Self {
        ItemDraft {
            description: String::new(),
            quantity: 1,
            rate: Decimal::ZERO,
            course: None,
        }
    }
}

impl ItemDraft {
    /// `None` while the typed quantity and rate multiply past `Decimal`.
    pub fn amount(&self) -> Option<Decimal> {
        line_amount(self.quantity, self.rate).ok()
    }
}

/// Money figures as the form shows them, in the display currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountsDisplay {
    /// Empty when the scratch amount overflows.
    pub item_amount: String,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
}

/// A validated invoice handed from the form to the preview. Read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedInvoice(InvoiceData);

impl SubmittedInvoice {
    pub fn into_inner(self) -> InvoiceData {
        self.0
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.0.id = Some(id);
    }
}

impl Deref for SubmittedInvoice {
    type Target = InvoiceData;

    fn deref(&self) -> &InvoiceData {
        &self.0
    }
}

/// Collects company, client and line-item input for one invoice.
///
/// Numeric input is parsed permissively: a quantity that is not a whole
/// number reads as 1, an unparsable rate or tax rate as 0. Dates and
/// status are checked and rejected without touching the draft.
#[derive(Debug, Clone)]
pub struct InvoiceForm {
    invoice: InvoiceData,
    scratch: ItemDraft,
    courses: Vec<Course>,
    students: Vec<Student>,
}

impl InvoiceForm {
    pub fn new(invoice: InvoiceData, courses: Vec<Course>, students: Vec<Student>) -> Self {
        InvoiceForm {
            invoice,
            scratch: ItemDraft::default(),
            courses,
            students,
        }
    }

    /// New draft with course and student lists fetched from the lookups.
    /// A lookup that fails leaves its list empty.
    pub async fn load(
        defaults: &InvoiceDefaults,
        today: NaiveDate,
        now: DateTime<Utc>,
        catalog: &dyn CourseCatalog,
        directory: &dyn StudentDirectory,
    ) -> Self {
        let courses = catalog.list_courses().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not load courses");
            Vec::new()
        });
        let students = directory.list_students().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not load students");
            Vec::new()
        });
        debug!(courses = courses.len(), students = students.len(), "invoice form loaded");
        InvoiceForm::new(InvoiceData::draft(defaults, today, now), courses, students)
    }

    /// Reopen a saved invoice.
    pub fn edit(existing: InvoiceData) -> Self {
        InvoiceForm::new(existing, Vec::new(), Vec::new())
    }

    pub fn invoice(&self) -> &InvoiceData {
        &self.invoice
    }

    pub fn item_draft(&self) -> &ItemDraft {
        &self.scratch
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), ValidationError> {
        match field {
            Field::InvoiceNumber => self.invoice.invoice_number = value.to_string(),
            Field::IssueDate => self.invoice.issue_date = parse_date("Issue date", value)?,
            Field::DueDate => self.invoice.due_date = parse_date("Due date", value)?,
            Field::TaxRate => self.invoice.set_tax_rate(parse_rate(value))?,
            Field::Notes => self.invoice.notes = value.to_string(),
            Field::Terms => self.invoice.terms = value.to_string(),
            Field::Status => self.invoice.status = value.parse()?,
            Field::Company(field) => field.apply(&mut self.invoice.company_info, value),
            Field::Client(field) => field.apply(&mut self.invoice.client_info, value),
        }
        Ok(())
    }

    pub fn set_item_description(&mut self, value: &str) {
        self.scratch.description = value.to_string();
    }

    pub fn set_item_quantity(&mut self, value: &str) {
        self.scratch.quantity = parse_quantity(value);
    }

    pub fn set_item_rate(&mut self, value: &str) {
        self.scratch.rate = parse_rate(value);
    }

    /// Append the scratch item and clear it. On error the scratch item
    /// and the invoice are left as they were.
    pub fn add_item(&mut self) -> Result<&InvoiceItem, ValidationError> {
        let draft = &self.scratch;
        check_line(&draft.description, draft.quantity, draft.rate)?;
        let item = InvoiceItem::new(draft.description.trim(), draft.quantity, draft.rate, draft.course.clone())?;
        debug!(item_id = item.id(), amount = %item.amount(), "item added");
        self.invoice.push_item(item)?;
        self.scratch = ItemDraft::default();
        let items = self.invoice.items();
        Ok(&items[items.len() - 1])
    }

    /// `Ok(false)` when no item has `id`.
    pub fn remove_item(&mut self, id: &str) -> Result<bool, ValidationError> {
        let removed = self.invoice.remove_item(id)?.is_some();
        debug!(item_id = id, removed, "remove item");
        Ok(removed)
    }

    pub fn edit_item(&mut self, id: &str, edit: ItemEdit) -> Result<(), ValidationError> {
        let current = self
            .invoice
            .item(id)
            .ok_or_else(|| ValidationError::UnknownItem(id.to_string()))?;
        check_line(
            edit.description.as_deref().unwrap_or(&current.description),
            edit.quantity.unwrap_or(current.quantity()),
            edit.rate.unwrap_or(current.rate()),
        )?;
        self.invoice.edit_item(id, edit)?;
        Ok(())
    }

    /// Pre-fill the scratch item from a course. Nothing is appended.
    pub fn select_course(&mut self, course_id: &str) -> Result<(), ValidationError> {
        let course = self
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| ValidationError::UnknownCourse(course_id.to_string()))?;
        self.scratch.description = course.title.clone();
        self.scratch.rate = course.price;
        self.scratch.course = Some(CourseTag {
            id: course.id.clone(),
            name: course.title.clone(),
            code: course.code.clone(),
        });
        Ok(())
    }

    /// Replace the client block with the student's details.
    pub fn select_client(&mut self, student_id: &str) -> Result<(), ValidationError> {
        let student = self
            .students
            .iter()
            .find(|s| s.id == student_id)
            .ok_or_else(|| ValidationError::UnknownStudent(student_id.to_string()))?;
        self.invoice.client_info = ContactInfo {
            name: student.full_name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone().unwrap_or_default(),
            ..ContactInfo::default()
        };
        Ok(())
    }

    pub fn amounts(&self, currency: &CurrencyConfig) -> AmountsDisplay {
        let prefix = currency.display_prefix();
        let totals = self.invoice.totals();
        AmountsDisplay {
            item_amount: self
                .scratch
                .amount()
                .map(|amount| format_money(amount, &prefix))
                .unwrap_or_default(),
            subtotal: format_money(totals.subtotal, &prefix),
            tax: format_money(totals.tax, &prefix),
            total: format_money(totals.total, &prefix),
        }
    }

    pub fn submit(&self) -> Result<SubmittedInvoice, ValidationError> {
        let client = &self.invoice.client_info;
        let result = if client.name.trim().is_empty() {
            Err(ValidationError::MissingClientName)
        } else if client.email.trim().is_empty() {
            Err(ValidationError::MissingClientEmail)
        } else if self.invoice.items().is_empty() {
            Err(ValidationError::NoItems)
        } else {
            Ok(SubmittedInvoice(self.invoice.clone()))
        };
        if let Err(e) = &result {
            debug!(reason = %e, "submit rejected");
        }
        result
    }
}

fn check_line(description: &str, quantity: u32, rate: Decimal) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::MissingDescription);
    }
    if quantity == 0 {
        return Err(ValidationError::InvalidQuantity);
    }
    if rate.is_zero() {
        return Err(ValidationError::MissingRate);
    }
    Ok(())
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
