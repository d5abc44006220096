//! The invoice entity and its totals rule.
//!
//! Line amounts and invoice totals are derived values: they are private
//! fields recomputed by every mutator and on deserialization, so a reader
//! can never observe them out of step with the items and tax rate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::InvoiceDefaults;
use crate::error::ValidationError;
use crate::money::round2;

/// Address and contact block used for both seller and client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    #[serde(alias = "zip_code", alias = "zipcode")]
    pub zip_code: String,
    pub country: String,
    pub website: String,
    /// `data:image/png;base64,...` or JPEG equivalent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

/// Catalog back-reference on a line item. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseTag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ItemWire")]
pub struct InvoiceItem {
    id: String,
    pub description: String,
    quantity: u32,
    rate: Decimal,
    amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseTag>,
}

/// Wire shape of a line; `amount` is re-derived, never read.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemWire {
    id: String,
    #[serde(default)]
    description: String,
    quantity: u32,
    rate: Decimal,
    #[serde(default)]
    course: Option<CourseTag>,
}

impl TryFrom<ItemWire> for InvoiceItem {
    type Error = ValidationError;

    fn try_from(wire: ItemWire) -> Result<Self, Self::Error> {
        Ok(InvoiceItem {
            amount: line_amount(wire.quantity, wire.rate)?,
            id: wire.id,
            description: wire.description,
            quantity: wire.quantity,
            rate: wire.rate,
            course: wire.course,
        })
    }
}

/// `rate * quantity`, or [`ValidationError::AmountTooLarge`] past the
/// range of `Decimal`.
pub fn line_amount(quantity: u32, rate: Decimal) -> Result<Decimal, ValidationError> {
    rate.checked_mul(Decimal::from(quantity))
        .ok_or(ValidationError::AmountTooLarge)
}

impl InvoiceItem {
    /// New line with a fresh random id.
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        rate: Decimal,
        course: Option<CourseTag>,
    ) -> Result<Self, ValidationError> {
        Ok(InvoiceItem {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            quantity,
            rate,
            amount: line_amount(quantity, rate)?,
            course,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Always `quantity * rate`.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Leaves the item unchanged when the new amount would overflow.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), ValidationError> {
        self.amount = line_amount(quantity, self.rate)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Leaves the item unchanged when the new amount would overflow.
    pub fn set_rate(&mut self, rate: Decimal) -> Result<(), ValidationError> {
        self.amount = line_amount(self.quantity, rate)?;
        self.rate = rate;
        Ok(())
    }
}

/// Partial update of an existing line. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemEdit {
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub rate: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Subtotal is the sum of line amounts, tax is `subtotal * rate / 100`
/// rounded to cents, total is their sum. `None` when any step overflows.
pub fn compute_totals(items: &[InvoiceItem], tax_rate: Decimal) -> Option<Totals> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount))?;
    let tax = round2(subtotal.checked_mul(tax_rate)?.checked_div(Decimal::ONE_HUNDRED)?);
    Some(Totals {
        subtotal,
        tax,
        total: subtotal.checked_add(tax)?,
    })
}

/// A label only; any status may follow any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    /// Upper-case text printed on the invoice.
    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "InvoiceParts")]
pub struct InvoiceData {
    /// Assigned by the store on first save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    /// Not required to follow `issue_date`.
    pub due_date: NaiveDate,
    pub company_info: ContactInfo,
    pub client_info: ContactInfo,
    items: Vec<InvoiceItem>,
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
    tax_rate: Decimal,
    pub notes: String,
    pub terms: String,
    pub status: InvoiceStatus,
}

/// Everything an invoice is built from; the derived totals are not part
/// of it. Stored totals found while deserializing are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvoiceParts {
    #[serde(default)]
    pub id: Option<String>,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub company_info: ContactInfo,
    #[serde(default)]
    pub client_info: ContactInfo,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    pub tax_rate: Decimal,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub status: InvoiceStatus,
}

impl TryFrom<InvoiceParts> for InvoiceData {
    type Error = ValidationError;

    fn try_from(parts: InvoiceParts) -> Result<Self, Self::Error> {
        let mut invoice = InvoiceData {
            id: parts.id,
            invoice_number: parts.invoice_number,
            issue_date: parts.issue_date,
            due_date: parts.due_date,
            company_info: parts.company_info,
            client_info: parts.client_info,
            items: parts.items,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            tax_rate: parts.tax_rate,
            notes: parts.notes,
            terms: parts.terms,
            status: parts.status,
        };
        invoice.recompute_or(|_| ())?;
        Ok(invoice)
    }
}

impl InvoiceData {
    /// Fresh draft: timestamp number, due date `due_in_days` after today,
    /// the configured seller, an empty client and no items.
    pub fn draft(defaults: &InvoiceDefaults, today: NaiveDate, now: DateTime<Utc>) -> Self {
        InvoiceData {
            id: None,
            invoice_number: format!("{}{}", defaults.number_prefix, now.timestamp_millis()),
            issue_date: today,
            due_date: today + Duration::days(i64::from(defaults.due_in_days)),
            company_info: defaults.seller.clone(),
            client_info: ContactInfo::default(),
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            tax_rate: defaults.tax_rate,
            notes: defaults.notes.clone(),
            terms: defaults.terms.clone(),
            status: InvoiceStatus::Draft,
        }
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&InvoiceItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    pub fn tax(&self) -> Decimal {
        self.tax
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            tax: self.tax,
            total: self.total,
        }
    }

    // Every mutator below is all-or-nothing: when the new totals would
    // overflow, the invoice is left exactly as it was.

    pub fn push_item(&mut self, item: InvoiceItem) -> Result<(), ValidationError> {
        self.items.push(item);
        self.recompute_or(|invoice| {
            invoice.items.pop();
        })
    }

    /// Removes the item with `id`, if there is one.
    pub fn remove_item(&mut self, id: &str) -> Result<Option<InvoiceItem>, ValidationError> {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return Ok(None);
        };
        let removed = self.items.remove(index);
        let kept = removed.clone();
        self.recompute_or(move |invoice| invoice.items.insert(index, kept))?;
        Ok(Some(removed))
    }

    /// Applies `edit` to the item with `id`. `Ok(false)` when there is no
    /// such item.
    pub fn edit_item(&mut self, id: &str, edit: ItemEdit) -> Result<bool, ValidationError> {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };
        let mut item = self.items[index].clone();
        if let Some(description) = edit.description {
            item.description = description;
        }
        if let Some(quantity) = edit.quantity {
            item.set_quantity(quantity)?;
        }
        if let Some(rate) = edit.rate {
            item.set_rate(rate)?;
        }
        let previous = std::mem::replace(&mut self.items[index], item);
        self.recompute_or(move |invoice| invoice.items[index] = previous)?;
        Ok(true)
    }

    pub fn set_tax_rate(&mut self, tax_rate: Decimal) -> Result<(), ValidationError> {
        let previous = std::mem::replace(&mut self.tax_rate, tax_rate);
        self.recompute_or(move |invoice| invoice.tax_rate = previous)
    }

    fn recompute_or(&mut self, undo: impl FnOnce(&mut Self)) -> Result<(), ValidationError> {
        match compute_totals(&self.items, self.tax_rate) {
            Some(totals) => {
                self.subtotal = totals.subtotal;
                self.tax = totals.tax;
                self.total = totals.total;
                Ok(())
            }
            None => {
                undo(self);
                Err(ValidationError::AmountTooLarge)
            }
        }
    }
}
