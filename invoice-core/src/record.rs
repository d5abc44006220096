use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{ContactInfo, InvoiceData, InvoiceItem, InvoiceParts, InvoiceStatus};

/// Row shape used by the invoice store: snake_case keys, contact blocks
/// and items as nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub company_info: ContactRecord,
    pub client_info: ContactRecord,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tax_rate: Decimal,
    pub total: Decimal,
    pub notes: String,
    pub terms: String,
    pub status: InvoiceStatus,
}

impl From<&InvoiceData> for InvoiceRecord {
    fn from(invoice: &InvoiceData) -> Self {
        InvoiceRecord {
            id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            company_info: ContactRecord::from(&invoice.company_info),
            client_info: ContactRecord::from(&invoice.client_info),
            items: invoice.items().to_vec(),
            subtotal: invoice.subtotal(),
            tax: invoice.tax(),
            tax_rate: invoice.tax_rate(),
            total: invoice.total(),
            notes: invoice.notes.clone(),
            terms: invoice.terms.clone(),
            status: invoice.status,
        }
    }
}

/// Totals are recomputed from the items rather than trusted. A record whose
/// amounts overflow is rejected.
impl TryFrom<InvoiceRecord> for InvoiceData {
    type Error = ValidationError;

    fn try_from(record: InvoiceRecord) -> Result<Self, Self::Error> {
        InvoiceParts {
            id: record.id,
            invoice_number: record.invoice_number,
            issue_date: record.issue_date,
            due_date: record.due_date,
            company_info: record.company_info.into(),
            client_info: record.client_info.into(),
            items: record.items,
            tax_rate: record.tax_rate,
            notes: record.notes,
            terms: record.terms,
            status: record.status,
        }
        .try_into()
    }
}

/// Contact block inside a record, snake_case like the rest of the row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl From<&ContactInfo> for ContactRecord {
    fn from(contact: &ContactInfo) -> Self {
        ContactRecord {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            address: contact.address.clone(),
            city: contact.city.clone(),
            state: contact.state.clone(),
            zip_code: contact.zip_code.clone(),
            country: contact.country.clone(),
            website: contact.website.clone(),
            logo: contact.logo.clone(),
        }
    }
}

impl From<ContactRecord> for ContactInfo {
    fn from(record: ContactRecord) -> Self {
        ContactInfo {
            name: record.name,
            email: record.email,
            phone: record.phone,
            address: record.address,
            city: record.city,
            state: record.state,
            zip_code: record.zip_code,
            country: record.country,
            website: record.website,
            logo: record.logo,
        }
    }
}
