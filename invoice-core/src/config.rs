use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use invoice_pdf::is_win_ansi;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::Result;
use crate::model::ContactInfo;

/// Runtime settings, read from an optional `invoicing.toml` and then
/// `INVOICING__*` environment variables (`INVOICING__STORE__TIMEOUT_SECS=5`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub currency: CurrencyConfig,
    pub defaults: InvoiceDefaults,
    pub pdf: PdfSettings,
    pub store: StoreSettings,
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            currency: CurrencyConfig::default(),
            defaults: InvoiceDefaults::default(),
            pdf: PdfSettings::default(),
            store: StoreSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::build(Config::builder().add_source(File::with_name("invoicing").required(false)))
    }

    /// Settings from TOML text, still overridable from the environment.
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .add_source(Environment::with_prefix("INVOICING").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// The one currency used on screen and on the PDF.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CurrencyConfig {
    pub code: String,
    pub symbol: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            code: "USD".to_string(),
            symbol: "$".to_string(),
        }
    }
}

impl CurrencyConfig {
    /// Prefix for amounts shown in the form.
    pub fn display_prefix(&self) -> String {
        self.symbol.clone()
    }

    /// Prefix for amounts on the PDF. The builtin fonts only cover
    /// WinAnsi, so a symbol such as `₹` becomes `INR `.
    pub fn pdf_prefix(&self) -> String {
        if !self.symbol.is_empty() && is_win_ansi(&self.symbol) {
            self.symbol.clone()
        } else {
            format!("{} ", self.code)
        }
    }
}

/// Values a new draft starts from.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct InvoiceDefaults {
    pub tax_rate: Decimal,
    pub due_in_days: u32,
    pub seller: ContactInfo,
    pub notes: String,
    pub terms: String,
    pub number_prefix: String,
}

impl Default for InvoiceDefaults {
    fn default() -> Self {
        InvoiceDefaults {
            tax_rate: Decimal::new(85, 1),
            due_in_days: 30,
            seller: ContactInfo {
                name: "Northwind Tech Academy".to_string(),
                email: "billing@northwind.academy".to_string(),
                phone: "+1 (555) 010-2040".to_string(),
                address: "120 Market Street, Suite 400".to_string(),
                city: "San Francisco".to_string(),
                state: "CA".to_string(),
                zip_code: "94105".to_string(),
                country: "United States".to_string(),
                website: "www.northwind.academy".to_string(),
                logo: None,
            },
            notes: "Thank you for choosing our training programs.".to_string(),
            terms: "Payment is due within 30 days of the invoice date.".to_string(),
            number_prefix: "INV-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PdfSettings {
    pub compress: bool,
    /// TrueType file embedded for invoice text, e.g. a DejaVu or Noto
    /// face for names and currency symbols outside WinAnsi.
    pub font: Option<PathBuf>,
    /// Used for headings and totals when `font` is set.
    pub bold_font: Option<PathBuf>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        PdfSettings {
            compress: true,
            font: None,
            bold_font: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSettings {
    /// Applied to every persistence call.
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings { timeout_secs: 15 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_source_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.defaults.tax_rate, dec!(8.5));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn toml_overrides_nested_values() {
        let settings = Settings::from_toml(
            r#"
            log_level = "debug"

            [currency]
            code = "INR"
            symbol = "₹"

            [defaults]
            tax_rate = "18"
            due_in_days = 15

            [defaults.seller]
            name = "Ledger Labs"
            zip_code = "560001"

            [store]
            timeout_secs = 3
            "#,
        )
        .unwrap();
        assert_eq!(settings.currency.code, "INR");
        assert_eq!(settings.defaults.tax_rate, dec!(18));
        assert_eq!(settings.defaults.due_in_days, 15);
        assert_eq!(settings.defaults.seller.name, "Ledger Labs");
        assert_eq!(settings.defaults.seller.zip_code, "560001");
        assert_eq!(settings.defaults.number_prefix, "INV-");
        assert_eq!(settings.store.timeout_secs, 3);
        assert!(settings.pdf.compress);
        assert_eq!(settings.pdf.font, None);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn pdf_prefix_falls_back_to_code() {
        let usd = CurrencyConfig::default();
        assert_eq!(usd.pdf_prefix(), "$");
        let euro = CurrencyConfig { code: "EUR".into(), symbol: "€".into() };
        assert_eq!(euro.pdf_prefix(), "€");
        let rupee = CurrencyConfig { code: "INR".into(), symbol: "₹".into() };
        assert_eq!(rupee.pdf_prefix(), "INR ");
        assert_eq!(rupee.display_prefix(), "₹");
    }
}
