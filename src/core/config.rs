//! Batch configuration: company and warehouse targets, payment and VAT
//! lookup tables, optional feed endpoint.
//!
//! Settings are read from a `[connector]` section:
//!
//! ```ini
//! [connector]
//! url = https://connector.example.com/orders
//! token = s3cret
//! company_code = 00000001
//! deposit_code = MAIN
//! document_type_code = OC
//! rounding_product_code = ROUNDING
//! shipping_vat_perc = 22
//! payment_name_1 = PayPal
//! payment_code_1 = PP
//! vat_perc_1 = 22
//! vat_code_1 = 22
//! ```
//!
//! Payment and VAT entries are numbered 1 to 10; pairs with an empty side
//! are ignored. Environment variables prefixed `ORDER_INGEST_` override
//! file values (`ORDER_INGEST_CONNECTOR__TOKEN` → `connector.token`).

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use ::config::{Config, Environment, File};
use rust_decimal::Decimal;

use super::error::IngestError;

/// Highest index probed for `payment_*_N` / `vat_*_N` pairs.
pub const MAX_TABLE_ENTRIES: usize = 10;

const SECTION: &str = "connector";

/// Where the order feed is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub token: String,
}

/// Immutable settings for one ingestion batch.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub company_code: String,
    /// Warehouse deposit goods are shipped from.
    pub deposit_code: String,
    /// Document type of the created orders.
    pub document_type_code: String,
    /// Product used for rounding-correction lines.
    pub rounding_product_code: Option<String>,
    /// VAT charged on the net shipping cost the feed delivers. When unset
    /// the shipping cost enters the order total as is.
    pub shipping_vat_rate: Option<Decimal>,
    pub feed: Option<FeedSource>,
    payment_codes: HashMap<String, String>,
    vat_codes: HashMap<Decimal, String>,
}

impl IngestConfig {
    pub fn new(
        company_code: impl Into<String>,
        deposit_code: impl Into<String>,
        document_type_code: impl Into<String>,
    ) -> Self {
        Self {
            company_code: company_code.into(),
            deposit_code: deposit_code.into(),
            document_type_code: document_type_code.into(),
            ..Self::default()
        }
    }

    pub fn rounding_product(mut self, code: impl Into<String>) -> Self {
        self.rounding_product_code = Some(code.into());
        self
    }

    pub fn shipping_vat(mut self, rate: Decimal) -> Self {
        self.shipping_vat_rate = Some(rate);
        self
    }

    pub fn feed(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.feed = Some(FeedSource {
            url: url.into(),
            token: token.into(),
        });
        self
    }

    /// Map a payment-method name (matched case-insensitively) to a code.
    pub fn payment(mut self, name: &str, code: impl Into<String>) -> Self {
        self.payment_codes.insert(name.to_lowercase(), code.into());
        self
    }

    /// Map a VAT percentage to a VAT code.
    pub fn vat_rate(mut self, rate: Decimal, code: impl Into<String>) -> Self {
        self.vat_codes.insert(rate.normalize(), code.into());
        self
    }

    pub fn payment_code(&self, name: &str) -> Option<&str> {
        self.payment_codes
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn vat_code(&self, rate: Decimal) -> Option<&str> {
        self.vat_codes.get(&rate.normalize()).map(String::as_str)
    }

    /// Load from a settings file (format picked from the extension) with
    /// environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ORDER_INGEST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Self::from_settings(&settings)
    }

    /// Build from already-assembled settings.
    pub fn from_settings(settings: &Config) -> Result<Self, IngestError> {
        let get = |key: &str| -> Option<String> {
            settings
                .get_string(&format!("{SECTION}.{key}"))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| -> Result<String, IngestError> {
            get(key).ok_or_else(|| {
                IngestError::Configuration(format!("missing setting {SECTION}.{key}"))
            })
        };

        let mut config = Self::new(
            require("company_code")?,
            require("deposit_code")?,
            require("document_type_code")?,
        );
        config.rounding_product_code = get("rounding_product_code");
        if let Some(perc) = get("shipping_vat_perc") {
            let rate = Decimal::from_str(&perc).map_err(|e| {
                IngestError::Configuration(format!("invalid shipping_vat_perc \"{perc}\": {e}"))
            })?;
            config = config.shipping_vat(rate);
        }
        if let (Some(url), Some(token)) = (get("url"), get("token")) {
            config = config.feed(url, token);
        }

        for index in 1..=MAX_TABLE_ENTRIES {
            if let (Some(name), Some(code)) = (
                get(&format!("payment_name_{index}")),
                get(&format!("payment_code_{index}")),
            ) {
                config = config.payment(&name, code);
            }
            if let (Some(perc), Some(code)) = (
                get(&format!("vat_perc_{index}")),
                get(&format!("vat_code_{index}")),
            ) {
                let rate = Decimal::from_str(&perc).map_err(|e| {
                    IngestError::Configuration(format!("invalid vat_perc_{index} \"{perc}\": {e}"))
                })?;
                config = config.vat_rate(rate, code);
            }
        }

        Ok(config)
    }
}
