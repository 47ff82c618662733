//! Ledger configuration

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Tunables of the posting, closing and reporting engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Largest debit/credit difference still treated as balanced (exclusive)
    pub balance_tolerance: BigDecimal,
    /// Current-year profit account that receives the closing aggregate
    pub profit_account_code: String,
    /// Profit distribution / retained earnings account
    pub distribution_account_code: String,
    /// Cash and bank accounts; sub-accounts match by prefix
    pub cash_account_codes: Vec<String>,
    /// Code prefixes of long-lived assets, used for investing cash flows
    pub long_lived_asset_prefixes: Vec<String>,
    /// Allow posting vouchers dated after today
    pub allow_future_dated_posting: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: BigDecimal::new(1.into(), 2),
            profit_account_code: "4103".to_string(),
            distribution_account_code: "4104".to_string(),
            cash_account_codes: vec!["1001".to_string(), "1002".to_string()],
            long_lived_asset_prefixes: vec!["15".to_string(), "16".to_string()],
            allow_future_dated_posting: false,
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from `config/ledger.*` and `LEDGER__*` environment variables.
    ///
    /// Every field is optional; missing ones fall back to [`LedgerConfig::default`].
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config/ledger").required(false))
            .add_source(
                config::Environment::with_prefix("LEDGER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cash_account_codes")
                    .with_list_parse_key("long_lived_asset_prefixes"),
            )
            .build()?
            .try_deserialize()
    }

    /// Whether `code` is one of the configured cash accounts or a sub-account of one
    pub fn is_cash_account(&self, code: &str) -> bool {
        self.cash_account_codes
            .iter()
            .any(|cash| code.starts_with(cash.as_str()))
    }

    pub fn is_long_lived_asset(&self, code: &str) -> bool {
        self.long_lived_asset_prefixes
            .iter()
            .any(|prefix| code.starts_with(prefix.as_str()))
    }
}
