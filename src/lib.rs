//! # Ledger Core
//!
//! A general-ledger engine: double-entry vouchers moving through a
//! draft -> approved -> posted lifecycle, cached running balances that are
//! always re-derivable from the voucher log, period closing, and financial
//! statements reconstructed as of any date.
//!
//! ## Features
//!
//! - **Chart of accounts**: six classifications with a parent/child hierarchy
//! - **Voucher lifecycle**: balancing validation, approval, atomic posting, reversal
//! - **Reconstruction**: point-in-time balances and period movements from the log
//! - **Period closing**: profit and loss accounts rolled into profit distribution
//! - **Financial reporting**: balance sheet, income statement, cash flow, trial balance
//! - **Reconciliation**: cache drift detection and rebuild from the log
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_core::{Actor, AccountClassification, Ledger, MemoryStorage, VoucherBuilder};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let ledger = Ledger::new(MemoryStorage::new());
//! let actor = Actor::new("accountant");
//!
//! ledger.create_account("1001", "Cash", AccountClassification::Asset, None).await.unwrap();
//! ledger.create_account("4001", "Capital", AccountClassification::Equity, None).await.unwrap();
//!
//! let input = VoucherBuilder::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "Owner investment")
//!     .debit("1001", BigDecimal::from(100), None)
//!     .credit("4001", BigDecimal::from(100), None)
//!     .build()
//!     .unwrap();
//!
//! let voucher = ledger.create_voucher(input, &actor).await.unwrap();
//! ledger.approve_voucher(voucher.id, &actor).await.unwrap();
//! ledger.post_voucher(voucher.id, &actor).await.unwrap();
//!
//! assert_eq!(ledger.current_balance("1001").await.unwrap(), BigDecimal::from(100));
//! # });
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::LedgerConfig;
pub use ledger::*;
pub use reconciliation::*;
pub use reports::*;
pub use traits::*;
pub use types::*;
pub use utils::MemoryStorage;

// Re-export voucher patterns for convenience
pub use ledger::voucher::patterns;
