//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::posting::PostingPlan;
use crate::reports::{BalanceSheet, CashFlowStatement, IncomeStatement};
use crate::types::*;

/// Storage abstraction for the ledger
///
/// This trait allows the ledger core to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.) by implementing these methods.
/// Every method is one storage transaction: a backend must apply all of a
/// call's effects or none of them, and reads must never observe a write
/// that is only partly applied.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Insert a new account; fails with `DuplicateCode` if the code exists (deleted or not),
    /// `InvalidParent` if the parent is missing or deleted
    async fn insert_account(&self, account: &Account) -> LedgerResult<()>;

    /// Get an account by code, including soft-deleted ones
    async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>>;

    /// List non-deleted accounts ordered by code, optionally filtered by classification
    async fn list_accounts(
        &self,
        classification: Option<AccountClassification>,
    ) -> LedgerResult<Vec<Account>>;

    /// Update an account's descriptive fields (name, parent, classification, metadata).
    ///
    /// The cached balance is never taken from `account`. Fails with
    /// `ClassificationLocked` when the classification changes on an account
    /// that live vouchers reference, and with `InvalidParent` / `CyclicHierarchy`
    /// when a new parent is missing or would close a loop.
    async fn update_account(&self, account: &Account) -> LedgerResult<()>;

    /// Soft-delete an account; fails with `HasChildren` or `ReferencedByEntries`
    async fn soft_delete_account(&self, code: &str) -> LedgerResult<()>;

    /// Insert a new voucher; fails with `DuplicateVoucherNumber`, or with
    /// `UnresolvedAccount` if an entry names a missing or deleted account.
    ///
    /// A closing voucher is refused with `ClosingPending` while another closing
    /// voucher is draft or approved, and with `AlreadyClosed` when a posted
    /// closing voucher is dated on or after it.
    async fn insert_voucher(&self, voucher: &Voucher) -> LedgerResult<()>;

    /// Get a voucher by ID, including soft-deleted ones
    async fn get_voucher(&self, id: VoucherId) -> LedgerResult<Option<Voucher>>;

    /// List vouchers ordered by transaction date, then creation order
    async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>>;

    /// Replace a voucher, provided its stored status is still `expected`.
    ///
    /// Fails with `ConcurrentModification` when another transition got there first.
    async fn replace_voucher(&self, voucher: &Voucher, expected: VoucherStatus)
        -> LedgerResult<()>;

    /// Apply a posting plan to the cached balances and mark the voucher posted.
    ///
    /// The voucher must still be approved and not deleted, and every account in
    /// the plan must exist and not be deleted; otherwise nothing changes.
    async fn commit_posting(&self, plan: &PostingPlan, stamp: &TransitionStamp)
        -> LedgerResult<()>;

    /// A consistent copy of all accounts and vouchers
    async fn snapshot(&self) -> LedgerResult<LedgerSnapshot>;

    /// Reset every cached balance to zero and replay all effective vouchers,
    /// provided no posting has committed since the snapshot at `expected_version`
    async fn rebuild_balances(&self, expected_version: u64) -> LedgerResult<()>;
}

/// Consistent read view of the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// All accounts, including soft-deleted ones
    pub accounts: Vec<Account>,
    /// All vouchers in creation order, including soft-deleted ones
    pub vouchers: Vec<Voucher>,
    /// Incremented on every balance-changing commit
    pub version: u64,
}

/// Voucher listing filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoucherFilter {
    pub status: Option<VoucherStatus>,
    pub kind: Option<VoucherKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_deleted: bool,
}

impl VoucherFilter {
    pub fn matches(&self, voucher: &Voucher) -> bool {
        if voucher.is_deleted && !self.include_deleted {
            return false;
        }
        if self.status.is_some_and(|s| s != voucher.status) {
            return false;
        }
        if self.kind.is_some_and(|k| k != voucher.kind) {
            return false;
        }
        if self.start_date.is_some_and(|d| voucher.transaction_date < d) {
            return false;
        }
        if self.end_date.is_some_and(|d| voucher.transaction_date > d) {
            return false;
        }
        true
    }
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Trait for implementing custom voucher validation rules
pub trait VoucherValidator: Send + Sync {
    /// Validate a voucher before it is stored or moved out of draft
    fn validate_voucher(&self, voucher: &Voucher, tolerance: &BigDecimal) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account code cannot be empty".to_string(),
            ));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default voucher validator: the balancing rules and nothing else
pub struct DefaultVoucherValidator;

impl VoucherValidator for DefaultVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher, tolerance: &BigDecimal) -> LedgerResult<()> {
        crate::utils::validation::validate_entries(&voucher.entries, tolerance)
    }
}

/// Trait for report generation
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Balance sheet as of a date; fails when the accounting identity does not hold
    async fn balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet>;

    /// Income statement for an inclusive date range, excluding closing vouchers
    async fn income_statement(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement>;

    /// Cash-flow statement for an inclusive date range
    async fn cash_flow(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<CashFlowStatement>;

    /// Trial balance as of a date
    async fn trial_balance(&self, as_of_date: NaiveDate) -> LedgerResult<TrialBalance>;
}
