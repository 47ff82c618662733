//! Core types and data structures for the ledger

use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account classifications of the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClassification {
    /// Assets - what the business owns (Cash, Receivables, Fixed Assets, etc.)
    Asset,
    /// Liabilities - what the business owes (Payables, Loans, Taxes, etc.)
    Liability,
    /// Equity - owner's interest (Paid-in Capital, Current-Year Profit, etc.)
    Equity,
    /// Income - revenue earned by the business
    Income,
    /// Expenses - period costs (selling, administrative, financial)
    Expense,
    /// Costs - production costs and overhead
    Cost,
}

impl AccountClassification {
    /// All classifications, in statement order
    pub const ALL: [AccountClassification; 6] = [
        AccountClassification::Asset,
        AccountClassification::Liability,
        AccountClassification::Equity,
        AccountClassification::Income,
        AccountClassification::Expense,
        AccountClassification::Cost,
    ];

    /// Returns the normal balance side for this classification.
    /// Assets, expenses and costs are debit-normal; everything else is credit-normal.
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountClassification::Asset
            | AccountClassification::Expense
            | AccountClassification::Cost => EntryType::Debit,
            AccountClassification::Liability
            | AccountClassification::Equity
            | AccountClassification::Income => EntryType::Credit,
        }
    }

    /// Signed balance change of one entry line against an account of this classification.
    ///
    /// This is the single definition of the debit/credit sign rule; posting and
    /// historical reconstruction both go through it.
    pub fn signed_delta(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        match self.normal_balance() {
            EntryType::Debit => debit - credit,
            EntryType::Credit => credit - debit,
        }
    }

    /// Income, expense and cost accounts are zeroed at period end
    pub fn is_profit_and_loss(&self) -> bool {
        matches!(
            self,
            AccountClassification::Income
                | AccountClassification::Expense
                | AccountClassification::Cost
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClassification::Asset => "asset",
            AccountClassification::Liability => "liability",
            AccountClassification::Equity => "equity",
            AccountClassification::Income => "income",
            AccountClassification::Expense => "expense",
            AccountClassification::Cost => "cost",
        }
    }
}

impl fmt::Display for AccountClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountClassification {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(AccountClassification::Asset),
            "liability" => Ok(AccountClassification::Liability),
            "equity" => Ok(AccountClassification::Equity),
            "income" => Ok(AccountClassification::Income),
            "expense" => Ok(AccountClassification::Expense),
            "cost" => Ok(AccountClassification::Cost),
            other => Err(LedgerError::Validation(format!(
                "Unknown account classification '{other}'"
            ))),
        }
    }
}

/// Sides of a double-entry line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit - increases assets, expenses and costs
    Debit,
    /// Credit - increases liabilities, equity and income
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

/// Account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account code; the first digit conventionally encodes the class
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Classification driving the normal-balance rule
    pub classification: AccountClassification,
    /// Optional parent account code for the account tree
    pub parent_code: Option<String>,
    /// Cached current balance, re-derivable from the voucher log
    running_balance: BigDecimal,
    /// Soft-delete flag; deleted accounts are never physically removed
    pub is_deleted: bool,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(
        code: String,
        name: String,
        classification: AccountClassification,
        parent_code: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            code,
            name,
            classification,
            parent_code,
            running_balance: BigDecimal::zero(),
            is_deleted: false,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Cached balance as of now, in the account's normal-balance sign
    pub fn running_balance(&self) -> &BigDecimal {
        &self.running_balance
    }

    /// Add a posting delta to the cache.
    ///
    /// Storage backends call this only while committing a posting.
    pub(crate) fn apply_delta(&mut self, delta: &BigDecimal) {
        self.running_balance += delta;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Overwrite the cache with a value replayed from the log.
    ///
    /// Storage backends call this only while committing a reconciliation.
    pub(crate) fn restore_balance(&mut self, balance: BigDecimal) {
        self.running_balance = balance;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// One debit or credit line of a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Account being affected
    pub account_code: String,
    /// Debit amount, zero when this is a credit line
    pub debit: BigDecimal,
    /// Credit amount, zero when this is a debit line
    pub credit: BigDecimal,
    /// Optional memo for this specific line
    pub memo: Option<String>,
}

impl Entry {
    /// Create an entry from a raw debit/credit pair
    pub fn new(
        account_code: String,
        debit: BigDecimal,
        credit: BigDecimal,
        memo: Option<String>,
    ) -> Self {
        Self {
            account_code,
            debit,
            credit,
            memo,
        }
    }

    /// Create a debit entry
    pub fn debit(account_code: String, amount: BigDecimal, memo: Option<String>) -> Self {
        Self::new(account_code, amount, BigDecimal::zero(), memo)
    }

    /// Create a credit entry
    pub fn credit(account_code: String, amount: BigDecimal, memo: Option<String>) -> Self {
        Self::new(account_code, BigDecimal::zero(), amount, memo)
    }

    /// Create an entry on the given side
    pub fn on_side(
        side: EntryType,
        account_code: String,
        amount: BigDecimal,
        memo: Option<String>,
    ) -> Self {
        match side {
            EntryType::Debit => Self::debit(account_code, amount, memo),
            EntryType::Credit => Self::credit(account_code, amount, memo),
        }
    }

    /// The side this line is on, or `None` for a malformed line
    pub fn side(&self) -> Option<EntryType> {
        match (self.debit.is_zero(), self.credit.is_zero()) {
            (false, true) => Some(EntryType::Debit),
            (true, false) => Some(EntryType::Credit),
            _ => None,
        }
    }

    /// The non-zero amount of a well-formed line
    pub fn amount(&self) -> &BigDecimal {
        if self.debit.is_zero() {
            &self.credit
        } else {
            &self.debit
        }
    }

    /// Same line with debit and credit swapped
    pub fn reversed(&self) -> Self {
        Self {
            account_code: self.account_code.clone(),
            debit: self.credit.clone(),
            credit: self.debit.clone(),
            memo: Some(format!(
                "Reversal: {}",
                self.memo.clone().unwrap_or_default()
            )),
        }
    }
}

/// Unique identifier of a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherId(pub Uuid);

impl VoucherId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VoucherId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VoucherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of whoever performs a transition.
///
/// Authentication happens outside the ledger; the core only records who acted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who performed a transition and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionStamp {
    pub actor: Actor,
    pub at: NaiveDateTime,
}

impl TransitionStamp {
    pub fn now(actor: &Actor) -> Self {
        Self {
            actor: actor.clone(),
            at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Voucher lifecycle states: draft -> approved -> posted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Draft,
    Approved,
    Posted,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Draft => "draft",
            VoucherStatus::Approved => "approved",
            VoucherStatus::Posted => "posted",
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What produced a voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum VoucherKind {
    /// Ordinary operator-entered voucher
    Regular,
    /// Period-end closing voucher; excluded from period movements
    Closing,
    /// Reversal of an earlier posted voucher
    Reversal { of: VoucherId },
}

impl VoucherKind {
    pub fn is_closing(&self) -> bool {
        matches!(self, VoucherKind::Closing)
    }

    /// Prefix used when generating voucher numbers
    pub fn number_prefix(&self) -> &'static str {
        match self {
            VoucherKind::Regular => "VOU",
            VoucherKind::Closing => "CLOS",
            VoucherKind::Reversal { .. } => "REV",
        }
    }
}

/// A double-entry transaction grouping an ordered set of entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Internal identifier
    pub id: VoucherId,
    /// Human-facing unique number
    pub voucher_number: String,
    /// Accounting date, distinct from the creation timestamp
    pub transaction_date: NaiveDate,
    /// Description of the transaction
    pub summary: String,
    /// Lifecycle state
    pub status: VoucherStatus,
    /// Origin of the voucher
    pub kind: VoucherKind,
    /// Ordered entry lines; order is kept for audit display
    pub entries: Vec<Entry>,
    /// Soft-delete flag, cascades to the entries
    pub is_deleted: bool,
    pub created: TransitionStamp,
    pub approval: Option<TransitionStamp>,
    pub posting: Option<TransitionStamp>,
    pub deletion: Option<TransitionStamp>,
}

impl Voucher {
    /// Calculate total debits
    pub fn total_debits(&self) -> BigDecimal {
        self.entries.iter().map(|e| &e.debit).sum()
    }

    /// Calculate total credits
    pub fn total_credits(&self) -> BigDecimal {
        self.entries.iter().map(|e| &e.credit).sum()
    }

    /// Posted and not deleted: the only vouchers that affect balances
    pub fn is_effective(&self) -> bool {
        self.status == VoucherStatus::Posted && !self.is_deleted
    }

    pub fn references_account(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.account_code == code)
    }
}

/// Balance of one account at a point in time, split into trial-balance columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Account information
    pub account: Account,
    /// Balance in the account's normal-balance sign
    pub balance: BigDecimal,
    /// Debit balance (if applicable)
    pub debit_balance: Option<BigDecimal>,
    /// Credit balance (if applicable)
    pub credit_balance: Option<BigDecimal>,
}

impl AccountBalance {
    /// Place a signed normal-side balance into the debit or credit column
    pub fn new(account: Account, balance: BigDecimal) -> Self {
        let normal = account.classification.normal_balance();
        let side = if balance < BigDecimal::zero() {
            normal.opposite()
        } else {
            normal
        };
        let amount = balance.abs();
        let (debit_balance, credit_balance) = match side {
            EntryType::Debit => (Some(amount), None),
            EntryType::Credit => (None, Some(amount)),
        };
        Self {
            account,
            balance,
            debit_balance,
            credit_balance,
        }
    }

    /// Get the balance amount regardless of debit/credit
    pub fn balance_amount(&self) -> BigDecimal {
        self.debit_balance
            .clone()
            .or_else(|| self.credit_balance.clone())
            .unwrap_or_else(BigDecimal::zero)
    }
}

/// Trial Balance - snapshot of all account balances at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Date of the trial balance
    pub as_of_date: NaiveDate,
    /// Account balances keyed and ordered by account code
    pub balances: BTreeMap<String, AccountBalance>,
    /// Total debits across all accounts
    pub total_debits: BigDecimal,
    /// Total credits across all accounts
    pub total_credits: BigDecimal,
    /// Whether debits and credits agree within tolerance
    pub is_balanced: bool,
}

/// Error families, used by callers to decide how to surface a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Input rejected before any mutation
    Validation,
    /// Operation illegal in the current lifecycle state
    State,
    /// A referenced record is missing or still referenced
    Referential,
    /// Cached or derived figures disagree with the log
    Consistency,
    /// Backend failure
    Storage,
}

/// Errors that can occur in the ledger system
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Voucher is not balanced: debits = {debit_total}, credits = {credit_total}, difference = {difference}")]
    Imbalance {
        debit_total: BigDecimal,
        credit_total: BigDecimal,
        difference: BigDecimal,
    },
    #[error("Malformed entry at line {index}: {reason}")]
    MalformedEntry { index: usize, reason: String },
    #[error("Voucher must have at least one entry")]
    EmptyVoucher,
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),
    #[error("Parent account '{0}' does not exist")]
    InvalidParent(String),
    #[error("Making '{parent}' the parent of '{code}' would create a cycle")]
    CyclicHierarchy { code: String, parent: String },
    #[error("Account '{0}' has child accounts")]
    HasChildren(String),
    #[error("Account '{0}' is referenced by voucher entries")]
    ReferencedByEntries(String),
    #[error("Classification of account '{0}' cannot change once entries reference it")]
    ClassificationLocked(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Entry references unknown or deleted account '{0}'")]
    UnresolvedAccount(String),
    #[error("Voucher not found: {0}")]
    VoucherNotFound(VoucherId),
    #[error("Voucher {0} has been deleted")]
    VoucherDeleted(VoucherId),
    #[error("Voucher number '{0}' already exists")]
    DuplicateVoucherNumber(String),
    #[error("Cannot move voucher from {from} to {to}")]
    InvalidTransition {
        from: VoucherStatus,
        to: VoucherStatus,
    },
    #[error("Voucher {0} is posted and cannot be changed or deleted")]
    ImmutableVoucher(VoucherId),
    #[error("Voucher {0} is not posted")]
    NotPosted(VoucherId),
    #[error("Voucher dated {date} is after today ({today})")]
    FutureDatedPosting { date: NaiveDate, today: NaiveDate },
    #[error("Profit and loss accounts are already closed as of {0}")]
    AlreadyClosed(NaiveDate),
    #[error("Closing voucher {0} is awaiting approval or posting")]
    ClosingPending(VoucherId),
    #[error("Current-year profit account '{0}' does not exist")]
    NoProfitAccount(String),
    #[error("Profit distribution account '{0}' does not exist")]
    NoDistributionAccount(String),
    #[error("Balance sheet does not balance as of {as_of_date}: assets = {assets}, liabilities + equity + profit = {liabilities_and_equity}")]
    UnbalancedStatement {
        as_of_date: NaiveDate,
        assets: BigDecimal,
        liabilities_and_equity: BigDecimal,
    },
    #[error("Ledger changed while the operation was running, please retry")]
    ConcurrentModification,
}

impl LedgerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LedgerError::Validation(_)
            | LedgerError::Imbalance { .. }
            | LedgerError::MalformedEntry { .. }
            | LedgerError::EmptyVoucher
            | LedgerError::DuplicateCode(_)
            | LedgerError::InvalidParent(_)
            | LedgerError::CyclicHierarchy { .. }
            | LedgerError::DuplicateVoucherNumber(_)
            | LedgerError::FutureDatedPosting { .. } => ErrorCategory::Validation,
            LedgerError::InvalidTransition { .. }
            | LedgerError::ImmutableVoucher(_)
            | LedgerError::NotPosted(_)
            | LedgerError::VoucherDeleted(_)
            | LedgerError::AlreadyClosed(_)
            | LedgerError::ClosingPending(_)
            | LedgerError::ClassificationLocked(_) => ErrorCategory::State,
            LedgerError::AccountNotFound(_)
            | LedgerError::UnresolvedAccount(_)
            | LedgerError::VoucherNotFound(_)
            | LedgerError::HasChildren(_)
            | LedgerError::ReferencedByEntries(_)
            | LedgerError::NoProfitAccount(_)
            | LedgerError::NoDistributionAccount(_) => ErrorCategory::Referential,
            LedgerError::UnbalancedStatement { .. } | LedgerError::ConcurrentModification => {
                ErrorCategory::Consistency
            }
            LedgerError::Storage(_) => ErrorCategory::Storage,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_signed_delta_follows_normal_balance() {
        let debit = dec("100.00");
        let credit = dec("30.00");

        for classification in [
            AccountClassification::Asset,
            AccountClassification::Expense,
            AccountClassification::Cost,
        ] {
            assert_eq!(classification.signed_delta(&debit, &credit), dec("70.00"));
        }
        for classification in [
            AccountClassification::Liability,
            AccountClassification::Equity,
            AccountClassification::Income,
        ] {
            assert_eq!(classification.signed_delta(&debit, &credit), dec("-70.00"));
        }
    }

    #[test]
    fn test_entry_side() {
        assert_eq!(
            Entry::debit("1001".into(), dec("1"), None).side(),
            Some(EntryType::Debit)
        );
        assert_eq!(
            Entry::credit("1001".into(), dec("1"), None).side(),
            Some(EntryType::Credit)
        );
        assert_eq!(
            Entry::new("1001".into(), dec("1"), dec("1"), None).side(),
            None
        );
        assert_eq!(
            Entry::new("1001".into(), dec("0"), dec("0"), None).side(),
            None
        );
    }

    #[test]
    fn test_account_balance_columns() {
        let cash = Account::new("1001".into(), "Cash".into(), AccountClassification::Asset, None);
        let overdrawn = AccountBalance::new(cash.clone(), dec("-25.00"));
        assert_eq!(overdrawn.credit_balance, Some(dec("25.00")));
        assert_eq!(overdrawn.debit_balance, None);

        let normal = AccountBalance::new(cash, dec("25.00"));
        assert_eq!(normal.debit_balance, Some(dec("25.00")));
    }

    #[test]
    fn test_classification_parsing() {
        assert_eq!(
            "Cost".parse::<AccountClassification>().unwrap(),
            AccountClassification::Cost
        );
        assert!("revenue".parse::<AccountClassification>().is_err());
    }

    #[test]
    fn test_voucher_kind_serialization() {
        let id = VoucherId::new();
        let json = serde_json::to_value(VoucherKind::Reversal { of: id }).unwrap();
        assert_eq!(json["kind"], "reversal");
        assert_eq!(json["of"], id.0.to_string());

        let closing: VoucherKind = serde_json::from_str(r#"{"kind":"closing"}"#).unwrap();
        assert!(closing.is_closing());
        assert_eq!(serde_json::to_value(VoucherStatus::Posted).unwrap(), "posted");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(LedgerError::EmptyVoucher.category(), ErrorCategory::Validation);
        assert_eq!(
            LedgerError::ImmutableVoucher(VoucherId::new()).category(),
            ErrorCategory::State
        );
        assert_eq!(
            LedgerError::UnresolvedAccount("9999".into()).category(),
            ErrorCategory::Referential
        );
        assert_eq!(
            LedgerError::ConcurrentModification.category(),
            ErrorCategory::Consistency
        );
    }
}
