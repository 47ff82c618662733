//! Voucher lifecycle: creation, approval, posting, deletion and reversal

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::ledger::posting::{live_classifications, PostingPlan};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_entries;

/// Operator input for a new voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVoucher {
    pub transaction_date: NaiveDate,
    pub summary: String,
    pub entries: Vec<Entry>,
}

/// Generate a unique, human-readable voucher number such as `VOU20240105093000A1B2C3D4`
pub fn generate_voucher_number(kind: VoucherKind) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!(
        "{}{}{}",
        kind.number_prefix(),
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        suffix
    )
}

/// Voucher manager driving the draft -> approved -> posted state machine
pub struct VoucherManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn VoucherValidator>,
    config: Arc<LedgerConfig>,
}

impl<S: LedgerStorage> VoucherManager<S> {
    /// Create a new voucher manager
    pub fn new(storage: S, config: Arc<LedgerConfig>) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultVoucherValidator),
            config,
        }
    }

    /// Create a new voucher manager with custom validator
    pub fn with_validator(
        storage: S,
        config: Arc<LedgerConfig>,
        validator: Box<dyn VoucherValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            config,
        }
    }

    /// Record a new draft voucher.
    ///
    /// The entries must already balance; an unbalanced or malformed voucher is
    /// rejected and nothing is stored.
    pub async fn create_voucher(
        &self,
        input: NewVoucher,
        kind: VoucherKind,
        actor: &Actor,
    ) -> LedgerResult<Voucher> {
        let voucher = Voucher {
            id: VoucherId::new(),
            voucher_number: generate_voucher_number(kind),
            transaction_date: input.transaction_date,
            summary: input.summary,
            status: VoucherStatus::Draft,
            kind,
            entries: input.entries,
            is_deleted: false,
            created: TransitionStamp::now(actor),
            approval: None,
            posting: None,
            deletion: None,
        };

        self.validate(&voucher)?;
        self.storage.insert_voucher(&voucher).await?;

        info!(
            voucher_id = %voucher.id,
            voucher_number = %voucher.voucher_number,
            date = %voucher.transaction_date,
            lines = voucher.entries.len(),
            actor = %actor,
            "voucher created"
        );
        Ok(voucher)
    }

    // balancing always applies; a custom validator only adds rules on top
    fn validate(&self, voucher: &Voucher) -> LedgerResult<()> {
        validate_entries(&voucher.entries, &self.config.balance_tolerance)?;
        self.validator
            .validate_voucher(voucher, &self.config.balance_tolerance)
    }

    /// Get a voucher by ID
    pub async fn get_voucher(&self, id: VoucherId) -> LedgerResult<Option<Voucher>> {
        self.storage.get_voucher(id).await
    }

    /// Get a live voucher by ID, returning an error if it is missing or deleted
    pub async fn get_voucher_required(&self, id: VoucherId) -> LedgerResult<Voucher> {
        let voucher = self
            .storage
            .get_voucher(id)
            .await?
            .ok_or(LedgerError::VoucherNotFound(id))?;
        if voucher.is_deleted {
            return Err(LedgerError::VoucherDeleted(id));
        }
        Ok(voucher)
    }

    /// List vouchers matching a filter
    pub async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>> {
        self.storage.list_vouchers(filter).await
    }

    /// Approve a draft voucher, re-checking balance and account references
    pub async fn approve(&self, id: VoucherId, actor: &Actor) -> LedgerResult<Voucher> {
        let mut voucher = self.get_voucher_required(id).await?;
        if voucher.status != VoucherStatus::Draft {
            return Err(LedgerError::InvalidTransition {
                from: voucher.status,
                to: VoucherStatus::Approved,
            });
        }

        self.validate(&voucher)?;
        for entry in &voucher.entries {
            match self.storage.get_account(&entry.account_code).await? {
                Some(account) if !account.is_deleted => {}
                _ => return Err(LedgerError::UnresolvedAccount(entry.account_code.clone())),
            }
        }

        voucher.status = VoucherStatus::Approved;
        voucher.approval = Some(TransitionStamp::now(actor));
        self.storage
            .replace_voucher(&voucher, VoucherStatus::Draft)
            .await?;

        info!(voucher_id = %id, voucher_number = %voucher.voucher_number, actor = %actor, "voucher approved");
        Ok(voucher)
    }

    /// Post an approved voucher, applying its balance effects in one commit
    pub async fn post(&self, id: VoucherId, actor: &Actor) -> LedgerResult<Voucher> {
        let mut voucher = self.get_voucher_required(id).await?;
        if voucher.status != VoucherStatus::Approved {
            return Err(LedgerError::InvalidTransition {
                from: voucher.status,
                to: VoucherStatus::Posted,
            });
        }

        let today = chrono::Utc::now().date_naive();
        if !self.config.allow_future_dated_posting && voucher.transaction_date > today {
            return Err(LedgerError::FutureDatedPosting {
                date: voucher.transaction_date,
                today,
            });
        }

        let accounts = self.storage.list_accounts(None).await?;
        let classifications = live_classifications(&accounts);
        let plan = PostingPlan::build(&voucher, |code| classifications.get(code).copied())
            .inspect_err(|e| warn!(voucher_id = %id, error = %e, "posting aborted"))?;

        let stamp = TransitionStamp::now(actor);
        self.storage.commit_posting(&plan, &stamp).await?;

        debug!(voucher_id = %id, accounts = plan.deltas.len(), "balance deltas applied");
        info!(voucher_id = %id, voucher_number = %voucher.voucher_number, actor = %actor, "voucher posted");

        voucher.status = VoucherStatus::Posted;
        voucher.posting = Some(stamp);
        Ok(voucher)
    }

    /// Soft-delete a draft or approved voucher together with its entries
    pub async fn delete(&self, id: VoucherId, actor: &Actor) -> LedgerResult<()> {
        let mut voucher = self.get_voucher_required(id).await?;
        if voucher.status == VoucherStatus::Posted {
            return Err(LedgerError::ImmutableVoucher(id));
        }

        let expected = voucher.status;
        voucher.is_deleted = true;
        voucher.deletion = Some(TransitionStamp::now(actor));
        self.storage.replace_voucher(&voucher, expected).await?;

        info!(voucher_id = %id, voucher_number = %voucher.voucher_number, actor = %actor, "voucher deleted");
        Ok(())
    }

    /// Create a draft voucher that undoes a posted one by swapping every debit and credit
    pub async fn reverse(
        &self,
        id: VoucherId,
        transaction_date: NaiveDate,
        actor: &Actor,
    ) -> LedgerResult<Voucher> {
        let original = self.get_voucher_required(id).await?;
        if original.status != VoucherStatus::Posted {
            return Err(LedgerError::NotPosted(id));
        }

        let input = NewVoucher {
            transaction_date,
            summary: format!("Reversal of {}", original.voucher_number),
            entries: original.entries.iter().map(Entry::reversed).collect(),
        };
        self.create_voucher(input, VoucherKind::Reversal { of: id }, actor)
            .await
    }
}

/// Builder for voucher input
#[derive(Debug)]
pub struct VoucherBuilder {
    voucher: NewVoucher,
}

impl VoucherBuilder {
    /// Create a new voucher builder
    pub fn new(transaction_date: NaiveDate, summary: impl Into<String>) -> Self {
        Self {
            voucher: NewVoucher {
                transaction_date,
                summary: summary.into(),
                entries: Vec::new(),
            },
        }
    }

    /// Add a debit entry
    pub fn debit(mut self, account_code: &str, amount: BigDecimal, memo: Option<String>) -> Self {
        self.voucher
            .entries
            .push(Entry::debit(account_code.to_string(), amount, memo));
        self
    }

    /// Add a credit entry
    pub fn credit(mut self, account_code: &str, amount: BigDecimal, memo: Option<String>) -> Self {
        self.voucher
            .entries
            .push(Entry::credit(account_code.to_string(), amount, memo));
        self
    }

    /// Add a custom entry
    pub fn entry(mut self, entry: Entry) -> Self {
        self.voucher.entries.push(entry);
        self
    }

    /// Build the voucher input, checking it balances at the default tolerance
    pub fn build(self) -> LedgerResult<NewVoucher> {
        validate_entries(
            &self.voucher.entries,
            &LedgerConfig::default().balance_tolerance,
        )?;
        Ok(self.voucher)
    }
}

/// Common voucher patterns
pub mod patterns {
    use super::*;

    /// Owner invests cash (debit cash, credit capital)
    pub fn owner_investment(
        date: NaiveDate,
        summary: &str,
        cash_code: &str,
        capital_code: &str,
        amount: BigDecimal,
    ) -> LedgerResult<NewVoucher> {
        VoucherBuilder::new(date, summary)
            .debit(cash_code, amount.clone(), Some("Cash invested by owner".to_string()))
            .credit(capital_code, amount, Some("Paid-in capital".to_string()))
            .build()
    }

    /// Sale for cash or on account (debit cash/receivables, credit revenue)
    pub fn sale(
        date: NaiveDate,
        summary: &str,
        cash_or_receivables_code: &str,
        revenue_code: &str,
        amount: BigDecimal,
    ) -> LedgerResult<NewVoucher> {
        VoucherBuilder::new(date, summary)
            .debit(cash_or_receivables_code, amount.clone(), None)
            .credit(revenue_code, amount, None)
            .build()
    }

    /// Expense paid in cash (debit expense, credit cash)
    pub fn expense_payment(
        date: NaiveDate,
        summary: &str,
        expense_code: &str,
        cash_code: &str,
        amount: BigDecimal,
    ) -> LedgerResult<NewVoucher> {
        VoucherBuilder::new(date, summary)
            .debit(expense_code, amount.clone(), None)
            .credit(cash_code, amount, None)
            .build()
    }

    /// Asset purchase (debit asset, credit cash/payables)
    pub fn asset_purchase(
        date: NaiveDate,
        summary: &str,
        asset_code: &str,
        cash_or_payables_code: &str,
        amount: BigDecimal,
    ) -> LedgerResult<NewVoucher> {
        VoucherBuilder::new(date, summary)
            .debit(asset_code, amount.clone(), None)
            .credit(cash_or_payables_code, amount, None)
            .build()
    }

    /// Loan received (debit cash, credit loan payable)
    pub fn loan_received(
        date: NaiveDate,
        summary: &str,
        cash_code: &str,
        loan_code: &str,
        amount: BigDecimal,
    ) -> LedgerResult<NewVoucher> {
        VoucherBuilder::new(date, summary)
            .debit(cash_code, amount.clone(), Some("Cash received from loan".to_string()))
            .credit(loan_code, amount, Some("Loan payable".to_string()))
            .build()
    }
}
