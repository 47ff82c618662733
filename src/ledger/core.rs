//! Main ledger orchestrator that coordinates accounts, vouchers, closing and reports

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::LedgerConfig;
use crate::ledger::closing::{ensure_closable, plan_closing};
use crate::ledger::reconstruction::{PeriodMovement, Reconstruction};
use crate::ledger::{AccountManager, NewVoucher, VoucherManager};
use crate::reconciliation::{BalanceDrift, DriftReport, ReconciliationEngine};
use crate::reports::*;
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    account_manager: AccountManager<S>,
    voucher_manager: VoucherManager<S>,
    reconciliation: ReconciliationEngine<S>,
    config: Arc<LedgerConfig>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, LedgerConfig::default())
    }

    /// Create a new ledger with explicit configuration
    pub fn with_config(storage: S, config: LedgerConfig) -> Self {
        let config = Arc::new(config);
        Self {
            account_manager: AccountManager::new(storage.clone()),
            voucher_manager: VoucherManager::new(storage.clone(), config.clone()),
            reconciliation: ReconciliationEngine::new(storage),
            config,
        }
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: LedgerConfig,
        account_validator: Box<dyn AccountValidator>,
        voucher_validator: Box<dyn VoucherValidator>,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            account_manager: AccountManager::with_validator(storage.clone(), account_validator),
            voucher_manager: VoucherManager::with_validator(
                storage.clone(),
                config.clone(),
                voucher_validator,
            ),
            reconciliation: ReconciliationEngine::new(storage),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        self.account_manager.storage.snapshot().await
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &self,
        code: impl Into<String>,
        name: impl Into<String>,
        classification: AccountClassification,
        parent_code: Option<String>,
    ) -> LedgerResult<Account> {
        self.account_manager
            .create_account(code.into(), name.into(), classification, parent_code)
            .await
    }

    /// Get an account by code, including soft-deleted ones
    pub async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(code).await
    }

    /// Resolve a live account, failing with `AccountNotFound`
    pub async fn lookup_account(&self, code: &str) -> LedgerResult<Account> {
        self.account_manager.resolve(code).await
    }

    /// List live accounts ordered by code
    pub async fn list_accounts(
        &self,
        classification: Option<AccountClassification>,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts(classification).await
    }

    /// Delete an account
    pub async fn delete_account(&self, code: &str) -> LedgerResult<()> {
        self.account_manager.delete_account(code).await
    }

    pub async fn rename_account(&self, code: &str, name: impl Into<String>) -> LedgerResult<Account> {
        self.account_manager.rename_account(code, name.into()).await
    }

    pub async fn move_account(&self, code: &str, new_parent: Option<String>) -> LedgerResult<Account> {
        self.account_manager.move_account(code, new_parent).await
    }

    pub async fn reclassify_account(
        &self,
        code: &str,
        classification: AccountClassification,
    ) -> LedgerResult<Account> {
        self.account_manager
            .reclassify_account(code, classification)
            .await
    }

    pub async fn child_accounts(&self, code: &str) -> LedgerResult<Vec<Account>> {
        self.account_manager.child_accounts(code).await
    }

    pub async fn account_path(&self, code: &str) -> LedgerResult<Vec<Account>> {
        self.account_manager.account_path(code).await
    }

    /// Setup the standard chart of accounts
    pub async fn setup_standard_chart(&self) -> LedgerResult<HashMap<String, Account>> {
        crate::ledger::account::utils::create_standard_chart(&self.account_manager).await
    }

    // Voucher operations
    /// Record a new draft voucher; unbalanced or malformed input is rejected
    pub async fn create_voucher(&self, input: NewVoucher, actor: &Actor) -> LedgerResult<Voucher> {
        self.voucher_manager
            .create_voucher(input, VoucherKind::Regular, actor)
            .await
    }

    pub async fn approve_voucher(&self, id: VoucherId, actor: &Actor) -> LedgerResult<Voucher> {
        self.voucher_manager.approve(id, actor).await
    }

    pub async fn post_voucher(&self, id: VoucherId, actor: &Actor) -> LedgerResult<Voucher> {
        self.voucher_manager.post(id, actor).await
    }

    pub async fn delete_voucher(&self, id: VoucherId, actor: &Actor) -> LedgerResult<()> {
        self.voucher_manager.delete(id, actor).await
    }

    /// Draft a voucher that reverses a posted one
    pub async fn reverse_voucher(
        &self,
        id: VoucherId,
        transaction_date: NaiveDate,
        actor: &Actor,
    ) -> LedgerResult<Voucher> {
        self.voucher_manager
            .reverse(id, transaction_date, actor)
            .await
    }

    pub async fn get_voucher(&self, id: VoucherId) -> LedgerResult<Option<Voucher>> {
        self.voucher_manager.get_voucher(id).await
    }

    pub async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>> {
        self.voucher_manager.list_vouchers(filter).await
    }

    // Closing
    /// Draft the closing voucher for all profit and loss balances as of `as_of_date`.
    ///
    /// The voucher still has to be approved and posted like any other. Only one
    /// closing voucher may be pending at a time, and a date on or before the
    /// latest posted closing cannot be closed again.
    pub async fn close_period(&self, as_of_date: NaiveDate, actor: &Actor) -> LedgerResult<Voucher> {
        let snapshot = self.snapshot().await?;
        // storage repeats this check atomically when the voucher is inserted
        ensure_closable(&snapshot.vouchers, as_of_date)?;
        let plan = plan_closing(&Reconstruction::new(&snapshot), as_of_date, &self.config)?;

        let voucher = self
            .voucher_manager
            .create_voucher(
                NewVoucher {
                    transaction_date: as_of_date,
                    summary: format!("Period closing as of {}", as_of_date),
                    entries: plan.entries,
                },
                VoucherKind::Closing,
                actor,
            )
            .await?;

        info!(
            voucher_id = %voucher.id,
            as_of = %as_of_date,
            total_income = %plan.total_income,
            total_expense = %plan.total_expense,
            total_cost = %plan.total_cost,
            net_profit = %plan.net_profit,
            "closing voucher drafted"
        );
        Ok(voucher)
    }

    // Balances
    /// Cached balance as of now
    pub async fn current_balance(&self, code: &str) -> LedgerResult<BigDecimal> {
        Ok(self.lookup_account(code).await?.running_balance().clone())
    }

    /// Balance replayed from the log up to and including `cutoff`
    pub async fn balance_as_of(&self, code: &str, cutoff: NaiveDate) -> LedgerResult<BigDecimal> {
        let snapshot = self.snapshot().await?;
        Reconstruction::new(&snapshot).balance_as_of(code, cutoff)
    }

    /// Debit and credit totals within the inclusive range, closing vouchers excluded
    pub async fn movement_in_period(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<PeriodMovement> {
        let snapshot = self.snapshot().await?;
        Reconstruction::new(&snapshot).movement_in_period(code, start_date, end_date)
    }

    // Reconciliation
    pub async fn check_drift(&self) -> LedgerResult<DriftReport> {
        self.reconciliation.check_drift().await
    }

    /// Rebuild every cached balance from the voucher log
    pub async fn reconcile(&self, actor: &Actor) -> LedgerResult<DriftReport> {
        self.reconciliation.reconcile(actor).await
    }

    /// Validate the integrity of the ledger
    pub async fn validate_integrity(
        &self,
        as_of_date: NaiveDate,
    ) -> LedgerResult<LedgerIntegrityReport> {
        let snapshot = self.snapshot().await?;
        let view = Reconstruction::new(&snapshot);
        let tolerance = &self.config.balance_tolerance;

        let trial_balance = assemble_trial_balance(&view, as_of_date, tolerance);
        let balance_sheet = assemble_balance_sheet(&view, as_of_date, tolerance);
        let (drift, _) = crate::reconciliation::detect_drift(&snapshot)?;

        let mut issues = Vec::new();

        if !trial_balance.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.total_debits, trial_balance.total_credits
            ));
        }

        let total_liabilities_equity = &balance_sheet.total_liabilities
            + &balance_sheet.total_equity
            + &balance_sheet.unclosed_profit;

        if !balance_sheet.is_balanced {
            issues.push(format!(
                "Balance sheet is not balanced: assets = {}, liabilities + equity + profit = {}",
                balance_sheet.total_assets, total_liabilities_equity
            ));
        }

        for d in &drift.drifts {
            issues.push(format!(
                "Cached balance of {} is {} but the voucher log gives {}",
                d.account_code, d.cached, d.replayed
            ));
        }

        Ok(LedgerIntegrityReport {
            as_of_date,
            is_valid: issues.is_empty(),
            issues,
            trial_balance_total_debits: trial_balance.total_debits,
            trial_balance_total_credits: trial_balance.total_credits,
            balance_sheet_total_assets: balance_sheet.total_assets,
            balance_sheet_total_liabilities_equity: total_liabilities_equity,
            drifted_accounts: drift.drifts,
        })
    }
}

#[async_trait]
impl<S: LedgerStorage + Clone> ReportGenerator for Ledger<S> {
    async fn balance_sheet(&self, as_of_date: NaiveDate) -> LedgerResult<BalanceSheet> {
        let snapshot = self.snapshot().await?;
        let sheet = assemble_balance_sheet(
            &Reconstruction::new(&snapshot),
            as_of_date,
            &self.config.balance_tolerance,
        );
        if !sheet.is_balanced {
            return Err(LedgerError::UnbalancedStatement {
                as_of_date,
                liabilities_and_equity: &sheet.total_assets - &sheet.difference,
                assets: sheet.total_assets,
            });
        }
        Ok(sheet)
    }

    async fn income_statement(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement> {
        let snapshot = self.snapshot().await?;
        Ok(assemble_income_statement(
            &Reconstruction::new(&snapshot),
            start_date,
            end_date,
        ))
    }

    async fn cash_flow(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<CashFlowStatement> {
        let snapshot = self.snapshot().await?;
        Ok(assemble_cash_flow(
            &Reconstruction::new(&snapshot),
            start_date,
            end_date,
            &self.config,
        ))
    }

    async fn trial_balance(&self, as_of_date: NaiveDate) -> LedgerResult<TrialBalance> {
        let snapshot = self.snapshot().await?;
        Ok(assemble_trial_balance(
            &Reconstruction::new(&snapshot),
            as_of_date,
            &self.config.balance_tolerance,
        ))
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub as_of_date: NaiveDate,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
    pub balance_sheet_total_assets: BigDecimal,
    pub balance_sheet_total_liabilities_equity: BigDecimal,
    pub drifted_accounts: Vec<BalanceDrift>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::voucher::patterns;
    use crate::utils::memory_storage::MemoryStorage;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_ledger_basic_operations() {
        let ledger = Ledger::new(MemoryStorage::new());
        let clerk = Actor::new("clerk");
        let manager = Actor::new("manager");

        ledger.setup_standard_chart().await.unwrap();

        let sale = patterns::sale(day(1, 1), "Sale of goods", "1001", "6001", BigDecimal::from(1000)).unwrap();
        let voucher = ledger.create_voucher(sale, &clerk).await.unwrap();
        assert_eq!(voucher.status, VoucherStatus::Draft);
        assert!(voucher.voucher_number.starts_with("VOU"));

        ledger.approve_voucher(voucher.id, &manager).await.unwrap();
        let posted = ledger.post_voucher(voucher.id, &manager).await.unwrap();
        assert_eq!(posted.status, VoucherStatus::Posted);
        assert_eq!(posted.posting.as_ref().unwrap().actor, manager);

        assert_eq!(ledger.current_balance("1001").await.unwrap(), BigDecimal::from(1000));
        assert_eq!(ledger.current_balance("6001").await.unwrap(), BigDecimal::from(1000));

        let balance_sheet = ledger.balance_sheet(day(1, 1)).await.unwrap();
        assert_eq!(balance_sheet.total_assets, BigDecimal::from(1000));
        assert_eq!(balance_sheet.unclosed_profit, BigDecimal::from(1000));

        let integrity = ledger.validate_integrity(day(1, 31)).await.unwrap();
        assert!(integrity.is_valid, "{:?}", integrity.issues);
    }

    #[tokio::test]
    async fn test_closing_blocks_while_pending() {
        let ledger = Ledger::new(MemoryStorage::new());
        let actor = Actor::new("controller");
        ledger.setup_standard_chart().await.unwrap();

        let sale = patterns::sale(day(2, 1), "Sale", "1002", "6001", BigDecimal::from(50)).unwrap();
        let v = ledger.create_voucher(sale, &actor).await.unwrap();
        ledger.approve_voucher(v.id, &actor).await.unwrap();
        ledger.post_voucher(v.id, &actor).await.unwrap();

        let closing = ledger.close_period(day(3, 31), &actor).await.unwrap();
        assert_eq!(closing.kind, VoucherKind::Closing);
        assert!(closing.voucher_number.starts_with("CLOS"));
        assert_eq!(
            ledger.close_period(day(3, 31), &actor).await,
            Err(LedgerError::ClosingPending(closing.id))
        );

        ledger.approve_voucher(closing.id, &actor).await.unwrap();
        ledger.post_voucher(closing.id, &actor).await.unwrap();
        assert_eq!(
            ledger.close_period(day(3, 31), &actor).await,
            Err(LedgerError::AlreadyClosed(day(3, 31)))
        );
        assert_eq!(ledger.current_balance("4104").await.unwrap(), BigDecimal::from(50));
        assert_eq!(ledger.current_balance("4103").await.unwrap(), BigDecimal::from(0));
    }
}
