//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::ledger::closing::ensure_closable;
use crate::ledger::posting::{replay, PostingPlan};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<String, Account>,
    /// Creation order
    vouchers: Vec<Voucher>,
    index: HashMap<VoucherId, usize>,
    numbers: HashSet<String>,
    version: u64,
}

impl State {
    fn live_account(&self, code: &str) -> Option<&Account> {
        self.accounts.get(code).filter(|a| !a.is_deleted)
    }

    fn referenced(&self, code: &str) -> bool {
        self.vouchers
            .iter()
            .any(|v| !v.is_deleted && v.references_account(code))
    }

    /// `parent` must be live, and `code` must not appear among its ancestors
    fn check_parent(&self, code: &str, parent: &str) -> LedgerResult<()> {
        let cycle = || LedgerError::CyclicHierarchy {
            code: code.to_string(),
            parent: parent.to_string(),
        };
        if parent == code {
            return Err(cycle());
        }
        if self.live_account(parent).is_none() {
            return Err(LedgerError::InvalidParent(parent.to_string()));
        }

        let mut seen = HashSet::new();
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == code || !seen.insert(current) {
                return Err(cycle());
            }
            cursor = self
                .accounts
                .get(current)
                .and_then(|a| a.parent_code.as_deref());
        }
        Ok(())
    }

    fn voucher_mut(&mut self, id: VoucherId) -> LedgerResult<&mut Voucher> {
        let slot = *self.index.get(&id).ok_or(LedgerError::VoucherNotFound(id))?;
        Ok(&mut self.vouchers[slot])
    }
}

/// In-memory storage implementation for testing and development.
///
/// All state sits behind one lock, so each trait call is a single critical
/// section and clones share the same ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<State>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        *self.state.write() = State::default();
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn insert_account(&self, account: &Account) -> LedgerResult<()> {
        let mut state = self.state.write();
        if state.accounts.contains_key(&account.code) {
            return Err(LedgerError::DuplicateCode(account.code.clone()));
        }
        if !account.running_balance().is_zero() {
            return Err(LedgerError::Validation(format!(
                "account '{}' must be created with a zero balance",
                account.code
            )));
        }
        if let Some(parent) = &account.parent_code {
            state.check_parent(&account.code, parent)?;
        }
        state.accounts.insert(account.code.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>> {
        Ok(self.state.read().accounts.get(code).cloned())
    }

    async fn list_accounts(
        &self,
        classification: Option<AccountClassification>,
    ) -> LedgerResult<Vec<Account>> {
        Ok(self
            .state
            .read()
            .accounts
            .values()
            .filter(|a| !a.is_deleted)
            .filter(|a| classification.is_none_or(|c| a.classification == c))
            .cloned()
            .collect())
    }

    async fn update_account(&self, account: &Account) -> LedgerResult<()> {
        let mut state = self.state.write();
        let stored = state
            .live_account(&account.code)
            .ok_or_else(|| LedgerError::AccountNotFound(account.code.clone()))?;

        if stored.classification != account.classification && state.referenced(&account.code) {
            return Err(LedgerError::ClassificationLocked(account.code.clone()));
        }
        if stored.parent_code != account.parent_code {
            if let Some(parent) = &account.parent_code {
                state.check_parent(&account.code, parent)?;
            }
        }

        // descriptive fields only; the cached balance stays as stored
        let mut updated = stored.clone();
        updated.name = account.name.clone();
        updated.classification = account.classification;
        updated.parent_code = account.parent_code.clone();
        updated.metadata = account.metadata.clone();
        updated.updated_at = account.updated_at;
        state.accounts.insert(updated.code.clone(), updated);
        Ok(())
    }

    async fn soft_delete_account(&self, code: &str) -> LedgerResult<()> {
        let mut state = self.state.write();
        if state.live_account(code).is_none() {
            return Err(LedgerError::AccountNotFound(code.to_string()));
        }
        if state
            .accounts
            .values()
            .any(|a| !a.is_deleted && a.parent_code.as_deref() == Some(code))
        {
            return Err(LedgerError::HasChildren(code.to_string()));
        }
        if state.referenced(code) {
            return Err(LedgerError::ReferencedByEntries(code.to_string()));
        }

        if let Some(account) = state.accounts.get_mut(code) {
            account.is_deleted = true;
            account.updated_at = chrono::Utc::now().naive_utc();
        }
        Ok(())
    }

    async fn insert_voucher(&self, voucher: &Voucher) -> LedgerResult<()> {
        let mut state = self.state.write();
        if state.numbers.contains(&voucher.voucher_number) {
            return Err(LedgerError::DuplicateVoucherNumber(
                voucher.voucher_number.clone(),
            ));
        }
        if state.index.contains_key(&voucher.id) {
            return Err(LedgerError::Storage(format!(
                "voucher {} already stored",
                voucher.id
            )));
        }
        if let Some(entry) = voucher
            .entries
            .iter()
            .find(|e| state.live_account(&e.account_code).is_none())
        {
            return Err(LedgerError::UnresolvedAccount(entry.account_code.clone()));
        }
        if voucher.kind == VoucherKind::Closing {
            ensure_closable(&state.vouchers, voucher.transaction_date)?;
        }

        let slot = state.vouchers.len();
        state.index.insert(voucher.id, slot);
        state.numbers.insert(voucher.voucher_number.clone());
        state.vouchers.push(voucher.clone());
        Ok(())
    }

    async fn get_voucher(&self, id: VoucherId) -> LedgerResult<Option<Voucher>> {
        let state = self.state.read();
        Ok(state.index.get(&id).map(|&slot| state.vouchers[slot].clone()))
    }

    async fn list_vouchers(&self, filter: &VoucherFilter) -> LedgerResult<Vec<Voucher>> {
        let mut vouchers: Vec<Voucher> = self
            .state
            .read()
            .vouchers
            .iter()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        // stable, so same-day vouchers keep creation order
        vouchers.sort_by_key(|v| v.transaction_date);
        Ok(vouchers)
    }

    async fn replace_voucher(
        &self,
        voucher: &Voucher,
        expected: VoucherStatus,
    ) -> LedgerResult<()> {
        let mut state = self.state.write();
        let stored = state.voucher_mut(voucher.id)?;

        if stored.is_deleted || stored.status != expected {
            return Err(LedgerError::ConcurrentModification);
        }
        if voucher.status == VoucherStatus::Posted || stored.status == VoucherStatus::Posted {
            return Err(LedgerError::ImmutableVoucher(voucher.id));
        }

        *stored = voucher.clone();
        Ok(())
    }

    async fn commit_posting(
        &self,
        plan: &PostingPlan,
        stamp: &TransitionStamp,
    ) -> LedgerResult<()> {
        let mut state = self.state.write();

        let stored = state.voucher_mut(plan.voucher_id)?;
        if stored.is_deleted || stored.status != VoucherStatus::Approved {
            return Err(LedgerError::ConcurrentModification);
        }
        if let Some(code) = plan.deltas.keys().find(|c| state.live_account(c).is_none()) {
            return Err(LedgerError::UnresolvedAccount(code.clone()));
        }

        // every check has passed; nothing below can fail
        for (code, delta) in &plan.deltas {
            if let Some(account) = state.accounts.get_mut(code) {
                account.apply_delta(delta);
            }
        }
        let stored = state.voucher_mut(plan.voucher_id)?;
        stored.status = VoucherStatus::Posted;
        stored.posting = Some(stamp.clone());
        state.version += 1;
        Ok(())
    }

    async fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let state = self.state.read();
        Ok(LedgerSnapshot {
            accounts: state.accounts.values().cloned().collect(),
            vouchers: state.vouchers.clone(),
            version: state.version,
        })
    }

    async fn rebuild_balances(&self, expected_version: u64) -> LedgerResult<()> {
        let mut state = self.state.write();
        if state.version != expected_version {
            return Err(LedgerError::ConcurrentModification);
        }

        let accounts: Vec<Account> = state.accounts.values().cloned().collect();
        let mut balances = replay(&accounts, &state.vouchers)?;
        for account in state.accounts.values_mut() {
            let balance = balances
                .remove(&account.code)
                .unwrap_or_else(BigDecimal::zero);
            account.restore_balance(balance);
        }
        state.version += 1;
        Ok(())
    }
}
