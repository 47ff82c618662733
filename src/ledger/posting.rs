//! Posting engine: turns a voucher's entries into per-account balance deltas
//!
//! All deltas of a voucher are computed before anything is applied; the
//! storage backend then applies the whole plan in one commit. If any entry's
//! account cannot be resolved no plan is produced at all.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::*;

/// Balance changes of one voucher, aggregated per account code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingPlan {
    pub voucher_id: VoucherId,
    /// Signed delta per account, in each account's normal-balance sign
    pub deltas: BTreeMap<String, BigDecimal>,
}

impl PostingPlan {
    /// Build the plan for `voucher`, resolving classifications through `resolve`.
    ///
    /// Fails with `UnresolvedAccount` on the first entry whose account is unknown.
    pub fn build<F>(voucher: &Voucher, resolve: F) -> LedgerResult<Self>
    where
        F: Fn(&str) -> Option<AccountClassification>,
    {
        Ok(Self {
            voucher_id: voucher.id,
            deltas: compute_deltas(&voucher.entries, resolve)?,
        })
    }

    pub fn touches(&self, code: &str) -> bool {
        self.deltas.contains_key(code)
    }
}

/// Signed deltas for a set of entries, aggregated per account
pub fn compute_deltas<F>(entries: &[Entry], resolve: F) -> LedgerResult<BTreeMap<String, BigDecimal>>
where
    F: Fn(&str) -> Option<AccountClassification>,
{
    let mut deltas: BTreeMap<String, BigDecimal> = BTreeMap::new();
    for entry in entries {
        let classification = resolve(&entry.account_code)
            .ok_or_else(|| LedgerError::UnresolvedAccount(entry.account_code.clone()))?;
        let delta = classification.signed_delta(&entry.debit, &entry.credit);
        *deltas
            .entry(entry.account_code.clone())
            .or_insert_with(BigDecimal::zero) += delta;
    }
    Ok(deltas)
}

/// Classification lookup over the live (non-deleted) accounts
pub fn live_classifications(accounts: &[Account]) -> HashMap<&str, AccountClassification> {
    accounts
        .iter()
        .filter(|a| !a.is_deleted)
        .map(|a| (a.code.as_str(), a.classification))
        .collect()
}

/// Replay every effective voucher through the posting engine, starting from zero.
///
/// The result is what every account's cached balance should be. Accounts
/// without postings are included with a zero balance.
pub fn replay(accounts: &[Account], vouchers: &[Voucher]) -> LedgerResult<BTreeMap<String, BigDecimal>> {
    let classifications: HashMap<&str, AccountClassification> = accounts
        .iter()
        .map(|a| (a.code.as_str(), a.classification))
        .collect();

    let mut balances: BTreeMap<String, BigDecimal> = accounts
        .iter()
        .map(|a| (a.code.clone(), BigDecimal::zero()))
        .collect();

    for voucher in vouchers.iter().filter(|v| v.is_effective()) {
        let deltas = compute_deltas(&voucher.entries, |code| classifications.get(code).copied())?;
        for (code, delta) in deltas {
            *balances.entry(code).or_insert_with(BigDecimal::zero) += delta;
        }
    }

    Ok(balances)
}
