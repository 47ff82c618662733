//! Point-in-time balances rebuilt from the voucher log
//!
//! Everything here replays posted, non-deleted vouchers from zero and never
//! reads the cached running balances, so historical figures stay correct no
//! matter what the cache holds.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::traits::LedgerSnapshot;
use crate::types::*;

/// Debit and credit turnover of one account over a period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMovement {
    pub debit_total: BigDecimal,
    pub credit_total: BigDecimal,
}

impl PeriodMovement {
    pub fn zero() -> Self {
        Self {
            debit_total: BigDecimal::zero(),
            credit_total: BigDecimal::zero(),
        }
    }

    /// Net movement in the normal-balance sign of `classification`
    pub fn net(&self, classification: AccountClassification) -> BigDecimal {
        classification.signed_delta(&self.debit_total, &self.credit_total)
    }
}

impl Default for PeriodMovement {
    fn default() -> Self {
        Self::zero()
    }
}

/// Read-only replay view over a ledger snapshot
pub struct Reconstruction<'a> {
    accounts: HashMap<&'a str, &'a Account>,
    vouchers: Vec<&'a Voucher>,
}

impl<'a> Reconstruction<'a> {
    pub fn new(snapshot: &'a LedgerSnapshot) -> Self {
        Self {
            accounts: snapshot
                .accounts
                .iter()
                .map(|a| (a.code.as_str(), a))
                .collect(),
            vouchers: snapshot.vouchers.iter().filter(|v| v.is_effective()).collect(),
        }
    }

    pub fn account(&self, code: &str) -> Option<&'a Account> {
        self.accounts.get(code).copied()
    }

    /// Non-deleted accounts ordered by code
    pub fn live_accounts(&self) -> Vec<&'a Account> {
        let mut accounts: Vec<&Account> = self
            .accounts
            .values()
            .copied()
            .filter(|a| !a.is_deleted)
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts
    }

    /// Effective vouchers dated within `[start, end]` (either bound optional)
    pub fn vouchers_between(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> impl Iterator<Item = &'a Voucher> + '_ {
        self.vouchers.iter().copied().filter(move |v| {
            start.is_none_or(|s| v.transaction_date >= s)
                && end.is_none_or(|e| v.transaction_date <= e)
        })
    }

    /// Balance of one account from every effective voucher dated on or before `cutoff`
    pub fn balance_as_of(&self, code: &str, cutoff: NaiveDate) -> LedgerResult<BigDecimal> {
        let account = self
            .account(code)
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))?;

        Ok(self
            .vouchers_between(None, Some(cutoff))
            .flat_map(|v| v.entries.iter())
            .filter(|e| e.account_code == code)
            .map(|e| account.classification.signed_delta(&e.debit, &e.credit))
            .sum())
    }

    /// Balances of every known account as of `cutoff`
    pub fn balances_as_of(&self, cutoff: NaiveDate) -> BTreeMap<String, BigDecimal> {
        self.accumulate(self.vouchers_between(None, Some(cutoff)))
    }

    /// Balances after every effective voucher regardless of date
    pub fn current_balances(&self) -> BTreeMap<String, BigDecimal> {
        self.accumulate(self.vouchers_between(None, None))
    }

    fn accumulate<'v>(
        &self,
        vouchers: impl Iterator<Item = &'v Voucher>,
    ) -> BTreeMap<String, BigDecimal> {
        let mut balances: BTreeMap<String, BigDecimal> = self
            .accounts
            .keys()
            .map(|code| (code.to_string(), BigDecimal::zero()))
            .collect();

        for entry in vouchers.flat_map(|v| v.entries.iter()) {
            if let Some(account) = self.account(&entry.account_code) {
                let delta = account.classification.signed_delta(&entry.debit, &entry.credit);
                *balances
                    .entry(entry.account_code.clone())
                    .or_insert_with(BigDecimal::zero) += delta;
            }
        }

        balances
    }

    /// Debit and credit totals of one account within the inclusive range.
    ///
    /// Closing vouchers are left out so that period figures are not cancelled
    /// out by the closing that zeroed them.
    pub fn movement_in_period(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<PeriodMovement> {
        if self.account(code).is_none() {
            return Err(LedgerError::AccountNotFound(code.to_string()));
        }
        Ok(self
            .movements_in_period(start, end)
            .remove(code)
            .unwrap_or_default())
    }

    /// Movements of every account touched within the inclusive range, closing vouchers excluded
    pub fn movements_in_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BTreeMap<String, PeriodMovement> {
        let mut movements: BTreeMap<String, PeriodMovement> = BTreeMap::new();
        for voucher in self
            .vouchers_between(Some(start), Some(end))
            .filter(|v| !v.kind.is_closing())
        {
            for entry in &voucher.entries {
                let movement = movements.entry(entry.account_code.clone()).or_default();
                movement.debit_total += &entry.debit;
                movement.credit_total += &entry.credit;
            }
        }
        movements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn voucher(date: NaiveDate, kind: VoucherKind, entries: Vec<Entry>) -> Voucher {
        let actor = Actor::new("tester");
        Voucher {
            id: VoucherId::new(),
            voucher_number: format!("VOU{}", date),
            transaction_date: date,
            summary: "test".into(),
            status: VoucherStatus::Posted,
            kind,
            entries,
            is_deleted: false,
            created: TransitionStamp::now(&actor),
            approval: None,
            posting: None,
            deletion: None,
        }
    }

    fn snapshot() -> LedgerSnapshot {
        LedgerSnapshot {
            accounts: vec![
                Account::new("1001".into(), "Cash".into(), AccountClassification::Asset, None),
                Account::new("6001".into(), "Revenue".into(), AccountClassification::Income, None),
                Account::new("4103".into(), "Profit".into(), AccountClassification::Equity, None),
            ],
            vouchers: vec![
                voucher(
                    date(1, 10),
                    VoucherKind::Regular,
                    vec![
                        Entry::debit("1001".into(), dec("300.00"), None),
                        Entry::credit("6001".into(), dec("300.00"), None),
                    ],
                ),
                voucher(
                    date(2, 5),
                    VoucherKind::Regular,
                    vec![
                        Entry::debit("1001".into(), dec("50.00"), None),
                        Entry::credit("6001".into(), dec("50.00"), None),
                    ],
                ),
                voucher(
                    date(3, 31),
                    VoucherKind::Closing,
                    vec![
                        Entry::debit("6001".into(), dec("350.00"), None),
                        Entry::credit("4103".into(), dec("350.00"), None),
                    ],
                ),
            ],
            version: 3,
        }
    }

    #[test]
    fn test_balance_as_of_respects_cutoff() {
        let snapshot = snapshot();
        let view = Reconstruction::new(&snapshot);

        assert_eq!(view.balance_as_of("1001", date(1, 9)).unwrap(), dec("0"));
        assert_eq!(view.balance_as_of("1001", date(1, 10)).unwrap(), dec("300.00"));
        assert_eq!(view.balance_as_of("6001", date(2, 28)).unwrap(), dec("350.00"));
        assert_eq!(view.balance_as_of("6001", date(3, 31)).unwrap(), dec("0"));
        assert_eq!(view.balance_as_of("4103", date(3, 31)).unwrap(), dec("350.00"));
    }

    #[test]
    fn test_unknown_account() {
        let snapshot = snapshot();
        let view = Reconstruction::new(&snapshot);
        assert_eq!(
            view.balance_as_of("9999", date(1, 1)),
            Err(LedgerError::AccountNotFound("9999".into()))
        );
    }

    #[test]
    fn test_movement_is_inclusive_and_skips_closing() {
        let snapshot = snapshot();
        let view = Reconstruction::new(&snapshot);

        let q1 = view.movement_in_period("6001", date(1, 10), date(3, 31)).unwrap();
        assert_eq!(q1.credit_total, dec("350.00"));
        assert_eq!(q1.debit_total, dec("0"));
        assert_eq!(q1.net(AccountClassification::Income), dec("350.00"));

        let feb = view.movement_in_period("1001", date(2, 5), date(2, 5)).unwrap();
        assert_eq!(feb.debit_total, dec("50.00"));

        let untouched = view.movement_in_period("4103", date(1, 1), date(3, 31)).unwrap();
        assert_eq!(untouched, PeriodMovement::zero());
    }

    #[test]
    fn test_balances_as_of_covers_every_account() {
        let snapshot = snapshot();
        let view = Reconstruction::new(&snapshot);
        let balances = view.balances_as_of(date(1, 31));
        assert_eq!(balances.len(), 3);
        assert_eq!(balances["1001"], dec("300.00"));
        assert_eq!(balances["4103"], dec("0"));
    }
}
