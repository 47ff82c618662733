//! Period-closing engine
//!
//! Builds the entries of the voucher that zeroes every income, expense and
//! cost account into the current-year profit account and then transfers the
//! profit to the distribution account. The voucher itself goes through the
//! normal draft -> approved -> posted lifecycle.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::ledger::reconstruction::Reconstruction;
use crate::types::*;

/// Entries and totals of a closing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosingPlan {
    pub as_of_date: NaiveDate,
    pub entries: Vec<Entry>,
    pub total_income: BigDecimal,
    pub total_expense: BigDecimal,
    pub total_cost: BigDecimal,
    /// income - expense - cost
    pub net_profit: BigDecimal,
}

/// Check that a closing voucher dated `as_of_date` may join `vouchers`.
///
/// Fails with `ClosingPending` while another closing voucher is draft or
/// approved, and with `AlreadyClosed` when a posted closing voucher is dated
/// on or after `as_of_date`.
pub fn ensure_closable<'a>(
    vouchers: impl IntoIterator<Item = &'a Voucher>,
    as_of_date: NaiveDate,
) -> LedgerResult<()> {
    for voucher in vouchers {
        if voucher.is_deleted || voucher.kind != VoucherKind::Closing {
            continue;
        }
        if voucher.status != VoucherStatus::Posted {
            return Err(LedgerError::ClosingPending(voucher.id));
        }
        if voucher.transaction_date >= as_of_date {
            return Err(LedgerError::AlreadyClosed(as_of_date));
        }
    }
    Ok(())
}

/// Compute the closing entries as of `as_of_date`.
///
/// Fails with `NoProfitAccount` / `NoDistributionAccount` when the designated
/// accounts are missing, and with `AlreadyClosed` when every profit and loss
/// account is already zero.
pub fn plan_closing(
    view: &Reconstruction<'_>,
    as_of_date: NaiveDate,
    config: &LedgerConfig,
) -> LedgerResult<ClosingPlan> {
    let profit_code = &config.profit_account_code;
    let distribution_code = &config.distribution_account_code;

    if !view.account(profit_code).is_some_and(|a| !a.is_deleted) {
        return Err(LedgerError::NoProfitAccount(profit_code.clone()));
    }
    if !view.account(distribution_code).is_some_and(|a| !a.is_deleted) {
        return Err(LedgerError::NoDistributionAccount(distribution_code.clone()));
    }

    let balances = view.balances_as_of(as_of_date);
    let mut entries = Vec::new();
    let mut total_income = BigDecimal::zero();
    let mut total_expense = BigDecimal::zero();
    let mut total_cost = BigDecimal::zero();

    for account in view
        .live_accounts()
        .into_iter()
        .filter(|a| a.classification.is_profit_and_loss())
    {
        let balance = match balances.get(&account.code) {
            Some(balance) if !balance.is_zero() => balance.clone(),
            _ => continue,
        };

        // a positive balance sits on the normal side, so it is cleared from the opposite one
        let normal = account.classification.normal_balance();
        let side = if balance > BigDecimal::zero() {
            normal.opposite()
        } else {
            normal
        };
        entries.push(Entry::on_side(
            side,
            account.code.clone(),
            balance.abs(),
            Some(format!("Close {} balance", account.name)),
        ));

        match account.classification {
            AccountClassification::Income => total_income += balance,
            AccountClassification::Expense => total_expense += balance,
            AccountClassification::Cost => total_cost += balance,
            _ => {}
        }
    }

    if entries.is_empty() {
        return Err(LedgerError::AlreadyClosed(as_of_date));
    }

    let net_profit = &total_income - &total_expense - &total_cost;

    if !net_profit.is_zero() {
        let amount = net_profit.abs();
        let (into_profit, out_of_profit) = if net_profit > BigDecimal::zero() {
            (EntryType::Credit, EntryType::Debit)
        } else {
            (EntryType::Debit, EntryType::Credit)
        };

        entries.push(Entry::on_side(
            into_profit,
            profit_code.clone(),
            amount.clone(),
            Some("Profit and loss for the period".to_string()),
        ));
        entries.push(Entry::on_side(
            out_of_profit,
            profit_code.clone(),
            amount.clone(),
            Some("Transfer current-year profit to distribution".to_string()),
        ));
        entries.push(Entry::on_side(
            into_profit,
            distribution_code.clone(),
            amount,
            Some("Transfer current-year profit to distribution".to_string()),
        ));
    }

    Ok(ClosingPlan {
        as_of_date,
        entries,
        total_income,
        total_expense,
        total_cost,
        net_profit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LedgerSnapshot;
    use crate::utils::validation::validate_entries;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn quarter_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn posted(entries: Vec<Entry>) -> Voucher {
        let actor = Actor::new("tester");
        Voucher {
            id: VoucherId::new(),
            voucher_number: "VOU1".into(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            summary: "test".into(),
            status: VoucherStatus::Posted,
            kind: VoucherKind::Regular,
            entries,
            is_deleted: false,
            created: TransitionStamp::now(&actor),
            approval: None,
            posting: None,
            deletion: None,
        }
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account::new("1002".into(), "Bank".into(), AccountClassification::Asset, None),
            Account::new("4103".into(), "Current-Year Profit".into(), AccountClassification::Equity, None),
            Account::new("4104".into(), "Profit Distribution".into(), AccountClassification::Equity, None),
            Account::new("5001".into(), "Production Cost".into(), AccountClassification::Cost, None),
            Account::new("6001".into(), "Revenue".into(), AccountClassification::Income, None),
            Account::new("6601".into(), "Selling Expenses".into(), AccountClassification::Expense, None),
        ]
    }

    #[test]
    fn test_quarter_close_reverses_profit_and_loss() {
        let snapshot = LedgerSnapshot {
            accounts: accounts(),
            vouchers: vec![
                posted(vec![
                    Entry::debit("1002".into(), dec("300.00"), None),
                    Entry::credit("6001".into(), dec("300.00"), None),
                ]),
                posted(vec![
                    Entry::debit("6601".into(), dec("120.00"), None),
                    Entry::credit("1002".into(), dec("120.00"), None),
                ]),
            ],
            version: 2,
        };
        let view = Reconstruction::new(&snapshot);
        let plan = plan_closing(&view, quarter_end(), &LedgerConfig::default()).unwrap();

        assert_eq!(plan.net_profit, dec("180.00"));
        assert_eq!(plan.entries[0], Entry::debit("6001".into(), dec("300.00"), plan.entries[0].memo.clone()));
        assert_eq!(plan.entries[1], Entry::credit("6601".into(), dec("120.00"), plan.entries[1].memo.clone()));
        assert_eq!(plan.entries[2].account_code, "4103");
        assert_eq!(plan.entries[2].credit, dec("180.00"));
        assert_eq!(plan.entries[4].account_code, "4104");
        assert_eq!(plan.entries[4].credit, dec("180.00"));
        assert!(validate_entries(&plan.entries, &dec("0.01")).is_ok());
    }

    #[test]
    fn test_loss_is_debited_to_distribution() {
        let snapshot = LedgerSnapshot {
            accounts: accounts(),
            vouchers: vec![posted(vec![
                Entry::debit("5001".into(), dec("80.00"), None),
                Entry::credit("1002".into(), dec("80.00"), None),
            ])],
            version: 1,
        };
        let view = Reconstruction::new(&snapshot);
        let plan = plan_closing(&view, quarter_end(), &LedgerConfig::default()).unwrap();

        assert_eq!(plan.net_profit, dec("-80.00"));
        assert_eq!(plan.entries[0].credit, dec("80.00"));
        assert_eq!(plan.entries[1].debit, dec("80.00"));
        assert_eq!(plan.entries[3].account_code, "4104");
        assert_eq!(plan.entries[3].debit, dec("80.00"));
        assert!(validate_entries(&plan.entries, &dec("0.01")).is_ok());
    }

    #[test]
    fn test_earlier_date_cannot_be_closed_again() {
        let mut june = posted(vec![]);
        june.kind = VoucherKind::Closing;
        june.transaction_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        assert_eq!(
            ensure_closable([&june], quarter_end()),
            Err(LedgerError::AlreadyClosed(quarter_end()))
        );
        assert_eq!(
            ensure_closable([&june], june.transaction_date),
            Err(LedgerError::AlreadyClosed(june.transaction_date))
        );
        let september = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        assert_eq!(ensure_closable([&june], september), Ok(()));

        let mut draft = june.clone();
        draft.id = VoucherId::new();
        draft.status = VoucherStatus::Draft;
        assert_eq!(
            ensure_closable([&june, &draft], september),
            Err(LedgerError::ClosingPending(draft.id))
        );
        draft.is_deleted = true;
        assert_eq!(ensure_closable([&june, &draft], september), Ok(()));
    }

    #[test]
    fn test_nothing_to_close() {
        let snapshot = LedgerSnapshot {
            accounts: accounts(),
            vouchers: vec![],
            version: 0,
        };
        let view = Reconstruction::new(&snapshot);
        assert_eq!(
            plan_closing(&view, quarter_end(), &LedgerConfig::default()),
            Err(LedgerError::AlreadyClosed(quarter_end()))
        );
    }

    #[test]
    fn test_missing_designated_accounts() {
        let mut accounts = accounts();
        accounts.retain(|a| a.code != "4104");
        let snapshot = LedgerSnapshot {
            accounts,
            vouchers: vec![],
            version: 0,
        };
        let view = Reconstruction::new(&snapshot);
        assert_eq!(
            plan_closing(&view, quarter_end(), &LedgerConfig::default()),
            Err(LedgerError::NoDistributionAccount("4104".into()))
        );

        let config = LedgerConfig {
            profit_account_code: "3999".into(),
            ..LedgerConfig::default()
        };
        assert_eq!(
            plan_closing(&view, quarter_end(), &config),
            Err(LedgerError::NoProfitAccount("3999".into()))
        );
    }
}
