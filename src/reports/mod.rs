//! Financial statement assemblers
//!
//! Pure functions over a [`Reconstruction`]: they never read cached running
//! balances and never mutate anything.

pub mod cash_flow;

pub use cash_flow::*;

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ledger::reconstruction::Reconstruction;
use crate::types::*;

/// Balance Sheet report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub assets: Vec<AccountBalance>,
    pub liabilities: Vec<AccountBalance>,
    pub equity: Vec<AccountBalance>,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    /// Income - expense - cost not yet closed into equity
    pub unclosed_profit: BigDecimal,
    /// assets - (liabilities + equity + unclosed profit)
    pub difference: BigDecimal,
    pub is_balanced: bool,
}

/// One account's figure on a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub account_code: String,
    pub account_name: String,
    pub amount: BigDecimal,
}

/// Income Statement report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub income: Vec<StatementLine>,
    pub costs: Vec<StatementLine>,
    pub expenses: Vec<StatementLine>,
    pub total_income: BigDecimal,
    pub total_cost: BigDecimal,
    pub total_expense: BigDecimal,
    /// income - cost
    pub gross_profit: BigDecimal,
    /// gross profit - expense
    pub net_profit: BigDecimal,
}

/// Partition balances as of `as_of_date` and check the accounting identity
pub fn assemble_balance_sheet(
    view: &Reconstruction<'_>,
    as_of_date: NaiveDate,
    tolerance: &BigDecimal,
) -> BalanceSheet {
    let balances = view.balances_as_of(as_of_date);

    let mut assets = Vec::new();
    let mut liabilities = Vec::new();
    let mut equity = Vec::new();
    let mut unclosed_profit = BigDecimal::zero();

    for account in view.live_accounts() {
        let balance = balances
            .get(&account.code)
            .cloned()
            .unwrap_or_else(BigDecimal::zero);
        match account.classification {
            AccountClassification::Asset => assets.push(AccountBalance::new(account.clone(), balance)),
            AccountClassification::Liability => {
                liabilities.push(AccountBalance::new(account.clone(), balance))
            }
            AccountClassification::Equity => equity.push(AccountBalance::new(account.clone(), balance)),
            AccountClassification::Income => unclosed_profit += balance,
            AccountClassification::Expense | AccountClassification::Cost => unclosed_profit -= balance,
        }
    }

    let total = |lines: &[AccountBalance]| -> BigDecimal { lines.iter().map(|l| &l.balance).sum() };
    let total_assets = total(&assets);
    let total_liabilities = total(&liabilities);
    let total_equity = total(&equity);
    let difference = &total_assets - (&total_liabilities + &total_equity + &unclosed_profit);
    let is_balanced = difference.abs() < *tolerance;

    BalanceSheet {
        as_of_date,
        assets,
        liabilities,
        equity,
        total_assets,
        total_liabilities,
        total_equity,
        unclosed_profit,
        difference,
        is_balanced,
    }
}

/// Sum period movements of the profit and loss accounts, closing vouchers excluded
pub fn assemble_income_statement(
    view: &Reconstruction<'_>,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> IncomeStatement {
    let movements = view.movements_in_period(start_date, end_date);

    let mut income = Vec::new();
    let mut costs = Vec::new();
    let mut expenses = Vec::new();

    for account in view.live_accounts() {
        let Some(movement) = movements.get(&account.code) else {
            continue;
        };
        let line = StatementLine {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            amount: movement.net(account.classification),
        };
        match account.classification {
            AccountClassification::Income => income.push(line),
            AccountClassification::Cost => costs.push(line),
            AccountClassification::Expense => expenses.push(line),
            _ => {}
        }
    }

    let total = |lines: &[StatementLine]| -> BigDecimal { lines.iter().map(|l| &l.amount).sum() };
    let total_income = total(&income);
    let total_cost = total(&costs);
    let total_expense = total(&expenses);
    let gross_profit = &total_income - &total_cost;
    let net_profit = &gross_profit - &total_expense;

    IncomeStatement {
        start_date,
        end_date,
        income,
        costs,
        expenses,
        total_income,
        total_cost,
        total_expense,
        gross_profit,
        net_profit,
    }
}

/// List every live account with its debit or credit column as of `as_of_date`
pub fn assemble_trial_balance(
    view: &Reconstruction<'_>,
    as_of_date: NaiveDate,
    tolerance: &BigDecimal,
) -> TrialBalance {
    let balances = view.balances_as_of(as_of_date);
    let mut lines = BTreeMap::new();
    let mut total_debits = BigDecimal::zero();
    let mut total_credits = BigDecimal::zero();

    for account in view.live_accounts() {
        let balance = balances
            .get(&account.code)
            .cloned()
            .unwrap_or_else(BigDecimal::zero);
        let line = AccountBalance::new(account.clone(), balance);
        if let Some(debit) = &line.debit_balance {
            total_debits += debit;
        }
        if let Some(credit) = &line.credit_balance {
            total_credits += credit;
        }
        lines.insert(account.code.clone(), line);
    }

    let is_balanced = (&total_debits - &total_credits).abs() < *tolerance;

    TrialBalance {
        as_of_date,
        balances: lines,
        total_debits,
        total_credits,
        is_balanced,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::traits::LedgerSnapshot;
    use std::str::FromStr;

    pub fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    pub fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    pub fn posted(on: NaiveDate, kind: VoucherKind, entries: Vec<Entry>) -> Voucher {
        let actor = Actor::new("tester");
        Voucher {
            id: VoucherId::new(),
            voucher_number: format!("{}{}", kind.number_prefix(), on),
            transaction_date: on,
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

    pub fn pair(debit: &str, credit: &str, amount: &str) -> Vec<Entry> {
        vec![
            Entry::debit(debit.into(), dec(amount), None),
            Entry::credit(credit.into(), dec(amount), None),
        ]
    }

    pub fn snapshot(vouchers: Vec<Voucher>) -> LedgerSnapshot {
        use AccountClassification::*;
        let accounts = [
            ("1001", "Cash", Asset),
            ("1002", "Bank Deposits", Asset),
            ("1122", "Accounts Receivable", Asset),
            ("1601", "Fixed Assets", Asset),
            ("2202", "Accounts Payable", Liability),
            ("4001", "Paid-in Capital", Equity),
            ("4103", "Current-Year Profit", Equity),
            ("4104", "Profit Distribution", Equity),
            ("6001", "Main Business Revenue", Income),
            ("6401", "Main Business Cost", Cost),
            ("6601", "Selling Expenses", Expense),
        ]
        .into_iter()
        .map(|(code, name, class)| Account::new(code.into(), name.into(), class, None))
        .collect();

        LedgerSnapshot {
            accounts,
            vouchers,
            version: 0,
        }
    }
}
