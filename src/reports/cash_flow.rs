//! Cash-flow statement
//!
//! Each voucher's net cash movement is attributed to the non-cash lines on
//! the other side of the voucher, pro rata to their amounts. The category of
//! a flow follows the classification of the line it is attributed to.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::ledger::reconstruction::Reconstruction;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CashFlowCategory {
    Operating,
    Investing,
    Financing,
}

/// Cash attributed to one offsetting line of one voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowItem {
    pub voucher_id: VoucherId,
    pub voucher_number: String,
    pub transaction_date: NaiveDate,
    pub description: String,
    pub counter_account_code: String,
    pub category: CashFlowCategory,
    /// Positive for inflows, negative for outflows
    pub amount: BigDecimal,
}

/// Inflow and outflow totals of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSection {
    pub items: Vec<CashFlowItem>,
    pub inflows: BigDecimal,
    pub outflows: BigDecimal,
    /// inflows - outflows
    pub net: BigDecimal,
}

impl CashFlowSection {
    fn from_items(items: Vec<CashFlowItem>) -> Self {
        let mut inflows = BigDecimal::zero();
        let mut outflows = BigDecimal::zero();
        for item in &items {
            if item.amount > BigDecimal::zero() {
                inflows += &item.amount;
            } else {
                outflows -= &item.amount;
            }
        }
        let net = &inflows - &outflows;
        Self {
            items,
            inflows,
            outflows,
            net,
        }
    }
}

/// Cash Flow Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub operating: CashFlowSection,
    pub investing: CashFlowSection,
    pub financing: CashFlowSection,
    pub net_cash_flow: BigDecimal,
    /// Cash balance at the end of the day before `start_date`
    pub beginning_cash: BigDecimal,
    pub ending_cash: BigDecimal,
}

fn categorize(account: Option<&Account>, config: &LedgerConfig) -> CashFlowCategory {
    match account.map(|a| (a.classification, a.code.as_str())) {
        Some((AccountClassification::Liability | AccountClassification::Equity, _)) => {
            CashFlowCategory::Financing
        }
        Some((AccountClassification::Asset, code)) if config.is_long_lived_asset(code) => {
            CashFlowCategory::Investing
        }
        _ => CashFlowCategory::Operating,
    }
}

fn cash_total(view: &Reconstruction<'_>, cutoff: Option<NaiveDate>, config: &LedgerConfig) -> BigDecimal {
    let Some(cutoff) = cutoff else {
        return BigDecimal::zero();
    };
    view.balances_as_of(cutoff)
        .iter()
        .filter(|(code, _)| config.is_cash_account(code))
        .map(|(_, balance)| balance)
        .sum()
}

/// Split `amount` over `weights` pro rata, rounded to cents, residue on the last share
fn pro_rata(amount: &BigDecimal, weights: &[&BigDecimal]) -> Vec<BigDecimal> {
    let total: BigDecimal = weights.iter().copied().sum();
    if total.is_zero() {
        return Vec::new();
    }

    let mut shares = Vec::with_capacity(weights.len());
    let mut allotted = BigDecimal::zero();
    for (i, weight) in weights.iter().enumerate() {
        let share = if i + 1 == weights.len() {
            amount - &allotted
        } else {
            ((amount.clone() * (*weight).clone()) / total.clone()).round(2)
        };
        allotted += &share;
        shares.push(share);
    }
    shares
}

/// Classify cash movements within `[start_date, end_date]`.
///
/// Transfers between cash accounts net to zero and produce no item.
pub fn assemble_cash_flow(
    view: &Reconstruction<'_>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    config: &LedgerConfig,
) -> CashFlowStatement {
    let mut operating = Vec::new();
    let mut investing = Vec::new();
    let mut financing = Vec::new();

    for voucher in view.vouchers_between(Some(start_date), Some(end_date)) {
        let (cash, others): (Vec<&Entry>, Vec<&Entry>) = voucher
            .entries
            .iter()
            .partition(|e| config.is_cash_account(&e.account_code));

        let net_cash: BigDecimal = cash.iter().map(|e| &e.debit - &e.credit).sum();
        if net_cash.is_zero() {
            continue;
        }

        // an inflow is funded by credits elsewhere, an outflow by debits
        let legs: Vec<&Entry> = others
            .into_iter()
            .filter(|e| {
                if net_cash > BigDecimal::zero() {
                    e.credit > BigDecimal::zero()
                } else {
                    e.debit > BigDecimal::zero()
                }
            })
            .collect();
        let weights: Vec<&BigDecimal> = legs.iter().map(|e| e.amount()).collect();
        let shares = pro_rata(&net_cash, &weights);

        let attributed: Vec<(&str, CashFlowCategory, BigDecimal)> = if shares.is_empty() {
            // no opposite-side line to carry the cash, e.g. a sub-tolerance residue
            let counter = voucher
                .entries
                .iter()
                .find(|e| !config.is_cash_account(&e.account_code))
                .or(cash.first().copied())
                .map_or("", |e| e.account_code.as_str());
            vec![(counter, CashFlowCategory::Operating, net_cash)]
        } else {
            legs.iter()
                .zip(shares)
                .map(|(leg, amount)| {
                    let category = categorize(view.account(&leg.account_code), config);
                    (leg.account_code.as_str(), category, amount)
                })
                .collect()
        };

        for (counter, category, amount) in attributed {
            let item = CashFlowItem {
                voucher_id: voucher.id,
                voucher_number: voucher.voucher_number.clone(),
                transaction_date: voucher.transaction_date,
                description: voucher.summary.clone(),
                counter_account_code: counter.to_string(),
                category,
                amount,
            };
            match category {
                CashFlowCategory::Operating => operating.push(item),
                CashFlowCategory::Investing => investing.push(item),
                CashFlowCategory::Financing => financing.push(item),
            }
        }
    }

    let operating = CashFlowSection::from_items(operating);
    let investing = CashFlowSection::from_items(investing);
    let financing = CashFlowSection::from_items(financing);
    let net_cash_flow = &operating.net + &investing.net + &financing.net;

    CashFlowStatement {
        start_date,
        end_date,
        operating,
        investing,
        financing,
        net_cash_flow,
        beginning_cash: cash_total(view, start_date.pred_opt(), config),
        ending_cash: cash_total(view, Some(end_date), config),
    }
}
