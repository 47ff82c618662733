//! Property-based tests for the posting, reconstruction and reconciliation invariants

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, Utc};
use ledger_core::utils::validate_entries;
use ledger_core::{
    AccountClassification, Actor, Entry, Ledger, LedgerError, MemoryStorage, ReportGenerator,
    VoucherBuilder,
};
use proptest::prelude::*;

const CHART: &[(&str, AccountClassification)] = &[
    ("1001", AccountClassification::Asset),
    ("1601", AccountClassification::Asset),
    ("2202", AccountClassification::Liability),
    ("4001", AccountClassification::Equity),
    ("4103", AccountClassification::Equity),
    ("4104", AccountClassification::Equity),
    ("6001", AccountClassification::Income),
    ("6401", AccountClassification::Cost),
    ("6601", AccountClassification::Expense),
];

#[derive(Debug, Clone)]
struct Posting {
    debit: usize,
    credit: usize,
    cents: i64,
    day: i64,
}

fn cents(n: i64) -> BigDecimal {
    BigDecimal::new(n.into(), 2)
}

fn origin() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

/// Strategy for two-line vouchers between distinct accounts within one year
fn posting_strategy() -> impl Strategy<Value = Posting> {
    (0..CHART.len(), 1..CHART.len(), 1i64..10_000_000, 0i64..365).prop_map(
        |(debit, shift, cents, day)| Posting {
            debit,
            credit: (debit + shift) % CHART.len(),
            cents,
            day,
        },
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn ledger_with(postings: &[Posting]) -> Ledger<MemoryStorage> {
    let ledger = Ledger::new(MemoryStorage::new());
    let actor = Actor::new("property");
    for (code, classification) in CHART {
        ledger
            .create_account(*code, *code, *classification, None)
            .await
            .unwrap();
    }
    for p in postings {
        let input = VoucherBuilder::new(origin() + Duration::days(p.day), "generated")
            .debit(CHART[p.debit].0, cents(p.cents), None)
            .credit(CHART[p.credit].0, cents(p.cents), None)
            .build()
            .unwrap();
        let voucher = ledger.create_voucher(input, &actor).await.unwrap();
        ledger.approve_voucher(voucher.id, &actor).await.unwrap();
        ledger.post_voucher(voucher.id, &actor).await.unwrap();
    }
    ledger
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any entry set is accepted exactly when its totals differ by less than a cent
    #[test]
    fn prop_validator_accepts_iff_balanced(
        debits in prop::collection::vec(1i64..1_000_000, 1..5),
        credits in prop::collection::vec(1i64..1_000_000, 1..5),
    ) {
        let entries: Vec<Entry> = debits
            .iter()
            .map(|&d| Entry::debit("1001".into(), cents(d), None))
            .chain(credits.iter().map(|&c| Entry::credit("4001".into(), cents(c), None)))
            .collect();
        let balanced = debits.iter().sum::<i64>() == credits.iter().sum::<i64>();

        match validate_entries(&entries, &cents(1)) {
            Ok(()) => prop_assert!(balanced),
            Err(LedgerError::Imbalance { difference, .. }) => {
                prop_assert!(!balanced);
                prop_assert!(difference >= cents(1));
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    /// The cache always equals a replay of the log as of today
    #[test]
    fn prop_cache_matches_reconstruction(postings in prop::collection::vec(posting_strategy(), 0..25)) {
        runtime().block_on(async {
            let ledger = ledger_with(&postings).await;
            let today = Utc::now().date_naive();
            for (code, _) in CHART {
                assert_eq!(
                    ledger.current_balance(code).await.unwrap(),
                    ledger.balance_as_of(code, today).await.unwrap()
                );
            }
            assert!(ledger.check_drift().await.unwrap().is_clean());
        });
    }

    /// Assets equal liabilities plus equity plus unclosed profit at every cutoff
    #[test]
    fn prop_accounting_identity_holds(
        postings in prop::collection::vec(posting_strategy(), 1..25),
        cutoff in 0i64..400,
    ) {
        runtime().block_on(async {
            let ledger = ledger_with(&postings).await;
            let as_of = origin() + Duration::days(cutoff);

            let sheet = ledger.balance_sheet(as_of).await.unwrap();
            assert!(sheet.is_balanced);

            let trial = ledger.trial_balance(as_of).await.unwrap();
            assert_eq!(trial.total_debits, trial.total_credits);
        });
    }

    /// Zeroing the cache and replaying the log reproduces the same balances
    #[test]
    fn prop_reconcile_round_trip(postings in prop::collection::vec(posting_strategy(), 0..25)) {
        runtime().block_on(async {
            let ledger = ledger_with(&postings).await;
            let before: Vec<BigDecimal> = ledger
                .list_accounts(None)
                .await
                .unwrap()
                .iter()
                .map(|a| a.running_balance().clone())
                .collect();

            let repaired = ledger.reconcile(&Actor::new("auditor")).await.unwrap();
            assert!(repaired.is_clean());

            let after: Vec<BigDecimal> = ledger
                .list_accounts(None)
                .await
                .unwrap()
                .iter()
                .map(|a| a.running_balance().clone())
                .collect();
            assert_eq!(before, after);
        });
    }

    /// Closing twice in a row never changes balances the second time
    #[test]
    fn prop_closing_is_idempotent(postings in prop::collection::vec(posting_strategy(), 1..15)) {
        runtime().block_on(async {
            let ledger = ledger_with(&postings).await;
            let actor = Actor::new("controller");
            let year_end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();

            match ledger.close_period(year_end, &actor).await {
                Ok(closing) => {
                    ledger.approve_voucher(closing.id, &actor).await.unwrap();
                    ledger.post_voucher(closing.id, &actor).await.unwrap();
                }
                Err(LedgerError::AlreadyClosed(_)) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }

            let before = ledger.trial_balance(year_end).await.unwrap();
            assert_eq!(
                ledger.close_period(year_end, &actor).await,
                Err(LedgerError::AlreadyClosed(year_end))
            );
            assert_eq!(ledger.trial_balance(year_end).await.unwrap(), before);

            let sheet = ledger.balance_sheet(year_end).await.unwrap();
            assert!(sheet.unclosed_profit == BigDecimal::from(0));
        });
    }
}
