//! Reconciliation of cached running balances against the voucher log
//!
//! The cache is only ever repaired by replaying the log; there is no way to
//! write an arbitrary balance.

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::ledger::posting::replay;
use crate::traits::{LedgerSnapshot, LedgerStorage};
use crate::types::*;

/// One account whose cached balance disagrees with the replayed log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDrift {
    pub account_code: String,
    pub cached: BigDecimal,
    pub replayed: BigDecimal,
}

impl BalanceDrift {
    /// cached - replayed
    pub fn difference(&self) -> BigDecimal {
        &self.cached - &self.replayed
    }
}

/// Outcome of comparing the cache with a full replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub drifts: Vec<BalanceDrift>,
    /// Snapshot version the comparison was made against
    pub version: u64,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// Compare every account's cached balance with the replay of all effective vouchers
pub fn detect_drift(snapshot: &LedgerSnapshot) -> LedgerResult<(DriftReport, BTreeMap<String, BigDecimal>)> {
    let replayed = replay(&snapshot.accounts, &snapshot.vouchers)?;

    let drifts = snapshot
        .accounts
        .iter()
        .filter_map(|account| {
            let expected = replayed
                .get(&account.code)
                .cloned()
                .unwrap_or_else(BigDecimal::zero);
            (account.running_balance() != &expected).then(|| BalanceDrift {
                account_code: account.code.clone(),
                cached: account.running_balance().clone(),
                replayed: expected,
            })
        })
        .collect();

    Ok((
        DriftReport {
            drifts,
            version: snapshot.version,
        },
        replayed,
    ))
}

/// Drift detection and cache rebuild over a storage backend
pub struct ReconciliationEngine<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> ReconciliationEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Report drift without changing anything
    pub async fn check_drift(&self) -> LedgerResult<DriftReport> {
        let snapshot = self.storage.snapshot().await?;
        let (report, _) = detect_drift(&snapshot)?;
        if !report.is_clean() {
            warn!(accounts = report.drifts.len(), "cached balances drifted from the voucher log");
        }
        Ok(report)
    }

    /// Rebuild every cached balance from zero by replaying the log.
    ///
    /// Returns the drift that was repaired. Fails with `ConcurrentModification`
    /// if a posting commits while the replay is computed.
    pub async fn reconcile(&self, actor: &Actor) -> LedgerResult<DriftReport> {
        let snapshot = self.storage.snapshot().await?;
        let (report, replayed) = detect_drift(&snapshot)?;

        self.storage.rebuild_balances(snapshot.version).await?;

        info!(
            actor = %actor,
            accounts = replayed.len(),
            repaired = report.drifts.len(),
            "balances rebuilt from voucher log"
        );
        Ok(report)
    }
}
