//! Validation utilities, including the balancing validator every voucher passes through

use bigdecimal::{BigDecimal, Zero};

use crate::traits::*;
use crate::types::*;

/// Check that an entry set is well formed and balanced.
///
/// Every line must carry exactly one non-zero, non-negative amount. The set is
/// balanced when `|debit_total - credit_total| < tolerance`.
pub fn validate_entries(entries: &[Entry], tolerance: &BigDecimal) -> LedgerResult<()> {
    if entries.is_empty() {
        return Err(LedgerError::EmptyVoucher);
    }

    for (index, entry) in entries.iter().enumerate() {
        validate_entry(index, entry)?;
    }

    let debit_total: BigDecimal = entries.iter().map(|e| &e.debit).sum();
    let credit_total: BigDecimal = entries.iter().map(|e| &e.credit).sum();
    let difference = (&debit_total - &credit_total).abs();

    if difference < *tolerance {
        Ok(())
    } else {
        Err(LedgerError::Imbalance {
            debit_total,
            credit_total,
            difference,
        })
    }
}

fn validate_entry(index: usize, entry: &Entry) -> LedgerResult<()> {
    let malformed = |reason: &str| LedgerError::MalformedEntry {
        index,
        reason: reason.to_string(),
    };

    if entry.debit < BigDecimal::zero() || entry.credit < BigDecimal::zero() {
        return Err(malformed("amounts cannot be negative"));
    }
    if entry.side().is_none() {
        return Err(if entry.debit.is_zero() {
            malformed("either debit or credit must be non-zero")
        } else {
            malformed("an entry cannot be both debit and credit")
        });
    }
    if entry.account_code.trim().is_empty() {
        return Err(malformed("account code is empty"));
    }
    Ok(())
}

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 20 {
        return Err(LedgerError::Validation(
            "Account code cannot exceed 20 characters".to_string(),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::Validation(
            "Account code can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a voucher summary is valid
pub fn validate_voucher_summary(summary: &str) -> LedgerResult<()> {
    if summary.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Voucher summary cannot be empty".to_string(),
        ));
    }

    if summary.chars().count() > 200 {
        return Err(LedgerError::Validation(
            "Voucher summary cannot exceed 200 characters".to_string(),
        ));
    }

    Ok(())
}

/// Account validator enforcing code and name formats
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;
        if let Some(parent) = &account.parent_code {
            validate_account_code(parent)?;
        }
        Ok(())
    }
}

/// Voucher validator that also rejects the same account twice on the same side
pub struct EnhancedVoucherValidator;

impl VoucherValidator for EnhancedVoucherValidator {
    fn validate_voucher(&self, voucher: &Voucher, tolerance: &BigDecimal) -> LedgerResult<()> {
        validate_voucher_summary(&voucher.summary)?;
        validate_entries(&voucher.entries, tolerance)?;

        let mut seen = std::collections::HashSet::new();
        for entry in &voucher.entries {
            if !seen.insert((&entry.account_code, entry.side())) {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' appears multiple times on the same side of the voucher",
                    entry.account_code
                )));
            }
        }

        Ok(())
    }
}
