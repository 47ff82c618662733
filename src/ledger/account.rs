//! Chart of accounts management

use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new account.
    ///
    /// The parent, when given, must be an existing non-deleted account.
    pub async fn create_account(
        &self,
        code: String,
        name: String,
        classification: AccountClassification,
        parent_code: Option<String>,
    ) -> LedgerResult<Account> {
        let account = Account::new(code, name, classification, parent_code);
        self.validator.validate_account(&account)?;

        if let Some(parent) = &account.parent_code {
            if parent == &account.code {
                return Err(LedgerError::CyclicHierarchy {
                    code: account.code.clone(),
                    parent: parent.clone(),
                });
            }
            self.live_parent(parent).await?;
        }

        self.storage.insert_account(&account).await?;

        info!(
            code = %account.code,
            classification = %account.classification,
            parent = account.parent_code.as_deref().unwrap_or("-"),
            "account created"
        );
        Ok(account)
    }

    /// Get an account by code, including soft-deleted ones
    pub async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>> {
        self.storage.get_account(code).await
    }

    /// Resolve a live account by code
    pub async fn resolve(&self, code: &str) -> LedgerResult<Account> {
        match self.storage.get_account(code).await? {
            Some(account) if !account.is_deleted => Ok(account),
            _ => Err(LedgerError::AccountNotFound(code.to_string())),
        }
    }

    /// List live accounts ordered by code
    pub async fn list_accounts(
        &self,
        classification: Option<AccountClassification>,
    ) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(classification).await
    }

    /// Soft-delete an account with no children and no referencing entries
    pub async fn delete_account(&self, code: &str) -> LedgerResult<()> {
        self.resolve(code).await?;
        self.storage.soft_delete_account(code).await?;
        info!(code, "account deleted");
        Ok(())
    }

    /// Change an account's display name
    pub async fn rename_account(&self, code: &str, name: String) -> LedgerResult<Account> {
        let mut account = self.resolve(code).await?;
        account.name = name;
        account.updated_at = chrono::Utc::now().naive_utc();
        self.validator.validate_account(&account)?;
        self.storage.update_account(&account).await?;
        info!(code, name = %account.name, "account renamed");
        Ok(account)
    }

    /// Reassign an account's parent, rejecting any move that would form a cycle
    pub async fn move_account(
        &self,
        code: &str,
        new_parent: Option<String>,
    ) -> LedgerResult<Account> {
        let mut account = self.resolve(code).await?;

        if let Some(parent) = &new_parent {
            self.live_parent(parent).await?;

            // walk up from the new parent; meeting `code` means the move closes a loop
            let mut seen = HashSet::new();
            let mut cursor = Some(parent.clone());
            while let Some(current) = cursor {
                if current == code || !seen.insert(current.clone()) {
                    return Err(LedgerError::CyclicHierarchy {
                        code: code.to_string(),
                        parent: parent.clone(),
                    });
                }
                cursor = self
                    .storage
                    .get_account(&current)
                    .await?
                    .and_then(|a| a.parent_code);
            }
        }

        account.parent_code = new_parent;
        account.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_account(&account).await?;
        info!(
            code,
            parent = account.parent_code.as_deref().unwrap_or("-"),
            "account moved"
        );
        Ok(account)
    }

    /// Change an account's classification; only allowed while no live voucher references it
    pub async fn reclassify_account(
        &self,
        code: &str,
        classification: AccountClassification,
    ) -> LedgerResult<Account> {
        let mut account = self.resolve(code).await?;
        if account.classification == classification {
            return Ok(account);
        }
        let previous = account.classification;
        account.classification = classification;
        account.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_account(&account).await?;
        info!(code, from = %previous, to = %classification, "account reclassified");
        Ok(account)
    }

    /// Direct children of an account
    pub async fn child_accounts(&self, parent_code: &str) -> LedgerResult<Vec<Account>> {
        self.resolve(parent_code).await?;
        Ok(self
            .storage
            .list_accounts(None)
            .await?
            .into_iter()
            .filter(|account| account.parent_code.as_deref() == Some(parent_code))
            .collect())
    }

    /// Ancestry of an account, root first and ending with the account itself
    pub async fn account_path(&self, code: &str) -> LedgerResult<Vec<Account>> {
        let mut path = Vec::new();
        let mut current_code = Some(code.to_string());

        while let Some(code) = current_code {
            let account = self.resolve(&code).await?;
            if path.iter().any(|a: &Account| a.code == account.code) {
                break;
            }
            current_code = account.parent_code.clone();
            path.insert(0, account);
        }

        Ok(path)
    }

    async fn live_parent(&self, parent: &str) -> LedgerResult<Account> {
        match self.storage.get_account(parent).await? {
            Some(account) if !account.is_deleted => Ok(account),
            _ => Err(LedgerError::InvalidParent(parent.to_string())),
        }
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;
    use AccountClassification::*;

    const STANDARD_CHART: &[(&str, &str, AccountClassification)] = &[
        ("1001", "Cash", Asset),
        ("1002", "Bank Deposits", Asset),
        ("1122", "Accounts Receivable", Asset),
        ("1123", "Prepayments", Asset),
        ("1403", "Raw Materials", Asset),
        ("1405", "Finished Goods", Asset),
        ("1601", "Fixed Assets", Asset),
        ("2202", "Accounts Payable", Liability),
        ("2203", "Advances from Customers", Liability),
        ("2211", "Payroll Payable", Liability),
        ("2221", "Taxes Payable", Liability),
        ("4001", "Paid-in Capital", Equity),
        ("4103", "Current-Year Profit", Equity),
        ("4104", "Profit Distribution", Equity),
        ("5001", "Production Cost", Cost),
        ("5101", "Manufacturing Overhead", Cost),
        ("6001", "Main Business Revenue", Income),
        ("6051", "Other Business Revenue", Income),
        ("6401", "Main Business Cost", Cost),
        ("6402", "Other Business Cost", Cost),
        ("6601", "Selling Expenses", Expense),
        ("6602", "Administrative Expenses", Expense),
        ("6603", "Financial Expenses", Expense),
    ];

    /// Create the default chart of accounts, keyed by code
    pub async fn create_standard_chart<S: LedgerStorage>(
        account_manager: &AccountManager<S>,
    ) -> LedgerResult<HashMap<String, Account>> {
        let mut accounts = HashMap::new();
        for (code, name, classification) in STANDARD_CHART {
            let account = account_manager
                .create_account(code.to_string(), name.to_string(), *classification, None)
                .await?;
            accounts.insert(account.code.clone(), account);
        }
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;

    async fn manager_with_tree() -> AccountManager<MemoryStorage> {
        let manager = AccountManager::new(MemoryStorage::new());
        manager
            .create_account("1001".into(), "Cash".into(), AccountClassification::Asset, None)
            .await
            .unwrap();
        manager
            .create_account(
                "100101".into(),
                "Petty Cash".into(),
                AccountClassification::Asset,
                Some("1001".into()),
            )
            .await
            .unwrap();
        manager
            .create_account(
                "10010101".into(),
                "Front Desk Float".into(),
                AccountClassification::Asset,
                Some("100101".into()),
            )
            .await
            .unwrap();
        manager
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_bad_parents() {
        let manager = manager_with_tree().await;

        let duplicate = manager
            .create_account("1001".into(), "Cash again".into(), AccountClassification::Asset, None)
            .await;
        assert_eq!(duplicate, Err(LedgerError::DuplicateCode("1001".into())));

        let orphan = manager
            .create_account(
                "2001".into(),
                "Payables".into(),
                AccountClassification::Liability,
                Some("2000".into()),
            )
            .await;
        assert_eq!(orphan, Err(LedgerError::InvalidParent("2000".into())));

        let own_parent = manager
            .create_account(
                "3001".into(),
                "Loop".into(),
                AccountClassification::Equity,
                Some("3001".into()),
            )
            .await;
        assert!(matches!(own_parent, Err(LedgerError::CyclicHierarchy { .. })));
    }

    #[tokio::test]
    async fn test_move_detects_cycles() {
        let manager = manager_with_tree().await;

        let result = manager.move_account("1001", Some("10010101".into())).await;
        assert_eq!(
            result,
            Err(LedgerError::CyclicHierarchy {
                code: "1001".into(),
                parent: "10010101".into(),
            })
        );

        let moved = manager.move_account("10010101", Some("1001".into())).await.unwrap();
        assert_eq!(moved.parent_code.as_deref(), Some("1001"));
        assert_eq!(manager.child_accounts("1001").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_account_path_is_root_first() {
        let manager = manager_with_tree().await;
        let path: Vec<String> = manager
            .account_path("10010101")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.code)
            .collect();
        assert_eq!(path, vec!["1001", "100101", "10010101"]);
    }

    #[tokio::test]
    async fn test_delete_requires_leaf() {
        let manager = manager_with_tree().await;
        assert_eq!(
            manager.delete_account("100101").await,
            Err(LedgerError::HasChildren("100101".into()))
        );

        manager.delete_account("10010101").await.unwrap();
        assert_eq!(
            manager.resolve("10010101").await,
            Err(LedgerError::AccountNotFound("10010101".into()))
        );
        // soft-deleted accounts keep their code reserved
        assert!(manager.get_account("10010101").await.unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn test_standard_chart() {
        let manager = AccountManager::new(MemoryStorage::new());
        let chart = utils::create_standard_chart(&manager).await.unwrap();
        assert_eq!(chart.len(), 23);
        assert_eq!(chart["4103"].classification, AccountClassification::Equity);
        assert_eq!(chart["6401"].classification, AccountClassification::Cost);
        assert_eq!(
            manager
                .list_accounts(Some(AccountClassification::Expense))
                .await
                .unwrap()
                .len(),
            3
        );
    }
}
