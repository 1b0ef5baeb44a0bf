//! Transaction model
//!
//! Represents a single income, expense or transfer record. Amounts are stored
//! as positive magnitudes; the kind decides the direction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AccountId, CategoryId, TransactionId};
use super::money::Money;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
    Transfer,
}

impl TransactionKind {
    /// Hebrew label used in the UI and in exports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "הכנסה",
            Self::Expense => "הוצאה",
            Self::Transfer => "העברה",
        }
    }

    /// Parse from an English keyword or a Hebrew label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" | "הכנסה" | "in" => Some(Self::Income),
            "expense" | "הוצאה" | "out" => Some(Self::Expense),
            "transfer" | "העברה" => Some(Self::Transfer),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    /// Transaction date
    pub date: NaiveDate,

    /// Amount (always positive, direction comes from `kind`)
    pub amount: Money,

    #[serde(rename = "type")]
    pub kind: TransactionKind,

    /// Free-text description (payee, merchant, bank text)
    pub description: String,

    /// Category (None for transfers and uncategorized records)
    pub category_id: Option<CategoryId>,

    /// Source account
    pub account_id: AccountId,

    /// Destination account, transfers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_id: Option<AccountId>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Notes (sealed at rest when encryption is enabled)
    #[serde(default)]
    pub notes: String,

    /// Bank reference number (אסמכתא)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Fingerprint for duplicate detection during CSV import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction
    pub fn new(
        account_id: AccountId,
        date: NaiveDate,
        amount: Money,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            date,
            amount,
            kind,
            description: description.into(),
            category_id: None,
            account_id,
            to_account_id: None,
            tags: Vec::new(),
            notes: String::new(),
            reference: None,
            import_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an expense in a category
    pub fn expense(
        account_id: AccountId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
        category_id: Option<CategoryId>,
    ) -> Self {
        let mut txn = Self::new(account_id, date, amount, TransactionKind::Expense, description);
        txn.category_id = category_id;
        txn
    }

    /// Create an income in a category
    pub fn income(
        account_id: AccountId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
        category_id: Option<CategoryId>,
    ) -> Self {
        let mut txn = Self::new(account_id, date, amount, TransactionKind::Income, description);
        txn.category_id = category_id;
        txn
    }

    /// Create a transfer between two accounts
    pub fn transfer(
        from: AccountId,
        to: AccountId,
        date: NaiveDate,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        let mut txn = Self::new(from, date, amount, TransactionKind::Transfer, description);
        txn.to_account_id = Some(to);
        txn
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionKind::Transfer
    }

    /// Net-worth effect: +amount for income, -amount for expense, zero for transfers
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
            TransactionKind::Transfer => Money::zero(),
        }
    }

    /// Effect of this transaction on the balance of `account`
    pub fn effect_on(&self, account: AccountId) -> Money {
        match self.kind {
            TransactionKind::Income if self.account_id == account => self.amount,
            TransactionKind::Expense if self.account_id == account => -self.amount,
            TransactionKind::Transfer => {
                let mut effect = Money::zero();
                if self.account_id == account {
                    effect -= self.amount;
                }
                if self.to_account_id == Some(account) {
                    effect += self.amount;
                }
                effect
            }
            _ => Money::zero(),
        }
    }

    /// Check whether the transaction touches an account (as source or target)
    pub fn involves_account(&self, account: AccountId) -> bool {
        self.account_id == account || self.to_account_id == Some(account)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Normalize tags: trimmed, non-empty, deduplicated, original order kept
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !normalized.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                normalized.push(tag.to_string());
            }
        }
        self.tags = normalized;
        self.updated_at = Utc::now();
    }

    /// Fingerprint used to detect the same bank row imported twice
    pub fn fingerprint(
        date: NaiveDate,
        kind: TransactionKind,
        amount: Money,
        description: &str,
    ) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        date.hash(&mut hasher);
        kind.hash(&mut hasher);
        amount.agorot().hash(&mut hasher);
        description.trim().to_lowercase().hash(&mut hasher);
        format!("imp-{:016x}", hasher.finish())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.date.format("%d/%m/%Y"),
            self.kind,
            self.description,
            self.amount
        )
    }
}
