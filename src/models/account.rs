//! Account model
//!
//! Represents a money source or sink (bank account, cash, credit card,
//! savings) with a running balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::AccountId;
use super::money::Money;

/// Type of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Bank current account (עו"ש)
    #[default]
    Bank,
    Cash,
    /// Credit card
    Credit,
    Savings,
}

impl AccountKind {
    /// Returns true if this account type typically carries debt
    pub fn is_liability(&self) -> bool {
        matches!(self, Self::Credit)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bank => "חשבון בנק",
            Self::Cash => "מזומן",
            Self::Credit => "כרטיס אשראי",
            Self::Savings => "חיסכון",
        }
    }

    /// Parse account type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bank" | "checking" | "בנק" | "עו\"ש" => Some(Self::Bank),
            "cash" | "מזומן" => Some(Self::Cash),
            "credit" | "credit_card" | "אשראי" => Some(Self::Credit),
            "savings" | "חיסכון" => Some(Self::Savings),
            _ => None,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A financial account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,

    /// Account name (e.g., "לאומי עו\"ש")
    pub name: String,

    #[serde(rename = "type")]
    pub kind: AccountKind,

    /// Balance when the account was added
    #[serde(default)]
    pub opening_balance: Money,

    /// Current balance, maintained as transactions are recorded
    pub balance: Money,

    #[serde(default)]
    pub bank_name: String,

    /// Branch number (סניף)
    #[serde(default)]
    pub branch_number: String,

    /// Account number (sealed at rest when encryption is enabled)
    #[serde(default)]
    pub account_number: String,

    /// Owner's Israeli ID number, teudat zehut (sealed at rest)
    #[serde(default)]
    pub owner_id: String,

    #[serde(default)]
    pub owner_phone: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Account {
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            name: name.into(),
            kind,
            opening_balance: Money::zero(),
            balance: Money::zero(),
            bank_name: String::new(),
            branch_number: String::new(),
            account_number: String::new(),
            owner_id: String::new(),
            owner_phone: String::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new account with an opening balance
    pub fn with_opening_balance(name: impl Into<String>, kind: AccountKind, balance: Money) -> Self {
        let mut account = Self::new(name, kind);
        account.opening_balance = balance;
        account.balance = balance;
        account
    }

    /// Apply a signed balance change
    pub fn adjust_balance(&mut self, delta: Money) {
        self.balance += delta;
        self.updated_at = Utc::now();
    }

    /// Account number with all but the last four digits hidden
    pub fn masked_account_number(&self) -> String {
        let digits: Vec<char> = self.account_number.chars().collect();
        if digits.len() <= 4 {
            return self.account_number.clone();
        }
        let visible: String = digits[digits.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(digits.len() - 4), visible)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_balance() {
        let account = Account::with_opening_balance("עו\"ש", AccountKind::Bank, Money::from_agorot(100000));
        assert_eq!(account.balance, account.opening_balance);
        assert!(account.is_active);
    }

    #[test]
    fn test_adjust_balance() {
        let mut account = Account::new("מזומן", AccountKind::Cash);
        account.adjust_balance(Money::from_agorot(-2500));
        assert_eq!(account.balance.agorot(), -2500);
    }

    #[test]
    fn test_masked_account_number() {
        let mut account = Account::new("פועלים", AccountKind::Bank);
        account.account_number = "12345678".into();
        assert_eq!(account.masked_account_number(), "****5678");
        account.account_number = "123".into();
        assert_eq!(account.masked_account_number(), "123");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(AccountKind::parse("אשראי"), Some(AccountKind::Credit));
        assert_eq!(AccountKind::parse("Savings"), Some(AccountKind::Savings));
        assert!(AccountKind::Credit.is_liability());
        assert_eq!(AccountKind::parse("stocks"), None);
    }
}
