//! Field-level validation for Kesef records
//!
//! Every record implements [`Validate`], which collects Hebrew error messages
//! keyed by field name instead of stopping at the first failure. The UI (or
//! CLI) can then show each message next to the field it belongs to.

pub mod rules;

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{Account, Budget, Category, Transaction, TransactionKind};

pub use rules::{is_valid_hex_color, is_valid_israeli_id, is_valid_israeli_phone, normalize_phone};

/// Error messages grouped by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Messages for one field (empty when the field is valid)
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of invalid fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Merge another set of errors, prefixing their field names
    pub fn merge(&mut self, prefix: &str, other: ValidationErrors) {
        for (field, messages) in other.fields {
            let key = if prefix.is_empty() {
                field
            } else {
                format!("{}.{}", prefix, field)
            };
            self.fields.entry(key).or_default().extend(messages);
        }
    }

    /// `Ok(())` when no errors were recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Records that can check their own fields
pub trait Validate {
    /// Collect every field error
    fn validation_errors(&self) -> ValidationErrors;

    fn validate(&self) -> Result<(), ValidationErrors> {
        self.validation_errors().into_result()
    }

    fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }
}

/// Longest accepted description
pub const MAX_DESCRIPTION_LEN: usize = 200;
/// Longest accepted category or account name
pub const MAX_NAME_LEN: usize = 50;

impl Validate for Transaction {
    fn validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        rules::required(&mut errors, "description", &self.description);
        rules::max_len(&mut errors, "description", &self.description, MAX_DESCRIPTION_LEN);
        rules::positive_amount(&mut errors, "amount", self.amount);
        rules::date_in_supported_range(&mut errors, "date", self.date);

        match self.kind {
            TransactionKind::Transfer => {
                match self.to_account_id {
                    None => errors.add("to_account_id", "יש לבחור חשבון יעד להעברה"),
                    Some(to) if to == self.account_id => {
                        errors.add("to_account_id", "לא ניתן להעביר לאותו חשבון")
                    }
                    Some(_) => {}
                }
                if self.category_id.is_some() {
                    errors.add("category_id", "להעברה בין חשבונות אין קטגוריה");
                }
            }
            TransactionKind::Income | TransactionKind::Expense => {
                if self.to_account_id.is_some() {
                    errors.add("to_account_id", "חשבון יעד מותר רק בהעברה");
                }
            }
        }

        for tag in &self.tags {
            if tag.trim().is_empty() {
                errors.add("tags", "תגית ריקה אינה מותרת");
                break;
            }
        }

        errors
    }
}

impl Transaction {
    /// Field validation plus the rules that depend on the current date
    pub fn validate_at(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut errors = self.validation_errors();
        rules::date_not_far_in_future(&mut errors, "date", self.date, today, rules::MAX_FUTURE_DAYS);
        errors.into_result()
    }
}

impl Validate for Category {
    fn validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        rules::required(&mut errors, "name", &self.name);
        rules::max_len(&mut errors, "name", &self.name, MAX_NAME_LEN);
        if let Some(budget) = self.monthly_budget {
            rules::non_negative_amount(&mut errors, "monthly_budget", budget);
        }
        if !rules::is_valid_hex_color(&self.color) {
            errors.add("color", "צבע אינו תקין");
        }

        errors
    }
}

impl Validate for Budget {
    fn validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        rules::required(&mut errors, "name", &self.name);
        rules::max_len(&mut errors, "name", &self.name, MAX_NAME_LEN);
        rules::date_in_supported_range(&mut errors, "start_date", self.start_date);
        rules::date_in_supported_range(&mut errors, "end_date", self.end_date);
        rules::date_order(&mut errors, "end_date", self.start_date, self.end_date);

        for allocation in &self.allocations {
            if allocation.amount.is_negative() {
                errors.add("allocations", "סכום הקצאה אינו יכול להיות שלילי");
                break;
            }
        }
        let mut seen = std::collections::HashSet::new();
        if !self.allocations.iter().all(|a| seen.insert(a.category_id)) {
            errors.add("allocations", "קטגוריה מופיעה יותר מפעם אחת בתקציב");
        }

        errors
    }
}

impl Validate for Account {
    fn validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        rules::required(&mut errors, "name", &self.name);
        rules::max_len(&mut errors, "name", &self.name, MAX_NAME_LEN);

        if !self.owner_id.trim().is_empty() && !rules::is_valid_israeli_id(&self.owner_id) {
            errors.add("owner_id", "מספר תעודת זהות אינו תקין");
        }
        if !self.owner_phone.trim().is_empty() && !rules::is_valid_israeli_phone(&self.owner_phone) {
            errors.add("owner_phone", "מספר טלפון אינו תקין");
        }
        let branch = self.branch_number.trim();
        if !branch.is_empty()
            && !(branch.len() <= 4 && branch.chars().all(|c| c.is_ascii_digit()))
        {
            errors.add("branch_number", "מספר סניף חייב להכיל 1-4 ספרות");
        }
        let number = self.account_number.trim();
        if !number.is_empty() && !number.chars().all(|c| c.is_ascii_digit() || c == '-') {
            errors.add("account_number", "מספר חשבון יכול להכיל ספרות ומקפים בלבד");
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, AccountKind, CategoryId, CategoryKind, Money};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_errors_are_field_keyed() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "שדה חובה");
        errors.add("name", "ארוך מדי");
        errors.add("amount", "שלילי");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name").len(), 2);
        assert!(errors.get("missing").is_empty());
        assert_eq!(errors.to_string(), "amount: שלילי; name: שדה חובה, ארוך מדי");
    }

    #[test]
    fn test_merge_prefixes_fields() {
        let mut outer = ValidationErrors::new();
        let mut inner = ValidationErrors::new();
        inner.add("amount", "x");
        outer.merge("row3", inner);
        assert!(outer.has("row3.amount"));
    }

    #[test]
    fn test_valid_expense() {
        let txn = Transaction::expense(AccountId::new(), date(2025, 1, 1), Money::from_agorot(100), "סופר", None);
        assert!(txn.validate().is_ok());
    }

    #[test]
    fn test_transaction_collects_all_errors() {
        let txn = Transaction::expense(AccountId::new(), date(2025, 1, 1), Money::zero(), "  ", None);
        let errors = txn.validate().unwrap_err();
        assert!(errors.has("amount"));
        assert!(errors.has("description"));
    }

    #[test]
    fn test_transaction_far_in_future_rejected() {
        let today = date(2025, 6, 1);
        let far = Transaction::expense(AccountId::new(), date(2099, 1, 1), Money::from_agorot(100), "x", None);
        assert!(far.validate().is_ok());
        assert!(far.validate_at(today).unwrap_err().has("date"));

        let post_dated = Transaction::expense(AccountId::new(), date(2026, 5, 1), Money::from_agorot(100), "צ'ק", None);
        assert!(post_dated.validate_at(today).is_ok());
    }

    #[test]
    fn test_transfer_rules() {
        let account = AccountId::new();
        let mut txn = Transaction::transfer(account, account, date(2025, 1, 1), Money::from_agorot(100), "העברה");
        txn.category_id = Some(CategoryId::new());
        let errors = txn.validate().unwrap_err();
        assert!(errors.has("to_account_id"));
        assert!(errors.has("category_id"));

        txn.to_account_id = None;
        txn.category_id = None;
        assert!(txn.validate().unwrap_err().has("to_account_id"));
    }

    #[test]
    fn test_expense_with_target_rejected() {
        let mut txn = Transaction::expense(AccountId::new(), date(2025, 1, 1), Money::from_agorot(100), "x", None);
        txn.to_account_id = Some(AccountId::new());
        assert!(txn.validate().unwrap_err().has("to_account_id"));
    }

    #[test]
    fn test_budget_date_order() {
        let budget = Budget::new("שנתי", date(2025, 12, 31), date(2025, 1, 1));
        assert!(budget.validate().unwrap_err().has("end_date"));
    }

    #[test]
    fn test_budget_negative_allocation() {
        let mut budget = Budget::new("ינואר", date(2025, 1, 1), date(2025, 1, 31));
        budget.allocate(CategoryId::new(), Money::from_agorot(-1));
        assert!(budget.validate().unwrap_err().has("allocations"));
    }

    #[test]
    fn test_category_rules() {
        let mut cat = Category::with_budget("מזון", CategoryKind::Expense, Money::from_agorot(-100));
        cat.color = "red".into();
        let errors = cat.validate().unwrap_err();
        assert!(errors.has("monthly_budget"));
        assert!(errors.has("color"));

        let long = Category::new("א".repeat(MAX_NAME_LEN + 1), CategoryKind::Expense);
        assert!(long.validate().unwrap_err().has("name"));
    }

    #[test]
    fn test_account_rules() {
        let mut account = Account::new("לאומי", AccountKind::Bank);
        assert!(account.is_valid());

        account.owner_id = "123456789".into();
        account.owner_phone = "12345".into();
        account.branch_number = "12a".into();
        let errors = account.validate().unwrap_err();
        assert!(errors.has("owner_id"));
        assert!(errors.has("owner_phone"));
        assert!(errors.has("branch_number"));

        account.owner_id = "123456782".into();
        account.owner_phone = "050-1234567".into();
        account.branch_number = "680".into();
        assert!(account.is_valid());
    }
}
