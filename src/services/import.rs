//! CSV import service
//!
//! Imports transactions from bank statement CSV files: column mapping
//! (presets for Israeli banks or detected from Hebrew headers), date and
//! amount parsing, duplicate detection by fingerprint, and a preview that is
//! committed in a second step.
//!
//! Files are read as UTF-8. Bank exports usually start with a few lines of
//! account details before the header row; everything before the first row
//! with a parseable date is skipped when the mapping expects a header.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;

use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{KesefError, KesefResult};
use crate::export::STANDARD_HEADERS;
use crate::models::{
    normalize_name, AccountId, Category, CategoryId, Money, Transaction, TransactionId,
    TransactionKind,
};
use crate::services::transaction::{CreateTransactionInput, TransactionService};
use crate::storage::Storage;

/// Date formats tried in order; two-digit years only match `%y`
const DATE_FORMATS: [&str; 6] = ["%d/%m/%Y", "%d/%m/%y", "%Y-%m-%d", "%d.%m.%Y", "%d.%m.%y", "%d-%m-%Y"];

/// Rows scanned when looking for a header line
const HEADER_SCAN_ROWS: usize = 15;

/// Column mapping configuration for CSV import
///
/// The amount comes from one signed column (negative means money out), or
/// from separate debit and credit columns. With a kind column the amount is
/// a magnitude and the kind gives its direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub date_column: usize,
    pub description_column: usize,
    pub amount_column: Option<usize>,
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
    pub kind_column: Option<usize>,
    pub category_column: Option<usize>,
    pub tags_column: Option<usize>,
    pub notes_column: Option<usize>,
    pub reference_column: Option<usize>,
    /// Skip everything before the first dated row
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date_column: 0,
            description_column: 1,
            amount_column: Some(2),
            debit_column: None,
            credit_column: None,
            kind_column: None,
            category_column: None,
            tags_column: None,
            notes_column: None,
            reference_column: None,
            has_header: true,
            delimiter: b',',
        }
    }
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// The app's own standard export layout
    pub fn standard() -> Self {
        Self {
            date_column: 0,
            description_column: 1,
            kind_column: Some(2),
            category_column: Some(3),
            amount_column: Some(5),
            tags_column: Some(6),
            notes_column: Some(7),
            ..Self::default()
        }
    }

    /// Bank Hapoalim: תאריך, תיאור הפעולה, פרטים, אסמכתא, חובה, זכות, יתרה
    pub fn hapoalim() -> Self {
        Self {
            date_column: 0,
            description_column: 1,
            notes_column: Some(2),
            reference_column: Some(3),
            amount_column: None,
            debit_column: Some(4),
            credit_column: Some(5),
            ..Self::default()
        }
    }

    /// Bank Leumi: תאריך, תאריך ערך, תיאור, אסמכתא, בחובה, בזכות, יתרה
    pub fn leumi() -> Self {
        Self {
            date_column: 0,
            description_column: 2,
            reference_column: Some(3),
            amount_column: None,
            debit_column: Some(4),
            credit_column: Some(5),
            ..Self::default()
        }
    }

    /// Discount Bank: תאריך, יום ערך, תיאור התנועה, זכות/חובה, יתרה, אסמכתה
    pub fn discount() -> Self {
        Self {
            date_column: 0,
            description_column: 2,
            amount_column: Some(3),
            reference_column: Some(5),
            ..Self::default()
        }
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Build a mapping from a header row
    ///
    /// Returns `None` unless a date, a description and an amount source
    /// (signed column or debit/credit pair) are all found.
    pub fn from_headers(headers: &StringRecord) -> Option<Self> {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        if cells.len() >= STANDARD_HEADERS.len()
            && cells.iter().zip(STANDARD_HEADERS).all(|(c, h)| c == h)
        {
            return Some(Self::standard());
        }

        let mut date = None;
        let mut description = None;
        let mut mapping = Self {
            amount_column: None,
            ..Self::default()
        };

        for (idx, h) in cells.iter().enumerate() {
            let h = h.as_str();
            if h.contains("תאריך") && !h.contains("ערך") {
                date.get_or_insert(idx);
            } else if (h.contains("זכות") && h.contains("חובה")) || h.contains("סכום") {
                mapping.amount_column.get_or_insert(idx);
            } else if h.contains("חובה") {
                mapping.debit_column.get_or_insert(idx);
            } else if h.contains("זכות") {
                mapping.credit_column.get_or_insert(idx);
            } else if h.contains("תיאור") {
                description.get_or_insert(idx);
            } else if h.contains("אסמכת") {
                mapping.reference_column.get_or_insert(idx);
            } else if h.contains("קטגוריה") {
                mapping.category_column.get_or_insert(idx);
            } else if h.contains("תגיות") {
                mapping.tags_column.get_or_insert(idx);
            } else if h == "סוג" {
                mapping.kind_column.get_or_insert(idx);
            } else if h.contains("הערות") || h.contains("פרטים") {
                mapping.notes_column.get_or_insert(idx);
            }
        }

        if mapping.debit_column.is_some() && mapping.credit_column.is_some() {
            mapping.amount_column = None;
        }
        let has_amount = mapping.amount_column.is_some()
            || (mapping.debit_column.is_some() && mapping.credit_column.is_some());

        match (date, description) {
            (Some(date), Some(description)) if has_amount => {
                mapping.date_column = date;
                mapping.description_column = description;
                Some(mapping)
            }
            _ => None,
        }
    }

    /// Scan the first lines of a file for a header row
    pub fn detect(data: &str) -> Option<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());
        reader
            .records()
            .take(HEADER_SCAN_ROWS)
            .filter_map(Result::ok)
            .find_map(|record| Self::from_headers(&record))
    }
}

/// Known CSV layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPreset {
    Standard,
    Hapoalim,
    Leumi,
    Discount,
}

impl ImportPreset {
    pub const ALL: [ImportPreset; 4] = [Self::Standard, Self::Hapoalim, Self::Leumi, Self::Discount];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "kesef" => Some(Self::Standard),
            "hapoalim" | "poalim" | "הפועלים" => Some(Self::Hapoalim),
            "leumi" | "לאומי" => Some(Self::Leumi),
            "discount" | "דיסקונט" => Some(Self::Discount),
            _ => None,
        }
    }

    pub fn mapping(&self) -> ColumnMapping {
        match self {
            Self::Standard => ColumnMapping::standard(),
            Self::Hapoalim => ColumnMapping::hapoalim(),
            Self::Leumi => ColumnMapping::leumi(),
            Self::Discount => ColumnMapping::discount(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "Kesef",
            Self::Hapoalim => "בנק הפועלים",
            Self::Leumi => "בנק לאומי",
            Self::Discount => "בנק דיסקונט",
        }
    }
}

impl fmt::Display for ImportPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A parsed row from the CSV before import
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// 1-based record number in the file
    pub row_number: usize,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    /// Always positive
    pub amount: Money,
    pub description: String,
    pub category_name: Option<String>,
    pub tags: Vec<String>,
    pub notes: String,
    pub reference: Option<String>,
    /// Duplicate-detection key
    pub fingerprint: String,
}

/// A row that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_number: usize,
    pub message: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "שורה {}: {}", self.row_number, self.message)
    }
}

pub type ParseOutcome = Result<ParsedRow, RowError>;

/// Status of a row in the import preview
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    /// Row will be imported
    New,
    /// Same fingerprint as a stored transaction or an earlier row; skipped
    Duplicate,
    /// Row cannot be imported
    Error(String),
}

/// Preview entry for import review
#[derive(Debug, Clone)]
pub struct ImportPreviewEntry {
    pub row_number: usize,
    /// `None` for rows that failed to parse
    pub row: Option<ParsedRow>,
    pub status: ImportStatus,
    /// Category resolved from the row's category name
    pub category_id: Option<CategoryId>,
    /// Stored transaction this row duplicates
    pub existing_id: Option<TransactionId>,
}

impl ImportPreviewEntry {
    pub fn is_new(&self) -> bool {
        self.status == ImportStatus::New
    }
}

/// Result of a committed import
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub errors: usize,
    pub imported_ids: Vec<TransactionId>,
    /// Error messages by row number
    pub error_messages: HashMap<usize, String>,
}

/// Service for CSV import
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Parse CSV text
    pub fn parse_csv(&self, data: &str, mapping: &ColumnMapping) -> KesefResult<Vec<ParseOutcome>> {
        self.parse_csv_from_reader(data.as_bytes(), mapping)
    }

    /// Parse CSV from any reader into per-row outcomes
    pub fn parse_csv_from_reader<R: Read>(
        &self,
        source: R,
        mapping: &ColumnMapping,
    ) -> KesefResult<Vec<ParseOutcome>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(mapping.delimiter)
            .from_reader(source);

        let mut outcomes = Vec::new();
        let mut started = !mapping.has_header;

        for (idx, result) in reader.records().enumerate() {
            let row_number = idx + 1;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    outcomes.push(Err(RowError {
                        row_number,
                        message: format!("שגיאה בקריאת השורה: {}", e),
                    }));
                    continue;
                }
            };

            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if !started {
                let first = cell(&record, Some(mapping.date_column)).unwrap_or_default();
                if parse_date(first).is_err() {
                    continue;
                }
                started = true;
            }

            outcomes.push(parse_record(&record, row_number, mapping));
        }

        tracing::debug!(rows = outcomes.len(), "parsed import file");
        Ok(outcomes)
    }

    /// Classify parsed rows against what is already stored
    pub fn preview(&self, parsed: &[ParseOutcome], account_id: AccountId) -> KesefResult<Vec<ImportPreviewEntry>> {
        self.storage.accounts.require(account_id)?;

        let mut known: HashMap<String, TransactionId> = HashMap::new();
        for txn in self
            .storage
            .transactions
            .find(|t| t.account_id == account_id)?
        {
            let key = txn.import_id.clone().unwrap_or_else(|| {
                Transaction::fingerprint(txn.date, txn.kind, txn.amount, &txn.description)
            });
            known.entry(key).or_insert(txn.id);
        }

        let categories = self.storage.categories.all()?;
        let mut seen_in_file = HashSet::new();
        let mut preview = Vec::with_capacity(parsed.len());

        for outcome in parsed {
            let entry = match outcome {
                Err(err) => ImportPreviewEntry {
                    row_number: err.row_number,
                    row: None,
                    status: ImportStatus::Error(err.message.clone()),
                    category_id: None,
                    existing_id: None,
                },
                Ok(row) => {
                    let existing_id = known.get(&row.fingerprint).copied();
                    let repeated = !seen_in_file.insert(row.fingerprint.clone());
                    let (status, category_id) = if existing_id.is_some() || repeated {
                        (ImportStatus::Duplicate, None)
                    } else {
                        match resolve_category(&categories, row) {
                            Ok(category_id) => (ImportStatus::New, category_id),
                            Err(message) => (ImportStatus::Error(message), None),
                        }
                    };
                    ImportPreviewEntry {
                        row_number: row.row_number,
                        row: Some(row.clone()),
                        status,
                        category_id,
                        existing_id,
                    }
                }
            };
            preview.push(entry);
        }

        Ok(preview)
    }

    /// Import the rows a preview marked as new
    ///
    /// `default_category` is used for rows without a category when its kind
    /// matches the row.
    pub fn commit(
        &self,
        preview: &[ImportPreviewEntry],
        account_id: AccountId,
        default_category: Option<&Category>,
    ) -> KesefResult<ImportResult> {
        let txn_service = TransactionService::new(self.storage);
        let mut result = ImportResult::default();

        for entry in preview {
            match (&entry.status, &entry.row) {
                (ImportStatus::New, Some(row)) => {
                    let mut input = CreateTransactionInput::new(
                        row.kind,
                        account_id,
                        row.date,
                        row.amount,
                        row.description.clone(),
                    );
                    input.category_id = entry.category_id.or_else(|| {
                        default_category
                            .filter(|c| c.kind.accepts(row.kind))
                            .map(|c| c.id)
                    });
                    input.tags = row.tags.clone();
                    input.notes = Some(row.notes.clone());
                    input.reference = row.reference.clone();
                    input.import_id = Some(row.fingerprint.clone());

                    match txn_service.create(input) {
                        Ok(txn) => {
                            result.imported += 1;
                            result.imported_ids.push(txn.id);
                        }
                        Err(e) => {
                            result.errors += 1;
                            result.error_messages.insert(entry.row_number, e.to_string());
                        }
                    }
                }
                (ImportStatus::New, None) => {
                    result.errors += 1;
                }
                (ImportStatus::Duplicate, _) => {
                    result.duplicates_skipped += 1;
                }
                (ImportStatus::Error(message), _) => {
                    result.errors += 1;
                    result.error_messages.insert(entry.row_number, message.clone());
                }
            }
        }

        tracing::info!(
            imported = result.imported,
            duplicates = result.duplicates_skipped,
            errors = result.errors,
            "import committed"
        );
        Ok(result)
    }

    /// Parse, preview and commit in one step
    pub fn import_csv(
        &self,
        data: &str,
        mapping: &ColumnMapping,
        account_id: AccountId,
        default_category: Option<&Category>,
    ) -> KesefResult<ImportResult> {
        let parsed = self.parse_csv(data, mapping)?;
        if parsed.is_empty() {
            return Err(KesefError::Import("לא נמצאו שורות לייבוא".into()));
        }
        let preview = self.preview(&parsed, account_id)?;
        self.commit(&preview, account_id, default_category)
    }
}

fn cell(record: &StringRecord, column: Option<usize>) -> Option<&str> {
    column
        .and_then(|c| record.get(c))
        .map(|s| s.trim_start_matches('\u{feff}').trim())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse a date in DD/MM/YYYY, DD/MM/YY or ISO form
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .filter_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .find(|date| date.year() >= 1900)
        .ok_or_else(|| format!("תאריך לא תקין: '{}'", s))
}

fn parse_amount(s: &str) -> Result<Money, String> {
    Money::parse(s).map_err(|_| format!("סכום לא תקין: '{}'", s))
}

fn parse_record(record: &StringRecord, row_number: usize, mapping: &ColumnMapping) -> ParseOutcome {
    let fail = |message: String| RowError { row_number, message };

    let date_str = non_empty(cell(record, Some(mapping.date_column)))
        .ok_or_else(|| fail("חסר תאריך".into()))?;
    let date = parse_date(date_str).map_err(fail)?;

    let description = cell(record, Some(mapping.description_column))
        .unwrap_or_default()
        .to_string();
    if description.is_empty() {
        return Err(fail("חסר תיאור".into()));
    }

    let (kind, amount) = if let Some(kind_str) = non_empty(cell(record, mapping.kind_column)) {
        let kind = TransactionKind::parse(kind_str)
            .ok_or_else(|| fail(format!("סוג תנועה לא מוכר: '{}'", kind_str)))?;
        if kind == TransactionKind::Transfer {
            return Err(fail(
                "ייבוא העברות בין חשבונות אינו נתמך; להעברת כל הנתונים יש להשתמש ב-kesef export json"
                    .into(),
            ));
        }
        let amount_str = non_empty(cell(record, mapping.amount_column))
            .ok_or_else(|| fail("חסר סכום".into()))?;
        (kind, parse_amount(amount_str).map_err(fail)?.abs())
    } else {
        let signed = if mapping.amount_column.is_some() {
            let amount_str = non_empty(cell(record, mapping.amount_column))
                .ok_or_else(|| fail("חסר סכום".into()))?;
            parse_amount(amount_str).map_err(fail)?
        } else {
            let debit = match non_empty(cell(record, mapping.debit_column)) {
                Some(s) => parse_amount(s).map_err(fail)?.abs(),
                None => Money::zero(),
            };
            let credit = match non_empty(cell(record, mapping.credit_column)) {
                Some(s) => parse_amount(s).map_err(fail)?.abs(),
                None => Money::zero(),
            };
            credit - debit
        };
        let kind = if signed.is_negative() {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        };
        (kind, signed.abs())
    };

    if amount.is_zero() {
        return Err(fail("סכום אפס".into()));
    }

    let tags = cell(record, mapping.tags_column)
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Ok(ParsedRow {
        row_number,
        date,
        kind,
        amount,
        fingerprint: Transaction::fingerprint(date, kind, amount, &description),
        description,
        category_name: non_empty(cell(record, mapping.category_column)).map(String::from),
        tags,
        notes: cell(record, mapping.notes_column).unwrap_or_default().to_string(),
        reference: non_empty(cell(record, mapping.reference_column)).map(String::from),
    })
}

/// Match a row's category name against stored categories of the same kind
fn resolve_category(categories: &[Category], row: &ParsedRow) -> Result<Option<CategoryId>, String> {
    let Some(name) = &row.category_name else {
        return Ok(None);
    };
    let key = normalize_name(name);
    categories
        .iter()
        .find(|c| c.name_key() == key && c.kind.accepts(row.kind))
        .map(|c| Some(c.id))
        .ok_or_else(|| format!("קטגוריה לא קיימת: '{}'", name))
}
