//! End-to-end tests for the `kesef` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn kesef(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kesef").unwrap();
    cmd.env("KESEF_DATA_DIR", data_dir)
        .env_remove("KESEF_KEY")
        .env_remove("KESEF_LOG");
    cmd
}

fn initialized() -> TempDir {
    let dir = TempDir::new().unwrap();
    kesef(dir.path()).arg("init").assert().success();
    dir
}

#[test]
fn init_seeds_categories_and_cash_account() {
    let dir = TempDir::new().unwrap();
    kesef(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("אותחל"));

    kesef(dir.path())
        .args(["category", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("מזון וסופרמרקט"))
        .stdout(predicate::str::contains("משכורת"));

    kesef(dir.path())
        .args(["account", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("מזומן"));

    kesef(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("כבר מאותחל"));
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    kesef(dir.path())
        .args(["account", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("kesef init"));
}

#[test]
fn add_and_list_transactions() {
    let dir = initialized();

    kesef(dir.path())
        .args(["transaction", "add", "שופרסל", "84.90", "--category", "מזון וסופרמרקט", "--tag", "בית"])
        .assert()
        .success()
        .stdout(predicate::str::contains("נרשמה הוצאה"));

    kesef(dir.path())
        .args(["transaction", "add", "משכורת מרץ", "12,000", "--kind", "income", "--category", "משכורת"])
        .assert()
        .success();

    kesef(dir.path())
        .args(["transaction", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("שופרסל"))
        .stdout(predicate::str::contains("84.90"))
        .stdout(predicate::str::contains("משכורת מרץ"));

    kesef(dir.path())
        .args(["transaction", "search", "שופר"])
        .assert()
        .success()
        .stdout(predicate::str::contains("שופרסל"))
        .stdout(predicate::str::contains("משכורת מרץ").not());

    kesef(dir.path())
        .args(["account", "show", "מזומן"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11,915.10"));
}

#[test]
fn expense_into_income_category_is_rejected() {
    let dir = initialized();

    kesef(dir.path())
        .args(["transaction", "add", "קפה", "14", "--category", "משכורת"])
        .assert()
        .failure();
}

#[test]
fn summary_and_tax_year_reports() {
    let dir = initialized();

    kesef(dir.path())
        .args(["transaction", "add", "משכורת", "10000", "--kind", "income", "--date", "15/03/2025"])
        .assert()
        .success();
    kesef(dir.path())
        .args(["transaction", "add", "שכירות", "4000", "--date", "20/03/2025"])
        .assert()
        .success();
    kesef(dir.path())
        .args(["transaction", "add", "משכורת", "11000", "--kind", "income", "--date", "15/04/2025"])
        .assert()
        .success();

    kesef(dir.path())
        .args(["report", "summary", "--month", "2025-03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("מרץ 2025"))
        .stdout(predicate::str::contains("10,000.00"))
        .stdout(predicate::str::contains("60%"));

    kesef(dir.path())
        .args(["report", "tax-year"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024/25"))
        .stdout(predicate::str::contains("2025/26"));

    kesef(dir.path())
        .args(["report", "summary", "--tax-year", "2025"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11,000.00"))
        .stdout(predicate::str::contains("10,000.00").not());
}

#[test]
fn export_csv_with_hebrew_headers() {
    let dir = initialized();

    kesef(dir.path())
        .args(["transaction", "add", "חשמל", "350", "--date", "01/02/2025"])
        .assert()
        .success();

    kesef(dir.path())
        .args(["export", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("תאריך,תיאור,סוג"))
        .stdout(predicate::str::contains("01/02/2025,חשמל,הוצאה"))
        .stdout(predicate::str::contains("350.00"));

    let out = dir.path().join("tax.csv");
    kesef(dir.path())
        .args(["export", "csv", "--layout", "tax", "--bom", "--output"])
        .arg(&out)
        .assert()
        .success();
    let bytes = fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    assert!(String::from_utf8_lossy(&bytes).contains("2024/25"));
}

#[test]
fn import_bank_statement_skips_duplicates() {
    let dir = initialized();
    kesef(dir.path())
        .args(["account", "add", "עו\"ש", "--bank", "הפועלים", "--branch", "612", "--number", "123456"])
        .assert()
        .success();

    let file = dir.path().join("statement.csv");
    fs::write(
        &file,
        "תאריך,תיאור הפעולה,פרטים,אסמכתא,חובה,זכות,יתרה\n\
         02/03/2025,שופרסל דיל,,1001,84.90,,915.10\n\
         05/03/2025,משכורת,,1002,,12000.00,12915.10\n\
         07/03/2025,,,1003,10.00,,12905.10\n",
    )
    .unwrap();

    kesef(dir.path())
        .args(["import", "csv", "--account", "עו\"ש", "--preset", "hapoalim", "--dry-run"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("חדשות: 2, כפולות: 0, שגיאות: 1"));

    kesef(dir.path())
        .args(["import", "csv", "--account", "עו\"ש", "--preset", "hapoalim"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("יובאו:            2"));

    kesef(dir.path())
        .args(["import", "csv", "--account", "עו\"ש", "--preset", "hapoalim"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("יובאו:            0"))
        .stdout(predicate::str::contains("כפולים שדולגו:    2"));

    kesef(dir.path())
        .args(["account", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**3456"))
        .stdout(predicate::str::contains("123456").not())
        .stdout(predicate::str::contains("11,915.10"));
}

#[test]
fn json_export_restores_into_a_fresh_store() {
    let source = initialized();
    kesef(source.path())
        .args(["transaction", "add", "ארנונה", "620", "--date", "10/01/2025"])
        .assert()
        .success();

    let backup = source.path().join("backup.json");
    kesef(source.path())
        .args(["export", "json", "--output"])
        .arg(&backup)
        .assert()
        .success();

    let target = TempDir::new().unwrap();
    kesef(target.path())
        .args(["import", "json"])
        .arg(&backup)
        .assert()
        .success()
        .stdout(predicate::str::contains("תנועות:    1"));

    kesef(target.path())
        .args(["transaction", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ארנונה"));

    // a store with data needs --yes
    kesef(target.path())
        .args(["import", "json"])
        .arg(&backup)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn check_reports_clean_store() {
    let dir = initialized();
    kesef(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("לא נמצאו בעיות"));
}

#[test]
fn encryption_requires_the_right_key() {
    let dir = initialized();
    kesef(dir.path())
        .args(["account", "add", "חיסכון", "--kind", "savings", "--number", "998877"])
        .assert()
        .success();

    kesef(dir.path())
        .args(["encrypt", "enable"])
        .env("KESEF_KEY", "סוד-משפחתי")
        .assert()
        .success();

    let store = fs::read_to_string(dir.path().join("store").join("kesef_accounts.json")).unwrap();
    assert!(!store.contains("998877"));

    kesef(dir.path())
        .args(["account", "show", "חיסכון"])
        .env("KESEF_KEY", "סוד-משפחתי")
        .assert()
        .success()
        .stdout(predicate::str::contains("**8877"));

    kesef(dir.path())
        .args(["account", "show", "חיסכון"])
        .env("KESEF_KEY", "wrong")
        .assert()
        .failure();

    kesef(dir.path())
        .args(["encrypt", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("פעילה"));
}
