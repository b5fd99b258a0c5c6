use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TRANSACTIONS: &str = "\
,trans_id,account_id,date,operation,amount,balance
0,1,5740,930105,CREDIT IN CASH,1000.0,1000.0
1,2,5740,930210,CASH WITHDRAWAL,1500.0,-500.0
2,3,1726,940101,CASH WITHDRAWAL,200.0,800.0
3,4,1726,940315,REMITTANCE TO ANOTHER BANK,3000.0,-2200.0
4,5,18,951224,COLLECTION FROM ANOTHER BANK,450.5,NA
";

fn ledgerscope(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ledgerscope").unwrap();
    cmd.env("LEDGERSCOPE_CONFIG_DIR", config_dir);
    cmd
}

fn write_csv(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

#[test]
fn analyze_prints_every_panel() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    ledgerscope(dir.path())
        .args(["analyze", &csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing Values"))
        .stdout(predicate::str::contains("Summary Statistics"))
        .stdout(predicate::str::contains("Outlier Percentage"))
        .stdout(predicate::str::contains("Total Amount by Year"))
        .stdout(predicate::str::contains("Balance of Account 5740"))
        .stdout(predicate::str::contains("dropped index columns"));
}

#[test]
fn analyze_json_reports_negative_balances() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    let output = ledgerscope(dir.path())
        .args(["analyze", &csv, "--account", "1726", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["params"]["account_id"], 1726);
    assert_eq!(value["temporal"]["account"]["negative"][0]["balance"], -2200.0);
    assert_eq!(value["source"]["rows"], 5);
}

#[test]
fn analyze_unknown_account_shows_notice() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    ledgerscope(dir.path())
        .args(["analyze", &csv, "--account", "99999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No data found for Account ID 99999"));
}

#[test]
fn analyze_invalid_date_fails_after_report() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        &dir,
        "bad.csv",
        "trans_id,account_id,date,operation,amount,balance\n\
         1,5740,930105,CREDIT IN CASH,1000.0,1000.0\n\
         2,5740,931340,CASH WITHDRAWAL,10.0,990.0\n",
    );
    ledgerscope(dir.path())
        .args(["analyze", &csv])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Summary Statistics"))
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn analyze_missing_column_shows_notice() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        &dir,
        "partial.csv",
        "trans_id,account_id,date,amount,balance\n1,5740,930105,1000.0,1000.0\n",
    );
    ledgerscope(dir.path())
        .args(["analyze", &csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing required columns: operation"))
        .stdout(predicate::str::contains("Summary Statistics"));
}

#[test]
fn analyze_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    let out = dir.path().join("out").join("report.json");
    ledgerscope(dir.path())
        .args(["analyze", &csv, "--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    let content = std::fs::read_to_string(&out).unwrap();
    assert!(content.contains("\"amount_by_year\""));
}

#[test]
fn analyze_rejects_unknown_operation() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    ledgerscope(dir.path())
        .args(["analyze", &csv, "--operation", "wire transfer"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown operation type"));
}

#[test]
fn dashboard_without_terminal_prints_text() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    ledgerscope(dir.path())
        .args(["dashboard", &csv, "--operation", "remittance"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Distribution of Amounts - REMITTANCE TO ANOTHER BANK",
        ));
}

#[test]
fn operations_lists_all_types() {
    let dir = tempfile::tempdir().unwrap();
    ledgerscope(dir.path())
        .arg("operations")
        .assert()
        .success()
        .stdout(predicate::str::contains("CREDIT CARD WITHDRAWAL"))
        .stdout(predicate::str::contains("credit-in-cash"));
}

#[test]
fn config_set_is_used_by_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "trans.csv", TRANSACTIONS);
    ledgerscope(dir.path())
        .args(["config", "set", "account_id", "1726"])
        .assert()
        .success();
    ledgerscope(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1726"));
    ledgerscope(dir.path())
        .args(["analyze", &csv])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balance of Account 1726"));
}

#[test]
fn config_set_rejects_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    ledgerscope(dir.path())
        .args(["config", "set", "colour", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown key"));
}
