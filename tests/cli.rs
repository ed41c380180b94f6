use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const CSV: &str = "\
Transaction_ID,Date,Customer_Name,Product,Total_Items,Total_Cost,Payment_Method,City,Store_Type,Discount_Applied,Customer_Category,Season,Promotion
1,2021-01-01 10:00:00,Ann,A,5,10.4,Cash,X,Mall,True,Student,Winter,None
2,2021-01-01 11:30:00,Bob,A,3,5.6,Cash,X,Mall,False,Student,Winter,None
3,2022-07-15 09:00:00,Cy,B,7,20.25,Card,Y,Kiosk,False,Retiree,Summer,BOGO
4,not-a-date,Di,C,2,3.0,Card,Y,Kiosk,False,Retiree,Summer,None
";

/// Runs the binary with HOME pointed at a scratch dir so no real settings
/// or cache are touched.
fn basket(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("basket").unwrap();
    cmd.env("HOME", home)
        .env_remove("BASKET_CSV")
        .env_remove("RUST_LOG");
    cmd
}

fn write_csv(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("transactions.csv");
    std::fs::write(&path, content).unwrap();
    path
}

fn json_stdout(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

#[test]
fn report_top_json() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), CSV);
    let v = json_stdout(
        basket(dir.path())
            .arg("--csv")
            .arg(&csv)
            .args(["report", "top", "--format", "json"]),
    );
    let top = v.as_array().unwrap();
    assert_eq!(top.len(), 3);
    assert_eq!(top[0]["product"], "A");
    assert_eq!(top[0]["total_items"], 8);
    assert_eq!(top[1]["product"], "B");
}

#[test]
fn report_histogram_json_with_filter() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), CSV);
    let v = json_stdout(
        basket(dir.path())
            .arg("--csv")
            .arg(&csv)
            .args(["report", "histogram", "--season", "Winter", "--format", "json"]),
    );
    let buckets = v["buckets"].as_array().unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0]["lower"], 2);
    assert_eq!(buckets[0]["total_items"], 3);
    assert_eq!(buckets[1]["total_items"], 5);
    assert_eq!(v["mean"], 4.0);
}

#[test]
fn report_seasonal_json() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), CSV);
    let v = json_stdout(
        basket(dir.path())
            .arg("--csv")
            .arg(&csv)
            .args(["report", "seasonal", "--format", "json"]),
    );
    let winter = v["series"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["season"] == "Winter")
        .unwrap();
    assert_eq!(winter["points"][0]["year"], 2021);
    assert_eq!(winter["points"][0]["total_cost"], 16);
    assert_eq!(v["excluded_rows"], 1);
}

#[test]
fn report_empty_range_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), CSV);
    basket(dir.path())
        .arg("--csv")
        .arg(&csv)
        .args(["report", "all", "--min-items", "10", "--max-items", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions match the current filters."));
}

#[test]
fn report_text_summary() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), CSV);
    basket(dir.path())
        .arg("--csv")
        .arg(&csv)
        .args(["report", "summary", "--category", "Student"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transactions"))
        .stdout(predicate::str::contains("$16.00"));
}

#[test]
fn missing_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        "Product,Customer_Category,Total_Items,Total_Cost,Date\nA,Student,1,1.0,2021-01-01\n",
    );
    basket(dir.path())
        .arg("--csv")
        .arg(&csv)
        .args(["report", "top"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing required column: Season"));
}

#[test]
fn offline_without_cache_fails() {
    let dir = tempfile::tempdir().unwrap();
    basket(dir.path())
        .args(["--offline", "report", "top"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No usable cached dataset"));
}

#[test]
fn status_reports_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), CSV);
    basket(dir.path())
        .arg("--csv")
        .arg(&csv)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows:            4"))
        .stdout(predicate::str::contains("Bad dates:       1"));
}
