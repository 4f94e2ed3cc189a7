// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::path::Path;

fn valeapp(db: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_valeapp"));
    cmd.env("VALEAPP_STORE", "sqlite")
        .env("VALEAPP_SQLITE_PATH", db)
        .env("VALEAPP_PASSWORD_ITERATIONS", "10")
        .env_remove("RUST_LOG");
    cmd
}

fn run_json(db: &Path, args: &[&str]) -> Value {
    let output = valeapp(db)
        .arg("--json")
        .args(args)
        .output()
        .expect("run valeapp");
    assert!(
        output.status.success(),
        "valeapp {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

fn write_workbook(path: &Path, rows: &[(&str, &str)]) {
    let mut wb = Workbook::new();
    let sheet = wb.add_worksheet();
    for (col, header) in ["Coditem_mapa", "Promax_unico", "Item", "Data"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).expect("header");
    }
    for (i, (key, owner)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, *key).expect("key");
        sheet.write_string(r, 1, *owner).expect("owner");
        sheet.write_string(r, 2, "Cerveja 600ml").expect("item");
        sheet.write_string(r, 3, "17/09/2025").expect("date");
    }
    wb.save(path).expect("save workbook");
}

#[test]
fn help_lists_every_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = valeapp(&dir.path().join("db.sqlite"))
        .arg("--help")
        .output()
        .expect("run help");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 help");
    for command in [
        "import", "normalize", "export", "cleanup", "admin", "employee", "stats", "doctor",
    ] {
        assert!(text.contains(command), "help is missing `{command}`");
    }
}

#[test]
fn unknown_flag_returns_usage_exit_code_with_machine_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = valeapp(&dir.path().join("db.sqlite"))
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("usage_error"), "unexpected stderr: {stderr}");
}

#[test]
fn doctor_reports_the_sqlite_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = run_json(&dir.path().join("db.sqlite"), &["doctor"]);
    assert_eq!(report["status"], "ok");
    assert_eq!(report["backend"], "sqlite");
}

#[test]
fn unknown_store_kind_is_a_config_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = valeapp(&dir.path().join("db.sqlite"))
        .env("VALEAPP_STORE", "postgres")
        .arg("doctor")
        .output()
        .expect("run doctor");
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn employees_and_admins_are_managed_from_the_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("db.sqlite");

    let added = run_json(
        &db,
        &[
            "employee", "add", "--cpf", "12345678900", "--name", "Ana Souza", "--promax", "P100",
        ],
    );
    assert_eq!(added["employee"]["name"], "Ana Souza");
    assert!(added["employee"].get("password").is_none());
    run_json(
        &db,
        &["employee", "add", "--cpf", "98765432100", "--name", "Bruno Lima", "--promax", "P200"],
    );

    let output = valeapp(&db)
        .args([
            "employee", "add", "--cpf", "12345678900", "--name", "Outra", "--promax", "P300",
        ])
        .output()
        .expect("run duplicate add");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Já existe um funcionário"), "unexpected stderr: {stderr}");

    let listed = run_json(&db, &["employee", "list", "--search", "bruno"]);
    let employees = listed["employees"].as_array().expect("employees");
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0]["promax"], "P200");

    run_json(
        &db,
        &["admin", "add", "--login", "gestor", "--name", "Gestor", "--password", "segredo"],
    );
    let admins = run_json(&db, &["admin", "list"]);
    assert_eq!(admins["admins"].as_array().map(Vec::len), Some(1));
    assert!(admins["admins"][0].get("password").is_none());
}

#[test]
fn import_export_and_cleanup_round_through_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("db.sqlite");
    let sheet = dir.path().join("vales.xlsx");
    write_workbook(&sheet, &[("10_500", "P100"), ("11_500", "P100")]);
    let sheet_arg = sheet.to_str().expect("utf8 path");

    let dry = run_json(&db, &["normalize", sheet_arg]);
    assert_eq!(dry["rows"], 2);
    assert_eq!(dry["vouchers"][0]["date"], "2025-09-17");
    assert_eq!(run_json(&db, &["stats"])["total"], 0);

    let imported = run_json(&db, &["import", sheet_arg]);
    assert_eq!(imported["inserted"], 2);
    let stats = run_json(&db, &["stats"]);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["pending_count"], 2);

    let out_dir = dir.path().join("out");
    let exported = run_json(
        &db,
        &["export", "vouchers", "--out-dir", out_dir.to_str().expect("utf8 path")],
    );
    assert_eq!(exported["rows"], 2);
    let path = exported["path"].as_str().expect("export path");
    let bytes = std::fs::read(path).expect("export written");
    assert!(bytes.starts_with(b"PK"));

    let output = valeapp(&db)
        .args(["cleanup", "--admin", "Gestor"])
        .output()
        .expect("run cleanup");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(run_json(&db, &["stats"])["total"], 2);

    let cleaned = run_json(&db, &["cleanup", "--admin", "Gestor", "--yes"]);
    assert_eq!(cleaned["deleted"], 2);
    assert_eq!(cleaned["archived"], 0);
    assert_eq!(run_json(&db, &["stats"])["total"], 0);
}

#[test]
fn unreadable_workbooks_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("db.sqlite");

    let output = valeapp(&db)
        .args(["import", "missing.xlsx"])
        .output()
        .expect("run import");
    assert_eq!(output.status.code(), Some(2));

    let garbage = dir.path().join("garbage.xlsx");
    std::fs::write(&garbage, b"not a workbook").expect("write garbage");
    let output = valeapp(&db)
        .args(["--json", "import", garbage.to_str().expect("utf8 path")])
        .output()
        .expect("run import");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("validation_error"), "unexpected stderr: {stderr}");
}
