use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SENDER: &str = "enviodigital@bancoedwards.cl";

const RECEIPT: &str = "Te informamos que se ha realizado una compra por $1.190 con Tarjeta ****7766 \
    en SPID MUT - O871 SANTIAGO CHL el 19/04/2025 14:33. Revisa Saldos y Movimientos.";

fn splitsync(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("splitsync").unwrap();
    cmd.env("HOME", home)
        .env("SPLITSYNC_DATA_DIR", home.join("data"))
        .env_remove("SPLITSYNC_MAILDIR")
        .env_remove("SPLITSYNC_SENDER")
        .env_remove("SPLITSYNC_SPLIT")
        .env_remove("SPLITSYNC_FRIEND_ID")
        .env_remove("SPLITSYNC_MAIL_USER")
        .env_remove("SPLITSYNC_LEDGER_USER_ID")
        .env_remove("SPLITSYNC_LEDGER_USER_EMAIL")
        .current_dir(home);
    cmd
}

fn with_credentials(cmd: &mut Command) -> &mut Command {
    cmd.env("SPLITSYNC_MAIL_USER", "me@example.com")
        .env("SPLITSYNC_LEDGER_USER_ID", "1")
        .env("SPLITSYNC_LEDGER_USER_EMAIL", "me@example.com")
        .env("SPLITSYNC_FRIEND_ID", "42")
}

fn deliver(home: &Path, name: &str, body: &str) {
    let dir = home.join("data").join("Maildir").join("new");
    std::fs::create_dir_all(&dir).unwrap();
    let raw = format!(
        "From: Banco de Chile <{SENDER}>\r\nTo: me@example.com\r\nSubject: Compra con tu Tarjeta\r\n\
         Date: Sat, 19 Apr 2025 14:40:00 -0400\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
    );
    std::fs::write(dir.join(name), raw).unwrap();
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    splitsync(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync").and(predicate::str::contains("summary")));
}

#[test]
fn sync_requires_credentials() {
    let home = tempfile::tempdir().unwrap();
    deliver(home.path(), "001", RECEIPT);
    splitsync(home.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SPLITSYNC_MAIL_USER"));
    assert!(home.path().join("data").join("Maildir").join("new").join("001").exists());
}

#[test]
fn status_before_first_sync() {
    let home = tempfile::tempdir().unwrap();
    splitsync(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions processed yet"));
}

#[test]
fn sync_creates_once_then_skips_duplicate() {
    let home = tempfile::tempdir().unwrap();
    deliver(home.path(), "001", RECEIPT);

    with_credentials(&mut splitsync(home.path()))
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created: 1").and(predicate::str::contains("1190.00")));

    deliver(home.path(), "002", RECEIPT);
    with_credentials(&mut splitsync(home.path()))
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicates: 1").and(predicate::str::contains("No expenses were created.")));

    splitsync(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed:  1"));

    let ledger = std::fs::read_to_string(home.path().join("data").join("ledger.json")).unwrap();
    assert!(ledger.contains("SPID MUT"));
}

#[test]
fn unparseable_email_is_left_unread() {
    let home = tempfile::tempdir().unwrap();
    deliver(home.path(), "001", "Tu estado de cuenta ya esta disponible");

    with_credentials(&mut splitsync(home.path()))
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed: 1"));

    let cur = home.path().join("data").join("Maildir").join("cur");
    assert!(cur.join("001:2,").exists());
    let errored = std::fs::read_to_string(home.path().join("data").join("logs").join("errored.log")).unwrap();
    assert!(errored.contains("No amount found in the email"));
}

#[test]
fn sync_output_exports_without_touching_mailbox() {
    let home = tempfile::tempdir().unwrap();
    deliver(home.path(), "001", RECEIPT);
    let output = home.path().join("emails.json");

    with_credentials(&mut splitsync(home.path()))
        .arg("sync")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 1 emails"));

    let data: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(data[0]["transaction"]["card_number"], "7766");
    assert!(home.path().join("data").join("Maildir").join("new").join("001").exists());
    assert!(!home.path().join("data").join("ledger.json").exists());
}

#[test]
fn health_and_delete() {
    let home = tempfile::tempdir().unwrap();
    with_credentials(&mut splitsync(home.path()))
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("me@example.com"));

    with_credentials(&mut splitsync(home.path()))
        .args(["delete", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No expense with id 99"));
}

#[test]
fn summary_rejects_bad_month() {
    let home = tempfile::tempdir().unwrap();
    with_credentials(&mut splitsync(home.path()))
        .args(["summary", "--month", "2025/04"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Use YYYY-MM format"));
}
