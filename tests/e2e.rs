use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

/// Binary under test, isolated from the caller's environment and any `.env`
/// in the working directory.
fn ulu(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ulu").unwrap();
    cmd.env_clear().current_dir(dir);
    cmd
}

#[test]
fn help_lists_modes_and_formats() {
    let tmp = tempdir().unwrap();
    ulu(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--container"));
}

#[test]
fn missing_fragment_is_a_usage_error() {
    let tmp = tempdir().unwrap();
    ulu(tmp.path()).assert().failure().code(2);
}

#[test]
fn unknown_mode_is_rejected() {
    let tmp = tempdir().unwrap();
    ulu(tmp.path())
        .args(["--mode", "everything", "smith"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn missing_host_causes_config_exit() {
    let tmp = tempdir().unwrap();
    ulu(tmp.path())
        .arg("smith")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("LDAP_HOST"));
}

#[test]
fn empty_fragment_causes_config_exit() {
    let tmp = tempdir().unwrap();
    ulu(tmp.path())
        .env("LDAP_HOST", "127.0.0.1")
        .arg("   ")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("fragment"));
}

#[test]
fn missing_env_file_causes_config_exit() {
    let tmp = tempdir().unwrap();
    ulu(tmp.path())
        .arg("--env-file")
        .arg(tmp.path().join("nope.env"))
        .arg("smith")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn missing_password_causes_config_exit() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join(".env"),
        "LDAP_HOST=127.0.0.1\nSEARCH_OU=OU=Staff,DC=corp,DC=example\nLDAP_USER=alice\n",
    )
    .unwrap();
    ulu(tmp.path())
        .arg("smith")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("LDAP_PASSWORD"));
}

#[test]
fn unreachable_server_is_an_auth_failure() {
    let tmp = tempdir().unwrap();
    let env_file = tmp.path().join("lookup.env");
    fs::write(
        &env_file,
        "LDAP_HOST=127.0.0.1\nSEARCH_OU=OU=Staff,DC=corp,DC=example\nADMIN_SEARCH_OU=OU=Admins,DC=corp,DC=example\nLDAP_DOMAIN=CORP\nLDAP_USER=alice\n",
    )
    .unwrap();
    ulu(tmp.path())
        .arg("--env-file")
        .arg(&env_file)
        .args(["--no-tls", "--port", "1", "--timeout", "2", "--password-stdin"])
        .arg("smith")
        .write_stdin("secret\n")
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("CORP\\alice"));
}
