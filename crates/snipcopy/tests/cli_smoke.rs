use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn snipcopy() -> Command {
    let mut cmd = Command::cargo_bin("snipcopy").expect("binary exists");
    cmd.env_remove("SNIPCOPY_STRIP_SHELL")
        .env_remove("SNIPCOPY_STRIP_PYTHON")
        .env_remove("SNIPCOPY_HIDE_AFTER_MS");
    cmd
}

fn page(dir: &tempfile::TempDir, markup: &str) -> std::path::PathBuf {
    let path = dir.path().join("page.html");
    fs::write(&path, markup).expect("write page");
    path
}

fn empty_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, "").expect("write config");
    path
}

#[test]
fn help_displays_usage() {
    snipcopy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn normalize_strips_prompts_from_stdin() {
    let dir = tempfile::tempdir().expect("tempdir");
    snipcopy()
        .arg("--config")
        .arg(empty_config(&dir))
        .arg("normalize")
        .write_stdin("$ ls\n>>> x\n")
        .assert()
        .success()
        .stdout("ls\nx\n");
}

#[test]
fn normalize_can_keep_shell_prompts() {
    let dir = tempfile::tempdir().expect("tempdir");
    snipcopy()
        .arg("--config")
        .arg(empty_config(&dir))
        .args(["normalize", "--keep-shell"])
        .write_stdin("$ ls\n>>> x\n")
        .assert()
        .success()
        .stdout("$ ls\nx\n");
}

#[test]
fn scan_lists_blocks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = page(
        &dir,
        r#"<pre><code>$ ls</code></pre><pre class="lang-py">print(1)</pre>"#,
    );
    snipcopy()
        .arg("--config")
        .arg(empty_config(&dir))
        .arg("scan")
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("0\tpre\t$ ls"))
        .stdout(predicate::str::contains("1\tpre.lang-py\tprint(1)"));
}

#[test]
fn send_dry_run_prints_payload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = page(&dir, "<pre><code>$ ls\n&gt;&gt;&gt; print(1)</code></pre>");
    snipcopy()
        .arg("--config")
        .arg(empty_config(&dir))
        .arg("send")
        .arg(&page)
        .args(["--message", r#"{"action":"copy-code-at-caret"}"#])
        .args(["--right-click", "0", "--dry-run"])
        .assert()
        .success()
        .stdout("ls\nprint(1)\n")
        .stderr(predicate::str::contains("Copied!"));
}

#[test]
fn send_ignores_unroutable_messages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = page(&dir, "<pre><code>$ ls</code></pre>");
    for message in [r#"{"action":"reload"}"#, "{", "{}"] {
        snipcopy()
            .arg("--config")
            .arg(empty_config(&dir))
            .arg("send")
            .arg(&page)
            .args(["--message", message, "--dry-run"])
            .assert()
            .success()
            .stdout("")
            .stderr(predicate::str::contains("Copied!").not());
    }
}

#[test]
fn copy_rejects_missing_block() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = page(&dir, "<p>no code</p>");
    snipcopy()
        .arg("--config")
        .arg(empty_config(&dir))
        .arg("copy")
        .arg(&page)
        .args(["--block", "2", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no block 2"));
}

#[test]
fn invalid_rule_in_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config.toml");
    fs::write(&config, "[rules]\nextra = [\"pre >\"]\n").expect("write config");
    snipcopy()
        .arg("--config")
        .arg(&config)
        .args(["normalize"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid block rule"));
}
