//! Smoke tests for the `medroute` binary. None of them reach the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn medroute() -> Command {
    let mut cmd = Command::cargo_bin("medroute").unwrap_or_else(|_| unreachable!());
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("MEDROUTE_API_KEY")
        .env_remove("MEDROUTE_LOCALE")
        .env_remove("MEDROUTE_PROMPT_DIR")
        .env_remove("RUST_LOG");
    cmd
}

const OUTCOMES: &str = r#"[
  {"agent": "drug_agent", "response_text": "Dose is 400 mg [1], max 1200 mg [2].\n\nReferences\n[1] Label\n[2] BNF"},
  {"agent": "research_agent", "response_text": "Trial A [1], B [2], C [3].\n\nReferences\n[1] A\n[2] B\n[3] C"}
]"#;

#[test]
fn test_help_lists_commands() {
    medroute()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("classify"))
        .stdout(predicate::str::contains("synthesize"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn test_classify_offline() {
    medroute()
        .args(["classify", "--offline", "latest trials on SGLT2 inhibitors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("research_query"))
        .stdout(predicate::str::contains("research_agent"));
}

#[test]
fn test_classify_without_key_uses_keywords() {
    medroute()
        .args(["--format", "json", "classify", "warfarin interaction"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"intent\": \"drug_info\""))
        .stdout(predicate::str::contains("keyword fallback"));
}

#[test]
fn test_classify_rejects_blank_message() {
    medroute()
        .args(["classify", "--offline", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input"));
}

#[test]
fn test_synthesize_from_stdin() {
    medroute()
        .arg("synthesize")
        .write_stdin(OUTCOMES)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Drug information"))
        .stdout(predicate::str::contains("Trial A [3], B [4], C [5]."))
        .stdout(predicate::str::contains("[5] C"));
}

#[test]
fn test_synthesize_spanish_json() {
    medroute()
        .args(["--format", "json", "--locale", "es", "synthesize", "-"])
        .write_stdin(OUTCOMES)
        .assert()
        .success()
        .stdout(predicate::str::contains("Referencias"))
        .stdout(predicate::str::contains("\"references\""));
}

#[test]
fn test_unknown_locale_fails() {
    medroute()
        .args(["--locale", "fr", "synthesize"])
        .write_stdin("[]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown locale"));
}

#[test]
fn test_ask_without_key_fails_cleanly() {
    medroute()
        .args(["ask", "paracetamol dose"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn test_init_prompts() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    medroute()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("classifier.md"));
    assert!(dir.path().join("composer.md").exists());

    medroute()
        .args(["init-prompts", "--dir"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}
