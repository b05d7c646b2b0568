use std::path::Path;

use anyhow::Result;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::Value as JsonValue;
use tempfile::TempDir;

const HANDBOOK: &str =
    "# Policy\n\n## Leave\nEmployees get 16 weeks.\n\n## Expenses\nSubmit via the portal.\n";

fn knowbot_command(workdir: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("knowbot")?;
    cmd.current_dir(workdir)
        .env("RUST_LOG", "warn")
        .env_remove("OPENAI_API_KEY")
        .args(["--offline", "--store-dir"])
        .arg(workdir.join("trees"));
    Ok(cmd)
}

fn index_handbook(workdir: &Path) -> Result<()> {
    let file = workdir.join("handbook.md");
    std::fs::write(&file, HANDBOOK)?;
    knowbot_command(workdir)?
        .args(["index", "--bot", "acme"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("Indexing complete!"))
        .stdout(contains("Document type:"))
        .stdout(contains("policy"));
    Ok(())
}

#[test]
fn sources_shows_empty_state() -> Result<()> {
    let workdir = TempDir::new()?;

    knowbot_command(workdir.path())?
        .args(["sources", "--bot", "acme"])
        .assert()
        .success()
        .stdout(contains("No sources indexed for acme yet."));
    Ok(())
}

#[test]
fn index_then_list_and_show() -> Result<()> {
    let workdir = TempDir::new()?;
    index_handbook(workdir.path())?;

    knowbot_command(workdir.path())?
        .args(["sources", "--bot", "acme"])
        .assert()
        .success()
        .stdout(contains("handbook"))
        .stdout(contains("handbook.md"));

    knowbot_command(workdir.path())?
        .args(["show", "--bot", "acme", "--source", "handbook"])
        .assert()
        .success()
        .stdout(contains("1.1"))
        .stdout(contains("Leave"))
        .stdout(contains("Expenses"));
    Ok(())
}

#[test]
fn reindexing_same_text_is_unchanged() -> Result<()> {
    let workdir = TempDir::new()?;
    index_handbook(workdir.path())?;

    knowbot_command(workdir.path())?
        .args(["index", "--bot", "acme", "handbook.md"])
        .assert()
        .success()
        .stdout(contains("Unchanged since"));
    Ok(())
}

#[test]
fn query_prints_context() -> Result<()> {
    let workdir = TempDir::new()?;
    index_handbook(workdir.path())?;

    knowbot_command(workdir.path())?
        .args(["query", "parental leave policy", "--bot", "acme", "--threshold", "50"])
        .assert()
        .success()
        .stdout(contains("# Knowledge Base Context"))
        .stdout(contains("handbook.md > Policy > Leave"))
        .stdout(contains("Employees get 16 weeks."));
    Ok(())
}

#[test]
fn query_json_output() -> Result<()> {
    let workdir = TempDir::new()?;
    index_handbook(workdir.path())?;

    let output = knowbot_command(workdir.path())?
        .args(["query", "parental leave policy", "--bot", "acme"])
        .args(["--threshold", "50", "--json"])
        .output()?;
    assert!(output.status.success());

    let result: JsonValue = serde_json::from_slice(&output.stdout)?;
    assert_eq!(result["confidenceThreshold"], 50);
    let sections = result["relevantSections"]
        .as_array()
        .expect("relevantSections array");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0]["sectionContent"], "Employees get 16 weeks.");
    assert_eq!(sections[0]["sourceName"], "handbook.md");
    Ok(())
}

#[test]
fn show_missing_source_fails() -> Result<()> {
    let workdir = TempDir::new()?;

    knowbot_command(workdir.path())?
        .args(["show", "--bot", "acme", "--source", "nope"])
        .assert()
        .failure()
        .stderr(contains("No tree for acme/nope"));
    Ok(())
}

#[test]
fn config_file_sets_default_threshold() -> Result<()> {
    let workdir = TempDir::new()?;
    index_handbook(workdir.path())?;
    std::fs::write(
        workdir.path().join("knowbot.toml"),
        "[retrieval]\ndefault_confidence_threshold = 100\n",
    )?;

    knowbot_command(workdir.path())?
        .args(["query", "parental leave policy", "--bot", "acme"])
        .assert()
        .success()
        .stdout(contains("No relevant sections found"));
    Ok(())
}
