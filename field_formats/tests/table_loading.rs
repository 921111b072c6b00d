use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use field_formats::load_script_tables;
use serde::Deserialize;
use tempfile::tempdir;

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

#[test]
fn loads_nested_tables_by_stem() -> Result<()> {
    let dir = tempdir()?;
    write(
        &dir.path().join("maps/Route113.json"),
        r#"{ "scripts": { "Route113_OnResume": [{ "cmd": "end" }] } }"#,
    )?;
    write(
        &dir.path().join("common.json"),
        r#"{ "text": { "Common_Text_Hi": "Hi" } }"#,
    )?;
    write(&dir.path().join("notes.txt"), "ignored")?;

    let tables = load_script_tables(dir.path())?;
    let names: Vec<_> = tables.keys().cloned().collect();
    assert_eq!(names, vec!["Route113".to_string(), "common".to_string()]);
    assert_eq!(tables["common"].text["Common_Text_Hi"], "Hi");
    Ok(())
}

#[test]
fn malformed_table_reports_its_path() -> Result<()> {
    let dir = tempdir()?;
    write(&dir.path().join("broken.json"), "{ \"scripts\": [ }")?;
    let err = load_script_tables(dir.path()).expect_err("broken JSON");
    assert!(format!("{err:#}").contains("broken.json"));
    Ok(())
}

#[derive(Debug, Deserialize)]
struct Summary {
    missing_scripts: Vec<String>,
    missing_movements: Vec<String>,
}

#[test]
fn table_export_lists_missing_references() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("tables");
    write(
        &input.join("Town.json"),
        r#"{
            "mapScripts": { "onResume": "Town_OnResume" },
            "scripts": {
                "Town_Main": [
                    { "cmd": "goto_if_eq", "args": ["VAR_TEMP_1", 1, "Town_Elsewhere"] },
                    { "cmd": "applymovement", "args": ["LOCALID_PLAYER", "Town_Movement_Step"] },
                    { "cmd": "call", "args": ["Common_Heal"] },
                    { "cmd": "end" }
                ]
            }
        }"#,
    )?;
    write(
        &input.join("Common.json"),
        r#"{ "scripts": { "Common_Heal": [{ "cmd": "return" }] } }"#,
    )?;
    let output = dir.path().join("out/summary.json");

    let status = Command::new(env!("CARGO_BIN_EXE_table_export"))
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .status()
        .context("running table_export")?;
    assert!(status.success(), "table_export exited with {status}");

    let summary: Summary = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(
        summary.missing_scripts,
        vec!["Town_Elsewhere".to_string(), "Town_OnResume".to_string()]
    );
    assert_eq!(summary.missing_movements, vec!["Town_Movement_Step".to_string()]);
    Ok(())
}
