//! Summarise a directory (or single file) of script tables as JSON: label
//! counts, a command-name histogram and references no loaded table defines.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use field_formats::{ScriptTable, load_script_table, load_script_tables};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Script table JSON file or directory of tables
    #[arg(long)]
    input: PathBuf,

    /// Output JSON file path
    #[arg(long)]
    output: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct TableSummary {
    scripts: usize,
    movements: usize,
    texts: usize,
    commands: usize,
    histogram: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
struct ExportSummary {
    tables: BTreeMap<String, TableSummary>,
    missing_scripts: BTreeSet<String>,
    missing_movements: BTreeSet<String>,
    missing_texts: BTreeSet<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let tables = if args.input.is_dir() {
        load_script_tables(&args.input)?
    } else {
        let name = args
            .input
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("table")
            .to_string();
        let table = load_script_table(&args.input)?;
        BTreeMap::from([(name, table)])
    };

    let summary = summarise(&tables);

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, &summary)?;
    } else {
        serde_json::to_writer(&mut writer, &summary)?;
    }
    writer.flush()?;
    println!(
        "Summarised {} table(s); {} missing script label(s)",
        summary.tables.len(),
        summary.missing_scripts.len()
    );
    Ok(())
}

fn summarise(tables: &BTreeMap<String, ScriptTable>) -> ExportSummary {
    let mut scripts = BTreeSet::new();
    let mut movements = BTreeSet::new();
    let mut texts = BTreeSet::new();
    for table in tables.values() {
        scripts.extend(table.scripts.keys().cloned());
        movements.extend(table.movements.keys().cloned());
        texts.extend(table.text.keys().cloned());
    }

    let mut summary = ExportSummary {
        tables: BTreeMap::new(),
        missing_scripts: BTreeSet::new(),
        missing_movements: BTreeSet::new(),
        missing_texts: BTreeSet::new(),
    };

    for (name, table) in tables {
        let mut histogram = BTreeMap::new();
        for command in table.scripts.values().flatten() {
            *histogram.entry(command.cmd.clone()).or_insert(0) += 1;

            let script_target = match command.cmd.as_str() {
                "goto" | "call" => command.args.first(),
                "case" => command.args.get(1),
                cmd if cmd.starts_with("goto_if") || cmd.starts_with("call_if") => {
                    command.args.last()
                }
                _ => None,
            };
            if let Some(label) = script_target.and_then(|arg| arg.as_text()) {
                if !scripts.contains(label) {
                    summary.missing_scripts.insert(label.to_string());
                }
            }

            if command.cmd == "applymovement" {
                if let Some(label) = command.args.get(1).and_then(|arg| arg.as_text()) {
                    if !movements.contains(label) {
                        summary.missing_movements.insert(label.to_string());
                    }
                }
            }

            if matches!(command.cmd.as_str(), "msgbox" | "message") {
                if let Some(label) = command.args.first().and_then(|arg| arg.as_text()) {
                    if !texts.contains(label) {
                        summary.missing_texts.insert(label.to_string());
                    }
                }
            }
        }

        for label in table.hook_labels() {
            if !scripts.contains(label) {
                summary.missing_scripts.insert(label.to_string());
            }
        }

        summary.tables.insert(
            name.clone(),
            TableSummary {
                scripts: table.scripts.len(),
                movements: table.movements.len(),
                texts: table.text.len(),
                commands: table.command_count(),
                histogram,
            },
        );
    }

    summary
}
