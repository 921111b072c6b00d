use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

/// One decoded map script table: event scripts, movement lists, text and
/// the map-level hook header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptTable {
    pub map_scripts: MapScripts,
    pub scripts: BTreeMap<String, Vec<RawCommand>>,
    pub movements: BTreeMap<String, Vec<String>>,
    pub text: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapScripts {
    pub on_transition: Option<String>,
    pub on_load: Option<String>,
    pub on_resume: Option<String>,
    pub on_warp_into: Vec<VarTrigger>,
    pub on_frame: Vec<VarTrigger>,
}

/// Table entry that fires `script` when `var` currently equals `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarTrigger {
    pub var: String,
    pub value: i32,
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCommand {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<RawArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArg {
    Number(i64),
    Text(String),
}

impl RawArg {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawArg::Text(text) => Some(text),
            RawArg::Number(_) => None,
        }
    }
}

impl fmt::Display for RawArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawArg::Number(value) => write!(f, "{value}"),
            RawArg::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for RawArg {
    fn from(value: &str) -> Self {
        RawArg::Text(value.to_string())
    }
}

impl From<i64> for RawArg {
    fn from(value: i64) -> Self {
        RawArg::Number(value)
    }
}

impl RawCommand {
    pub fn new(cmd: &str, args: Vec<RawArg>) -> Self {
        Self {
            cmd: cmd.to_string(),
            args,
        }
    }
}

impl ScriptTable {
    pub fn parse_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("decoding script table JSON")
    }

    pub fn command_count(&self) -> usize {
        self.scripts.values().map(Vec::len).sum()
    }

    /// Hook labels named by the header, in hook order.
    pub fn hook_labels(&self) -> Vec<&str> {
        let header = &self.map_scripts;
        let mut labels = Vec::new();
        labels.extend(header.on_transition.as_deref());
        labels.extend(header.on_load.as_deref());
        labels.extend(header.on_warp_into.iter().map(|entry| entry.script.as_str()));
        labels.extend(header.on_resume.as_deref());
        labels.extend(header.on_frame.iter().map(|entry| entry.script.as_str()));
        labels
    }
}

pub fn load_script_table<P: AsRef<Path>>(path: P) -> Result<ScriptTable> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading script table {}", path.display()))?;
    ScriptTable::parse_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Loads every `*.json` table below `root`, keyed by file stem.
pub fn load_script_tables<P: AsRef<Path>>(root: P) -> Result<BTreeMap<String, ScriptTable>> {
    let root = root.as_ref();
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    let mut tables = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if !entry.file_type().is_file() || !is_json {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let table = load_script_table(path)?;
        if tables.insert(stem.to_string(), table).is_some() {
            bail!("duplicate script table name {stem} under {}", root.display());
        }
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_argument_kinds() {
        let table = ScriptTable::parse_str(
            r#"{
                "scripts": {
                    "Main": [
                        { "cmd": "setvar", "args": ["VAR_TEMP_1", 5] },
                        { "cmd": "end" }
                    ]
                }
            }"#,
        )
        .expect("table parses");
        let main = &table.scripts["Main"];
        assert_eq!(main[0].args, vec![RawArg::from("VAR_TEMP_1"), RawArg::Number(5)]);
        assert!(main[1].args.is_empty());
        assert_eq!(table.command_count(), 2);
        assert!(table.movements.is_empty());
    }

    #[test]
    fn header_uses_camel_case_keys() {
        let table = ScriptTable::parse_str(
            r#"{
                "mapScripts": {
                    "onTransition": "Map_OnTransition",
                    "onResume": "Map_OnResume",
                    "onWarpInto": [{ "var": "VAR_STATE", "value": 4, "script": "Map_Warp" }]
                }
            }"#,
        )
        .expect("header parses");
        let header = &table.map_scripts;
        assert_eq!(header.on_transition.as_deref(), Some("Map_OnTransition"));
        assert_eq!(header.on_load, None);
        assert_eq!(header.on_warp_into[0].value, 4);
        assert_eq!(
            table.hook_labels(),
            vec!["Map_OnTransition", "Map_Warp", "Map_OnResume"]
        );
    }

    #[test]
    fn raw_args_display_their_source_text() {
        assert_eq!(RawArg::Number(-3).to_string(), "-3");
        assert_eq!(RawArg::from("DIR_EAST").to_string(), "DIR_EAST");
        assert_eq!(RawArg::Number(1).as_text(), None);
    }
}
