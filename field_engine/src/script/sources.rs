//! Label lookup across the active map table and the shared common table.

use std::collections::BTreeMap;
use std::rc::Rc;

use field_formats::{MapScripts, ScriptTable};

use super::command::{decode_script, Command};

/// A script table with its command lists decoded once up front.
#[derive(Debug, Clone, Default)]
pub struct CompiledTable {
    pub map_scripts: MapScripts,
    scripts: BTreeMap<String, Rc<[Command]>>,
    movements: BTreeMap<String, Rc<[String]>>,
    text: BTreeMap<String, String>,
}

impl CompiledTable {
    pub fn compile(table: &ScriptTable) -> Self {
        let scripts = table
            .scripts
            .iter()
            .map(|(label, body)| (label.clone(), Rc::from(decode_script(body))))
            .collect();
        let movements = table
            .movements
            .iter()
            .map(|(label, steps)| (label.clone(), Rc::from(steps.clone())))
            .collect();
        Self {
            map_scripts: table.map_scripts.clone(),
            scripts,
            movements,
            text: table.text.clone(),
        }
    }

    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }
}

/// Map tables by map id plus the common table. Lookups try the selected
/// map first.
#[derive(Debug, Clone, Default)]
pub struct ScriptSources {
    common: CompiledTable,
    maps: BTreeMap<String, CompiledTable>,
    current: Option<String>,
}

impl ScriptSources {
    pub fn new(common: &ScriptTable) -> Self {
        Self {
            common: CompiledTable::compile(common),
            ..Self::default()
        }
    }

    pub fn add_map(&mut self, map: &str, table: &ScriptTable) {
        let compiled = CompiledTable::compile(table);
        log::debug!("scripts.map {map}: {} script(s)", compiled.script_count());
        self.maps.insert(map.to_string(), compiled);
    }

    /// Switches the overlay to `map`. Maps without a table fall through to
    /// the common table alone.
    pub fn select_map(&mut self, map: &str) {
        if !self.maps.contains_key(map) {
            log::debug!("scripts.map {map}: no map table, using common scripts only");
        }
        self.current = Some(map.to_string());
    }

    pub fn current_map(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn map_table(&self) -> Option<&CompiledTable> {
        self.current.as_ref().and_then(|map| self.maps.get(map))
    }

    fn layers(&self) -> impl Iterator<Item = &CompiledTable> {
        self.map_table().into_iter().chain(std::iter::once(&self.common))
    }

    pub fn script(&self, label: &str) -> Option<Rc<[Command]>> {
        self.layers()
            .find_map(|table| table.scripts.get(label))
            .cloned()
    }

    pub fn movement(&self, label: &str) -> Option<Rc<[String]>> {
        self.layers()
            .find_map(|table| table.movements.get(label))
            .cloned()
    }

    pub fn text(&self, label: &str) -> Option<&str> {
        self.layers()
            .find_map(|table| table.text.get(label))
            .map(String::as_str)
    }

    /// Hook header of the selected map, if it has a table.
    pub fn map_scripts(&self) -> Option<&MapScripts> {
        self.map_table().map(|table| &table.map_scripts)
    }
}
