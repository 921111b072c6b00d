use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

const TEMP_VAR_PREFIX: &str = "VAR_TEMP_";
const TEMP_FLAG_PREFIX: &str = "FLAG_TEMP_";

/// A script variable. Local object references such as `LOCALID_BRENDAN`
/// cannot be expressed numerically, so they are kept as symbols and read
/// back as 0 by numeric consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Numeric(i32),
    Symbol(String),
}

impl VarValue {
    pub fn as_number(&self) -> i32 {
        match self {
            VarValue::Numeric(value) => *value,
            VarValue::Symbol(_) => 0,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            VarValue::Symbol(symbol) => Some(symbol),
            VarValue::Numeric(_) => None,
        }
    }
}

impl Default for VarValue {
    fn default() -> Self {
        VarValue::Numeric(0)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        VarValue::Numeric(value)
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        VarValue::Symbol(value.to_string())
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Numeric(value) => write!(f, "{value}"),
            VarValue::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

/// Flag and variable store shared by the interpreter and the step callbacks.
/// Callers own it and pass it in explicitly.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventState {
    flags: BTreeSet<String>,
    vars: BTreeMap<String, VarValue>,
}

impl EventState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flag_set(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn set_flag(&mut self, name: &str) {
        self.flags.insert(name.to_string());
    }

    pub fn clear_flag(&mut self, name: &str) {
        self.flags.remove(name);
    }

    pub fn var(&self, name: &str) -> Option<&VarValue> {
        self.vars.get(name)
    }

    /// Numeric view of a variable; unset and symbolic variables read as 0.
    pub fn var_number(&self, name: &str) -> i32 {
        self.vars.get(name).map(VarValue::as_number).unwrap_or(0)
    }

    pub fn var_symbol(&self, name: &str) -> Option<&str> {
        self.vars.get(name).and_then(VarValue::as_symbol)
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<VarValue>) {
        self.vars.insert(name.to_string(), value.into());
    }

    /// Adds `delta` to the numeric view and stores the result, dropping any
    /// symbol the variable held.
    pub fn add_var(&mut self, name: &str, delta: i32) -> i32 {
        let value = self.var_number(name).wrapping_add(delta);
        self.set_var(name, value);
        value
    }

    /// Copies `source` into `dest`, symbol included.
    pub fn copy_var(&mut self, dest: &str, source: &str) {
        let value = self.vars.get(source).cloned().unwrap_or_default();
        self.vars.insert(dest.to_string(), value);
    }

    /// Clears the map-local temporaries (`VAR_TEMP_*`, `FLAG_TEMP_*`).
    pub fn reset_temps(&mut self) {
        self.vars.retain(|name, _| !name.starts_with(TEMP_VAR_PREFIX));
        self.flags.retain(|name| !name.starts_with(TEMP_FLAG_PREFIX));
    }

    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().map(String::as_str)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &VarValue)> {
        self.vars.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbolic_vars_read_as_zero() {
        let mut state = EventState::new();
        state.set_var("VAR_0x8004", "LOCALID_RIVAL");
        assert_eq!(state.var_number("VAR_0x8004"), 0);
        assert_eq!(state.var_symbol("VAR_0x8004"), Some("LOCALID_RIVAL"));
        assert_eq!(state.var_number("VAR_UNSET"), 0);
    }

    #[test]
    fn copy_var_carries_symbols_and_numeric_copies_drop_them() {
        let mut state = EventState::new();
        state.set_var("VAR_0x8004", "LOCALID_RIVAL");
        state.copy_var("VAR_0x8005", "VAR_0x8004");
        assert_eq!(state.var_symbol("VAR_0x8005"), Some("LOCALID_RIVAL"));

        state.set_var("VAR_0x8006", 3);
        state.copy_var("VAR_0x8005", "VAR_0x8006");
        assert_eq!(state.var_symbol("VAR_0x8005"), None);
        assert_eq!(state.var_number("VAR_0x8005"), 3);
    }

    #[test]
    fn add_var_replaces_symbol_with_number() {
        let mut state = EventState::new();
        state.set_var("VAR_0x8004", "LOCALID_RIVAL");
        assert_eq!(state.add_var("VAR_0x8004", 2), 2);
        assert_eq!(state.var("VAR_0x8004"), Some(&VarValue::Numeric(2)));
    }

    #[test]
    fn reset_temps_keeps_persistent_entries() {
        let mut state = EventState::new();
        state.set_var("VAR_TEMP_1", 7);
        state.set_var("VAR_ICE_STEP_COUNT", 2);
        state.set_flag("FLAG_TEMP_1");
        state.set_flag("FLAG_BADGE05_GET");
        state.reset_temps();
        assert_eq!(state.var("VAR_TEMP_1"), None);
        assert_eq!(state.var_number("VAR_ICE_STEP_COUNT"), 2);
        assert!(!state.is_flag_set("FLAG_TEMP_1"));
        assert!(state.is_flag_set("FLAG_BADGE05_GET"));
    }
}
