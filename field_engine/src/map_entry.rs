//! Map-entry hook sequencing. The stage order is fixed per entry kind and
//! each hook script runs to completion before the next stage starts.

use std::collections::VecDeque;

use field_formats::{MapScripts, VarTrigger};
use serde::{Deserialize, Serialize};

use crate::script::{ScriptEnv, ScriptInterpreter, ScriptSignal, ScriptStatus};
use crate::state::EventState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MapEntryKind {
    /// Full load after a warp.
    Warp,
    /// Walking across a map connection.
    Connection,
    /// Loading a save in place.
    Continue,
    /// Returning from a menu or battle.
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryStage {
    ResetTemps,
    ResetStepCallbacks,
    OnTransition,
    OnLoad,
    OnWarpInto,
    OnResume,
}

impl MapEntryKind {
    pub fn stages(self) -> &'static [EntryStage] {
        use EntryStage::*;
        match self {
            MapEntryKind::Warp => &[
                ResetTemps,
                ResetStepCallbacks,
                OnTransition,
                OnLoad,
                OnWarpInto,
                OnResume,
            ],
            MapEntryKind::Connection => &[ResetTemps, ResetStepCallbacks, OnTransition, OnResume],
            MapEntryKind::Continue => &[ResetStepCallbacks, OnLoad, OnResume],
            MapEntryKind::Resume => &[ResetStepCallbacks, OnResume],
        }
    }
}

/// One completed stage and the hook script it started, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: EntryStage,
    pub script: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapEntry {
    map: String,
    kind: MapEntryKind,
    pending: VecDeque<EntryStage>,
    history: Vec<StageRecord>,
}

impl MapEntry {
    pub fn new(map: &str, kind: MapEntryKind) -> Self {
        MapEntry {
            map: map.to_string(),
            kind,
            pending: kind.stages().iter().copied().collect(),
            history: Vec::new(),
        }
    }

    pub fn map(&self) -> &str {
        &self.map
    }

    pub fn kind(&self) -> MapEntryKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// Runs stages until one leaves its hook script suspended, or every
    /// stage is done.
    pub fn advance(
        &mut self,
        interpreter: &mut ScriptInterpreter,
        env: &mut ScriptEnv<'_>,
    ) -> ScriptStatus {
        if interpreter.sources().current_map() != Some(self.map.as_str()) {
            interpreter.sources_mut().select_map(&self.map);
        }

        while let Some(stage) = self.pending.pop_front() {
            let script = match stage {
                EntryStage::ResetTemps => {
                    env.state.reset_temps();
                    None
                }
                EntryStage::ResetStepCallbacks => {
                    env.steps.reset();
                    None
                }
                EntryStage::OnTransition => hook(interpreter, |header| header.on_transition.clone()),
                EntryStage::OnLoad => hook(interpreter, |header| header.on_load.clone()),
                EntryStage::OnWarpInto => interpreter.sources().map_scripts().and_then(|header| {
                    first_matching(&header.on_warp_into, env.state).map(str::to_string)
                }),
                EntryStage::OnResume => hook(interpreter, |header| header.on_resume.clone()),
            };
            log::debug!("map_entry.{:?} {} {:?}", stage, self.map, script);
            self.history.push(StageRecord {
                stage,
                script: script.clone(),
            });

            if let Some(label) = script {
                if interpreter.execute(&label, env) {
                    let status = interpreter.status();
                    if status != ScriptStatus::Finished {
                        return status;
                    }
                }
            }
        }
        ScriptStatus::Finished
    }

    /// Forwards a signal to the suspended stage script and continues with
    /// the remaining stages once it finishes.
    pub fn resume(
        &mut self,
        signal: ScriptSignal,
        interpreter: &mut ScriptInterpreter,
        env: &mut ScriptEnv<'_>,
    ) -> ScriptStatus {
        match interpreter.resume(signal, env) {
            ScriptStatus::Finished => self.advance(interpreter, env),
            suspended => suspended,
        }
    }
}

fn hook(
    interpreter: &ScriptInterpreter,
    pick: impl FnOnce(&MapScripts) -> Option<String>,
) -> Option<String> {
    interpreter.sources().map_scripts().and_then(pick)
}

fn first_matching<'a>(triggers: &'a [VarTrigger], state: &EventState) -> Option<&'a str> {
    triggers
        .iter()
        .find(|trigger| state.var_number(&trigger.var) == trigger.value)
        .map(|trigger| trigger.script.as_str())
}

/// The on-frame script to run this frame, if any of the triggers match.
pub fn frame_script<'a>(header: &'a MapScripts, state: &EventState) -> Option<&'a str> {
    first_matching(&header.on_frame, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessField;
    use crate::host::TilePos;
    use crate::script::{ScriptSources, ScriptWait};
    use crate::step_callback::{StepCallbackId, StepCallbackManager};
    use field_formats::{MapLayout, ScriptTable};

    const MAP: &str = "MAP_SOOTOPOLIS_CITY_GYM_1F";

    const TABLE: &str = r#"{
        "mapScripts": {
            "onTransition": "Gym_OnTransition",
            "onLoad": "Gym_OnLoad",
            "onResume": "Gym_OnResume",
            "onWarpInto": [
                { "var": "VAR_TEMP_0", "value": 0, "script": "Gym_WarpIntoZero" },
                { "var": "VAR_TRACE", "value": 12, "script": "Gym_WarpIntoAfterLoad" }
            ],
            "onFrame": [{ "var": "VAR_GYM_STATE", "value": 1, "script": "Gym_Frame" }]
        },
        "scripts": {
            "Gym_OnTransition": [{ "cmd": "addvar", "args": ["VAR_TRACE", 1] }, { "cmd": "end" }],
            "Gym_OnLoad": [
                { "cmd": "setvar", "args": ["VAR_TEMP_0", 7] },
                { "cmd": "addvar", "args": ["VAR_TRACE", 11] },
                { "cmd": "end" }
            ],
            "Gym_WarpIntoZero": [{ "cmd": "setflag", "args": ["FLAG_WRONG_WARP_INTO"] }, { "cmd": "end" }],
            "Gym_WarpIntoAfterLoad": [
                { "cmd": "delay", "args": [2] },
                { "cmd": "addvar", "args": ["VAR_TRACE", 100] },
                { "cmd": "end" }
            ],
            "Gym_OnResume": [
                { "cmd": "setstepcallback", "args": ["STEP_CB_SOOTOPOLIS_ICE"] },
                { "cmd": "addvar", "args": ["VAR_TRACE", 1000] },
                { "cmd": "end" }
            ],
            "Gym_Frame": [{ "cmd": "end" }]
        }
    }"#;

    struct Rig {
        interpreter: ScriptInterpreter,
        state: EventState,
        steps: StepCallbackManager,
        field: HeadlessField,
    }

    impl Rig {
        fn new() -> Self {
            let table = ScriptTable::parse_str(TABLE).expect("table parses");
            let mut sources = ScriptSources::new(&ScriptTable::default());
            sources.add_map(MAP, &table);
            let mut field = HeadlessField::new("MAY", 1);
            field.add_layout(MapLayout::filled(MAP, 4, 4, 1));
            field.enter_map(MAP, TilePos::new(0, 0));
            Rig {
                interpreter: ScriptInterpreter::new(sources),
                state: EventState::new(),
                steps: StepCallbackManager::new(),
                field,
            }
        }

        fn advance(&mut self, entry: &mut MapEntry) -> ScriptStatus {
            let mut env = ScriptEnv {
                state: &mut self.state,
                steps: &mut self.steps,
                host: &mut self.field,
            };
            entry.advance(&mut self.interpreter, &mut env)
        }

        fn resume(&mut self, entry: &mut MapEntry, signal: ScriptSignal) -> ScriptStatus {
            let mut env = ScriptEnv {
                state: &mut self.state,
                steps: &mut self.steps,
                host: &mut self.field,
            };
            entry.resume(signal, &mut self.interpreter, &mut env)
        }
    }

    #[test]
    fn warp_entry_runs_every_hook_in_order() {
        let mut rig = Rig::new();
        rig.state.set_var("VAR_TEMP_5", 3);
        rig.steps.set_callback(StepCallbackId::Ash);

        let mut entry = MapEntry::new(MAP, MapEntryKind::Warp);
        assert_eq!(
            rig.advance(&mut entry),
            ScriptStatus::Suspended(ScriptWait::Frames(2))
        );
        assert_eq!(rig.state.var("VAR_TEMP_5"), None);
        assert_eq!(rig.state.var_number("VAR_TRACE"), 12);

        assert_eq!(
            rig.resume(&mut entry, ScriptSignal::FramesElapsed(2)),
            ScriptStatus::Finished
        );
        assert!(entry.is_finished());
        assert_eq!(rig.state.var_number("VAR_TRACE"), 1112);
        assert!(!rig.state.is_flag_set("FLAG_WRONG_WARP_INTO"));
        assert_eq!(rig.steps.selected(), StepCallbackId::SootopolisIce);

        let stages: Vec<EntryStage> = entry.history().iter().map(|record| record.stage).collect();
        assert_eq!(stages, MapEntryKind::Warp.stages());
        assert_eq!(
            entry.history()[4].script.as_deref(),
            Some("Gym_WarpIntoAfterLoad")
        );
    }

    #[test]
    fn resume_entry_only_reactivates_callbacks() {
        let mut rig = Rig::new();
        rig.state.set_var("VAR_TEMP_1", 0b101);

        let mut entry = MapEntry::new(MAP, MapEntryKind::Resume);
        assert_eq!(rig.advance(&mut entry), ScriptStatus::Finished);
        assert_eq!(rig.state.var_number("VAR_TRACE"), 1000);
        assert_eq!(rig.state.var_number("VAR_TEMP_1"), 0b101);
        assert_eq!(rig.steps.selected(), StepCallbackId::SootopolisIce);
    }

    #[test]
    fn continue_keeps_temps_and_skips_transition() {
        let mut rig = Rig::new();
        rig.state.set_var("VAR_TEMP_3", 9);

        let mut entry = MapEntry::new(MAP, MapEntryKind::Continue);
        assert_eq!(rig.advance(&mut entry), ScriptStatus::Finished);
        assert_eq!(rig.state.var_number("VAR_TEMP_3"), 9);
        assert_eq!(rig.state.var_number("VAR_TRACE"), 1011);
    }

    #[test]
    fn frame_script_picks_first_matching_trigger() {
        let table = ScriptTable::parse_str(TABLE).expect("table parses");
        let mut state = EventState::new();
        assert_eq!(frame_script(&table.map_scripts, &state), None);
        state.set_var("VAR_GYM_STATE", 1);
        assert_eq!(frame_script(&table.map_scripts, &state), Some("Gym_Frame"));
    }
}
