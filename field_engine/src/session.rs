//! Headless driver: owns the state store, step callbacks, interpreter and
//! field, and feeds suspended scripts the signals a real game loop would.

use serde::Serialize;
use thiserror::Error;

use crate::headless::{FieldEvent, HeadlessField, PlayerState};
use crate::host::{Direction, TilePos};
use crate::map_entry::{frame_script, MapEntry, MapEntryKind, StageRecord};
use crate::script::{
    InterpreterSnapshot, ScriptEnv, ScriptInterpreter, ScriptSignal, ScriptStatus, ScriptWait,
};
use crate::state::EventState;
use crate::step_callback::{StepCallbackManager, StepCallbackSnapshot, StepContext};

/// Warps chained back to back before the session gives up.
const MAX_WARP_HOPS: usize = 16;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no layout loaded for map {0}")]
    UnknownMap(String),
    #[error("script {0} not found or another script is still running")]
    ScriptRejected(String),
    #[error("script {label} still waiting on {wait:?} after {signals} signals")]
    Stalled {
        label: String,
        wait: ScriptWait,
        signals: usize,
    },
    #[error("warp chain exceeded {0} hops")]
    WarpLoop(usize),
}

/// How prompts are answered and how long waits may run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub answer_yes: bool,
    /// Index picked at choice menus; `None` backs out when allowed.
    pub choice: Option<u16>,
    pub signal_budget: usize,
    pub frames_per_step: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            answer_yes: true,
            choice: Some(0),
            signal_budget: 100_000,
            frames_per_step: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub frame: u64,
    pub map: String,
    pub player: PlayerState,
    pub step_callbacks: StepCallbackSnapshot,
    pub interpreter: InterpreterSnapshot,
    pub map_entries: Vec<MapEntrySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapEntrySummary {
    pub map: String,
    pub kind: MapEntryKind,
    pub stages: Vec<StageRecord>,
}

pub struct Session {
    pub state: EventState,
    pub steps: StepCallbackManager,
    pub interpreter: ScriptInterpreter,
    pub field: HeadlessField,
    config: SessionConfig,
    frame: u64,
    entries: Vec<MapEntrySummary>,
}

impl Session {
    pub fn new(interpreter: ScriptInterpreter, field: HeadlessField, config: SessionConfig) -> Self {
        Session {
            state: EventState::new(),
            steps: StepCallbackManager::new(),
            interpreter,
            field,
            config,
            frame: 0,
            entries: Vec::new(),
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn events(&self) -> &[FieldEvent] {
        self.field.events()
    }

    fn parts(&mut self) -> (&mut ScriptInterpreter, ScriptEnv<'_>) {
        (
            &mut self.interpreter,
            ScriptEnv {
                state: &mut self.state,
                steps: &mut self.steps,
                host: &mut self.field,
            },
        )
    }

    /// Runs `label` to completion, then performs any warp it queued.
    pub fn run_script(&mut self, label: &str) -> Result<(), SessionError> {
        let (interpreter, mut env) = self.parts();
        if !interpreter.execute(label, &mut env) {
            return Err(SessionError::ScriptRejected(label.to_string()));
        }
        self.drive(label, None)?;
        self.settle_warps()
    }

    /// Places the player on `map` and runs its entry hooks.
    pub fn enter_map(
        &mut self,
        map: &str,
        pos: TilePos,
        kind: MapEntryKind,
    ) -> Result<(), SessionError> {
        self.enter_map_inner(map, pos, kind)?;
        self.settle_warps()
    }

    fn enter_map_inner(
        &mut self,
        map: &str,
        pos: TilePos,
        kind: MapEntryKind,
    ) -> Result<(), SessionError> {
        if !self.field.has_layout(map) {
            return Err(SessionError::UnknownMap(map.to_string()));
        }
        log::info!("map.enter {map} ({}, {}) {kind:?}", pos.x, pos.y);
        self.field.enter_map(map, pos);
        self.field.record(FieldEvent::MapEntered {
            map: map.to_string(),
            x: pos.x,
            y: pos.y,
        });

        let mut entry = MapEntry::new(map, kind);
        let (interpreter, mut env) = self.parts();
        entry.advance(interpreter, &mut env);
        let label = format!("{map} entry");
        let result = self.drive(&label, Some(&mut entry));
        self.entries.push(MapEntrySummary {
            map: map.to_string(),
            kind,
            stages: entry.history().to_vec(),
        });
        result
    }

    fn settle_warps(&mut self) -> Result<(), SessionError> {
        for _ in 0..MAX_WARP_HOPS {
            let Some(warp) = self.field.take_queued_warp() else {
                return Ok(());
            };
            self.field.player_mut().facing = warp.facing;
            self.enter_map_inner(&warp.map, warp.pos, MapEntryKind::Warp)?;
        }
        Err(SessionError::WarpLoop(MAX_WARP_HOPS))
    }

    /// Walks to each waypoint in turn, one tile at a time (x first, then y),
    /// ticking the step callbacks for every frame of every step.
    pub fn walk(&mut self, waypoints: &[TilePos]) -> Result<(), SessionError> {
        for target in waypoints {
            while self.field.player().pos != *target {
                let pos = self.field.player().pos;
                let direction = if pos.x != target.x {
                    if target.x > pos.x { Direction::East } else { Direction::West }
                } else if target.y > pos.y {
                    Direction::South
                } else {
                    Direction::North
                };
                let next = pos.step(direction, 1);
                {
                    let player = self.field.player_mut();
                    player.facing = direction;
                    player.destination = Some(next);
                }
                for _ in 0..self.config.frames_per_step {
                    self.tick_frame();
                }
                {
                    let player = self.field.player_mut();
                    player.pos = next;
                    player.destination = None;
                }
                log::trace!("player.step ({}, {})", next.x, next.y);
                self.run_frame_script()?;
            }
        }
        Ok(())
    }

    /// Lets `frames` frames pass with the player standing still.
    pub fn idle(&mut self, frames: u32) -> Result<(), SessionError> {
        for _ in 0..frames {
            self.tick_frame();
            self.run_frame_script()?;
        }
        Ok(())
    }

    fn run_frame_script(&mut self) -> Result<(), SessionError> {
        if self.interpreter.is_running() {
            return Ok(());
        }
        let label = self
            .interpreter
            .sources()
            .map_scripts()
            .and_then(|header| frame_script(header, &self.state))
            .map(str::to_string);
        match label {
            Some(label) => self.run_script(&label),
            None => Ok(()),
        }
    }

    fn tick_frame(&mut self) {
        let map = self.field.current_map_id().to_string();
        let player = self.field.player();
        let ctx_dest = player.destination.unwrap_or(player.pos);
        let elevation = player.elevation;
        let at_fastest_speed = player.at_fastest_speed;
        self.steps.update(StepContext {
            map: &map,
            dest: ctx_dest,
            elevation,
            at_fastest_speed,
            state: &mut self.state,
            world: &mut self.field,
        });
        self.frame += 1;
    }

    fn deliver(&mut self, signal: ScriptSignal, entry: Option<&mut MapEntry>) -> ScriptStatus {
        let (interpreter, mut env) = self.parts();
        match entry {
            Some(entry) => entry.resume(signal, interpreter, &mut env),
            None => interpreter.resume(signal, &mut env),
        }
    }

    /// Answers waits until the script (and any remaining entry stages)
    /// finish or the signal budget runs out.
    fn drive(&mut self, label: &str, mut entry: Option<&mut MapEntry>) -> Result<(), SessionError> {
        let mut signals = 0;
        loop {
            for ticket in self.field.take_finished_movements() {
                self.deliver(ScriptSignal::MovementFinished(ticket), entry.as_deref_mut());
            }
            let ScriptStatus::Suspended(wait) = self.interpreter.status() else {
                return Ok(());
            };

            signals += 1;
            if signals > self.config.signal_budget {
                return Err(SessionError::Stalled {
                    label: label.to_string(),
                    wait,
                    signals: signals - 1,
                });
            }
            let signal = self.answer(&wait);
            self.deliver(signal, entry.as_deref_mut());
        }
    }

    fn answer(&mut self, wait: &ScriptWait) -> ScriptSignal {
        match wait {
            ScriptWait::Message => ScriptSignal::MessageDismissed,
            ScriptWait::YesNo => ScriptSignal::YesNo(self.config.answer_yes),
            ScriptWait::Choice { cancelable } => match self.config.choice {
                Some(index) => ScriptSignal::Choice(Some(index)),
                None if *cancelable => ScriptSignal::Choice(None),
                None => ScriptSignal::Choice(Some(0)),
            },
            // Movements complete through their tickets; until then time passes.
            ScriptWait::Frames(_) | ScriptWait::Movement(_) => {
                self.tick_frame();
                ScriptSignal::FramesElapsed(1)
            }
            ScriptWait::DoorAnimation => {
                self.field.take_door_animation();
                ScriptSignal::DoorAnimationFinished
            }
            ScriptWait::Warp => ScriptSignal::WarpFinished,
            ScriptWait::PlayerIdle => {
                self.field.player_mut().destination = None;
                ScriptSignal::PlayerIdle
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            frame: self.frame,
            map: self.field.current_map_id().to_string(),
            player: self.field.player().clone(),
            step_callbacks: self.steps.debug_state(),
            interpreter: self.interpreter.snapshot(),
            map_entries: self.entries.clone(),
        }
    }
}
