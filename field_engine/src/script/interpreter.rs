use std::rc::Rc;

use serde::Serialize;

use crate::host::{Direction, MovementTicket, ScriptHost, TilePos, WarpRequest, WarpStyle};
use crate::state::{EventState, VarValue};
use crate::step_callback::{StepCallbackId, StepCallbackManager};

use super::command::{Command, Condition, MessageKind, Operand};
use super::constants::{
    is_var_name, resolve_value, resolve_var_value, MULTI_B_PRESSED, PLAYER_LOCAL_ID, VAR_RESULT,
};
use super::movement::{classify_movement, MovementStep};
use super::sources::ScriptSources;
use super::specials::run_special;
use super::text::{format_text, StringVars, TextContext};
use super::tracker::MovementTracker;

/// Tracker key for the player's own movements.
pub const PLAYER_OBJECT: &str = "PLAYER";

const PLAYER_ALIASES: &[&str] = &["LOCALID_PLAYER", "OBJ_EVENT_ID_PLAYER"];
const FADE_FRAMES: u32 = 16;
/// Commands one `run` may execute before the script is treated as a
/// runaway loop and stopped.
const MAX_COMMANDS_PER_RUN: usize = 100_000;

/// Everything a script touches while it runs. Borrowed per call so the
/// caller keeps ownership of the state store, step callbacks and host.
pub struct ScriptEnv<'a> {
    pub state: &'a mut EventState,
    pub steps: &'a mut StepCallbackManager,
    pub host: &'a mut dyn ScriptHost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MovementTarget {
    All,
    Object(String),
}

/// What a suspended script is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScriptWait {
    Message,
    YesNo,
    Choice { cancelable: bool },
    Frames(u32),
    Movement(MovementTarget),
    DoorAnimation,
    Warp,
    PlayerIdle,
}

/// Completion reported back by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptSignal {
    MessageDismissed,
    YesNo(bool),
    /// Selected index, or `None` when the player backed out.
    Choice(Option<u16>),
    FramesElapsed(u32),
    MovementFinished(MovementTicket),
    DoorAnimationFinished,
    WarpFinished,
    PlayerIdle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ScriptStatus {
    Finished,
    Suspended(ScriptWait),
}

#[derive(Debug, Clone)]
struct CallFrame {
    sequence: Rc<[Command]>,
    ip: usize,
}

#[derive(Debug, Clone, Copy)]
struct SwitchState {
    value: i32,
    matched: bool,
}

enum Flow {
    Next,
    Suspend(ScriptWait),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ObjectRef {
    Player,
    Local(String),
}

impl ObjectRef {
    fn key(&self) -> &str {
        match self {
            ObjectRef::Player => PLAYER_OBJECT,
            ObjectRef::Local(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterpreterSnapshot {
    pub running: Option<String>,
    pub call_depth: usize,
    pub waiting: Option<ScriptWait>,
    pub movements: MovementTracker,
    pub warp_pending: bool,
    pub door_pending: bool,
}

/// Walks decoded script commands for one foreground script at a time,
/// yielding at every asynchronous command.
#[derive(Debug)]
pub struct ScriptInterpreter {
    sources: ScriptSources,
    running: Option<String>,
    frame: Option<CallFrame>,
    stack: Vec<CallFrame>,
    switch: Option<SwitchState>,
    last_compare: Option<(i32, i32)>,
    movements: MovementTracker,
    strings: StringVars,
    waiting: Option<ScriptWait>,
    warp_pending: bool,
    door_pending: bool,
}

impl ScriptInterpreter {
    pub fn new(sources: ScriptSources) -> Self {
        ScriptInterpreter {
            sources,
            running: None,
            frame: None,
            stack: Vec::new(),
            switch: None,
            last_compare: None,
            movements: MovementTracker::new(),
            strings: StringVars::new(),
            waiting: None,
            warp_pending: false,
            door_pending: false,
        }
    }

    pub fn sources(&self) -> &ScriptSources {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut ScriptSources {
        &mut self.sources
    }

    pub fn is_running(&self) -> bool {
        self.frame.is_some()
    }

    pub fn status(&self) -> ScriptStatus {
        match &self.waiting {
            Some(wait) if self.is_running() => ScriptStatus::Suspended(wait.clone()),
            _ => ScriptStatus::Finished,
        }
    }

    pub fn call_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn string_var(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }

    /// Starts `label` and runs it until it ends or suspends. Returns false
    /// when the label is unknown or another script is still live.
    pub fn execute(&mut self, label: &str, env: &mut ScriptEnv<'_>) -> bool {
        if let Some(active) = &self.running {
            log::warn!("script.busy {label}: {active} is still running");
            return false;
        }
        let Some(sequence) = self.sources.script(label) else {
            log::warn!("script.missing {label}");
            return false;
        };

        log::debug!("script.start {label}");
        self.running = Some(label.to_string());
        self.frame = Some(CallFrame { sequence, ip: 0 });
        self.stack.clear();
        self.switch = None;
        self.last_compare = None;
        self.warp_pending = false;
        self.door_pending = false;
        self.run(env);
        true
    }

    /// Feeds one completion signal in. A signal that does not answer the
    /// current wait is ignored; movement completions always settle their
    /// tracked entry.
    pub fn resume(&mut self, signal: ScriptSignal, env: &mut ScriptEnv<'_>) -> ScriptStatus {
        if let ScriptSignal::MovementFinished(ticket) = signal {
            if !self.movements.finish(ticket) {
                log::trace!("movement.untracked ticket {}", ticket.0);
            }
        }
        let Some(wait) = self.waiting.clone() else {
            return self.status();
        };

        let satisfied = match (&wait, signal) {
            (ScriptWait::Message, ScriptSignal::MessageDismissed) => true,
            (ScriptWait::YesNo, ScriptSignal::YesNo(answer)) => {
                env.state.set_var(VAR_RESULT, i32::from(answer));
                true
            }
            (ScriptWait::Choice { cancelable }, ScriptSignal::Choice(selection)) => {
                match selection {
                    Some(index) => {
                        env.state.set_var(VAR_RESULT, i32::from(index));
                        true
                    }
                    None if *cancelable => {
                        env.state.set_var(VAR_RESULT, MULTI_B_PRESSED);
                        true
                    }
                    None => false,
                }
            }
            (ScriptWait::Frames(remaining), ScriptSignal::FramesElapsed(elapsed)) => {
                if elapsed >= *remaining {
                    true
                } else {
                    self.waiting = Some(ScriptWait::Frames(remaining - elapsed));
                    false
                }
            }
            (ScriptWait::Movement(target), ScriptSignal::MovementFinished(_)) => {
                self.movements.join(target_key(target))
            }
            (ScriptWait::DoorAnimation, ScriptSignal::DoorAnimationFinished) => {
                self.door_pending = false;
                true
            }
            (ScriptWait::Warp, ScriptSignal::WarpFinished) => {
                self.warp_pending = false;
                true
            }
            (ScriptWait::PlayerIdle, ScriptSignal::PlayerIdle) => true,
            _ => {
                log::trace!("script.signal {signal:?} ignored while waiting on {wait:?}");
                false
            }
        };

        if satisfied {
            self.waiting = None;
            self.run(env);
        }
        self.status()
    }

    pub fn snapshot(&self) -> InterpreterSnapshot {
        InterpreterSnapshot {
            running: self.running.clone(),
            call_depth: self.stack.len(),
            waiting: self.waiting.clone(),
            movements: self.movements.clone(),
            warp_pending: self.warp_pending,
            door_pending: self.door_pending,
        }
    }

    fn run(&mut self, env: &mut ScriptEnv<'_>) {
        for _ in 0..MAX_COMMANDS_PER_RUN {
            let Some(frame) = self.frame.as_mut() else {
                return;
            };
            let sequence = Rc::clone(&frame.sequence);
            let Some(command) = sequence.get(frame.ip) else {
                self.finish();
                return;
            };
            frame.ip += 1;

            match self.dispatch(command, env) {
                Flow::Next => {}
                Flow::Suspend(wait) => {
                    log::trace!("script.suspend {wait:?}");
                    self.waiting = Some(wait);
                    return;
                }
                Flow::End => {
                    self.finish();
                    return;
                }
            }
        }
        log::error!(
            "script.runaway {}: stopped after {MAX_COMMANDS_PER_RUN} commands without yielding",
            self.running.as_deref().unwrap_or("?")
        );
        self.finish();
    }

    fn finish(&mut self) {
        if let Some(label) = self.running.take() {
            log::debug!("script.end {label}");
        }
        self.frame = None;
        self.stack.clear();
        self.switch = None;
        self.waiting = None;
    }

    /// Replaces the current frame with `label`, pushing the caller first
    /// when `push` is set. Missing labels are skipped and return false.
    fn jump(&mut self, label: &str, push: bool) -> bool {
        let Some(sequence) = self.sources.script(label) else {
            log::warn!("script.missing_target {label}: skipped");
            return false;
        };
        let caller = self.frame.replace(CallFrame { sequence, ip: 0 });
        if push {
            if let Some(caller) = caller {
                self.stack.push(caller);
            }
        }
        true
    }

    fn condition_holds(&self, condition: &Condition, state: &EventState) -> bool {
        match condition {
            Condition::Compare { cmp, lhs, rhs } => {
                cmp.holds(resolve_value(lhs, state), resolve_value(rhs, state))
            }
            Condition::LastCompare(cmp) => match self.last_compare {
                Some((lhs, rhs)) => cmp.holds(lhs, rhs),
                None => false,
            },
            Condition::Flag { flag, set } => state.is_flag_set(flag) == *set,
        }
    }

    fn message_text(&self, label: &str, env: &ScriptEnv<'_>) -> Option<String> {
        let Some(raw) = self.sources.text(label) else {
            log::warn!("text.missing {label}: message skipped");
            return None;
        };
        let player_name = env.host.player_name();
        let ctx = TextContext {
            player_name: &player_name,
            player_gender: env.host.player_gender(),
            strings: &self.strings,
        };
        Some(format_text(raw, &ctx))
    }

    fn dispatch(&mut self, command: &Command, env: &mut ScriptEnv<'_>) -> Flow {
        match command {
            Command::End => return Flow::End,
            Command::Return => match self.stack.pop() {
                Some(caller) => self.frame = Some(caller),
                None => return Flow::End,
            },
            Command::Goto(label) => {
                self.jump(label, false);
            }
            Command::Call(label) => {
                self.jump(label, true);
            }
            Command::GotoIf { condition, label } => {
                if self.condition_holds(condition, env.state) {
                    self.jump(label, false);
                }
            }
            Command::CallIf { condition, label } => {
                if self.condition_holds(condition, env.state) {
                    self.jump(label, true);
                }
            }
            Command::Compare { lhs, rhs } => {
                self.last_compare = Some((resolve_value(lhs, env.state), resolve_value(rhs, env.state)));
            }
            Command::Switch(scrutinee) => {
                self.switch = Some(SwitchState {
                    value: resolve_value(scrutinee, env.state),
                    matched: false,
                });
            }
            Command::Case { value, label } => {
                let value = resolve_value(value, env.state);
                let open = matches!(
                    self.switch,
                    Some(switch) if !switch.matched && switch.value == value
                );
                // An unresolvable case target leaves the switch open.
                if open && self.jump(label, false) {
                    if let Some(switch) = self.switch.as_mut() {
                        switch.matched = true;
                    }
                }
            }

            Command::SetVar { var, value } => {
                let value = resolve_var_value(value, env.state);
                env.state.set_var(var, value);
            }
            Command::AddVar { var, value } => {
                let delta = resolve_value(value, env.state);
                env.state.add_var(var, delta);
            }
            Command::SubVar { var, value } => {
                let delta = resolve_value(value, env.state);
                env.state.add_var(var, delta.wrapping_neg());
            }
            Command::CopyVar { dest, source } => env.state.copy_var(dest, source),
            Command::SetFlag(flag) => env.state.set_flag(flag),
            Command::ClearFlag(flag) => env.state.clear_flag(flag),
            Command::CheckFlag(flag) => {
                let set = env.state.is_flag_set(flag);
                env.state.set_var(VAR_RESULT, i32::from(set));
            }
            Command::CheckPlayerGender => {
                let gender = env.host.player_gender();
                env.state.set_var(VAR_RESULT, gender);
            }

            Command::Lock => {
                if !env.host.is_player_idle() {
                    return Flow::Suspend(ScriptWait::PlayerIdle);
                }
            }
            Command::Release => {}
            Command::FacePlayer => env.host.face_talker_toward_player(),

            Command::Msgbox { text, kind } => {
                let Some(message) = self.message_text(text, env) else {
                    return Flow::Next;
                };
                return match kind {
                    MessageKind::YesNo => {
                        env.host.show_yes_no(Some(&message));
                        Flow::Suspend(ScriptWait::YesNo)
                    }
                    MessageKind::Default => {
                        env.host.show_message(&message);
                        Flow::Suspend(ScriptWait::Message)
                    }
                };
            }
            Command::Message(text) => {
                let Some(message) = self.message_text(text, env) else {
                    return Flow::Next;
                };
                env.host.show_message(&message);
                return Flow::Suspend(ScriptWait::Message);
            }
            Command::WaitMessage => {}
            Command::CloseMessage => env.host.close_message(),
            Command::YesNoBox => {
                env.host.show_yes_no(None);
                return Flow::Suspend(ScriptWait::YesNo);
            }
            Command::Multichoice { menu, cancelable } => {
                let menu = resolve_value(menu, env.state);
                env.host.show_choice(menu, *cancelable);
                return Flow::Suspend(ScriptWait::Choice {
                    cancelable: *cancelable,
                });
            }

            Command::ApplyMovement {
                object,
                movement,
                map,
            } => self.apply_movement(object, movement, map.as_deref(), env),
            Command::WaitMovement { object, .. } => {
                let target = match object {
                    None => MovementTarget::All,
                    Some(object) => match resolve_object(object, env.state) {
                        ObjectRef::Local(id) if id == "0" => MovementTarget::All,
                        resolved => MovementTarget::Object(resolved.key().to_string()),
                    },
                };
                if !self.movements.join(target_key(&target)) {
                    return Flow::Suspend(ScriptWait::Movement(target));
                }
            }
            Command::SetObjectVisible {
                object,
                map,
                visible,
                persistent,
            } => match resolve_object(object, env.state) {
                ObjectRef::Player => env.host.set_player_visible(*visible),
                ObjectRef::Local(id) => {
                    let map = map.clone().unwrap_or_else(|| env.host.current_map());
                    env.host.set_object_visible(&map, &id, *visible, *persistent);
                }
            },
            Command::SetObjectXY {
                object,
                x,
                y,
                persistent,
            } => {
                let pos = TilePos::new(resolve_value(x, env.state), resolve_value(y, env.state));
                match resolve_object(object, env.state) {
                    ObjectRef::Player => log::warn!("setobjectxy on the player ignored"),
                    ObjectRef::Local(id) => {
                        let map = env.host.current_map();
                        env.host.set_object_position(&map, &id, pos, *persistent);
                    }
                }
            }
            Command::CopyObjectXYToPerm(object) => match resolve_object(object, env.state) {
                ObjectRef::Player => log::warn!("copyobjectxytoperm on the player ignored"),
                ObjectRef::Local(id) => {
                    let map = env.host.current_map();
                    match env.host.object_position(&map, &id) {
                        Some(pos) => env.host.set_object_position(&map, &id, pos, true),
                        None => log::warn!("copyobjectxytoperm {id}: no such object on {map}"),
                    }
                }
            },
            Command::TurnObject { object, direction } => {
                let direction = Direction::from_raw(resolve_value(direction, env.state));
                match resolve_object(object, env.state) {
                    ObjectRef::Player => {
                        env.host.move_player(&[MovementStep::Face(direction)]);
                    }
                    ObjectRef::Local(id) => {
                        let map = env.host.current_map();
                        env.host.face_object(&map, &id, direction);
                    }
                }
            }
            Command::SetObjectMovementType {
                object,
                movement_type,
            } => match resolve_object(object, env.state) {
                ObjectRef::Player => log::warn!("setobjectmovementtype on the player ignored"),
                ObjectRef::Local(id) => {
                    let map = env.host.current_map();
                    env.host.set_object_movement_type(&map, &id, movement_type);
                }
            },
            Command::SetPlayerVisible(visible) => env.host.set_player_visible(*visible),

            Command::Delay(frames) => {
                let frames = resolve_value(frames, env.state);
                if frames > 0 {
                    return Flow::Suspend(ScriptWait::Frames(frames as u32));
                }
            }
            Command::WaitState => {
                if self.warp_pending {
                    return Flow::Suspend(ScriptWait::Warp);
                }
            }
            Command::Warp { map, x, y, style } => {
                let pos = TilePos::new(resolve_value(x, env.state), resolve_value(y, env.state));
                self.queue_warp(env, map, pos, Direction::North, *style);
            }
            Command::WarpHole { map } => {
                let pos = env
                    .host
                    .player_destination()
                    .unwrap_or_else(|| env.host.player_position());
                self.queue_warp(env, map, pos, Direction::South, WarpStyle::Hole);
            }
            Command::SetDynamicWarp { map, x, y } => {
                let pos = TilePos::new(resolve_value(x, env.state), resolve_value(y, env.state));
                log::debug!("warp.dynamic {map} ({}, {})", pos.x, pos.y);
                env.host.set_dynamic_warp(map, pos);
            }
            Command::FadeScreen(mode) => {
                let mode = resolve_value(mode, env.state);
                env.host.fade_screen(mode);
                return Flow::Suspend(ScriptWait::Frames(FADE_FRAMES));
            }
            Command::Door { x, y, action } => {
                let pos = TilePos::new(resolve_value(x, env.state), resolve_value(y, env.state));
                let map = env.host.current_map();
                env.host.start_door_animation(&map, pos, *action);
                self.door_pending = true;
            }
            Command::WaitDoorAnim => {
                if self.door_pending {
                    return Flow::Suspend(ScriptWait::DoorAnimation);
                }
            }

            Command::SetMetatile { x, y, metatile } => {
                let (x, y) = (resolve_value(x, env.state), resolve_value(y, env.state));
                let raw = resolve_value(metatile, env.state);
                match u16::try_from(raw) {
                    Ok(metatile) => {
                        let map = env.host.current_map();
                        env.host.set_metatile(&map, x, y, metatile);
                    }
                    Err(_) => log::warn!("setmetatile ({x}, {y}): invalid metatile {raw}"),
                }
            }
            Command::SetStepCallback(id) => {
                let raw = resolve_value(id, env.state);
                match StepCallbackId::from_raw(raw) {
                    Some(id) => env.steps.set_callback(id),
                    None => log::warn!("setstepcallback: unknown callback id {raw}"),
                }
            }
            Command::Special(name) => {
                run_special(name, env, &mut self.strings);
            }
            Command::SpecialVar { var, name } => {
                if let Some(value) = run_special(name, env, &mut self.strings) {
                    env.state.set_var(var, value);
                }
            }
            Command::CheckItem(item) => {
                let held = env.host.has_item(&item.text());
                env.state.set_var(VAR_RESULT, i32::from(held));
            }

            Command::Ignored(name) => log::trace!("script.ignored {name}"),
            Command::Unknown { name, args } => {
                log::warn!("script.unknown_command {name} {args:?}: skipped");
            }
        }
        Flow::Next
    }

    fn apply_movement(
        &mut self,
        object: &Operand,
        movement: &str,
        map: Option<&str>,
        env: &mut ScriptEnv<'_>,
    ) {
        let target = resolve_object(object, env.state);
        let map = map
            .map(str::to_string)
            .unwrap_or_else(|| env.host.current_map());
        if let ObjectRef::Local(id) = &target {
            if !env.host.has_object(&map, id) {
                log::warn!("applymovement {id}: no such object on {map}, treated as finished");
                self.movements.settle_now(id);
                return;
            }
        }
        let Some(names) = self.sources.movement(movement) else {
            log::warn!("movement.missing {movement}: skipped");
            return;
        };
        let steps = classify_movement(&names);
        let ticket = match &target {
            ObjectRef::Player => env.host.move_player(&steps),
            ObjectRef::Local(id) => env.host.move_object(&map, id, &steps),
        };
        log::trace!("movement.start {} {movement} ticket {}", target.key(), ticket.0);
        self.movements.start(target.key(), ticket);
    }

    fn queue_warp(
        &mut self,
        env: &mut ScriptEnv<'_>,
        map: &str,
        pos: TilePos,
        facing: Direction,
        style: WarpStyle,
    ) {
        log::debug!("warp.queue {map} ({}, {}) {style:?}", pos.x, pos.y);
        env.host.queue_warp(WarpRequest {
            map: map.to_string(),
            pos,
            facing,
            style,
        });
        self.warp_pending = true;
    }
}

fn target_key(target: &MovementTarget) -> Option<&str> {
    match target {
        MovementTarget::All => None,
        MovementTarget::Object(key) => Some(key),
    }
}

/// Resolves an object argument. `VAR_*` arguments are dereferenced and may
/// hold a local id symbol.
fn resolve_object(operand: &Operand, state: &EventState) -> ObjectRef {
    let id = match operand {
        Operand::Number(value) => value.to_string(),
        Operand::Symbol(token) if is_var_name(token) => match state.var(token) {
            Some(VarValue::Symbol(symbol)) => symbol.clone(),
            Some(VarValue::Numeric(value)) => value.to_string(),
            None => "0".to_string(),
        },
        Operand::Symbol(token) => token.clone(),
    };
    if PLAYER_ALIASES.contains(&id.as_str()) || id == PLAYER_LOCAL_ID.to_string() {
        ObjectRef::Player
    } else {
        ObjectRef::Local(id)
    }
}
