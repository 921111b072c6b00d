//! Decoded script opcodes. Every table command becomes exactly one
//! `Command`; anything unrecognised or malformed lands in `Unknown`.

use field_formats::{RawArg, RawCommand};

use crate::host::{DoorAction, WarpStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Number(i32),
    Symbol(String),
}

impl Operand {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Operand::Symbol(symbol) => Some(symbol),
            Operand::Number(_) => None,
        }
    }

    /// Text form, as used for labels, flags and variable names.
    pub fn text(&self) -> String {
        match self {
            Operand::Symbol(symbol) => symbol.clone(),
            Operand::Number(value) => value.to_string(),
        }
    }
}

impl From<&RawArg> for Operand {
    fn from(arg: &RawArg) -> Self {
        match arg {
            RawArg::Number(value) => match i32::try_from(*value) {
                Ok(value) => Operand::Number(value),
                Err(_) => {
                    log::warn!("script.arg {value}: out of range, read as 0");
                    Operand::Number(0)
                }
            },
            RawArg::Text(text) => Operand::Symbol(text.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Eq,
    Gt,
    Le,
    Ge,
    Ne,
}

impl Comparison {
    fn from_suffix(suffix: &str) -> Option<Comparison> {
        match suffix {
            "lt" => Some(Comparison::Lt),
            "eq" => Some(Comparison::Eq),
            "gt" => Some(Comparison::Gt),
            "le" => Some(Comparison::Le),
            "ge" => Some(Comparison::Ge),
            "ne" => Some(Comparison::Ne),
            _ => None,
        }
    }

    /// Legacy `goto_if <code>, label` condition codes.
    fn from_code(code: i32) -> Option<Comparison> {
        match code {
            0 => Some(Comparison::Lt),
            1 => Some(Comparison::Eq),
            2 => Some(Comparison::Gt),
            3 => Some(Comparison::Le),
            4 => Some(Comparison::Ge),
            5 => Some(Comparison::Ne),
            _ => None,
        }
    }

    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Eq => lhs == rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Ne => lhs != rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `goto_if_eq VAR, value, label`
    Compare {
        cmp: Comparison,
        lhs: Operand,
        rhs: Operand,
    },
    /// `compare VAR, value` followed by `goto_if_eq label`
    LastCompare(Comparison),
    Flag { flag: String, set: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Default,
    YesNo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    End,
    Return,
    Goto(String),
    Call(String),
    GotoIf { condition: Condition, label: String },
    CallIf { condition: Condition, label: String },
    Compare { lhs: Operand, rhs: Operand },
    Switch(Operand),
    Case { value: Operand, label: String },

    SetVar { var: String, value: Operand },
    AddVar { var: String, value: Operand },
    SubVar { var: String, value: Operand },
    CopyVar { dest: String, source: String },
    SetFlag(String),
    ClearFlag(String),
    CheckFlag(String),
    CheckPlayerGender,

    Lock,
    Release,
    FacePlayer,

    Msgbox { text: String, kind: MessageKind },
    Message(String),
    WaitMessage,
    CloseMessage,
    YesNoBox,
    Multichoice { menu: Operand, cancelable: bool },

    ApplyMovement { object: Operand, movement: String, map: Option<String> },
    WaitMovement { object: Option<Operand>, map: Option<String> },
    SetObjectVisible { object: Operand, map: Option<String>, visible: bool, persistent: bool },
    SetObjectXY { object: Operand, x: Operand, y: Operand, persistent: bool },
    /// Persists an object's current position as its spawn position.
    CopyObjectXYToPerm(Operand),
    TurnObject { object: Operand, direction: Operand },
    SetObjectMovementType { object: Operand, movement_type: String },
    SetPlayerVisible(bool),

    Delay(Operand),
    WaitState,
    Warp { map: String, x: Operand, y: Operand, style: WarpStyle },
    WarpHole { map: String },
    SetDynamicWarp { map: String, x: Operand, y: Operand },
    FadeScreen(Operand),
    Door { x: Operand, y: Operand, action: DoorAction },
    WaitDoorAnim,

    SetMetatile { x: Operand, y: Operand, metatile: Operand },
    SetStepCallback(Operand),
    Special(String),
    SpecialVar { var: String, name: String },
    CheckItem(Operand),

    /// Accepted command with no effect here (audio, stats, respawn).
    Ignored(String),
    Unknown { name: String, args: Vec<Operand> },
}

const IGNORED_COMMANDS: &[&str] = &[
    "playse",
    "waitse",
    "playbgm",
    "fadedefaultbgm",
    "fadeoutbgm",
    "playfanfare",
    "waitfanfare",
    "playmoncry",
    "waitmoncry",
    "incrementgamestat",
    "setrespawn",
    "nop",
];

struct Args<'a>(&'a [Operand]);

impl<'a> Args<'a> {
    fn operand(&self, index: usize) -> Option<Operand> {
        self.0.get(index).cloned()
    }

    fn text(&self, index: usize) -> Option<String> {
        self.0.get(index).map(Operand::text)
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl Command {
    pub fn decode(raw: &RawCommand) -> Command {
        let args: Vec<Operand> = raw.args.iter().map(Operand::from).collect();
        match decode_known(&raw.cmd, &Args(&args)) {
            Some(command) => command,
            None => Command::Unknown {
                name: raw.cmd.clone(),
                args,
            },
        }
    }
}

fn decode_known(name: &str, args: &Args<'_>) -> Option<Command> {
    if let Some(suffix) = name.strip_prefix("goto_if_") {
        let (condition, label) = decode_condition(suffix, args)?;
        return Some(Command::GotoIf { condition, label });
    }
    if let Some(suffix) = name.strip_prefix("call_if_") {
        let (condition, label) = decode_condition(suffix, args)?;
        return Some(Command::CallIf { condition, label });
    }
    if name == "goto_if" || name == "call_if" {
        let cmp = match args.operand(0)? {
            Operand::Number(code) => Comparison::from_code(code)?,
            Operand::Symbol(suffix) => Comparison::from_suffix(&suffix.to_ascii_lowercase())?,
        };
        let condition = Condition::LastCompare(cmp);
        let label = args.text(1)?;
        return Some(if name == "goto_if" {
            Command::GotoIf { condition, label }
        } else {
            Command::CallIf { condition, label }
        });
    }
    if IGNORED_COMMANDS.contains(&name) {
        return Some(Command::Ignored(name.to_string()));
    }

    let command = match name {
        "end" => Command::End,
        "return" => Command::Return,
        "goto" => Command::Goto(args.text(0)?),
        "call" => Command::Call(args.text(0)?),
        "compare" => Command::Compare {
            lhs: args.operand(0)?,
            rhs: args.operand(1)?,
        },
        "switch" => Command::Switch(args.operand(0)?),
        "case" => Command::Case {
            value: args.operand(0)?,
            label: args.text(1)?,
        },

        "setvar" => Command::SetVar {
            var: args.text(0)?,
            value: args.operand(1)?,
        },
        "addvar" => Command::AddVar {
            var: args.text(0)?,
            value: args.operand(1)?,
        },
        "subvar" => Command::SubVar {
            var: args.text(0)?,
            value: args.operand(1)?,
        },
        "copyvar" => Command::CopyVar {
            dest: args.text(0)?,
            source: args.text(1)?,
        },
        "setflag" => Command::SetFlag(args.text(0)?),
        "clearflag" => Command::ClearFlag(args.text(0)?),
        "checkflag" => Command::CheckFlag(args.text(0)?),
        "checkplayergender" => Command::CheckPlayerGender,

        "lock" | "lockall" => Command::Lock,
        "release" | "releaseall" => Command::Release,
        "faceplayer" => Command::FacePlayer,

        "msgbox" => Command::Msgbox {
            text: args.text(0)?,
            kind: match args.text(1).as_deref() {
                Some("MSGBOX_YESNO") => MessageKind::YesNo,
                _ => MessageKind::Default,
            },
        },
        "message" => Command::Message(args.text(0)?),
        "waitmessage" => Command::WaitMessage,
        "closemessage" => Command::CloseMessage,
        "yesnobox" => Command::YesNoBox,
        "multichoice" | "multichoicedefault" => Command::Multichoice {
            menu: args.operand(2)?,
            cancelable: !truthy(args.operand(3)),
        },

        "applymovement" => Command::ApplyMovement {
            object: args.operand(0)?,
            movement: args.text(1)?,
            map: args.text(2),
        },
        "waitmovement" => Command::WaitMovement {
            object: args.operand(0),
            map: args.text(1),
        },
        "addobject" | "showobjectat" => Command::SetObjectVisible {
            object: args.operand(0)?,
            map: args.text(1),
            visible: true,
            persistent: name == "addobject",
        },
        "removeobject" | "hideobjectat" => Command::SetObjectVisible {
            object: args.operand(0)?,
            map: args.text(1),
            visible: false,
            persistent: name == "removeobject",
        },
        "setobjectxy" | "setobjectxyperm" => Command::SetObjectXY {
            object: args.operand(0)?,
            x: args.operand(1)?,
            y: args.operand(2)?,
            persistent: name == "setobjectxyperm",
        },
        "copyobjectxytoperm" => Command::CopyObjectXYToPerm(args.operand(0)?),
        "turnobject" => Command::TurnObject {
            object: args.operand(0)?,
            direction: args.operand(1)?,
        },
        "setobjectmovementtype" => Command::SetObjectMovementType {
            object: args.operand(0)?,
            movement_type: args.text(1)?,
        },
        "showplayer" => Command::SetPlayerVisible(true),
        "hideplayer" => Command::SetPlayerVisible(false),

        "delay" => Command::Delay(args.operand(0)?),
        "waitstate" => Command::WaitState,
        "warp" | "warpsilent" | "warpdoor" | "warpteleport" => {
            let (x, y) = warp_coords(args)?;
            let style = match name {
                "warpsilent" => WarpStyle::Silent,
                "warpdoor" => WarpStyle::Door,
                "warpteleport" => WarpStyle::Teleport,
                _ => WarpStyle::Normal,
            };
            Command::Warp {
                map: args.text(0)?,
                x,
                y,
                style,
            }
        }
        "warphole" => Command::WarpHole { map: args.text(0)? },
        "setdynamicwarp" => {
            let (x, y) = warp_coords(args)?;
            Command::SetDynamicWarp {
                map: args.text(0)?,
                x,
                y,
            }
        }
        "fadescreen" | "fadescreenswapbuffers" => Command::FadeScreen(args.operand(0)?),
        "opendoor" => Command::Door {
            x: args.operand(0)?,
            y: args.operand(1)?,
            action: DoorAction::Open,
        },
        "closedoor" => Command::Door {
            x: args.operand(0)?,
            y: args.operand(1)?,
            action: DoorAction::Close,
        },
        "waitdooranim" => Command::WaitDoorAnim,

        "setmetatile" => Command::SetMetatile {
            x: args.operand(0)?,
            y: args.operand(1)?,
            metatile: args.operand(2)?,
        },
        "setstepcallback" => Command::SetStepCallback(args.operand(0)?),
        "special" => Command::Special(args.text(0)?),
        "specialvar" => Command::SpecialVar {
            var: args.text(0)?,
            name: args.text(1)?,
        },
        "checkitem" => Command::CheckItem(args.operand(0)?),
        _ => return None,
    };
    Some(command)
}

/// `map, x, y` or `map, warp_id, x, y`; missing coordinates read as -1.
fn warp_coords(args: &Args<'_>) -> Option<(Operand, Operand)> {
    Some(match args.len() {
        0..=2 => (Operand::Number(-1), Operand::Number(-1)),
        3 => (args.operand(1)?, args.operand(2)?),
        _ => (args.operand(2)?, args.operand(3)?),
    })
}

fn truthy(operand: Option<Operand>) -> bool {
    match operand {
        Some(Operand::Number(value)) => value != 0,
        Some(Operand::Symbol(symbol)) => matches!(symbol.as_str(), "TRUE" | "YES"),
        None => false,
    }
}

fn decode_condition(suffix: &str, args: &Args<'_>) -> Option<(Condition, String)> {
    match suffix {
        "set" | "unset" => Some((
            Condition::Flag {
                flag: args.text(0)?,
                set: suffix == "set",
            },
            args.text(1)?,
        )),
        _ => {
            let cmp = Comparison::from_suffix(suffix)?;
            if args.len() == 1 {
                return Some((Condition::LastCompare(cmp), args.text(0)?));
            }
            Some((
                Condition::Compare {
                    cmp,
                    lhs: args.operand(0)?,
                    rhs: args.operand(1)?,
                },
                args.text(2)?,
            ))
        }
    }
}

/// Decodes a whole script body.
pub fn decode_script(raw: &[RawCommand]) -> Vec<Command> {
    raw.iter().map(Command::decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cmd: &str, args: Vec<RawArg>) -> RawCommand {
        RawCommand::new(cmd, args)
    }

    #[test]
    fn conditionals_decode_both_forms() {
        let direct = Command::decode(&raw(
            "goto_if_eq",
            vec!["VAR_X".into(), RawArg::Number(5), "L1".into()],
        ));
        assert_eq!(
            direct,
            Command::GotoIf {
                condition: Condition::Compare {
                    cmp: Comparison::Eq,
                    lhs: Operand::Symbol("VAR_X".to_string()),
                    rhs: Operand::Number(5),
                },
                label: "L1".to_string(),
            }
        );

        let legacy = Command::decode(&raw("call_if_ge", vec!["L2".into()]));
        assert_eq!(
            legacy,
            Command::CallIf {
                condition: Condition::LastCompare(Comparison::Ge),
                label: "L2".to_string(),
            }
        );

        let flag = Command::decode(&raw("goto_if_unset", vec!["FLAG_X".into(), "L3".into()]));
        assert!(matches!(
            flag,
            Command::GotoIf { condition: Condition::Flag { set: false, .. }, .. }
        ));

        let coded = Command::decode(&raw("goto_if", vec![RawArg::Number(5), "L4".into()]));
        assert_eq!(
            coded,
            Command::GotoIf {
                condition: Condition::LastCompare(Comparison::Ne),
                label: "L4".to_string(),
            }
        );
    }

    #[test]
    fn unknown_and_malformed_commands_fall_back() {
        assert_eq!(
            Command::decode(&raw("trainerbattle_single", vec![RawArg::Number(3)])),
            Command::Unknown {
                name: "trainerbattle_single".to_string(),
                args: vec![Operand::Number(3)],
            }
        );
        assert!(matches!(
            Command::decode(&raw("goto", Vec::new())),
            Command::Unknown { .. }
        ));
        assert!(matches!(
            Command::decode(&raw("goto_if_zz", vec!["VAR_X".into(), RawArg::Number(1), "L".into()])),
            Command::Unknown { .. }
        ));
        assert_eq!(
            Command::decode(&raw("playse", vec!["SE_DOOR".into()])),
            Command::Ignored("playse".to_string())
        );
    }

    #[test]
    fn warp_forms_pick_coordinates() {
        let three = Command::decode(&raw(
            "warp",
            vec!["MAP_ROUTE101".into(), RawArg::Number(7), RawArg::Number(9)],
        ));
        assert!(matches!(
            three,
            Command::Warp { x: Operand::Number(7), y: Operand::Number(9), style: WarpStyle::Normal, .. }
        ));
        let four = Command::decode(&raw(
            "warpsilent",
            vec!["MAP_ROUTE101".into(), RawArg::Number(0), RawArg::Number(3), RawArg::Number(4)],
        ));
        assert!(matches!(
            four,
            Command::Warp { x: Operand::Number(3), y: Operand::Number(4), style: WarpStyle::Silent, .. }
        ));
    }

    #[test]
    fn object_and_dynamic_warp_commands_decode() {
        assert_eq!(
            Command::decode(&raw("copyobjectxytoperm", vec!["LOCALID_RIVAL".into()])),
            Command::CopyObjectXYToPerm(Operand::Symbol("LOCALID_RIVAL".to_string()))
        );
        assert_eq!(
            Command::decode(&raw(
                "setdynamicwarp",
                vec!["MAP_ROUTE119".into(), RawArg::Number(6), RawArg::Number(31)],
            )),
            Command::SetDynamicWarp {
                map: "MAP_ROUTE119".to_string(),
                x: Operand::Number(6),
                y: Operand::Number(31),
            }
        );
    }

    #[test]
    fn oversized_numbers_read_as_zero() {
        let big = i64::from(i32::MAX) + 1;
        assert_eq!(
            Command::decode(&raw("delay", vec![RawArg::Number(big)])),
            Command::Delay(Operand::Number(0))
        );
        assert_eq!(
            Operand::from(&RawArg::Number(i64::from(i32::MIN))),
            Operand::Number(i32::MIN)
        );
    }

    #[test]
    fn multichoice_cancel_follows_ignore_b_argument() {
        let cancelable = Command::decode(&raw(
            "multichoice",
            vec![RawArg::Number(0), RawArg::Number(0), "MULTI_SSTIDAL_LILYCOVE".into(), "FALSE".into()],
        ));
        assert!(matches!(cancelable, Command::Multichoice { cancelable: true, .. }));
        let locked = Command::decode(&raw(
            "multichoice",
            vec![RawArg::Number(0), RawArg::Number(0), RawArg::Number(3), "TRUE".into()],
        ));
        assert!(matches!(locked, Command::Multichoice { cancelable: false, .. }));
    }
}
