//! Symbolic constant tables used by script arguments.

use crate::state::{EventState, VarValue};
use crate::step_callback::tiles::metatile_by_label;
use crate::step_callback::StepCallbackId;

use super::command::Operand;

pub const VAR_RESULT: &str = "VAR_RESULT";
pub const MULTI_B_PRESSED: i32 = 127;
pub const PLAYER_LOCAL_ID: i32 = 255;

const NAMED_CONSTANTS: &[(&str, i32)] = &[
    ("FALSE", 0),
    ("TRUE", 1),
    ("NO", 0),
    ("YES", 1),
    ("MALE", 0),
    ("FEMALE", 1),
    ("DIR_NONE", 0),
    ("DIR_SOUTH", 1),
    ("DIR_NORTH", 2),
    ("DIR_WEST", 3),
    ("DIR_EAST", 4),
    ("FADE_FROM_BLACK", 0),
    ("FADE_TO_BLACK", 1),
    ("FADE_FROM_WHITE", 2),
    ("FADE_TO_WHITE", 3),
    ("B_OUTCOME_WON", 1),
    ("B_OUTCOME_LOST", 2),
    ("B_OUTCOME_DREW", 3),
    ("B_OUTCOME_RAN", 4),
    ("B_OUTCOME_PLAYER_TELEPORTED", 5),
    ("B_OUTCOME_MON_FLED", 6),
    ("B_OUTCOME_CAUGHT", 7),
    ("MULTI_B_PRESSED", MULTI_B_PRESSED),
    ("OBJ_EVENT_ID_PLAYER", PLAYER_LOCAL_ID),
    ("SPECIES_NONE", 0),
    ("SPECIES_TREECKO", 277),
    ("SPECIES_TORCHIC", 280),
    ("SPECIES_MUDKIP", 283),
    ("ITEM_NONE", 0),
    ("ITEM_POKE_BALL", 4),
    ("ITEM_POTION", 13),
];

/// Resolves a bare token: named constants, step callback ids and metatile
/// labels become numbers, numeric text is parsed, other identifiers stay
/// symbolic, and anything else reads as 0.
pub fn resolve_constant(token: &str) -> VarValue {
    if let Some((_, value)) = NAMED_CONSTANTS.iter().find(|(name, _)| *name == token) {
        return VarValue::Numeric(*value);
    }
    if let Some(id) = StepCallbackId::from_name(token) {
        return VarValue::Numeric(id.raw());
    }
    if let Some(metatile) = metatile_by_label(token) {
        return VarValue::Numeric(i32::from(metatile));
    }
    if let Some(value) = parse_number(token) {
        return VarValue::Numeric(value);
    }
    let identifier = token
        .chars()
        .next()
        .map(|first| first.is_ascii_alphabetic() || first == '_')
        .unwrap_or(false);
    if identifier {
        VarValue::Symbol(token.to_string())
    } else {
        VarValue::Numeric(0)
    }
}

/// Decimal or `0x` hexadecimal, optionally negative.
pub fn parse_number(token: &str) -> Option<i32> {
    let token = token.trim();
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    let value = if negative { -value } else { value };
    i32::try_from(value).ok()
}

pub fn is_var_name(token: &str) -> bool {
    token.starts_with("VAR_")
}

/// Numeric value of an argument: literals as-is, `VAR_*` dereferenced,
/// constants resolved, unknown symbols as 0.
pub fn resolve_value(operand: &Operand, state: &EventState) -> i32 {
    match operand {
        Operand::Number(value) => *value,
        Operand::Symbol(token) if is_var_name(token) => state.var_number(token),
        Operand::Symbol(token) => resolve_constant(token).as_number(),
    }
}

/// Like `resolve_value`, but symbols survive: used where a variable may
/// legitimately hold a local object reference.
pub fn resolve_var_value(operand: &Operand, state: &EventState) -> VarValue {
    match operand {
        Operand::Number(value) => VarValue::Numeric(*value),
        Operand::Symbol(token) if is_var_name(token) => {
            state.var(token).cloned().unwrap_or_default()
        }
        Operand::Symbol(token) => resolve_constant(token),
    }
}
