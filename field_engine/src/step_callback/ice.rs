use serde::Serialize;

use super::tiles::{
    METATILE_SOOTOPOLIS_GYM_ICE_BROKEN, METATILE_SOOTOPOLIS_GYM_ICE_CRACKED, MB_CRACKED_ICE,
    MB_THIN_ICE,
};
use super::{StepFrame, TileBatch};
use crate::host::TilePos;
use crate::state::EventState;

pub const VAR_ICE_STEP_COUNT: &str = "VAR_ICE_STEP_COUNT";

const ICE_DELAY: u8 = 4;
const ICE_PUZZLE_LEFT: i32 = 3;
const ICE_PUZZLE_RIGHT: i32 = 13;

/// Visited-tile bitmask per puzzle row; bit `x - ICE_PUZZLE_LEFT`.
const ICE_ROW_VARS: [(i32, &str); 10] = [
    (6, "VAR_TEMP_1"),
    (7, "VAR_TEMP_2"),
    (8, "VAR_TEMP_3"),
    (9, "VAR_TEMP_4"),
    (12, "VAR_TEMP_5"),
    (13, "VAR_TEMP_6"),
    (14, "VAR_TEMP_7"),
    (17, "VAR_TEMP_8"),
    (18, "VAR_TEMP_9"),
    (19, "VAR_TEMP_A"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum IcePhase {
    #[default]
    Init,
    Waiting,
    Cracking,
    Breaking,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SootopolisIce {
    pub phase: IcePhase,
    pub prev: TilePos,
    pub target: TilePos,
    pub delay: u8,
}

fn row_var(y: i32) -> Option<&'static str> {
    ICE_ROW_VARS
        .iter()
        .find(|(row, _)| *row == y)
        .map(|(_, name)| *name)
}

fn mark_visited(state: &mut EventState, pos: TilePos) {
    if !(ICE_PUZZLE_LEFT..=ICE_PUZZLE_RIGHT).contains(&pos.x) {
        return;
    }
    let Some(var) = row_var(pos.y) else {
        return;
    };
    let bits = state.var_number(var) | (1 << (pos.x - ICE_PUZZLE_LEFT));
    state.set_var(var, bits);
}

/// Tiles whose visited bit is set, row by row.
pub(super) fn cracked_tiles(state: &EventState) -> Vec<TilePos> {
    let mut tiles = Vec::new();
    for (y, var) in ICE_ROW_VARS {
        let bits = state.var_number(var);
        if bits == 0 {
            continue;
        }
        for x in ICE_PUZZLE_LEFT..=ICE_PUZZLE_RIGHT {
            if bits & (1 << (x - ICE_PUZZLE_LEFT)) != 0 {
                tiles.push(TilePos::new(x, y));
            }
        }
    }
    tiles
}

impl SootopolisIce {
    pub(super) fn step(
        &mut self,
        frame: &StepFrame<'_>,
        state: &mut EventState,
        tiles: &mut TileBatch<'_>,
    ) {
        match self.phase {
            IcePhase::Init => {
                self.prev = frame.dest;
                self.phase = IcePhase::Waiting;
            }
            IcePhase::Waiting => {
                if frame.dest == self.prev {
                    return;
                }
                self.prev = frame.dest;
                match tiles.behavior_at(frame.map, frame.dest) {
                    Some(MB_THIN_ICE) => {
                        state.add_var(VAR_ICE_STEP_COUNT, 1);
                        self.schedule(frame.dest, IcePhase::Cracking);
                    }
                    Some(MB_CRACKED_ICE) => {
                        state.set_var(VAR_ICE_STEP_COUNT, 0);
                        self.schedule(frame.dest, IcePhase::Breaking);
                    }
                    _ => {}
                }
            }
            IcePhase::Cracking => {
                if self.count_down() {
                    tiles.set_metatile(frame.map, self.target, METATILE_SOOTOPOLIS_GYM_ICE_CRACKED);
                    mark_visited(state, self.target);
                    self.phase = IcePhase::Waiting;
                }
            }
            IcePhase::Breaking => {
                if self.count_down() {
                    tiles.set_metatile(frame.map, self.target, METATILE_SOOTOPOLIS_GYM_ICE_BROKEN);
                    self.phase = IcePhase::Waiting;
                }
            }
        }
    }

    fn schedule(&mut self, target: TilePos, phase: IcePhase) {
        self.target = target;
        self.delay = ICE_DELAY;
        self.phase = phase;
    }

    fn count_down(&mut self) -> bool {
        self.delay = self.delay.saturating_sub(1);
        self.delay == 0
    }
}
