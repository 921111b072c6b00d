use serde::Serialize;

use super::ice::VAR_ICE_STEP_COUNT;
use super::tiles::{
    METATILE_CAVE_CRACKED_FLOOR, METATILE_CAVE_CRACKED_FLOOR_HOLE,
    METATILE_SKY_PILLAR_CRACKED_FLOOR_HOLE, MB_CRACKED_FLOOR, MB_CRACKED_FLOOR_HOLE,
};
use super::{StepFrame, TileBatch};
use crate::host::TilePos;
use crate::state::EventState;

const CRACK_DELAY: u8 = 3;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrackedFloor {
    pub prev: Option<TilePos>,
    pub slots: [Option<CrackSlot>; 2],
}

/// A cracked tile that becomes a hole when `delay` reaches zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrackSlot {
    pub map: String,
    pub pos: TilePos,
    pub delay: u8,
}

fn open_hole(map: &str, tiles: &mut TileBatch<'_>, pos: TilePos) {
    let hole = if tiles.metatile_at(map, pos) == Some(METATILE_CAVE_CRACKED_FLOOR) {
        METATILE_CAVE_CRACKED_FLOOR_HOLE
    } else {
        METATILE_SKY_PILLAR_CRACKED_FLOOR_HOLE
    };
    tiles.set_metatile(map, pos, hole);
}

impl CrackedFloor {
    pub(super) fn step(
        &mut self,
        frame: &StepFrame<'_>,
        state: &mut EventState,
        tiles: &mut TileBatch<'_>,
    ) {
        let behavior = tiles.behavior_at(frame.map, frame.dest);

        for slot in self.slots.iter_mut() {
            let Some(crack) = slot.as_mut() else {
                continue;
            };
            if crack.map != frame.map {
                *slot = None;
                continue;
            }
            crack.delay = crack.delay.saturating_sub(1);
            if crack.delay == 0 {
                let pos = crack.pos;
                *slot = None;
                open_hole(frame.map, tiles, pos);
            }
        }

        if behavior == Some(MB_CRACKED_FLOOR_HOLE) {
            state.set_var(VAR_ICE_STEP_COUNT, 0);
        }

        if self.prev == Some(frame.dest) {
            return;
        }
        self.prev = Some(frame.dest);
        if behavior != Some(MB_CRACKED_FLOOR) {
            return;
        }

        if !frame.at_fastest_speed {
            state.set_var(VAR_ICE_STEP_COUNT, 0);
        }
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(CrackSlot {
                    map: frame.map.to_string(),
                    pos: frame.dest,
                    delay: CRACK_DELAY,
                });
            }
            None => log::debug!(
                "cracked_floor.drop ({}, {}): both slots busy",
                frame.dest.x,
                frame.dest.y
            ),
        }
    }
}
