use serde::Serialize;

use super::tiles::{
    METATILE_FORTREE_BRIDGE_OVER_GRASS_LOWERED, METATILE_FORTREE_BRIDGE_OVER_GRASS_RAISED,
    METATILE_FORTREE_BRIDGE_OVER_TREES_LOWERED, METATILE_FORTREE_BRIDGE_OVER_TREES_RAISED,
    MB_FORTREE_BRIDGE,
};
use super::{StepFrame, TileBatch};
use crate::host::TilePos;

const BOUNCE_FRAMES: u8 = 16;
const BOUNCE_PERIOD: u8 = 7;
const BOUNCE_PULSE_PHASE: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FortreePhase {
    #[default]
    Idle,
    Tracking,
    Bouncing,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FortreeBridge {
    pub phase: FortreePhase,
    pub prev: TilePos,
    pub old_bridge: TilePos,
    pub bounce: u8,
    pub restores: Vec<BridgeRestore>,
}

/// Pulsed bridge section that goes back up when `delay` runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeRestore {
    pub map: String,
    pub pos: TilePos,
    pub delay: u8,
}

fn can_touch_bridge(elevation: u8) -> bool {
    elevation & 1 == 0
}

fn lowered_variant(metatile: u16) -> Option<u16> {
    match metatile {
        METATILE_FORTREE_BRIDGE_OVER_GRASS_RAISED => Some(METATILE_FORTREE_BRIDGE_OVER_GRASS_LOWERED),
        METATILE_FORTREE_BRIDGE_OVER_TREES_RAISED => Some(METATILE_FORTREE_BRIDGE_OVER_TREES_LOWERED),
        _ => None,
    }
}

fn raised_variant(metatile: u16) -> Option<u16> {
    match metatile {
        METATILE_FORTREE_BRIDGE_OVER_GRASS_LOWERED => Some(METATILE_FORTREE_BRIDGE_OVER_GRASS_RAISED),
        METATILE_FORTREE_BRIDGE_OVER_TREES_LOWERED => Some(METATILE_FORTREE_BRIDGE_OVER_TREES_RAISED),
        _ => None,
    }
}

fn lower(frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>, pos: TilePos) -> bool {
    if !can_touch_bridge(frame.elevation) {
        return false;
    }
    match tiles.metatile_at(frame.map, pos).and_then(lowered_variant) {
        Some(lowered) => {
            tiles.set_metatile(frame.map, pos, lowered);
            true
        }
        None => false,
    }
}

fn raise(map: &str, tiles: &mut TileBatch<'_>, pos: TilePos) {
    if let Some(raised) = tiles.metatile_at(map, pos).and_then(raised_variant) {
        tiles.set_metatile(map, pos, raised);
    }
}

impl FortreeBridge {
    pub(super) fn step(&mut self, frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>) {
        match self.phase {
            FortreePhase::Idle => {
                self.prev = frame.dest;
                if is_bridge(frame, tiles, frame.dest) {
                    lower(frame, tiles, frame.dest);
                }
                self.phase = FortreePhase::Tracking;
            }
            FortreePhase::Tracking => {
                if frame.dest == self.prev {
                    return;
                }
                let on_bridge = is_bridge(frame, tiles, frame.dest);
                let left_bridge = is_bridge(frame, tiles, self.prev);
                if can_touch_bridge(frame.elevation) {
                    if left_bridge {
                        raise(frame.map, tiles, self.prev);
                    }
                    if on_bridge {
                        lower(frame, tiles, frame.dest);
                    }
                }
                self.old_bridge = self.prev;
                self.prev = frame.dest;
                if !left_bridge {
                    return;
                }
                self.bounce = BOUNCE_FRAMES;
                self.phase = FortreePhase::Bouncing;
                self.bounce(frame, tiles);
            }
            FortreePhase::Bouncing => self.bounce(frame, tiles),
        }
    }

    fn bounce(&mut self, frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>) {
        self.bounce = self.bounce.saturating_sub(1);
        if self.bounce % BOUNCE_PERIOD == BOUNCE_PULSE_PHASE && lower(frame, tiles, self.old_bridge)
        {
            self.restores.push(BridgeRestore {
                map: frame.map.to_string(),
                pos: self.old_bridge,
                delay: 1,
            });
        }
        if self.bounce == 0 {
            self.phase = FortreePhase::Tracking;
        }
    }

    /// Raises pulsed sections whose one-frame dip has elapsed.
    pub(super) fn tick_restores(&mut self, frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>) {
        self.restores.retain_mut(|restore| {
            if restore.map != frame.map {
                return false;
            }
            restore.delay = restore.delay.saturating_sub(1);
            if restore.delay > 0 {
                return true;
            }
            raise(frame.map, tiles, restore.pos);
            false
        });
    }
}

fn is_bridge(frame: &StepFrame<'_>, tiles: &TileBatch<'_>, pos: TilePos) -> bool {
    tiles.behavior_at(frame.map, pos) == Some(MB_FORTREE_BRIDGE)
}
