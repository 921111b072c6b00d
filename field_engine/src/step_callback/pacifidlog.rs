use serde::Serialize;

use super::tiles::*;
use super::{StepFrame, TileBatch};
use crate::host::TilePos;

const SETTLE_FRAMES: u8 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PacifidlogPhase {
    #[default]
    Init,
    Tracking,
    Settling,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PacifidlogBridge {
    pub phase: PacifidlogPhase,
    pub prev: TilePos,
    /// Section that floats back up once the settle delay ends.
    pub to_raise: Option<TilePos>,
    pub delay: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogPart {
    VerticalTop,
    VerticalBottom,
    HorizontalLeft,
    HorizontalRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Floating,
    HalfSubmerged,
    Submerged,
}

impl LogPart {
    fn from_behavior(behavior: Option<u16>) -> Option<LogPart> {
        match behavior? {
            MB_PACIFIDLOG_VERTICAL_LOG_TOP => Some(LogPart::VerticalTop),
            MB_PACIFIDLOG_VERTICAL_LOG_BOTTOM => Some(LogPart::VerticalBottom),
            MB_PACIFIDLOG_HORIZONTAL_LOG_LEFT => Some(LogPart::HorizontalLeft),
            MB_PACIFIDLOG_HORIZONTAL_LOG_RIGHT => Some(LogPart::HorizontalRight),
            _ => None,
        }
    }

    /// Both tiles of the section this part belongs to, relative to it.
    fn section(self) -> [(i32, i32, LogPart); 2] {
        match self {
            LogPart::VerticalTop => [(0, 0, LogPart::VerticalTop), (0, 1, LogPart::VerticalBottom)],
            LogPart::VerticalBottom => [(0, -1, LogPart::VerticalTop), (0, 0, LogPart::VerticalBottom)],
            LogPart::HorizontalLeft => {
                [(0, 0, LogPart::HorizontalLeft), (1, 0, LogPart::HorizontalRight)]
            }
            LogPart::HorizontalRight => {
                [(-1, 0, LogPart::HorizontalLeft), (0, 0, LogPart::HorizontalRight)]
            }
        }
    }

    fn metatile(self, depth: Depth) -> u16 {
        match (self, depth) {
            (LogPart::VerticalTop, Depth::Floating) => METATILE_PACIFIDLOG_FLOATING_VERTICAL_TOP,
            (LogPart::VerticalTop, Depth::HalfSubmerged) => {
                METATILE_PACIFIDLOG_HALF_SUBMERGED_VERTICAL_TOP
            }
            (LogPart::VerticalTop, Depth::Submerged) => METATILE_PACIFIDLOG_SUBMERGED_VERTICAL_TOP,
            (LogPart::VerticalBottom, Depth::Floating) => {
                METATILE_PACIFIDLOG_FLOATING_VERTICAL_BOTTOM
            }
            (LogPart::VerticalBottom, Depth::HalfSubmerged) => {
                METATILE_PACIFIDLOG_HALF_SUBMERGED_VERTICAL_BOTTOM
            }
            (LogPart::VerticalBottom, Depth::Submerged) => {
                METATILE_PACIFIDLOG_SUBMERGED_VERTICAL_BOTTOM
            }
            (LogPart::HorizontalLeft, Depth::Floating) => {
                METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_LEFT
            }
            (LogPart::HorizontalLeft, Depth::HalfSubmerged) => {
                METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_LEFT
            }
            (LogPart::HorizontalLeft, Depth::Submerged) => {
                METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_LEFT
            }
            (LogPart::HorizontalRight, Depth::Floating) => {
                METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_RIGHT
            }
            (LogPart::HorizontalRight, Depth::HalfSubmerged) => {
                METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_RIGHT
            }
            (LogPart::HorizontalRight, Depth::Submerged) => {
                METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_RIGHT
            }
        }
    }

    /// False when the player only moved deeper into the section it left.
    fn should_raise(self, new: TilePos, old: TilePos) -> bool {
        match self {
            LogPart::VerticalTop => new.y <= old.y,
            LogPart::VerticalBottom => new.y >= old.y,
            LogPart::HorizontalLeft => new.x <= old.x,
            LogPart::HorizontalRight => new.x >= old.x,
        }
    }

    /// False when the player came from the other half of the same section.
    fn should_sink(self, new: TilePos, old: TilePos) -> bool {
        match self {
            LogPart::VerticalTop => new.y >= old.y,
            LogPart::VerticalBottom => new.y <= old.y,
            LogPart::HorizontalLeft => new.x >= old.x,
            LogPart::HorizontalRight => new.x <= old.x,
        }
    }
}

fn set_section(frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>, pos: TilePos, depth: Depth) {
    let Some(part) = LogPart::from_behavior(tiles.behavior_at(frame.map, pos)) else {
        return;
    };
    for (dx, dy, tile_part) in part.section() {
        tiles.set_metatile(frame.map, pos.offset(dx, dy), tile_part.metatile(depth));
    }
}

impl PacifidlogBridge {
    pub(super) fn step(&mut self, frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>) {
        match self.phase {
            PacifidlogPhase::Init => {
                self.prev = frame.dest;
                set_section(frame, tiles, frame.dest, Depth::Submerged);
                self.phase = PacifidlogPhase::Tracking;
            }
            PacifidlogPhase::Tracking => {
                if frame.dest == self.prev {
                    return;
                }
                let old = self.prev;
                self.prev = frame.dest;

                let raise = LogPart::from_behavior(tiles.behavior_at(frame.map, old))
                    .map(|part| part.should_raise(frame.dest, old))
                    .unwrap_or(false);
                let sink = LogPart::from_behavior(tiles.behavior_at(frame.map, frame.dest))
                    .map(|part| part.should_sink(frame.dest, old))
                    .unwrap_or(false);
                if raise {
                    set_section(frame, tiles, old, Depth::HalfSubmerged);
                }
                if sink {
                    set_section(frame, tiles, frame.dest, Depth::HalfSubmerged);
                }
                if raise || sink {
                    self.to_raise = raise.then_some(old);
                    self.delay = SETTLE_FRAMES;
                    self.phase = PacifidlogPhase::Settling;
                }
            }
            PacifidlogPhase::Settling => {
                self.delay = self.delay.saturating_sub(1);
                if self.delay > 0 {
                    return;
                }
                set_section(frame, tiles, frame.dest, Depth::Submerged);
                if let Some(pos) = self.to_raise.take() {
                    set_section(frame, tiles, pos, Depth::Floating);
                }
                self.phase = PacifidlogPhase::Tracking;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{tick, GridWorld};
    use super::super::{StepCallbackId, StepCallbackManager};
    use super::*;
    use crate::state::EventState;

    fn horizontal_log() -> GridWorld {
        GridWorld::default()
            .tile(10, 5, MB_PACIFIDLOG_HORIZONTAL_LOG_LEFT, METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_LEFT)
            .tile(11, 5, MB_PACIFIDLOG_HORIZONTAL_LOG_RIGHT, METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_RIGHT)
    }

    fn pacifidlog_manager() -> StepCallbackManager {
        let mut manager = StepCallbackManager::new();
        manager.set_callback(StepCallbackId::PacifidlogBridge);
        manager
    }

    #[test]
    fn log_sinks_then_floats_after_settle_delays() {
        let mut manager = pacifidlog_manager();
        let mut state = EventState::new();
        let mut world = horizontal_log();

        tick(&mut manager, &mut state, &mut world, 0, 0);
        tick(&mut manager, &mut state, &mut world, 10, 5);
        assert_eq!(world.metatile(10, 5), Some(METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_LEFT));
        assert_eq!(world.metatile(11, 5), Some(METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_RIGHT));

        for _ in 0..7 {
            tick(&mut manager, &mut state, &mut world, 10, 5);
        }
        assert_eq!(world.metatile(10, 5), Some(METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_LEFT));
        tick(&mut manager, &mut state, &mut world, 10, 5);
        assert_eq!(world.metatile(10, 5), Some(METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_LEFT));
        assert_eq!(world.metatile(11, 5), Some(METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_RIGHT));

        tick(&mut manager, &mut state, &mut world, 11, 5);
        assert_eq!(manager.debug_state().pacifidlog.phase, PacifidlogPhase::Tracking);
        tick(&mut manager, &mut state, &mut world, 12, 5);
        assert_eq!(world.metatile(10, 5), Some(METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_LEFT));
        assert_eq!(world.metatile(11, 5), Some(METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_RIGHT));

        for _ in 0..8 {
            tick(&mut manager, &mut state, &mut world, 12, 5);
        }
        assert_eq!(world.metatile(10, 5), Some(METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_LEFT));
        assert_eq!(world.metatile(11, 5), Some(METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_RIGHT));
        assert_eq!(manager.debug_state().pacifidlog.to_raise, None);
    }

    #[test]
    fn starting_on_a_log_submerges_it_immediately() {
        let mut manager = pacifidlog_manager();
        let mut state = EventState::new();
        let mut world = GridWorld::default()
            .tile(3, 3, MB_PACIFIDLOG_VERTICAL_LOG_TOP, METATILE_PACIFIDLOG_FLOATING_VERTICAL_TOP)
            .tile(3, 4, MB_PACIFIDLOG_VERTICAL_LOG_BOTTOM, METATILE_PACIFIDLOG_FLOATING_VERTICAL_BOTTOM);

        tick(&mut manager, &mut state, &mut world, 3, 4);
        assert_eq!(world.metatile(3, 3), Some(METATILE_PACIFIDLOG_SUBMERGED_VERTICAL_TOP));
        assert_eq!(world.metatile(3, 4), Some(METATILE_PACIFIDLOG_SUBMERGED_VERTICAL_BOTTOM));
        assert_eq!(world.invalidations, 1);
    }

    #[test]
    fn movement_during_settle_keeps_a_single_target() {
        let mut manager = pacifidlog_manager();
        let mut state = EventState::new();
        let mut world = horizontal_log();

        tick(&mut manager, &mut state, &mut world, 9, 5);
        tick(&mut manager, &mut state, &mut world, 10, 5);
        let writes_after_entry = world.writes.len();
        tick(&mut manager, &mut state, &mut world, 9, 5);
        tick(&mut manager, &mut state, &mut world, 10, 5);
        tick(&mut manager, &mut state, &mut world, 11, 5);

        let snapshot = manager.debug_state().pacifidlog;
        assert_eq!(snapshot.phase, PacifidlogPhase::Settling);
        assert_eq!(snapshot.to_raise, None);
        assert_eq!(snapshot.delay, 5);
        assert_eq!(world.writes.len(), writes_after_entry);

        for _ in 0..5 {
            tick(&mut manager, &mut state, &mut world, 11, 5);
        }
        assert_eq!(world.metatile(10, 5), Some(METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_LEFT));
        assert_eq!(manager.debug_state().pacifidlog.phase, PacifidlogPhase::Tracking);
    }
}
