use serde::Serialize;

use super::tiles::{
    METATILE_MUDDY_SLOPE_FRAME0, METATILE_MUDDY_SLOPE_FRAME1, METATILE_MUDDY_SLOPE_FRAME2,
    METATILE_MUDDY_SLOPE_FRAME3, MB_MUDDY_SLOPE,
};
use super::{StepFrame, TileBatch};
use crate::host::TilePos;

const SLOPE_FRAMES: u8 = 32;
const MAX_SLOPE_ANIMATIONS: usize = 4;
/// Indexed by `remaining / 8`.
const SLOPE_CYCLE: [u16; 4] = [
    METATILE_MUDDY_SLOPE_FRAME0,
    METATILE_MUDDY_SLOPE_FRAME3,
    METATILE_MUDDY_SLOPE_FRAME2,
    METATILE_MUDDY_SLOPE_FRAME1,
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct MuddySlope {
    pub started: bool,
    pub map: String,
    pub prev: TilePos,
    pub animations: Vec<SlopeAnimation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlopeAnimation {
    pub map: String,
    pub pos: TilePos,
    pub remaining: u8,
}

impl MuddySlope {
    pub(super) fn step(&mut self, frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>) {
        if !self.started || self.map != frame.map {
            self.started = true;
            self.map = frame.map.to_string();
            self.prev = frame.dest;
        } else if self.prev != frame.dest {
            self.prev = frame.dest;
            if tiles.behavior_at(frame.map, frame.dest) == Some(MB_MUDDY_SLOPE) {
                if self.animations.len() < MAX_SLOPE_ANIMATIONS {
                    self.animations.push(SlopeAnimation {
                        map: frame.map.to_string(),
                        pos: frame.dest,
                        remaining: SLOPE_FRAMES,
                    });
                } else {
                    log::debug!(
                        "muddy_slope.drop ({}, {}): {} animations running",
                        frame.dest.x,
                        frame.dest.y,
                        MAX_SLOPE_ANIMATIONS
                    );
                }
            }
        }

        self.animations.retain_mut(|animation| {
            if animation.map != frame.map {
                return false;
            }
            animation.remaining = animation.remaining.saturating_sub(1);
            let metatile = if animation.remaining == 0 {
                METATILE_MUDDY_SLOPE_FRAME0
            } else {
                SLOPE_CYCLE[usize::from(animation.remaining / 8)]
            };
            tiles.set_metatile(frame.map, animation.pos, metatile);
            animation.remaining > 0
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{tick, tick_with, GridWorld};
    use super::super::StepCallbackManager;
    use super::*;
    use crate::state::EventState;

    #[test]
    fn slope_cycles_through_frames_and_rests() {
        let mut manager = StepCallbackManager::new();
        let mut state = EventState::new();
        let mut world = GridWorld::default().tile(2, 2, MB_MUDDY_SLOPE, METATILE_MUDDY_SLOPE_FRAME0);

        tick(&mut manager, &mut state, &mut world, 2, 3);
        let mut seen = Vec::new();
        tick(&mut manager, &mut state, &mut world, 2, 2);
        seen.push(world.metatile(2, 2));
        for _ in 0..31 {
            tick(&mut manager, &mut state, &mut world, 2, 2);
            if seen.last() != Some(&world.metatile(2, 2)) {
                seen.push(world.metatile(2, 2));
            }
        }

        assert_eq!(
            seen,
            vec![
                Some(METATILE_MUDDY_SLOPE_FRAME1),
                Some(METATILE_MUDDY_SLOPE_FRAME2),
                Some(METATILE_MUDDY_SLOPE_FRAME3),
                Some(METATILE_MUDDY_SLOPE_FRAME0),
            ]
        );
        assert!(manager.debug_state().muddy_slope.animations.is_empty());
        assert_eq!(world.invalidations, 4);
    }

    #[test]
    fn at_most_four_slopes_animate_at_once() {
        let mut manager = StepCallbackManager::new();
        let mut state = EventState::new();
        let mut world = GridWorld::default();
        for y in 1..=5 {
            world = world.tile(0, y, MB_MUDDY_SLOPE, METATILE_MUDDY_SLOPE_FRAME0);
        }

        tick(&mut manager, &mut state, &mut world, 0, 0);
        for y in 1..=5 {
            tick(&mut manager, &mut state, &mut world, 0, y);
        }
        let animations = manager.debug_state().muddy_slope.animations;
        assert_eq!(animations.len(), 4);
        assert!(animations.iter().all(|animation| animation.pos.y <= 4));
    }

    #[test]
    fn changing_maps_rebases_without_triggering() {
        let mut manager = StepCallbackManager::new();
        let mut state = EventState::new();
        let mut world = GridWorld::default().tile(4, 4, MB_MUDDY_SLOPE, METATILE_MUDDY_SLOPE_FRAME0);

        tick(&mut manager, &mut state, &mut world, 0, 0);
        tick_with(&mut manager, &mut state, &mut world, "MAP_OTHER", 4, 4, 0, false);
        assert!(manager.debug_state().muddy_slope.animations.is_empty());
        assert_eq!(manager.debug_state().muddy_slope.map, "MAP_OTHER");
    }
}
