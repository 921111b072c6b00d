use serde::Serialize;

use super::tiles::{
    METATILE_FALLARBOR_ASH_GRASS, METATILE_FALLARBOR_NORMAL_GRASS,
    METATILE_LAVARIDGE_NORMAL_GRASS, MB_ASH_GRASS,
};
use super::{StepFrame, TileBatch};
use crate::host::{FieldEffect, TilePos};
use crate::state::EventState;

pub const VAR_ASH_GATHER_COUNT: &str = "VAR_ASH_GATHER_COUNT";
pub const ITEM_SOOT_SACK: &str = "ITEM_SOOT_SACK";
pub const ASH_GATHER_CAP: i32 = 9999;

const ASH_EFFECT_DELAY: u8 = 4;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AshGrass {
    pub prev: Option<TilePos>,
    pub pending: Vec<AshEntry>,
}

/// Grass swap waiting on its field effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AshEntry {
    pub map: String,
    pub pos: TilePos,
    pub replacement: u16,
    pub delay: u8,
}

impl AshGrass {
    pub(super) fn step(
        &mut self,
        frame: &StepFrame<'_>,
        state: &mut EventState,
        tiles: &mut TileBatch<'_>,
    ) {
        if self.prev == Some(frame.dest) {
            return;
        }
        self.prev = Some(frame.dest);
        if tiles.behavior_at(frame.map, frame.dest) != Some(MB_ASH_GRASS) {
            return;
        }

        let replacement = if tiles.metatile_at(frame.map, frame.dest)
            == Some(METATILE_FALLARBOR_ASH_GRASS)
        {
            METATILE_FALLARBOR_NORMAL_GRASS
        } else {
            METATILE_LAVARIDGE_NORMAL_GRASS
        };
        self.pending.push(AshEntry {
            map: frame.map.to_string(),
            pos: frame.dest,
            replacement,
            delay: ASH_EFFECT_DELAY,
        });

        if tiles.has_item(ITEM_SOOT_SACK) {
            let gathered = state.var_number(VAR_ASH_GATHER_COUNT);
            if gathered < ASH_GATHER_CAP {
                state.set_var(VAR_ASH_GATHER_COUNT, gathered + 1);
            }
        }
    }

    /// Counts pending effects down; entries left behind on another map are
    /// discarded unfired.
    pub(super) fn tick(&mut self, frame: &StepFrame<'_>, tiles: &mut TileBatch<'_>) {
        self.pending.retain_mut(|entry| {
            if entry.map != frame.map {
                log::debug!("ash.drop {} ({}, {})", entry.map, entry.pos.x, entry.pos.y);
                return false;
            }
            entry.delay = entry.delay.saturating_sub(1);
            if entry.delay > 0 {
                return true;
            }
            tiles.set_metatile(frame.map, entry.pos, entry.replacement);
            tiles.spawn_field_effect(FieldEffect::Ash {
                map: entry.map.clone(),
                pos: entry.pos,
                metatile: entry.replacement,
            });
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{tick, tick_with, GridWorld};
    use super::super::{StepCallbackId, StepCallbackManager};
    use super::*;

    fn ash_manager() -> StepCallbackManager {
        let mut manager = StepCallbackManager::new();
        manager.set_callback(StepCallbackId::Ash);
        manager
    }

    #[test]
    fn ash_swap_fires_once_on_fourth_tick() {
        let mut manager = ash_manager();
        let mut state = EventState::new();
        let mut world = GridWorld::default().tile(5, 5, MB_ASH_GRASS, METATILE_FALLARBOR_ASH_GRASS);

        tick(&mut manager, &mut state, &mut world, 0, 0);
        tick(&mut manager, &mut state, &mut world, 0, 0);
        for frame in 1..=4 {
            tick(&mut manager, &mut state, &mut world, 5, 5);
            if frame < 4 {
                assert!(world.writes.is_empty(), "no swap before frame 4 (frame {frame})");
                assert!(world.effects.is_empty());
            }
        }

        assert_eq!(world.writes, vec![(5, 5, METATILE_FALLARBOR_NORMAL_GRASS)]);
        assert_eq!(
            world.effects,
            vec![FieldEffect::Ash {
                map: "MAP_TEST".to_string(),
                pos: TilePos::new(5, 5),
                metatile: METATILE_FALLARBOR_NORMAL_GRASS,
            }]
        );
        assert_eq!(world.invalidations, 1);

        for _ in 0..8 {
            tick(&mut manager, &mut state, &mut world, 5, 5);
        }
        assert_eq!(world.writes.len(), 1);
        assert_eq!(world.invalidations, 1);
    }

    #[test]
    fn non_fallarbor_ash_uses_lavaridge_grass() {
        let mut manager = ash_manager();
        let mut state = EventState::new();
        let mut world = GridWorld::default().tile(2, 0, MB_ASH_GRASS, 0x3A0);

        tick(&mut manager, &mut state, &mut world, 0, 0);
        for _ in 0..4 {
            tick(&mut manager, &mut state, &mut world, 2, 0);
        }
        assert_eq!(world.metatile(2, 0), Some(METATILE_LAVARIDGE_NORMAL_GRASS));
    }

    #[test]
    fn leaving_the_map_drops_pending_swaps() {
        let mut manager = ash_manager();
        let mut state = EventState::new();
        let mut world = GridWorld::default().tile(1, 1, MB_ASH_GRASS, METATILE_FALLARBOR_ASH_GRASS);

        tick(&mut manager, &mut state, &mut world, 0, 0);
        tick(&mut manager, &mut state, &mut world, 1, 1);
        tick_with(&mut manager, &mut state, &mut world, "MAP_OTHER", 1, 1, 0, false);
        for _ in 0..6 {
            tick(&mut manager, &mut state, &mut world, 1, 1);
        }
        assert!(world.writes.is_empty());
        assert!(world.effects.is_empty());
    }

    #[test]
    fn gathering_needs_the_sack_and_stops_at_cap() {
        let mut manager = ash_manager();
        let mut state = EventState::new();
        let mut world = GridWorld::default()
            .tile(1, 0, MB_ASH_GRASS, METATILE_FALLARBOR_ASH_GRASS)
            .tile(2, 0, MB_ASH_GRASS, METATILE_FALLARBOR_ASH_GRASS);

        tick(&mut manager, &mut state, &mut world, 1, 0);
        tick(&mut manager, &mut state, &mut world, 2, 0);
        assert_eq!(state.var_number(VAR_ASH_GATHER_COUNT), 0);

        world.items.push(ITEM_SOOT_SACK.to_string());
        state.set_var(VAR_ASH_GATHER_COUNT, ASH_GATHER_CAP - 1);
        world.metatiles.insert((1, 0), METATILE_FALLARBOR_ASH_GRASS);
        world.metatiles.insert((2, 0), METATILE_FALLARBOR_ASH_GRASS);
        for _ in 0..3 {
            tick(&mut manager, &mut state, &mut world, 1, 0);
            tick(&mut manager, &mut state, &mut world, 2, 0);
        }
        assert_eq!(state.var_number(VAR_ASH_GATHER_COUNT), ASH_GATHER_CAP);
    }
}
