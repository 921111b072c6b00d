//! Per-frame step callbacks: one selectable tile automaton plus the
//! always-on muddy slope task, all advanced by a single `update` call.

mod ash;
mod cracked_floor;
mod fortree;
mod ice;
mod muddy_slope;
mod pacifidlog;
pub mod tiles;

use serde::{Deserialize, Serialize};

use crate::host::{FieldEffect, FieldWorld, TilePos};
use crate::state::EventState;

pub use ash::{AshEntry, AshGrass, ASH_GATHER_CAP, ITEM_SOOT_SACK, VAR_ASH_GATHER_COUNT};
pub use cracked_floor::{CrackSlot, CrackedFloor};
pub use fortree::{BridgeRestore, FortreeBridge, FortreePhase};
pub use ice::{IcePhase, SootopolisIce, VAR_ICE_STEP_COUNT};
pub use muddy_slope::{MuddySlope, SlopeAnimation};
pub use pacifidlog::{PacifidlogBridge, PacifidlogPhase};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepCallbackId {
    #[default]
    None,
    Ash,
    FortreeBridge,
    PacifidlogBridge,
    SootopolisIce,
    Truck,
    SecretBase,
    CrackedFloor,
}

const STEP_CALLBACK_NAMES: [(StepCallbackId, &str); 8] = [
    (StepCallbackId::None, "STEP_CB_DUMMY"),
    (StepCallbackId::Ash, "STEP_CB_ASH"),
    (StepCallbackId::FortreeBridge, "STEP_CB_FORTREE_BRIDGE"),
    (StepCallbackId::PacifidlogBridge, "STEP_CB_PACIFIDLOG_BRIDGE"),
    (StepCallbackId::SootopolisIce, "STEP_CB_SOOTOPOLIS_ICE"),
    (StepCallbackId::Truck, "STEP_CB_TRUCK"),
    (StepCallbackId::SecretBase, "STEP_CB_SECRET_BASE"),
    (StepCallbackId::CrackedFloor, "STEP_CB_CRACKED_FLOOR"),
];

impl StepCallbackId {
    pub fn from_raw(raw: i32) -> Option<StepCallbackId> {
        usize::try_from(raw)
            .ok()
            .and_then(|index| STEP_CALLBACK_NAMES.get(index))
            .map(|(id, _)| *id)
    }

    pub fn raw(self) -> i32 {
        STEP_CALLBACK_NAMES
            .iter()
            .position(|(id, _)| *id == self)
            .map(|index| index as i32)
            .unwrap_or(0)
    }

    pub fn from_name(name: &str) -> Option<StepCallbackId> {
        STEP_CALLBACK_NAMES
            .iter()
            .find(|(_, label)| *label == name)
            .map(|(id, _)| *id)
    }

    pub fn name(self) -> &'static str {
        STEP_CALLBACK_NAMES[self.raw() as usize].1
    }
}

/// Everything one frame of step callbacks reads or writes.
pub struct StepContext<'a> {
    pub map: &'a str,
    /// Tile the player is moving toward (or standing on when idle).
    pub dest: TilePos,
    pub elevation: u8,
    pub at_fastest_speed: bool,
    pub state: &'a mut EventState,
    pub world: &'a mut dyn FieldWorld,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StepFrame<'a> {
    pub map: &'a str,
    pub dest: TilePos,
    pub elevation: u8,
    pub at_fastest_speed: bool,
}

/// Tile access for one update; counts effective writes so the view is
/// invalidated once at the end.
pub(crate) struct TileBatch<'w> {
    world: &'w mut dyn FieldWorld,
    writes: usize,
}

impl<'w> TileBatch<'w> {
    fn new(world: &'w mut dyn FieldWorld) -> Self {
        Self { world, writes: 0 }
    }

    pub fn behavior_at(&self, map: &str, pos: TilePos) -> Option<u16> {
        self.world.behavior_at(map, pos.x, pos.y)
    }

    pub fn metatile_at(&self, map: &str, pos: TilePos) -> Option<u16> {
        self.world.metatile_at(map, pos.x, pos.y)
    }

    pub fn set_metatile(&mut self, map: &str, pos: TilePos, metatile: u16) {
        if self.metatile_at(map, pos) == Some(metatile) {
            return;
        }
        self.world.set_metatile(map, pos.x, pos.y, metatile);
        self.writes += 1;
    }

    pub fn spawn_field_effect(&mut self, effect: FieldEffect) {
        self.world.spawn_field_effect(effect);
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.world.has_item(item)
    }

    fn finish(self) -> usize {
        if self.writes > 0 {
            self.world.invalidate_view();
        }
        self.writes
    }
}

#[derive(Debug, Default)]
pub struct StepCallbackManager {
    selected: StepCallbackId,
    ash: AshGrass,
    fortree: FortreeBridge,
    pacifidlog: PacifidlogBridge,
    ice: SootopolisIce,
    cracked_floor: CrackedFloor,
    muddy_slope: MuddySlope,
}

/// Diagnostic copy of every automaton field.
#[derive(Debug, Clone, Serialize)]
pub struct StepCallbackSnapshot {
    pub selected: StepCallbackId,
    pub ash: AshGrass,
    pub fortree: FortreeBridge,
    pub pacifidlog: PacifidlogBridge,
    pub ice: SootopolisIce,
    pub cracked_floor: CrackedFloor,
    pub muddy_slope: MuddySlope,
}

impl StepCallbackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> StepCallbackId {
        self.selected
    }

    /// Activates `id`, discarding all automaton state.
    pub fn set_callback(&mut self, id: StepCallbackId) {
        log::debug!("step_callback.select {}", id.name());
        self.clear_automata();
        self.selected = id;
    }

    pub fn reset(&mut self) {
        self.clear_automata();
        self.selected = StepCallbackId::None;
    }

    fn clear_automata(&mut self) {
        self.ash = AshGrass::default();
        self.fortree = FortreeBridge::default();
        self.pacifidlog = PacifidlogBridge::default();
        self.ice = SootopolisIce::default();
        self.cracked_floor = CrackedFloor::default();
        self.muddy_slope = MuddySlope::default();
    }

    /// Advances every automaton by one frame.
    pub fn update(&mut self, ctx: StepContext<'_>) {
        let StepContext {
            map,
            dest,
            elevation,
            at_fastest_speed,
            state,
            world,
        } = ctx;
        let frame = StepFrame {
            map,
            dest,
            elevation,
            at_fastest_speed,
        };
        let mut tiles = TileBatch::new(world);

        self.fortree.tick_restores(&frame, &mut tiles);
        match self.selected {
            StepCallbackId::Ash => self.ash.step(&frame, state, &mut tiles),
            StepCallbackId::FortreeBridge => self.fortree.step(&frame, &mut tiles),
            StepCallbackId::PacifidlogBridge => self.pacifidlog.step(&frame, &mut tiles),
            StepCallbackId::SootopolisIce => self.ice.step(&frame, state, &mut tiles),
            StepCallbackId::CrackedFloor => self.cracked_floor.step(&frame, state, &mut tiles),
            StepCallbackId::None | StepCallbackId::Truck | StepCallbackId::SecretBase => {}
        }
        self.ash.tick(&frame, &mut tiles);
        self.muddy_slope.step(&frame, &mut tiles);

        let writes = tiles.finish();
        if writes > 0 {
            log::trace!("step_callback.update {map} wrote {writes} tile(s)");
        }
    }

    /// Rewrites the ice puzzle tiles recorded as cracked in the row
    /// variables. Returns the number of tiles restored.
    pub fn restore_cracked_ice<W: FieldWorld + ?Sized>(
        &self,
        map: &str,
        state: &EventState,
        world: &mut W,
    ) -> usize {
        let cracked = ice::cracked_tiles(state);
        for pos in &cracked {
            world.set_metatile(map, pos.x, pos.y, tiles::METATILE_SOOTOPOLIS_GYM_ICE_CRACKED);
        }
        if !cracked.is_empty() {
            world.invalidate_view();
        }
        cracked.len()
    }

    pub fn debug_state(&self) -> StepCallbackSnapshot {
        StepCallbackSnapshot {
            selected: self.selected,
            ash: self.ash.clone(),
            fortree: self.fortree.clone(),
            pacifidlog: self.pacifidlog.clone(),
            ice: self.ice.clone(),
            cracked_floor: self.cracked_floor.clone(),
            muddy_slope: self.muddy_slope.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use super::*;

    /// In-memory grid keyed by coordinate, recording writes and
    /// invalidations.
    #[derive(Debug, Default)]
    pub struct GridWorld {
        pub behaviors: BTreeMap<(i32, i32), u16>,
        pub metatiles: BTreeMap<(i32, i32), u16>,
        pub writes: Vec<(i32, i32, u16)>,
        pub effects: Vec<FieldEffect>,
        pub invalidations: usize,
        pub items: Vec<String>,
    }

    impl GridWorld {
        pub fn tile(mut self, x: i32, y: i32, behavior: u16, metatile: u16) -> Self {
            self.behaviors.insert((x, y), behavior);
            self.metatiles.insert((x, y), metatile);
            self
        }

        pub fn metatile(&self, x: i32, y: i32) -> Option<u16> {
            self.metatiles.get(&(x, y)).copied()
        }
    }

    impl FieldWorld for GridWorld {
        fn behavior_at(&self, _map: &str, x: i32, y: i32) -> Option<u16> {
            Some(self.behaviors.get(&(x, y)).copied().unwrap_or(0))
        }

        fn metatile_at(&self, _map: &str, x: i32, y: i32) -> Option<u16> {
            self.metatiles.get(&(x, y)).copied()
        }

        fn set_metatile(&mut self, _map: &str, x: i32, y: i32, metatile: u16) {
            self.metatiles.insert((x, y), metatile);
            self.writes.push((x, y, metatile));
        }

        fn invalidate_view(&mut self) {
            self.invalidations += 1;
        }

        fn spawn_field_effect(&mut self, effect: FieldEffect) {
            self.effects.push(effect);
        }

        fn has_item(&self, item: &str) -> bool {
            self.items.iter().any(|held| held == item)
        }
    }

    pub fn tick(
        manager: &mut StepCallbackManager,
        state: &mut EventState,
        world: &mut GridWorld,
        x: i32,
        y: i32,
    ) {
        tick_with(manager, state, world, "MAP_TEST", x, y, 0, false);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tick_with(
        manager: &mut StepCallbackManager,
        state: &mut EventState,
        world: &mut GridWorld,
        map: &str,
        x: i32,
        y: i32,
        elevation: u8,
        at_fastest_speed: bool,
    ) {
        manager.update(StepContext {
            map,
            dest: TilePos::new(x, y),
            elevation,
            at_fastest_speed,
            state,
            world,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{tick, GridWorld};
    use super::*;

    #[test]
    fn selector_ids_map_to_names() {
        assert_eq!(StepCallbackId::from_raw(4), Some(StepCallbackId::SootopolisIce));
        assert_eq!(StepCallbackId::from_raw(8), None);
        assert_eq!(StepCallbackId::from_raw(-1), None);
        assert_eq!(
            StepCallbackId::from_name("STEP_CB_CRACKED_FLOOR"),
            Some(StepCallbackId::CrackedFloor)
        );
        assert_eq!(StepCallbackId::Ash.raw(), 1);
        assert_eq!(StepCallbackId::None.name(), "STEP_CB_DUMMY");
    }

    #[test]
    fn switching_selector_discards_pending_work() {
        let mut manager = StepCallbackManager::new();
        let mut state = EventState::new();
        let mut world = GridWorld::default().tile(5, 5, tiles::MB_ASH_GRASS, 0x20A);

        manager.set_callback(StepCallbackId::Ash);
        tick(&mut manager, &mut state, &mut world, 0, 0);
        tick(&mut manager, &mut state, &mut world, 5, 5);
        assert_eq!(manager.debug_state().ash.pending.len(), 1);

        manager.set_callback(StepCallbackId::Ash);
        assert!(manager.debug_state().ash.pending.is_empty());
        for _ in 0..6 {
            tick(&mut manager, &mut state, &mut world, 5, 5);
        }
        assert!(world.writes.is_empty());
    }

    #[test]
    fn inert_selectors_only_run_the_slope_task() {
        let mut manager = StepCallbackManager::new();
        let mut state = EventState::new();
        let mut world = GridWorld::default()
            .tile(1, 0, tiles::MB_ASH_GRASS, 0x20A)
            .tile(2, 0, tiles::MB_THIN_ICE, 0x001);

        for id in [StepCallbackId::Truck, StepCallbackId::SecretBase, StepCallbackId::None] {
            manager.set_callback(id);
            for x in 0..3 {
                for _ in 0..5 {
                    tick(&mut manager, &mut state, &mut world, x, 0);
                }
            }
        }
        assert!(world.writes.is_empty());
        assert_eq!(world.invalidations, 0);
    }

    #[test]
    fn restore_cracked_ice_reads_row_bitmasks() {
        let manager = StepCallbackManager::new();
        let mut state = EventState::new();
        state.set_var("VAR_TEMP_1", 0b101);
        state.set_var("VAR_TEMP_A", 1 << 10);
        let mut world = GridWorld::default();

        let restored = manager.restore_cracked_ice("MAP_TEST", &state, &mut world);
        assert_eq!(restored, 3);
        assert_eq!(world.metatile(3, 6), Some(tiles::METATILE_SOOTOPOLIS_GYM_ICE_CRACKED));
        assert_eq!(world.metatile(5, 6), Some(tiles::METATILE_SOOTOPOLIS_GYM_ICE_CRACKED));
        assert_eq!(world.metatile(13, 19), Some(tiles::METATILE_SOOTOPOLIS_GYM_ICE_CRACKED));
        assert_eq!(world.metatile(4, 6), None);
        assert_eq!(world.invalidations, 1);
    }

    #[test]
    fn debug_state_serializes() {
        let mut manager = StepCallbackManager::new();
        manager.set_callback(StepCallbackId::FortreeBridge);
        let json = serde_json::to_value(manager.debug_state()).expect("snapshot serializes");
        assert_eq!(json["selected"], "FortreeBridge");
        assert_eq!(json["fortree"]["phase"], "Idle");
    }
}
