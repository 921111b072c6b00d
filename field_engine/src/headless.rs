//! In-memory field host: tiles from loaded layouts, instant movement, and a
//! log of every externally visible call.

use std::collections::{BTreeMap, BTreeSet};

use field_formats::MapLayout;
use serde::Serialize;

use crate::host::{
    DoorAction, Direction, FieldEffect, FieldWorld, MovementTicket, ScriptHost, TilePos,
    WarpRequest,
};
use crate::script::MovementStep;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum FieldEvent {
    #[serde(rename = "message.show")]
    MessageShown { text: String },
    #[serde(rename = "message.yes_no")]
    YesNoShown { text: Option<String> },
    #[serde(rename = "message.choice")]
    ChoiceShown { menu: i32, cancelable: bool },
    #[serde(rename = "message.close")]
    MessageClosed,
    #[serde(rename = "tile.write")]
    TileWritten {
        map: String,
        x: i32,
        y: i32,
        metatile: u16,
    },
    #[serde(rename = "view.invalidate")]
    ViewInvalidated,
    #[serde(rename = "effect.spawn")]
    EffectSpawned { effect: FieldEffect },
    #[serde(rename = "movement.start")]
    MovementStarted {
        object: String,
        steps: usize,
        frames: u32,
        ticket: u32,
    },
    #[serde(rename = "object.visibility")]
    ObjectVisibility {
        map: String,
        local_id: String,
        visible: bool,
        persistent: bool,
    },
    #[serde(rename = "object.position")]
    ObjectPositioned {
        map: String,
        local_id: String,
        x: i32,
        y: i32,
        persistent: bool,
    },
    #[serde(rename = "object.face")]
    ObjectFaced {
        map: String,
        local_id: String,
        direction: Direction,
    },
    #[serde(rename = "object.movement_type")]
    MovementTypeSet {
        map: String,
        local_id: String,
        movement_type: String,
    },
    #[serde(rename = "player.visibility")]
    PlayerVisibility { visible: bool },
    #[serde(rename = "warp.queue")]
    WarpQueued { warp: WarpRequest },
    #[serde(rename = "warp.dynamic")]
    DynamicWarpSet { map: String, x: i32, y: i32 },
    #[serde(rename = "map.enter")]
    MapEntered { map: String, x: i32, y: i32 },
    #[serde(rename = "door.animate")]
    DoorAnimated {
        map: String,
        x: i32,
        y: i32,
        action: DoorAction,
    },
    #[serde(rename = "screen.fade")]
    ScreenFaded { mode: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerState {
    pub name: String,
    pub gender: i32,
    pub pos: TilePos,
    pub facing: Direction,
    /// Set while a step toward this tile is in progress.
    pub destination: Option<TilePos>,
    pub elevation: u8,
    pub visible: bool,
    pub at_fastest_speed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectState {
    pub pos: TilePos,
    pub facing: Direction,
    pub visible: bool,
    pub movement_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HeadlessField {
    layouts: BTreeMap<String, MapLayout>,
    current_map: String,
    player: PlayerState,
    objects: BTreeMap<(String, String), ObjectState>,
    items: BTreeSet<String>,
    talker: Option<String>,
    events: Vec<FieldEvent>,
    invalidations: usize,
    next_ticket: u32,
    finished: Vec<MovementTicket>,
    queued_warp: Option<WarpRequest>,
    dynamic_warp: Option<(String, TilePos)>,
    door_animating: bool,
}

impl HeadlessField {
    pub fn new(player_name: &str, player_gender: i32) -> Self {
        HeadlessField {
            layouts: BTreeMap::new(),
            current_map: String::new(),
            player: PlayerState {
                name: player_name.to_string(),
                gender: player_gender,
                pos: TilePos::default(),
                facing: Direction::South,
                destination: None,
                elevation: 0,
                visible: true,
                at_fastest_speed: false,
            },
            objects: BTreeMap::new(),
            items: BTreeSet::new(),
            talker: None,
            events: Vec::new(),
            invalidations: 0,
            next_ticket: 0,
            finished: Vec::new(),
            queued_warp: None,
            dynamic_warp: None,
            door_animating: false,
        }
    }

    /// Registers a layout and spawns its object placements.
    pub fn add_layout(&mut self, layout: MapLayout) {
        for placement in &layout.objects {
            self.objects.insert(
                (layout.id.clone(), placement.local_id.clone()),
                ObjectState {
                    pos: TilePos::new(placement.x, placement.y),
                    facing: Direction::South,
                    visible: placement.visible,
                    movement_type: None,
                },
            );
        }
        self.layouts.insert(layout.id.clone(), layout);
    }

    pub fn layout(&self, map: &str) -> Option<&MapLayout> {
        self.layouts.get(map)
    }

    pub fn has_layout(&self, map: &str) -> bool {
        self.layouts.contains_key(map)
    }

    /// Places the player on `map` without recording an event.
    pub fn enter_map(&mut self, map: &str, pos: TilePos) {
        if !self.layouts.contains_key(map) {
            log::warn!("headless.enter {map}: no layout loaded, tiles read as empty");
        }
        self.current_map = map.to_string();
        self.player.pos = pos;
        self.player.destination = None;
    }

    pub fn current_map_id(&self) -> &str {
        &self.current_map
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    pub fn object(&self, map: &str, local_id: &str) -> Option<&ObjectState> {
        self.objects.get(&(map.to_string(), local_id.to_string()))
    }

    pub fn give_item(&mut self, item: &str) {
        self.items.insert(item.to_string());
    }

    /// Object the player is talking to, turned by `faceplayer`.
    pub fn set_talker(&mut self, local_id: Option<&str>) {
        self.talker = local_id.map(str::to_string);
    }

    pub fn events(&self) -> &[FieldEvent] {
        &self.events
    }

    pub fn record(&mut self, event: FieldEvent) {
        self.events.push(event);
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations
    }

    /// Tickets of movements that have completed since the last call, in
    /// issue order.
    pub fn take_finished_movements(&mut self) -> Vec<MovementTicket> {
        std::mem::take(&mut self.finished)
    }

    pub fn take_queued_warp(&mut self) -> Option<WarpRequest> {
        self.queued_warp.take()
    }

    pub fn dynamic_warp(&self) -> Option<(&str, TilePos)> {
        self.dynamic_warp
            .as_ref()
            .map(|(map, pos)| (map.as_str(), *pos))
    }

    pub fn take_door_animation(&mut self) -> bool {
        std::mem::replace(&mut self.door_animating, false)
    }

    fn issue_ticket(&mut self, object: &str, steps: &[MovementStep]) -> MovementTicket {
        self.next_ticket += 1;
        let ticket = MovementTicket(self.next_ticket);
        self.events.push(FieldEvent::MovementStarted {
            object: object.to_string(),
            steps: steps.len(),
            frames: crate::script::movement::total_frames(steps),
            ticket: ticket.0,
        });
        self.finished.push(ticket);
        ticket
    }
}

struct Body<'a> {
    pos: &'a mut TilePos,
    facing: &'a mut Direction,
    visible: &'a mut bool,
}

impl Body<'_> {
    fn apply(&mut self, steps: &[MovementStep], player: TilePos) {
        let original = *self.facing;
        for step in steps {
            match step {
                MovementStep::Travel { direction, .. } => {
                    *self.pos = self.pos.step(*direction, 1);
                    *self.facing = *direction;
                }
                MovementStep::Jump {
                    direction,
                    distance,
                } => {
                    *self.pos = self.pos.step(*direction, *distance);
                    *self.facing = *direction;
                }
                MovementStep::InPlace { direction, .. } | MovementStep::Face(direction) => {
                    *self.facing = *direction;
                }
                MovementStep::JumpInPlace {
                    direction,
                    then_face,
                } => *self.facing = then_face.unwrap_or(*direction),
                MovementStep::FacePlayer => *self.facing = facing_toward(*self.pos, player),
                MovementStep::FaceAwayFromPlayer => {
                    *self.facing = facing_toward(*self.pos, player).opposite();
                }
                MovementStep::FaceOriginalDirection => *self.facing = original,
                MovementStep::SetVisible(visible) => *self.visible = *visible,
                MovementStep::Animation { .. }
                | MovementStep::StateFlag(_)
                | MovementStep::Delay(_)
                | MovementStep::Unknown(_) => {}
            }
        }
    }
}

fn facing_toward(from: TilePos, to: TilePos) -> Direction {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    if dx == 0 && dy == 0 {
        Direction::None
    } else if dx.abs() >= dy.abs() {
        if dx > 0 { Direction::East } else { Direction::West }
    } else if dy > 0 {
        Direction::South
    } else {
        Direction::North
    }
}

impl FieldWorld for HeadlessField {
    fn behavior_at(&self, map: &str, x: i32, y: i32) -> Option<u16> {
        self.layouts.get(map)?.behavior_at(x, y)
    }

    fn metatile_at(&self, map: &str, x: i32, y: i32) -> Option<u16> {
        self.layouts.get(map)?.metatile_at(x, y)
    }

    fn set_metatile(&mut self, map: &str, x: i32, y: i32, metatile: u16) {
        let written = self
            .layouts
            .get_mut(map)
            .map(|layout| layout.set_metatile(x, y, metatile))
            .unwrap_or(false);
        if !written {
            log::warn!("tile.write {map} ({x}, {y}): outside any loaded layout");
            return;
        }
        self.events.push(FieldEvent::TileWritten {
            map: map.to_string(),
            x,
            y,
            metatile,
        });
    }

    fn invalidate_view(&mut self) {
        self.invalidations += 1;
        self.events.push(FieldEvent::ViewInvalidated);
    }

    fn spawn_field_effect(&mut self, effect: FieldEffect) {
        self.events.push(FieldEvent::EffectSpawned { effect });
    }

    fn has_item(&self, item: &str) -> bool {
        self.items.contains(item)
    }
}

impl ScriptHost for HeadlessField {
    fn current_map(&self) -> String {
        self.current_map.clone()
    }

    fn player_name(&self) -> String {
        self.player.name.clone()
    }

    fn player_gender(&self) -> i32 {
        self.player.gender
    }

    fn player_position(&self) -> TilePos {
        self.player.pos
    }

    fn player_destination(&self) -> Option<TilePos> {
        self.player.destination
    }

    fn is_player_idle(&self) -> bool {
        self.player.destination.is_none()
    }

    fn set_player_visible(&mut self, visible: bool) {
        self.player.visible = visible;
        self.events.push(FieldEvent::PlayerVisibility { visible });
    }

    fn show_message(&mut self, text: &str) {
        self.events.push(FieldEvent::MessageShown {
            text: text.to_string(),
        });
    }

    fn show_yes_no(&mut self, text: Option<&str>) {
        self.events.push(FieldEvent::YesNoShown {
            text: text.map(str::to_string),
        });
    }

    fn show_choice(&mut self, menu: i32, cancelable: bool) {
        self.events.push(FieldEvent::ChoiceShown { menu, cancelable });
    }

    fn close_message(&mut self) {
        self.events.push(FieldEvent::MessageClosed);
    }

    fn has_object(&self, map: &str, local_id: &str) -> bool {
        self.object(map, local_id).is_some()
    }

    fn object_position(&self, map: &str, local_id: &str) -> Option<TilePos> {
        self.object(map, local_id).map(|object| object.pos)
    }

    fn move_object(&mut self, map: &str, local_id: &str, steps: &[MovementStep]) -> MovementTicket {
        let player = self.player.pos;
        match self
            .objects
            .get_mut(&(map.to_string(), local_id.to_string()))
        {
            Some(object) => Body {
                pos: &mut object.pos,
                facing: &mut object.facing,
                visible: &mut object.visible,
            }
            .apply(steps, player),
            None => log::warn!("headless.move {local_id}: not placed on {map}"),
        }
        self.issue_ticket(local_id, steps)
    }

    fn move_player(&mut self, steps: &[MovementStep]) -> MovementTicket {
        let player = self.player.pos;
        Body {
            pos: &mut self.player.pos,
            facing: &mut self.player.facing,
            visible: &mut self.player.visible,
        }
        .apply(steps, player);
        self.issue_ticket(crate::script::PLAYER_OBJECT, steps)
    }

    fn set_object_visible(&mut self, map: &str, local_id: &str, visible: bool, persistent: bool) {
        if let Some(object) = self
            .objects
            .get_mut(&(map.to_string(), local_id.to_string()))
        {
            object.visible = visible;
        }
        self.events.push(FieldEvent::ObjectVisibility {
            map: map.to_string(),
            local_id: local_id.to_string(),
            visible,
            persistent,
        });
    }

    fn set_object_position(&mut self, map: &str, local_id: &str, pos: TilePos, persistent: bool) {
        if let Some(object) = self
            .objects
            .get_mut(&(map.to_string(), local_id.to_string()))
        {
            object.pos = pos;
        }
        self.events.push(FieldEvent::ObjectPositioned {
            map: map.to_string(),
            local_id: local_id.to_string(),
            x: pos.x,
            y: pos.y,
            persistent,
        });
    }

    fn face_object(&mut self, map: &str, local_id: &str, direction: Direction) {
        if let Some(object) = self
            .objects
            .get_mut(&(map.to_string(), local_id.to_string()))
        {
            object.facing = direction;
        }
        self.events.push(FieldEvent::ObjectFaced {
            map: map.to_string(),
            local_id: local_id.to_string(),
            direction,
        });
    }

    fn face_talker_toward_player(&mut self) {
        let Some(talker) = self.talker.clone() else {
            return;
        };
        let map = self.current_map.clone();
        let Some(object) = self.object(&map, &talker) else {
            return;
        };
        let direction = facing_toward(object.pos, self.player.pos);
        self.face_object(&map, &talker, direction);
    }

    fn set_object_movement_type(&mut self, map: &str, local_id: &str, movement_type: &str) {
        if let Some(object) = self
            .objects
            .get_mut(&(map.to_string(), local_id.to_string()))
        {
            object.movement_type = Some(movement_type.to_string());
        }
        self.events.push(FieldEvent::MovementTypeSet {
            map: map.to_string(),
            local_id: local_id.to_string(),
            movement_type: movement_type.to_string(),
        });
    }

    fn queue_warp(&mut self, warp: WarpRequest) {
        self.events.push(FieldEvent::WarpQueued { warp: warp.clone() });
        self.queued_warp = Some(warp);
    }

    fn set_dynamic_warp(&mut self, map: &str, pos: TilePos) {
        self.events.push(FieldEvent::DynamicWarpSet {
            map: map.to_string(),
            x: pos.x,
            y: pos.y,
        });
        self.dynamic_warp = Some((map.to_string(), pos));
    }

    fn start_door_animation(&mut self, map: &str, pos: TilePos, action: DoorAction) {
        self.door_animating = true;
        self.events.push(FieldEvent::DoorAnimated {
            map: map.to_string(),
            x: pos.x,
            y: pos.y,
            action,
        });
    }

    fn fade_screen(&mut self, mode: i32) {
        self.events.push(FieldEvent::ScreenFaded { mode });
    }
}
