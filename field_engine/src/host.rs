//! Collaborator contracts the engine drives: tile access for the step
//! callbacks, and the wider object/dialog/warp surface for scripts.

use serde::{Deserialize, Serialize};

use crate::script::movement::MovementStep;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn step(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx * distance, dy * distance)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    None,
    South,
    North,
    West,
    East,
}

impl Direction {
    pub fn from_raw(value: i32) -> Direction {
        match value {
            1 => Direction::South,
            2 => Direction::North,
            3 => Direction::West,
            4 => Direction::East,
            _ => Direction::None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Direction::None => 0,
            Direction::South => 1,
            Direction::North => 2,
            Direction::West => 3,
            Direction::East => 4,
        }
    }

    /// Parses movement-name suffixes (`down`, `up`, `left`, `right`).
    pub fn from_suffix(suffix: &str) -> Option<Direction> {
        match suffix {
            "down" => Some(Direction::South),
            "up" => Some(Direction::North),
            "left" => Some(Direction::West),
            "right" => Some(Direction::East),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::None => (0, 0),
            Direction::South => (0, 1),
            Direction::North => (0, -1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::None => Direction::None,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }
}

/// Opaque completion handle for an in-flight movement. The host hands one
/// out per started movement and later reports it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MovementTicket(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldEffect {
    /// Ash puff over a grass tile that was just cleared.
    Ash {
        map: String,
        pos: TilePos,
        metatile: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarpStyle {
    Normal,
    Silent,
    Door,
    Teleport,
    Hole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarpRequest {
    pub map: String,
    pub pos: TilePos,
    pub facing: Direction,
    pub style: WarpStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorAction {
    Open,
    Close,
}

/// Tile substrate and the few player facts the step callbacks consult.
pub trait FieldWorld {
    /// Behavior code of the tile at a map-local coordinate.
    fn behavior_at(&self, map: &str, x: i32, y: i32) -> Option<u16>;
    fn metatile_at(&self, map: &str, x: i32, y: i32) -> Option<u16>;
    /// Writes a metatile without redrawing; callers batch `invalidate_view`.
    fn set_metatile(&mut self, map: &str, x: i32, y: i32, metatile: u16);
    fn invalidate_view(&mut self);
    fn spawn_field_effect(&mut self, effect: FieldEffect);
    fn has_item(&self, item: &str) -> bool;
}

/// Everything a running script may call out to.
pub trait ScriptHost: FieldWorld {
    fn current_map(&self) -> String;
    fn player_name(&self) -> String;
    /// 0 for male, 1 for female.
    fn player_gender(&self) -> i32;
    fn player_position(&self) -> TilePos;
    /// Tile the player is walking toward, when mid-step.
    fn player_destination(&self) -> Option<TilePos>;
    fn is_player_idle(&self) -> bool;
    fn set_player_visible(&mut self, visible: bool);

    fn show_message(&mut self, text: &str);
    fn show_yes_no(&mut self, text: Option<&str>);
    fn show_choice(&mut self, menu: i32, cancelable: bool);
    fn close_message(&mut self);

    fn has_object(&self, map: &str, local_id: &str) -> bool;
    fn object_position(&self, map: &str, local_id: &str) -> Option<TilePos>;
    fn move_object(&mut self, map: &str, local_id: &str, steps: &[MovementStep]) -> MovementTicket;
    fn move_player(&mut self, steps: &[MovementStep]) -> MovementTicket;
    fn set_object_visible(&mut self, map: &str, local_id: &str, visible: bool, persistent: bool);
    fn set_object_position(&mut self, map: &str, local_id: &str, pos: TilePos, persistent: bool);
    fn face_object(&mut self, map: &str, local_id: &str, direction: Direction);
    /// Turns the object the player last talked to toward the player.
    fn face_talker_toward_player(&mut self);
    fn set_object_movement_type(&mut self, map: &str, local_id: &str, movement_type: &str);

    fn queue_warp(&mut self, warp: WarpRequest);
    /// Target used by warp tiles that point at the dynamic warp slot.
    fn set_dynamic_warp(&mut self, map: &str, pos: TilePos);
    fn start_door_animation(&mut self, map: &str, pos: TilePos, action: DoorAction);
    fn fade_screen(&mut self, mode: i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_raw_values_round_trip() {
        for raw in 0..=4 {
            assert_eq!(Direction::from_raw(raw).raw(), raw);
        }
        assert_eq!(Direction::from_raw(9), Direction::None);
    }

    #[test]
    fn tile_steps_follow_screen_axes() {
        let origin = TilePos::new(4, 4);
        assert_eq!(origin.step(Direction::North, 1), TilePos::new(4, 3));
        assert_eq!(origin.step(Direction::East, 2), TilePos::new(6, 4));
        assert_eq!(Direction::West.opposite(), Direction::East);
    }
}
