//! Movement-script vocabulary: step names classified into typed steps the
//! host can animate.

use serde::Serialize;

use crate::host::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Speed {
    Slow,
    Normal,
    Fast,
    Faster,
    Fastest,
}

impl Speed {
    /// Frames needed to cross one tile.
    pub fn frames_per_tile(self) -> u32 {
        match self {
            Speed::Slow => 32,
            Speed::Normal => 16,
            Speed::Fast => 8,
            Speed::Faster => 4,
            Speed::Fastest => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gait {
    Walk,
    Run,
    Slide,
    Ride,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MovementStep {
    Travel {
        direction: Direction,
        gait: Gait,
        speed: Speed,
    },
    InPlace {
        direction: Direction,
        speed: Speed,
    },
    Face(Direction),
    FacePlayer,
    FaceAwayFromPlayer,
    FaceOriginalDirection,
    Jump {
        direction: Direction,
        distance: i32,
    },
    JumpInPlace {
        direction: Direction,
        then_face: Option<Direction>,
    },
    SetVisible(bool),
    /// Fixed-length animation with no position change (emotes, bows).
    Animation {
        name: String,
        frames: u32,
    },
    /// Sprite state toggle that takes no time.
    StateFlag(String),
    Delay(u32),
    Unknown(String),
}

const ANIMATION_FRAMES: u32 = 8;
const JUMP_FRAMES: u32 = 16;

const STATE_FLAGS: &[&str] = &[
    "step_end",
    "lock_facing_direction",
    "unlock_facing_direction",
    "set_fixed_priority",
    "clear_fixed_priority",
    "disable_anim",
    "restore_anim",
    "enable_jump_landing_ground_effect",
    "disable_jump_landing_ground_effect",
    "init_affine_anim",
    "clear_affine_anim",
];

const ONE_OFF_ANIMATIONS: &[&str] = &[
    "nurse_joy_bow",
    "reveal_trainer",
    "rock_smash_break",
    "cut_tree",
    "figure_8",
    "fly_up",
    "fly_down",
];

const TRAVEL_PREFIXES: &[(&str, Gait, Speed)] = &[
    ("walk_slow_", Gait::Walk, Speed::Slow),
    ("walk_fastest_", Gait::Walk, Speed::Fastest),
    ("walk_faster_", Gait::Walk, Speed::Faster),
    ("walk_fast_", Gait::Walk, Speed::Fast),
    ("walk_", Gait::Walk, Speed::Normal),
    ("player_run_", Gait::Run, Speed::Fast),
    ("slide_", Gait::Slide, Speed::Fast),
    ("ride_water_current_", Gait::Ride, Speed::Fast),
];

const IN_PLACE_PREFIXES: &[(&str, Speed)] = &[
    ("walk_in_place_slow_", Speed::Slow),
    ("walk_in_place_faster_", Speed::Faster),
    ("walk_in_place_fast_", Speed::Fast),
    ("walk_in_place_", Speed::Normal),
];

impl MovementStep {
    pub fn classify(name: &str) -> MovementStep {
        if STATE_FLAGS.contains(&name) {
            return MovementStep::StateFlag(name.to_string());
        }
        if let Some(frames) = name
            .strip_prefix("delay_")
            .and_then(|count| count.parse::<u32>().ok())
        {
            return MovementStep::Delay(frames);
        }
        match name {
            "face_player" => return MovementStep::FacePlayer,
            "face_away_player" => return MovementStep::FaceAwayFromPlayer,
            "face_original_direction" => return MovementStep::FaceOriginalDirection,
            "set_invisible" => return MovementStep::SetVisible(false),
            "set_visible" => return MovementStep::SetVisible(true),
            _ => {}
        }
        if name.starts_with("emote_") || ONE_OFF_ANIMATIONS.contains(&name) {
            return MovementStep::Animation {
                name: name.to_string(),
                frames: ANIMATION_FRAMES,
            };
        }
        if name.contains("_diag_") {
            return MovementStep::Animation {
                name: name.to_string(),
                frames: 1,
            };
        }

        if let Some(rest) = name.strip_prefix("jump_in_place_") {
            let mut parts = rest.splitn(2, '_');
            let first = parts.next().and_then(Direction::from_suffix);
            let second = parts.next().map(Direction::from_suffix);
            match (first, second) {
                (Some(direction), None) => {
                    return MovementStep::JumpInPlace {
                        direction,
                        then_face: None,
                    }
                }
                (Some(direction), Some(Some(then))) => {
                    return MovementStep::JumpInPlace {
                        direction,
                        then_face: Some(then),
                    }
                }
                _ => {}
            }
        }
        for (prefix, distance) in [("jump_2_", 2), ("jump_special_", 1), ("jump_", 1)] {
            if let Some(direction) = name.strip_prefix(prefix).and_then(Direction::from_suffix) {
                return MovementStep::Jump {
                    direction,
                    distance,
                };
            }
        }
        for (prefix, speed) in IN_PLACE_PREFIXES {
            if let Some(direction) = name.strip_prefix(prefix).and_then(Direction::from_suffix) {
                return MovementStep::InPlace {
                    direction,
                    speed: *speed,
                };
            }
        }
        for (prefix, gait, speed) in TRAVEL_PREFIXES {
            if let Some(direction) = name.strip_prefix(prefix).and_then(Direction::from_suffix) {
                return MovementStep::Travel {
                    direction,
                    gait: *gait,
                    speed: *speed,
                };
            }
        }
        if let Some(direction) = name.strip_prefix("face_").and_then(Direction::from_suffix) {
            return MovementStep::Face(direction);
        }

        log::warn!("movement.unknown {name}: treating as a one-frame delay");
        MovementStep::Unknown(name.to_string())
    }

    pub fn frames(&self) -> u32 {
        match self {
            MovementStep::Travel { speed, .. } | MovementStep::InPlace { speed, .. } => {
                speed.frames_per_tile()
            }
            MovementStep::Jump { distance, .. } => JUMP_FRAMES * (*distance as u32),
            MovementStep::JumpInPlace { .. } => JUMP_FRAMES,
            MovementStep::Animation { frames, .. } => *frames,
            MovementStep::Delay(frames) => *frames,
            MovementStep::StateFlag(_) => 0,
            MovementStep::Face(_)
            | MovementStep::FacePlayer
            | MovementStep::FaceAwayFromPlayer
            | MovementStep::FaceOriginalDirection
            | MovementStep::SetVisible(_)
            | MovementStep::Unknown(_) => 1,
        }
    }
}

pub fn classify_movement(names: &[String]) -> Vec<MovementStep> {
    names.iter().map(|name| MovementStep::classify(name)).collect()
}

pub fn total_frames(steps: &[MovementStep]) -> u32 {
    steps.iter().map(MovementStep::frames).sum()
}
