//! Behavior codes and metatile ids the step callbacks key on.

pub const MB_ASH_GRASS: u16 = 0x24;
pub const MB_THIN_ICE: u16 = 0x26;
pub const MB_CRACKED_ICE: u16 = 0x27;
pub const MB_CRACKED_FLOOR_HOLE: u16 = 0x66;
pub const MB_PACIFIDLOG_VERTICAL_LOG_TOP: u16 = 0x70;
pub const MB_PACIFIDLOG_VERTICAL_LOG_BOTTOM: u16 = 0x71;
pub const MB_PACIFIDLOG_HORIZONTAL_LOG_LEFT: u16 = 0x72;
pub const MB_PACIFIDLOG_HORIZONTAL_LOG_RIGHT: u16 = 0x73;
pub const MB_FORTREE_BRIDGE: u16 = 0x74;
pub const MB_MUDDY_SLOPE: u16 = 0xD0;
pub const MB_CRACKED_FLOOR: u16 = 0xD2;

pub const METATILE_FALLARBOR_ASH_GRASS: u16 = 0x20A;
pub const METATILE_FALLARBOR_NORMAL_GRASS: u16 = 0x212;
pub const METATILE_LAVARIDGE_NORMAL_GRASS: u16 = 0x206;

pub const METATILE_FORTREE_BRIDGE_OVER_GRASS_RAISED: u16 = 0x24E;
pub const METATILE_FORTREE_BRIDGE_OVER_GRASS_LOWERED: u16 = 0x24F;
pub const METATILE_FORTREE_BRIDGE_OVER_TREES_RAISED: u16 = 0x256;
pub const METATILE_FORTREE_BRIDGE_OVER_TREES_LOWERED: u16 = 0x257;

pub const METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_LEFT: u16 = 0x250;
pub const METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_RIGHT: u16 = 0x251;
pub const METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_LEFT: u16 = 0x252;
pub const METATILE_PACIFIDLOG_HALF_SUBMERGED_HORIZONTAL_RIGHT: u16 = 0x253;
pub const METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_LEFT: u16 = 0x254;
pub const METATILE_PACIFIDLOG_SUBMERGED_HORIZONTAL_RIGHT: u16 = 0x255;
pub const METATILE_PACIFIDLOG_FLOATING_VERTICAL_TOP: u16 = 0x258;
pub const METATILE_PACIFIDLOG_FLOATING_VERTICAL_BOTTOM: u16 = 0x260;
pub const METATILE_PACIFIDLOG_HALF_SUBMERGED_VERTICAL_TOP: u16 = 0x259;
pub const METATILE_PACIFIDLOG_HALF_SUBMERGED_VERTICAL_BOTTOM: u16 = 0x261;
pub const METATILE_PACIFIDLOG_SUBMERGED_VERTICAL_TOP: u16 = 0x25A;
pub const METATILE_PACIFIDLOG_SUBMERGED_VERTICAL_BOTTOM: u16 = 0x262;

pub const METATILE_SOOTOPOLIS_GYM_ICE_CRACKED: u16 = 0x20E;
pub const METATILE_SOOTOPOLIS_GYM_ICE_BROKEN: u16 = 0x206;

pub const METATILE_CAVE_CRACKED_FLOOR: u16 = 0x22F;
pub const METATILE_CAVE_CRACKED_FLOOR_HOLE: u16 = 0x206;
pub const METATILE_SKY_PILLAR_CRACKED_FLOOR_HOLE: u16 = 0x237;

pub const METATILE_MUDDY_SLOPE_FRAME0: u16 = 0x0E8;
pub const METATILE_MUDDY_SLOPE_FRAME1: u16 = 0x0E9;
pub const METATILE_MUDDY_SLOPE_FRAME2: u16 = 0x0EA;
pub const METATILE_MUDDY_SLOPE_FRAME3: u16 = 0x0EB;

/// Script-facing metatile labels (`setmetatile` arguments).
pub const METATILE_LABELS: &[(&str, u16)] = &[
    ("METATILE_Fallarbor_AshGrass", METATILE_FALLARBOR_ASH_GRASS),
    ("METATILE_Fallarbor_NormalGrass", METATILE_FALLARBOR_NORMAL_GRASS),
    ("METATILE_Lavaridge_NormalGrass", METATILE_LAVARIDGE_NORMAL_GRASS),
    ("METATILE_Fortree_BridgeOverGrass_Raised", METATILE_FORTREE_BRIDGE_OVER_GRASS_RAISED),
    ("METATILE_Fortree_BridgeOverGrass_Lowered", METATILE_FORTREE_BRIDGE_OVER_GRASS_LOWERED),
    ("METATILE_Fortree_BridgeOverTrees_Raised", METATILE_FORTREE_BRIDGE_OVER_TREES_RAISED),
    ("METATILE_Fortree_BridgeOverTrees_Lowered", METATILE_FORTREE_BRIDGE_OVER_TREES_LOWERED),
    ("METATILE_Pacifidlog_FloatingLogs_HorizontalLeft", METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_LEFT),
    ("METATILE_Pacifidlog_FloatingLogs_HorizontalRight", METATILE_PACIFIDLOG_FLOATING_HORIZONTAL_RIGHT),
    ("METATILE_Pacifidlog_FloatingLogs_VerticalTop", METATILE_PACIFIDLOG_FLOATING_VERTICAL_TOP),
    ("METATILE_Pacifidlog_FloatingLogs_VerticalBottom", METATILE_PACIFIDLOG_FLOATING_VERTICAL_BOTTOM),
    ("METATILE_SootopolisGym_Ice_Cracked", METATILE_SOOTOPOLIS_GYM_ICE_CRACKED),
    ("METATILE_SootopolisGym_Ice_Broken", METATILE_SOOTOPOLIS_GYM_ICE_BROKEN),
    ("METATILE_Cave_CrackedFloor", METATILE_CAVE_CRACKED_FLOOR),
    ("METATILE_Cave_CrackedFloor_Hole", METATILE_CAVE_CRACKED_FLOOR_HOLE),
    ("METATILE_Pacifidlog_SkyPillar_CrackedFloor_Hole", METATILE_SKY_PILLAR_CRACKED_FLOOR_HOLE),
    ("METATILE_General_MuddySlope_Frame0", METATILE_MUDDY_SLOPE_FRAME0),
];

pub fn metatile_by_label(label: &str) -> Option<u16> {
    METATILE_LABELS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, id)| *id)
}
