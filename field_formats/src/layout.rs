use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Tile grid for one map. Behavior codes are looked up per metatile id so a
/// tile swap also swaps its behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapLayout {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub metatiles: Vec<u16>,
    #[serde(default)]
    pub behaviors: BTreeMap<u16, u16>,
    #[serde(default)]
    pub objects: Vec<ObjectPlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPlacement {
    pub local_id: String,
    pub x: i32,
    pub y: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

fn tile_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

impl MapLayout {
    /// Layout filled with a single metatile.
    pub fn filled(id: &str, width: u32, height: u32, metatile: u16) -> Self {
        Self {
            id: id.to_string(),
            width,
            height,
            metatiles: vec![metatile; tile_count(width, height)],
            behaviors: BTreeMap::new(),
            objects: Vec::new(),
        }
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let layout: MapLayout = serde_json::from_str(text).context("decoding map layout JSON")?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<()> {
        let expected = tile_count(self.width, self.height);
        if self.metatiles.len() != expected {
            bail!(
                "layout {} declares {}x{} but carries {} metatiles",
                self.id,
                self.width,
                self.height,
                self.metatiles.len()
            );
        }
        Ok(())
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn metatile_at(&self, x: i32, y: i32) -> Option<u16> {
        self.index(x, y).map(|index| self.metatiles[index])
    }

    /// Behavior of the tile at (x, y); metatiles without an entry read as 0.
    pub fn behavior_at(&self, x: i32, y: i32) -> Option<u16> {
        self.metatile_at(x, y)
            .map(|metatile| self.behaviors.get(&metatile).copied().unwrap_or(0))
    }

    /// Returns false when the coordinate is outside the grid.
    pub fn set_metatile(&mut self, x: i32, y: i32, metatile: u16) -> bool {
        match self.index(x, y) {
            Some(index) => {
                self.metatiles[index] = metatile;
                true
            }
            None => false,
        }
    }

    pub fn with_behavior(mut self, metatile: u16, behavior: u16) -> Self {
        self.behaviors.insert(metatile, behavior);
        self
    }
}

pub fn load_map_layout<P: AsRef<Path>>(path: P) -> Result<MapLayout> {
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("reading layout {}", path.display()))?;
    MapLayout::parse_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavior_follows_metatile_swaps() {
        let mut layout = MapLayout::filled("MAP_TEST", 3, 2, 0x001).with_behavior(0x20A, 0x24);
        assert!(layout.set_metatile(2, 1, 0x20A));
        assert_eq!(layout.behavior_at(2, 1), Some(0x24));
        assert_eq!(layout.behavior_at(0, 0), Some(0));
        assert!(layout.set_metatile(2, 1, 0x212));
        assert_eq!(layout.behavior_at(2, 1), Some(0));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn tile_count_does_not_wrap_in_u32() {
        assert_eq!(tile_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(MapLayout::filled("MAP_TEST", 4, 3, 0).metatiles.len(), 12);
    }

    #[test]
    fn out_of_bounds_reads_are_none() {
        let mut layout = MapLayout::filled("MAP_TEST", 2, 2, 0);
        assert_eq!(layout.metatile_at(-1, 0), None);
        assert_eq!(layout.metatile_at(2, 0), None);
        assert!(!layout.set_metatile(0, 5, 1));
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let err = MapLayout::parse_str(
            r#"{ "id": "MAP_BAD", "width": 2, "height": 2, "metatiles": [1, 2, 3] }"#,
        )
        .expect_err("dimension mismatch");
        assert!(format!("{err:#}").contains("MAP_BAD"));
    }

    #[test]
    fn parses_numeric_behavior_keys_and_objects() {
        let layout = MapLayout::parse_str(
            r#"{
                "id": "MAP_ROUTE",
                "width": 1,
                "height": 1,
                "metatiles": [522],
                "behaviors": { "522": 36 },
                "objects": [{ "localId": "LOCALID_HIKER", "x": 0, "y": 0 }]
            }"#,
        )
        .expect("layout parses");
        assert_eq!(layout.behavior_at(0, 0), Some(36));
        assert!(layout.objects[0].visible);
    }
}
