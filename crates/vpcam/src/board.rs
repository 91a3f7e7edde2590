// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::{
    platform::{self, BoardPaths},
    Error,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs};

/// Maximum number of camera slots a board describes.
pub const MAX_CAMERAS: usize = 4;

/// Bus routing of one camera slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSlot {
    pub i2c_bus: u32,
    pub mipi_host: u32,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    i2c_bus: Option<u32>,
    mipi_host: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawBoard {
    cameras: Vec<RawSlot>,
}

/// Camera slots of the running board, from `/etc/board_config.json`.
///
/// The file holds one object per board keyed `board_<id>`:
///
/// ```json
/// { "board_0x0301": { "cameras": [ { "i2c_bus": 6, "mipi_host": 0 } ] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardConfig {
    pub board_id: String,
    /// Enabled slots, in slot order.
    pub cameras: Vec<CameraSlot>,
}

impl BoardConfig {
    /// Read the board id and parse the matching entry of the board file.
    pub fn load(paths: &BoardPaths) -> Result<BoardConfig, Error> {
        let board_id = platform::board_id(paths)?;
        let json = fs::read_to_string(&paths.board_config)?;
        BoardConfig::parse(&json, &board_id)
    }

    /// Parse the entry for `board_id` out of a board file.
    ///
    /// A slot missing `i2c_bus` or `mipi_host` ends the list; slots before
    /// it stay enabled. Slots past [`MAX_CAMERAS`] are ignored.
    pub fn parse(json: &str, board_id: &str) -> Result<BoardConfig, Error> {
        let key = format!("board_{}", board_id);
        let mut boards: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let entry = boards.remove(&key).ok_or_else(|| {
            Error::InvalidArgument(format!("board configuration has no {} entry", key))
        })?;
        let raw: RawBoard = serde_json::from_value(entry)?;

        let mut cameras = Vec::with_capacity(MAX_CAMERAS);
        for slot in raw.cameras.into_iter().take(MAX_CAMERAS) {
            match (slot.i2c_bus, slot.mipi_host) {
                (Some(i2c_bus), Some(mipi_host)) => cameras.push(CameraSlot { i2c_bus, mipi_host }),
                _ => {
                    debug!("camera slot {} incomplete, ignoring the rest", cameras.len());
                    break;
                }
            }
        }

        Ok(BoardConfig {
            board_id: board_id.to_string(),
            cameras,
        })
    }

    /// Slot `index`, if it is enabled.
    pub fn slot(&self, index: usize) -> Option<CameraSlot> {
        self.cameras.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RDK_X5: &str = r#"{
        "board_0x0301": {
            "cameras": [
                { "i2c_bus": 6, "mipi_host": 0 },
                { "i2c_bus": 4, "mipi_host": 2 }
            ]
        },
        "board_0x0302": {
            "cameras": [ { "i2c_bus": 1, "mipi_host": 1 } ]
        }
    }"#;

    #[test]
    fn test_parse_selects_board() {
        let config = BoardConfig::parse(RDK_X5, "0x0301").unwrap();
        assert_eq!(config.cameras.len(), 2);
        assert_eq!(
            config.slot(1),
            Some(CameraSlot {
                i2c_bus: 4,
                mipi_host: 2
            })
        );
        assert_eq!(config.slot(2), None);
    }

    #[test]
    fn test_missing_board() {
        let err = BoardConfig::parse(RDK_X5, "0x9999").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_incomplete_slot_stops_parsing() {
        let json = r#"{ "board_1": { "cameras": [
            { "i2c_bus": 6, "mipi_host": 0 },
            { "i2c_bus": 4 },
            { "i2c_bus": 2, "mipi_host": 3 }
        ] } }"#;
        let config = BoardConfig::parse(json, "1").unwrap();
        assert_eq!(config.cameras.len(), 1);
    }

    #[test]
    fn test_at_most_four_slots() {
        let slots: Vec<String> = (0..6)
            .map(|i| format!(r#"{{ "i2c_bus": {}, "mipi_host": {} }}"#, i, i))
            .collect();
        let json = format!(r#"{{ "board_a": {{ "cameras": [{}] }} }}"#, slots.join(","));
        let config = BoardConfig::parse(&json, "a").unwrap();
        assert_eq!(config.cameras.len(), MAX_CAMERAS);
    }

    #[test]
    fn test_invalid_json() {
        let err = BoardConfig::parse("{ not json", "a").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_load_from_tree() {
        let dir = TempDir::new().unwrap();
        let paths = BoardPaths::with_root(dir.path());
        fs::create_dir_all(&paths.socinfo).unwrap();
        fs::create_dir_all(paths.board_config.parent().unwrap()).unwrap();
        fs::write(paths.socinfo.join("board_id"), "0x0302\n").unwrap();
        fs::write(&paths.board_config, RDK_X5).unwrap();

        let config = BoardConfig::load(&paths).unwrap();
        assert_eq!(config.board_id, "0x0302");
        assert_eq!(config.cameras[0].mipi_host, 1);
    }
}
