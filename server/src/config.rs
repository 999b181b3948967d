//! Game config file loading
//!
//! The config is a single JSON document with the map roster and the global
//! defaults. Parsing goes through serde into plain file structs, which are
//! then assembled into the immutable `Game` model.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use shared::game::Game;
use shared::geometry::{Point, Road};
use shared::loot_generator::LootGeneratorConfig;
use shared::map::{Building, DuplicateId, Map, MapId, Office, OfficeId, Offset};

/// Config file missing, malformed or inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map {0} has no loot types")]
    EmptyLootTypes(String),
    #[error(transparent)]
    Duplicate(#[from] DuplicateId),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameFile {
    maps: Vec<MapFile>,
    default_dog_speed: Option<f64>,
    default_bag_capacity: Option<usize>,
    loot_generator_config: LootGeneratorFile,
    dog_retirement_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LootGeneratorFile {
    /// Base period in seconds
    period: f64,
    probability: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapFile {
    id: String,
    name: String,
    roads: Vec<RoadFile>,
    #[serde(default)]
    buildings: Vec<BuildingFile>,
    #[serde(default)]
    offices: Vec<OfficeFile>,
    loot_types: Vec<serde_json::Value>,
    dog_speed: Option<f64>,
    bag_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RoadFile {
    x0: i32,
    y0: i32,
    x1: Option<i32>,
    y1: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct BuildingFile {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficeFile {
    id: String,
    x: i32,
    y: i32,
    offset_x: i32,
    offset_y: i32,
}

/// Loads the game model from a config file on disk
pub fn load_game(path: &Path) -> Result<Game, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    game_from_json(&text)
}

/// Builds the game model from config JSON text
pub fn game_from_json(text: &str) -> Result<Game, ConfigError> {
    let file: GameFile = serde_json::from_str(text)?;

    let mut game = Game::new();
    game.set_loot_config(LootGeneratorConfig {
        period_ms: file.loot_generator_config.period * 1000.0,
        probability: file.loot_generator_config.probability,
    });
    if let Some(seconds) = file.dog_retirement_time {
        game.set_retirement_time(seconds);
    }
    if let Some(speed) = file.default_dog_speed {
        game.set_default_speed(speed);
    }
    if let Some(capacity) = file.default_bag_capacity {
        game.set_default_bag_capacity(capacity);
    }

    for map_file in file.maps {
        if map_file.loot_types.is_empty() {
            return Err(ConfigError::EmptyLootTypes(map_file.id));
        }

        let mut map = Map::new(
            MapId(map_file.id),
            map_file.name,
            map_file.loot_types,
        );

        for road in map_file.roads {
            let start = Point {
                x: road.x0,
                y: road.y0,
            };
            // A road record needs one of the two end coordinates
            if let Some(x1) = road.x1 {
                map.add_road(Road::horizontal(start, x1));
            } else if let Some(y1) = road.y1 {
                map.add_road(Road::vertical(start, y1));
            }
        }

        for building in map_file.buildings {
            map.add_building(Building {
                position: Point {
                    x: building.x,
                    y: building.y,
                },
                width: building.w,
                height: building.h,
            });
        }

        for office in map_file.offices {
            map.add_office(Office {
                id: OfficeId(office.id),
                position: Point {
                    x: office.x,
                    y: office.y,
                },
                offset: Offset {
                    dx: office.offset_x,
                    dy: office.offset_y,
                },
            })?;
        }

        map.set_dog_speed(map_file.dog_speed.unwrap_or(game.default_speed()));
        map.set_bag_capacity(map_file.bag_capacity.unwrap_or(game.default_bag_capacity()));
        map.build_road_indexes();

        game.add_map(map)?;
    }

    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "defaultDogSpeed": 3.0,
        "defaultBagCapacity": 4,
        "dogRetirementTime": 15.5,
        "lootGeneratorConfig": { "period": 5.0, "probability": 0.5 },
        "maps": [
            {
                "id": "map1",
                "name": "Village",
                "roads": [
                    { "x0": 0, "y0": 0, "x1": 40 },
                    { "x0": 40, "y0": 0, "y1": 30 },
                    { "x0": 5, "y0": 5 }
                ],
                "buildings": [ { "x": 5, "y": 5, "w": 30, "h": 20 } ],
                "offices": [ { "id": "o0", "x": 40, "y": 30, "offsetX": 5, "offsetY": 0 } ],
                "lootTypes": [ { "name": "key", "value": 10 } ]
            },
            {
                "id": "map2",
                "name": "Town",
                "roads": [ { "x0": 0, "y0": 0, "x1": 10 } ],
                "lootTypes": [ { "name": "wallet", "value": 30 } ],
                "dogSpeed": 6.5,
                "bagCapacity": 1
            }
        ]
    }"#;

    #[test]
    fn test_loads_maps_with_defaults_and_overrides() {
        let game = game_from_json(SAMPLE).unwrap();
        assert_eq!(game.maps().len(), 2);

        let map1 = game.find_map(&MapId("map1".to_string())).unwrap();
        assert_eq!(map1.name(), "Village");
        assert_eq!(map1.dog_speed(), 3.0);
        assert_eq!(map1.bag_capacity(), 4);
        // The record without an end coordinate is dropped
        assert_eq!(map1.roads().len(), 2);
        assert_eq!(map1.buildings().len(), 1);
        assert_eq!(map1.offices().len(), 1);
        assert_eq!(map1.points_for_type(0), 10);

        let map2 = game.find_map(&MapId("map2".to_string())).unwrap();
        assert_eq!(map2.dog_speed(), 6.5);
        assert_eq!(map2.bag_capacity(), 1);
    }

    #[test]
    fn test_loads_global_settings() {
        let game = game_from_json(SAMPLE).unwrap();
        assert_eq!(game.default_speed(), 3.0);
        assert_eq!(game.default_bag_capacity(), 4);
        assert_eq!(game.retirement_time(), 15.5);
        assert_eq!(game.retirement_ms(), 15_500);
        // Period comes in seconds and is stored in milliseconds
        assert_eq!(game.loot_config().period_ms, 5000.0);
        assert_eq!(game.loot_config().probability, 0.5);
    }

    #[test]
    fn test_road_indexes_are_built() {
        let game = game_from_json(SAMPLE).unwrap();
        let map1 = game.find_map(&MapId("map1".to_string())).unwrap();
        assert_eq!(map1.horizontal_roads_by_y().len(), 1);
        assert_eq!(map1.vertical_roads_by_x().len(), 1);
    }

    #[test]
    fn test_empty_loot_types_is_an_error() {
        let text = r#"{
            "lootGeneratorConfig": { "period": 5.0, "probability": 0.5 },
            "maps": [ { "id": "m", "name": "M", "roads": [], "lootTypes": [] } ]
        }"#;
        assert!(matches!(
            game_from_json(text),
            Err(ConfigError::EmptyLootTypes(_))
        ));
    }

    #[test]
    fn test_missing_loot_generator_config_is_an_error() {
        assert!(matches!(
            game_from_json(r#"{ "maps": [] }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_duplicate_office_id_is_an_error() {
        let text = r#"{
            "lootGeneratorConfig": { "period": 5.0, "probability": 0.5 },
            "maps": [ {
                "id": "m", "name": "M",
                "roads": [ { "x0": 0, "y0": 0, "x1": 5 } ],
                "offices": [
                    { "id": "o", "x": 0, "y": 0, "offsetX": 0, "offsetY": 0 },
                    { "id": "o", "x": 5, "y": 0, "offsetX": 0, "offsetY": 0 }
                ],
                "lootTypes": [ { "value": 1 } ]
            } ]
        }"#;
        assert!(matches!(
            game_from_json(text),
            Err(ConfigError::Duplicate(_))
        ));
    }
}
