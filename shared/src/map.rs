//! Static map data: roads, buildings, offices and the loot type catalog

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::geometry::{Point, Road};

/// Map identifier, unique across the game
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapId(pub String);

impl MapId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Office identifier, unique within its map
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfficeId(pub String);

impl OfficeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier collision detected while loading static data
#[derive(Debug, Error)]
#[error("duplicate id: {0}")]
pub struct DuplicateId(pub String);

/// Integer offset of an office sprite relative to its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

/// Decorative axis-aligned rectangle, not used by the physics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub position: Point,
    pub width: i32,
    pub height: i32,
}

/// Loot drop-off point where dogs deposit their bag for score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub position: Point,
    pub offset: Offset,
}

/// Index entry pairing a road with its cross-axis coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadIndex {
    pub road_idx: usize,
    pub coord: f64,
}

/// Immutable static data for one map
///
/// Construction happens at config load time: roads, buildings and offices are
/// added one by one, then `build_road_indexes` is called once everything is
/// in place. After that the map is only read.
#[derive(Debug, Clone)]
pub struct Map {
    id: MapId,
    name: String,
    roads: Vec<Road>,
    buildings: Vec<Building>,
    offices: Vec<Office>,
    office_index: HashMap<OfficeId, usize>,
    loot_types: Vec<Value>,
    horizontal_roads_by_y: Vec<RoadIndex>,
    vertical_roads_by_x: Vec<RoadIndex>,
    dog_speed: f64,
    bag_capacity: usize,
}

impl Map {
    pub fn new(id: MapId, name: impl Into<String>, loot_types: Vec<Value>) -> Self {
        Map {
            id,
            name: name.into(),
            roads: Vec::new(),
            buildings: Vec::new(),
            offices: Vec::new(),
            office_index: HashMap::new(),
            loot_types,
            horizontal_roads_by_y: Vec::new(),
            vertical_roads_by_x: Vec::new(),
            dog_speed: 0.0,
            bag_capacity: 3,
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn offices(&self) -> &[Office] {
        &self.offices
    }

    pub fn loot_types(&self) -> &[Value] {
        &self.loot_types
    }

    pub fn dog_speed(&self) -> f64 {
        self.dog_speed
    }

    pub fn bag_capacity(&self) -> usize {
        self.bag_capacity
    }

    pub fn add_road(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// Adds an office, rejecting a second office with the same id
    pub fn add_office(&mut self, office: Office) -> Result<(), DuplicateId> {
        if self.office_index.contains_key(&office.id) {
            return Err(DuplicateId(office.id.0.clone()));
        }
        self.office_index
            .insert(office.id.clone(), self.offices.len());
        self.offices.push(office);
        Ok(())
    }

    pub fn set_dog_speed(&mut self, speed: f64) {
        self.dog_speed = speed;
    }

    pub fn set_bag_capacity(&mut self, capacity: usize) {
        self.bag_capacity = capacity;
    }

    /// Rebuilds the sorted road indices; safe to call more than once
    pub fn build_road_indexes(&mut self) {
        self.horizontal_roads_by_y.clear();
        self.vertical_roads_by_x.clear();

        for (road_idx, road) in self.roads.iter().enumerate() {
            if road.is_horizontal() {
                self.horizontal_roads_by_y.push(RoadIndex {
                    road_idx,
                    coord: f64::from(road.start().y),
                });
            } else {
                self.vertical_roads_by_x.push(RoadIndex {
                    road_idx,
                    coord: f64::from(road.start().x),
                });
            }
        }

        // Stable sort keeps insertion order between roads sharing a coordinate
        self.horizontal_roads_by_y
            .sort_by(|a, b| a.coord.total_cmp(&b.coord));
        self.vertical_roads_by_x
            .sort_by(|a, b| a.coord.total_cmp(&b.coord));
    }

    pub fn horizontal_roads_by_y(&self) -> &[RoadIndex] {
        &self.horizontal_roads_by_y
    }

    pub fn vertical_roads_by_x(&self) -> &[RoadIndex] {
        &self.vertical_roads_by_x
    }

    /// Number of loot types defined for this map
    pub fn type_count(&self) -> usize {
        self.loot_types.len()
    }

    /// Score awarded for depositing an item of the given type
    pub fn points_for_type(&self, type_index: usize) -> u64 {
        self.loot_types
            .get(type_index)
            .and_then(|record| record.get("value"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}
