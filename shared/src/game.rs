//! Game root: map registry, lazily created sessions and global config

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::dog::DogId;
use crate::loot_generator::LootGeneratorConfig;
use crate::map::{DuplicateId, Map, MapId};
use crate::session::GameSession;

/// A dog harvested by the tick because of sustained inactivity
#[derive(Debug, Clone, PartialEq)]
pub struct RetiredDog {
    pub map_id: MapId,
    pub dog_id: DogId,
    pub name: String,
    pub score: u64,
    pub play_time_ms: u64,
}

/// Registry of maps and their sessions plus the global configuration
///
/// Maps are added once at load time. A session is created the first time a
/// player joins its map and lives for the rest of the process.
#[derive(Debug)]
pub struct Game {
    maps: Vec<Map>,
    map_index: HashMap<MapId, usize>,
    sessions: HashMap<MapId, GameSession>,
    default_speed: f64,
    default_bag_capacity: usize,
    loot_config: LootGeneratorConfig,
    retirement_time_s: f64,
}

impl Game {
    pub fn new() -> Self {
        Game {
            maps: Vec::new(),
            map_index: HashMap::new(),
            sessions: HashMap::new(),
            default_speed: 1.0,
            default_bag_capacity: 3,
            loot_config: LootGeneratorConfig::default(),
            retirement_time_s: 60.0,
        }
    }

    pub fn add_map(&mut self, map: Map) -> Result<(), DuplicateId> {
        if self.map_index.contains_key(map.id()) {
            return Err(DuplicateId(map.id().0.clone()));
        }
        self.map_index.insert(map.id().clone(), self.maps.len());
        self.maps.push(map);
        Ok(())
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn find_map(&self, id: &MapId) -> Option<&Map> {
        self.map_index.get(id).map(|idx| &self.maps[*idx])
    }

    pub fn sessions(&self) -> &HashMap<MapId, GameSession> {
        &self.sessions
    }

    pub fn session(&self, map_id: &MapId) -> Option<&GameSession> {
        self.sessions.get(map_id)
    }

    pub fn session_mut(&mut self, map_id: &MapId) -> Option<&mut GameSession> {
        self.sessions.get_mut(map_id)
    }

    /// Replaces the session for its map, used when restoring a snapshot
    pub fn insert_session(&mut self, session: GameSession) {
        self.sessions.insert(session.id().clone(), session);
    }

    pub fn set_default_speed(&mut self, speed: f64) {
        self.default_speed = speed;
    }

    pub fn default_speed(&self) -> f64 {
        self.default_speed
    }

    pub fn set_default_bag_capacity(&mut self, capacity: usize) {
        self.default_bag_capacity = capacity;
    }

    pub fn default_bag_capacity(&self) -> usize {
        self.default_bag_capacity
    }

    pub fn set_loot_config(&mut self, config: LootGeneratorConfig) {
        self.loot_config = config;
    }

    pub fn loot_config(&self) -> LootGeneratorConfig {
        self.loot_config
    }

    /// Sets the retirement threshold in seconds
    pub fn set_retirement_time(&mut self, seconds: f64) {
        self.retirement_time_s = seconds;
    }

    pub fn retirement_time(&self) -> f64 {
        self.retirement_time_s
    }

    pub fn retirement_ms(&self) -> u64 {
        (self.retirement_time_s * 1000.0) as u64
    }

    /// Adds a dog to the session for `map_id`, creating the session first if
    /// this is the map's first player
    ///
    /// Returns `None` when the map does not exist.
    pub fn join_dog(&mut self, map_id: &MapId, name: &str, randomize: bool) -> Option<DogId> {
        let map_idx = *self.map_index.get(map_id)?;
        let loot_config = self.loot_config;
        let retirement_ms = self.retirement_ms();

        let Game { maps, sessions, .. } = self;
        let map = &maps[map_idx];
        let session = sessions.entry(map_id.clone()).or_insert_with(|| {
            GameSession::new(
                map_id.clone(),
                loot_config,
                retirement_ms,
                StdRng::from_entropy(),
            )
        });

        Some(session.add_dog(name, map, randomize))
    }

    /// Runs one tick for every session and reports retired dogs
    ///
    /// Retired dogs stay in their sessions; the caller removes them once
    /// their records are persisted.
    pub fn update(&mut self, delta_ms: u64) -> Vec<RetiredDog> {
        let Game {
            maps,
            map_index,
            sessions,
            ..
        } = self;

        let mut retired = Vec::new();
        for (map_id, session) in sessions.iter_mut() {
            let map = &maps[map_index[map_id]];
            for dog_id in session.update(map, delta_ms) {
                if let Some(dog) = session.dog(dog_id) {
                    retired.push(RetiredDog {
                        map_id: map_id.clone(),
                        dog_id,
                        name: dog.name().to_string(),
                        score: dog.score(),
                        play_time_ms: dog.in_game_ms(),
                    });
                }
            }
        }
        retired
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
