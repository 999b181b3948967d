//! Application layer: players, bearer tokens and the game use cases
//!
//! This module manages everything that sits between the HTTP handlers and
//! the simulation engine:
//! - Player bookkeeping: which token controls which dog in which session
//! - Token minting and lookup
//! - The use cases the API exposes: join, list players, read state, set a
//!   movement command, advance the clock and read the leaderboard

use std::collections::HashMap;

use log::{error, info};
use rand::Rng;
use thiserror::Error;

use shared::dog::DogId;
use shared::game::Game;
use shared::geometry::{Direction, Speed};
use shared::map::{Map, MapId};

use crate::db::{RetiredRecord, RetirementSink};

/// Failures surfaced by the application use cases
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("map not found")]
    MapNotFound,
    #[error("unknown token")]
    UnknownToken,
}

/// 32-hex-character bearer credential controlling one dog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Accepts exactly 32 hex digits, normalizing to lowercase
    pub fn parse(raw: &str) -> Option<Token> {
        if raw.len() == 32 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Token(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub(crate) fn from_stored(raw: String) -> Token {
        Token(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mints a fresh token from two random 64-bit halves
fn mint_token(rng: &mut impl Rng) -> Token {
    let high: u64 = rng.gen();
    let low: u64 = rng.gen();
    Token(format!("{high:016x}{low:016x}"))
}

/// A joined player: the dog it controls and the session holding it
#[derive(Debug, Clone)]
pub struct Player {
    pub dog_id: DogId,
    pub map_id: MapId,
    pub token: Token,
}

/// Registry mapping dog ids and tokens to players
#[derive(Debug, Default)]
pub struct Players {
    players: HashMap<DogId, Player>,
    tokens: HashMap<Token, DogId>,
    next_player_id: u32,
}

impl Players {
    /// Registers a freshly joined dog and mints its token
    pub fn add(&mut self, dog_id: DogId, map_id: MapId) -> Token {
        let mut rng = rand::thread_rng();
        let token = loop {
            let candidate = mint_token(&mut rng);
            if !self.tokens.contains_key(&candidate) {
                break candidate;
            }
        };

        self.tokens.insert(token.clone(), dog_id);
        self.players.insert(
            dog_id,
            Player {
                dog_id,
                map_id,
                token: token.clone(),
            },
        );
        self.next_player_id += 1;
        token
    }

    pub fn find(&self, dog_id: DogId) -> Option<&Player> {
        self.players.get(&dog_id)
    }

    pub fn find_by_token(&self, token: &Token) -> Option<&Player> {
        self.tokens
            .get(token)
            .and_then(|dog_id| self.players.get(dog_id))
    }

    /// Removes the player and its token
    pub fn delete(&mut self, dog_id: DogId) {
        if let Some(player) = self.players.remove(&dog_id) {
            self.tokens.remove(&player.token);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub(crate) fn next_player_id(&self) -> u32 {
        self.next_player_id
    }

    /// Replaces the whole registry, used when restoring a snapshot
    pub(crate) fn restore(&mut self, players: Vec<Player>, next_player_id: u32) {
        self.players.clear();
        self.tokens.clear();
        for player in players {
            self.tokens.insert(player.token.clone(), player.dog_id);
            self.players.insert(player.dog_id, player);
        }
        self.next_player_id = next_player_id;
    }
}

/// Per-dog slice of the session state returned to clients
#[derive(Debug, Clone, PartialEq)]
pub struct DogStateView {
    pub id: u64,
    pub name: String,
    pub position: [f64; 2],
    pub speed: [f64; 2],
    pub direction: &'static str,
    pub bag: Vec<(u64, usize)>,
    pub score: u64,
}

/// One lost object visible on the player's map
#[derive(Debug, Clone, PartialEq)]
pub struct LootStateView {
    pub id: u64,
    pub type_index: usize,
    pub position: [f64; 2],
}

/// Everything the state endpoint reports for one session
#[derive(Debug, Clone, PartialEq)]
pub struct StateView {
    pub dogs: Vec<DogStateView>,
    pub loots: Vec<LootStateView>,
}

/// Application root tying the game model to the player registry
pub struct Application {
    game: Game,
    players: Players,
    auto_tick_enabled: bool,
    randomize_spawn: bool,
}

impl Application {
    pub fn new(game: Game, randomize_spawn: bool) -> Self {
        Application {
            game,
            players: Players::default(),
            auto_tick_enabled: false,
            randomize_spawn,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub(crate) fn players_mut(&mut self) -> &mut Players {
        &mut self.players
    }

    pub fn maps(&self) -> &[Map] {
        self.game.maps()
    }

    pub fn find_map(&self, map_id: &str) -> Option<&Map> {
        self.game.find_map(&MapId(map_id.to_string()))
    }

    pub fn is_auto_tick_enabled(&self) -> bool {
        self.auto_tick_enabled
    }

    pub fn set_auto_tick_enabled(&mut self, enabled: bool) {
        self.auto_tick_enabled = enabled;
    }

    pub fn randomize_spawn(&self) -> bool {
        self.randomize_spawn
    }

    pub fn set_randomize_spawn(&mut self, enabled: bool) {
        self.randomize_spawn = enabled;
    }

    /// Joins a player to the map's session and mints its token
    pub fn join(&mut self, map_id: &str, user_name: &str) -> Result<(Token, DogId), AppError> {
        let map_id = MapId(map_id.to_string());
        let dog_id = self
            .game
            .join_dog(&map_id, user_name, self.randomize_spawn)
            .ok_or(AppError::MapNotFound)?;
        let token = self.players.add(dog_id, map_id.clone());
        info!("{} joined map {} as dog {}", user_name, map_id, dog_id.0);
        Ok((token, dog_id))
    }

    /// Names of every dog in the calling player's session
    pub fn list_players(&self, token: &Token) -> Result<Vec<(u64, String)>, AppError> {
        let player = self
            .players
            .find_by_token(token)
            .ok_or(AppError::UnknownToken)?;
        let session = self
            .game
            .session(&player.map_id)
            .ok_or(AppError::UnknownToken)?;

        Ok(session
            .dogs()
            .iter()
            .map(|(id, dog)| (id.0, dog.name().to_string()))
            .collect())
    }

    /// Full dynamic state of the calling player's session
    pub fn state(&self, token: &Token) -> Result<StateView, AppError> {
        let player = self
            .players
            .find_by_token(token)
            .ok_or(AppError::UnknownToken)?;
        let session = self
            .game
            .session(&player.map_id)
            .ok_or(AppError::UnknownToken)?;

        let dogs = session
            .dogs()
            .values()
            .map(|dog| DogStateView {
                id: dog.id().0,
                name: dog.name().to_string(),
                position: [dog.position().x, dog.position().y],
                speed: [dog.speed().x, dog.speed().y],
                direction: dog.direction().as_str(),
                bag: dog
                    .bag()
                    .items()
                    .iter()
                    .map(|item| (item.id.0, item.type_index))
                    .collect(),
                score: dog.score(),
            })
            .collect();

        let loots = session
            .loots()
            .values()
            .map(|loot| LootStateView {
                id: loot.id().0,
                type_index: loot.type_index(),
                position: [loot.position().x, loot.position().y],
            })
            .collect();

        Ok(StateView { dogs, loots })
    }

    /// Applies a movement command to the calling player's dog
    ///
    /// `command` is one of "U", "D", "L", "R" or "" (stop); the API layer
    /// validates the value before calling.
    pub fn set_player_action(&mut self, token: &Token, command: &str) -> Result<(), AppError> {
        let player = self
            .players
            .find_by_token(token)
            .ok_or(AppError::UnknownToken)?
            .clone();
        let speed_value = self
            .game
            .find_map(&player.map_id)
            .map(|map| map.dog_speed())
            .ok_or(AppError::UnknownToken)?;
        let dog = self
            .game
            .session_mut(&player.map_id)
            .and_then(|session| session.dog_mut(player.dog_id))
            .ok_or(AppError::UnknownToken)?;

        let (direction, speed) = match command {
            "U" => (
                Direction::North,
                Speed {
                    x: 0.0,
                    y: -speed_value,
                },
            ),
            "D" => (
                Direction::South,
                Speed {
                    x: 0.0,
                    y: speed_value,
                },
            ),
            "L" => (
                Direction::West,
                Speed {
                    x: -speed_value,
                    y: 0.0,
                },
            ),
            "R" => (
                Direction::East,
                Speed {
                    x: speed_value,
                    y: 0.0,
                },
            ),
            _ => (Direction::None, Speed::zero()),
        };

        dog.set_default_speed(speed_value);
        dog.set_speed(speed);
        dog.set_direction(direction);
        Ok(())
    }

    /// Advances every session by `delta_ms` and retires inactive dogs
    ///
    /// Each retired dog is forwarded to the sink, then removed from its
    /// session and from the player registry. A sink failure is logged and
    /// the dog is still retired, so a dead database cannot wedge the game.
    pub async fn tick<S: RetirementSink>(&mut self, delta_ms: u64, sink: &S) {
        let retired = self.game.update(delta_ms);

        for dog in retired {
            if let Err(e) = sink
                .save(RetiredRecord {
                    name: dog.name.clone(),
                    score: dog.score as i32,
                    play_time_ms: dog.play_time_ms as i32,
                })
                .await
            {
                error!("failed to persist retired player {}: {}", dog.name, e);
            }

            if let Some(session) = self.game.session_mut(&dog.map_id) {
                session.remove_dog(dog.dog_id);
            }
            self.players.delete(dog.dog_id);
            info!(
                "dog {} retired from map {} after {} ms with score {}",
                dog.name, dog.map_id, dog.play_time_ms, dog.score
            );
        }
    }
}
