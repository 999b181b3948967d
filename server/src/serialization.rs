//! Snapshot codec: atomic save and restore of the full live state
//!
//! A snapshot captures every session (dogs, loot, id counters), the player
//! and token registries and the application flags. Encoding is an opaque
//! binary blob; it only needs to round-trip through this implementation.
//!
//! Saving is crash consistent: the blob is written to a sibling temp file
//! and renamed over the target, so a crash mid-write leaves the previous
//! snapshot intact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::dog::{Dog, DogId};
use shared::geometry::{Direction, Position, Speed};
use shared::loot::{BagItem, Loot, LootId};
use shared::map::MapId;
use shared::session::GameSession;

use crate::app::{Application, Player, Token};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Failure while persisting or restoring the snapshot
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("state file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file decode error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("state file references unknown map {0}")]
    UnknownMap(String),
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct DogRepr {
    id: u64,
    name: String,
    position: (f64, f64),
    default_speed: f64,
    speed: (f64, f64),
    direction: Direction,
    bag_capacity: usize,
    bag: Vec<(u64, usize)>,
    score: u64,
    in_game_ms: u64,
    idle_ms: u64,
}

impl DogRepr {
    fn capture(dog: &Dog) -> Self {
        DogRepr {
            id: dog.id().0,
            name: dog.name().to_string(),
            position: (dog.position().x, dog.position().y),
            default_speed: dog.default_speed(),
            speed: (dog.speed().x, dog.speed().y),
            direction: dog.direction(),
            bag_capacity: dog.bag().capacity(),
            bag: dog
                .bag()
                .items()
                .iter()
                .map(|item| (item.id.0, item.type_index))
                .collect(),
            score: dog.score(),
            in_game_ms: dog.in_game_ms(),
            idle_ms: dog.idle_ms(),
        }
    }

    fn restore(self) -> Dog {
        Dog::restore(
            DogId(self.id),
            self.name,
            Position {
                x: self.position.0,
                y: self.position.1,
            },
            self.default_speed,
            Speed {
                x: self.speed.0,
                y: self.speed.1,
            },
            self.direction,
            self.bag_capacity,
            self.bag
                .into_iter()
                .map(|(id, type_index)| BagItem {
                    id: LootId(id),
                    type_index,
                })
                .collect(),
            self.score,
            self.in_game_ms,
            self.idle_ms,
        )
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct LootRepr {
    id: u64,
    position: (f64, f64),
    type_index: usize,
}

impl LootRepr {
    fn capture(loot: &Loot) -> Self {
        LootRepr {
            id: loot.id().0,
            position: (loot.position().x, loot.position().y),
            type_index: loot.type_index(),
        }
    }

    fn restore(self) -> Loot {
        Loot::new(
            LootId(self.id),
            Position {
                x: self.position.0,
                y: self.position.1,
            },
            self.type_index,
        )
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct SessionRepr {
    map_id: String,
    next_dog_id: u64,
    next_loot_id: u64,
    dogs: Vec<DogRepr>,
    loots: Vec<LootRepr>,
}

impl SessionRepr {
    fn capture(session: &GameSession) -> Self {
        SessionRepr {
            map_id: session.id().0.clone(),
            next_dog_id: session.next_dog_id(),
            next_loot_id: session.next_loot_id(),
            dogs: session.dogs().values().map(DogRepr::capture).collect(),
            loots: session.loots().values().map(LootRepr::capture).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct PlayerRepr {
    dog_id: u64,
    map_id: String,
    token: String,
}

/// On-disk snapshot of the whole application
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRepr {
    sessions: Vec<SessionRepr>,
    players: Vec<PlayerRepr>,
    next_player_id: u32,
    auto_tick_enabled: bool,
    randomize_spawn: bool,
}

/// Captures the application into its serializable form
///
/// Sessions and players are sorted so two captures of the same state are
/// byte-identical.
pub fn snapshot(app: &Application) -> SnapshotRepr {
    let mut sessions: Vec<SessionRepr> = app
        .game()
        .sessions()
        .values()
        .map(SessionRepr::capture)
        .collect();
    sessions.sort_by(|a, b| a.map_id.cmp(&b.map_id));

    let mut players: Vec<PlayerRepr> = app
        .players()
        .iter()
        .map(|player| PlayerRepr {
            dog_id: player.dog_id.0,
            map_id: player.map_id.0.clone(),
            token: player.token.as_str().to_string(),
        })
        .collect();
    players.sort_by_key(|player| player.dog_id);

    SnapshotRepr {
        sessions,
        players,
        next_player_id: app.players().next_player_id(),
        auto_tick_enabled: app.is_auto_tick_enabled(),
        randomize_spawn: app.randomize_spawn(),
    }
}

/// Applies a decoded snapshot onto a freshly configured application
pub fn apply_snapshot(app: &mut Application, repr: SnapshotRepr) -> Result<(), SaveError> {
    let loot_config = app.game().loot_config();
    let retirement_ms = app.game().retirement_ms();

    for session_repr in repr.sessions {
        let map_id = MapId(session_repr.map_id);
        if app.game().find_map(&map_id).is_none() {
            return Err(SaveError::UnknownMap(map_id.0));
        }

        let session = GameSession::restore(
            map_id,
            session_repr.dogs.into_iter().map(DogRepr::restore).collect(),
            session_repr
                .loots
                .into_iter()
                .map(LootRepr::restore)
                .collect(),
            session_repr.next_dog_id,
            session_repr.next_loot_id,
            loot_config,
            retirement_ms,
            StdRng::from_entropy(),
        );
        app.game_mut().insert_session(session);
    }

    let players = repr
        .players
        .into_iter()
        .map(|player| Player {
            dog_id: DogId(player.dog_id),
            map_id: MapId(player.map_id),
            token: Token::from_stored(player.token),
        })
        .collect();
    app.players_mut().restore(players, repr.next_player_id);

    app.set_auto_tick_enabled(repr.auto_tick_enabled);
    app.set_randomize_spawn(repr.randomize_spawn);
    Ok(())
}

/// Writes the snapshot to `path` via a sibling temp file and atomic rename
pub fn save_state(path: &Path, app: &Application) -> Result<(), SaveError> {
    let bytes = bincode::serialize(&snapshot(app))?;

    let mut temp_path = path.to_path_buf();
    temp_path.set_extension("tmp");
    std::fs::write(&temp_path, bytes)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Restores the snapshot from `path`; a missing file is a no-op
pub fn restore_state(path: &Path, app: &mut Application) -> Result<(), SaveError> {
    if !path.exists() {
        return Ok(());
    }
    let bytes = std::fs::read(path)?;
    let repr: SnapshotRepr = bincode::deserialize(&bytes)?;
    apply_snapshot(app, repr)
}

/// Tick observer that re-saves the state file every `interval_ms` of game time
pub struct StateSaver {
    path: PathBuf,
    interval_ms: u64,
    elapsed_ms: u64,
}

impl StateSaver {
    pub fn new(path: PathBuf, interval_ms: u64) -> Self {
        StateSaver {
            path,
            interval_ms,
            elapsed_ms: 0,
        }
    }

    /// Called after every tick with the tick's delta
    pub fn on_tick(&mut self, delta_ms: u64, app: &Application) -> Result<(), SaveError> {
        self.elapsed_ms += delta_ms;
        if self.elapsed_ms >= self.interval_ms {
            save_state(&self.path, app)?;
            self.elapsed_ms = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::game::Game;
    use shared::geometry::{Point, Road};
    use shared::map::Map;

    fn test_game() -> Game {
        let mut map = Map::new(
            MapId("town".to_string()),
            "Town",
            vec![serde_json::json!({"value": 5}), serde_json::json!({"value": 1})],
        );
        map.add_road(Road::horizontal(Point { x: 0, y: 0 }, 20));
        map.set_dog_speed(2.0);
        map.set_bag_capacity(3);
        map.build_road_indexes();

        let mut game = Game::new();
        game.add_map(map).unwrap();
        game
    }

    fn populated_app() -> Application {
        let mut app = Application::new(test_game(), false);
        let (token_a, _) = app.join("town", "Rex").unwrap();
        let (_token_b, _) = app.join("town", "Laika").unwrap();
        app.set_player_action(&token_a, "R").unwrap();

        let map_id = MapId("town".to_string());
        let session = app.game_mut().session_mut(&map_id).unwrap();
        session.spawn_loot(Position { x: 4.0, y: 0.0 }, 0);
        session.spawn_loot(Position { x: 9.0, y: 0.1 }, 1);
        app
    }

    #[test]
    fn test_snapshot_round_trip_preserves_state() {
        let app = populated_app();
        let repr = snapshot(&app);
        let bytes = bincode::serialize(&repr).unwrap();
        let decoded: SnapshotRepr = bincode::deserialize(&bytes).unwrap();

        let mut restored = Application::new(test_game(), false);
        apply_snapshot(&mut restored, decoded).unwrap();

        assert_eq!(snapshot(&restored), snapshot(&app));
    }

    #[test]
    fn test_restored_tokens_still_resolve() {
        let app = populated_app();
        let token = app.players().iter().next().unwrap().token.clone();
        let dog_id = app.players().find_by_token(&token).unwrap().dog_id;

        let mut restored = Application::new(test_game(), false);
        apply_snapshot(&mut restored, snapshot(&app)).unwrap();

        let player = restored.players().find_by_token(&token).unwrap();
        assert_eq!(player.dog_id, dog_id);
        assert_eq!(restored.list_players(&token).unwrap().len(), 2);
    }

    #[test]
    fn test_save_and_restore_through_file() {
        let app = populated_app();
        let path = std::env::temp_dir().join(format!(
            "dogwalk-state-{}-{}.bin",
            std::process::id(),
            line!()
        ));

        save_state(&path, &app).unwrap();
        // The temp file must be gone after the rename
        assert!(!path.with_extension("tmp").exists());

        let mut restored = Application::new(test_game(), false);
        restore_state(&path, &mut restored).unwrap();
        assert_eq!(snapshot(&restored), snapshot(&app));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_restore_missing_file_is_a_no_op() {
        let mut app = Application::new(test_game(), false);
        let path = std::env::temp_dir().join("dogwalk-state-does-not-exist.bin");
        restore_state(&path, &mut app).unwrap();
        assert!(app.players().is_empty());
    }

    #[test]
    fn test_restore_corrupt_file_fails() {
        let path = std::env::temp_dir().join(format!(
            "dogwalk-state-corrupt-{}.bin",
            std::process::id()
        ));
        std::fs::write(&path, b"not a snapshot").unwrap();

        let mut app = Application::new(test_game(), false);
        assert!(restore_state(&path, &mut app).is_err());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_snapshot_of_unknown_map_fails_to_apply() {
        let app = populated_app();
        let repr = snapshot(&app);

        let mut empty = Application::new(Game::new(), false);
        assert!(matches!(
            apply_snapshot(&mut empty, repr),
            Err(SaveError::UnknownMap(_))
        ));
    }

    #[test]
    fn test_state_saver_respects_interval() {
        let app = populated_app();
        let path = std::env::temp_dir().join(format!(
            "dogwalk-state-saver-{}.bin",
            std::process::id()
        ));
        let mut saver = StateSaver::new(path.clone(), 1000);

        saver.on_tick(400, &app).unwrap();
        assert!(!path.exists());

        saver.on_tick(600, &app).unwrap();
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
    }
}
