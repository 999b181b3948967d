//! Integration tests for the dog walking game server
//!
//! These tests drive the application layer end to end: config loading,
//! joining, commanded movement, pickups, deposits, retirement and the
//! snapshot file round-trip.

use std::sync::Mutex;

use assert_approx_eq::assert_approx_eq;

use server::app::{AppError, Application, Token};
use server::config;
use server::db::{RetiredRecord, RetirementSink};
use server::serialization;

use shared::map::MapId;

const CONFIG: &str = r#"{
    "defaultDogSpeed": 2.0,
    "defaultBagCapacity": 3,
    "dogRetirementTime": 1.0,
    "lootGeneratorConfig": { "period": 5.0, "probability": 0.0 },
    "maps": [
        {
            "id": "town",
            "name": "Town",
            "roads": [ { "x0": 0, "y0": 0, "x1": 10 } ],
            "offices": [ { "id": "o0", "x": 10, "y": 0, "offsetX": 5, "offsetY": 0 } ],
            "lootTypes": [
                { "name": "key", "value": 7 },
                { "name": "bone", "value": 2 }
            ]
        }
    ]
}"#;

/// In-memory retirement sink standing in for the database
struct MemorySink {
    records: Mutex<Vec<RetiredRecord>>,
}

impl MemorySink {
    fn new() -> Self {
        MemorySink {
            records: Mutex::new(Vec::new()),
        }
    }

    fn take(&self) -> Vec<RetiredRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl RetirementSink for MemorySink {
    async fn save(&self, record: RetiredRecord) -> Result<(), sqlx::Error> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn top(&self, _offset: i64, _limit: i64) -> Result<Vec<RetiredRecord>, sqlx::Error> {
        Ok(Vec::new())
    }
}

fn new_application() -> Application {
    let game = config::game_from_json(CONFIG).expect("config should parse");
    Application::new(game, false)
}

fn spawn_loot(app: &mut Application, x: f64, y: f64, type_index: usize) {
    // Sessions exist only after the first join
    let map_id = MapId("town".to_string());
    let session = app
        .game_mut()
        .session_mut(&map_id)
        .expect("session should exist");
    session.spawn_loot(shared::geometry::Position { x, y }, type_index);
}

/// GAMEPLAY SCENARIOS
mod gameplay_tests {
    use super::*;

    /// A commanded dog walks its road and picks up the loot on the way
    #[tokio::test]
    async fn straight_line_pickup() {
        let mut app = new_application();
        let (token, dog_id) = app.join("town", "Rex").unwrap();
        spawn_loot(&mut app, 5.0, 0.0, 0);
        app.set_player_action(&token, "R").unwrap();

        let sink = MemorySink::new();
        app.tick(3000, &sink).await;

        let state = app.state(&token).unwrap();
        let dog = state.dogs.iter().find(|d| d.id == dog_id.0).unwrap();
        assert_approx_eq!(dog.position[0], 6.0, 1e-9);
        assert_eq!(dog.bag.len(), 1);
        assert!(state.loots.is_empty());
    }

    /// The road edge clamps the dog and zeroes its speed, keeping direction
    #[tokio::test]
    async fn edge_clamp_halts_dog() {
        let mut app = new_application();
        let (token, dog_id) = app.join("town", "Rex").unwrap();
        app.set_player_action(&token, "R").unwrap();

        let sink = MemorySink::new();
        // 2 units/s for 6 seconds runs past the end of the 10-unit road
        app.tick(6000, &sink).await;

        let state = app.state(&token).unwrap();
        let dog = state.dogs.iter().find(|d| d.id == dog_id.0).unwrap();
        assert_approx_eq!(dog.position[0], 10.0, 1e-9);
        assert_eq!(dog.speed, [0.0, 0.0]);
        assert_eq!(dog.direction, "R");
    }

    /// Loot collected on the way is deposited at the office for score
    #[tokio::test]
    async fn pickup_then_deposit_scores() {
        let mut app = new_application();
        let (token, dog_id) = app.join("town", "Rex").unwrap();
        spawn_loot(&mut app, 5.0, 0.0, 0);
        app.set_player_action(&token, "R").unwrap();

        let sink = MemorySink::new();
        app.tick(10_000, &sink).await;

        let state = app.state(&token).unwrap();
        let dog = state.dogs.iter().find(|d| d.id == dog_id.0).unwrap();
        assert_eq!(dog.score, 7);
        assert!(dog.bag.is_empty());
        assert!(state.loots.is_empty());
    }

    /// An idle dog retires and its record reaches the sink exactly once
    #[tokio::test]
    async fn retirement_reaches_the_sink() {
        let mut app = new_application();
        let (token, _) = app.join("town", "Rex").unwrap();

        let sink = MemorySink::new();
        app.tick(600, &sink).await;
        assert!(sink.take().is_empty());

        app.tick(600, &sink).await;
        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Rex");
        assert_eq!(records[0].score, 0);
        assert_eq!(records[0].play_time_ms, 1200);

        assert_eq!(app.state(&token).unwrap_err(), AppError::UnknownToken);
    }

    /// Two players on one map see each other
    #[tokio::test]
    async fn players_share_a_session() {
        let mut app = new_application();
        let (token_a, _) = app.join("town", "Rex").unwrap();
        let (_token_b, _) = app.join("town", "Laika").unwrap();

        let names: Vec<String> = app
            .list_players(&token_a)
            .unwrap()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Rex".to_string()));
        assert!(names.contains(&"Laika".to_string()));
    }
}

/// TOKEN TESTS
mod token_tests {
    use super::*;

    #[test]
    fn join_mints_distinct_well_formed_tokens() {
        let mut app = new_application();
        let (token_a, _) = app.join("town", "Rex").unwrap();
        let (token_b, _) = app.join("town", "Laika").unwrap();

        assert_ne!(token_a, token_b);
        for token in [&token_a, &token_b] {
            assert_eq!(token.as_str().len(), 32);
            assert!(token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn unknown_token_is_rejected() {
        let app = new_application();
        let token = Token::parse("deadbeefdeadbeefdeadbeefdeadbeef").unwrap();
        assert_eq!(app.list_players(&token).unwrap_err(), AppError::UnknownToken);
    }
}

/// SNAPSHOT TESTS
mod snapshot_tests {
    use super::*;

    /// Save to a file and restore into a fresh application
    #[tokio::test]
    async fn state_file_round_trip() {
        let mut app = new_application();
        let (token, dog_id) = app.join("town", "Rex").unwrap();
        spawn_loot(&mut app, 4.0, 0.0, 1);
        app.set_player_action(&token, "R").unwrap();

        let sink = MemorySink::new();
        app.tick(500, &sink).await;

        let path = std::env::temp_dir().join(format!(
            "dogwalk-integration-state-{}.bin",
            std::process::id()
        ));
        serialization::save_state(&path, &app).unwrap();

        let mut restored = new_application();
        serialization::restore_state(&path, &mut restored).unwrap();

        let state = restored.state(&token).unwrap();
        let dog = state.dogs.iter().find(|d| d.id == dog_id.0).unwrap();
        assert_approx_eq!(dog.position[0], 1.0, 1e-9);
        assert!(dog.bag.is_empty());
        assert_eq!(state.loots.len(), 1);

        // The restored session keeps ticking from where it left off; the
        // dog passes the loot at x=4 and picks it up
        restored.tick(2000, &sink).await;
        let state = restored.state(&token).unwrap();
        let dog = state.dogs.iter().find(|d| d.id == dog_id.0).unwrap();
        assert_approx_eq!(dog.position[0], 5.0, 1e-9);
        assert_eq!(dog.bag.len(), 1);
        assert!(state.loots.is_empty());

        std::fs::remove_file(&path).unwrap();
    }
}
