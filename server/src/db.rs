//! Retirement persistence backed by Postgres
//!
//! Retired players land in a single `retired_players` table ordered by the
//! leaderboard index. The pool blocks callers while every connection is in
//! use, which is the only place the server waits on a shared resource.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Environment variable holding the database URL
pub const DB_URL_ENV: &str = "GAME_DB_URL";

const POOL_CAPACITY: u32 = 4;

/// One leaderboard entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetiredRecord {
    pub name: String,
    pub score: i32,
    pub play_time_ms: i32,
}

/// Persistence contract for retired players
///
/// `save` appends one record per retired dog; `top` pages through the
/// leaderboard ordered by score descending, then play time, then name.
pub trait RetirementSink {
    fn save(
        &self,
        record: RetiredRecord,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    fn top(
        &self,
        offset: i64,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<RetiredRecord>, sqlx::Error>> + Send;
}

/// Connection pool plus the retired players repository
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connects the pool and provisions the leaderboard table
    pub async fn connect(url: &str) -> Result<Database, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(POOL_CAPACITY)
            .connect(url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS retired_players (
                id UUID CONSTRAINT retired_player_id_constraint PRIMARY KEY,
                name varchar(100) NOT NULL,
                score integer,
                play_time_ms integer
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS retired_players_score_play_time_name_idx
             ON retired_players (score DESC, play_time_ms, name)",
        )
        .execute(&pool)
        .await?;

        Ok(Database { pool })
    }
}

impl RetirementSink for Database {
    async fn save(&self, record: RetiredRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO retired_players (id, name, score, play_time_ms) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(&record.name)
        .bind(record.score)
        .bind(record.play_time_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn top(&self, offset: i64, limit: i64) -> Result<Vec<RetiredRecord>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT name, score, play_time_ms FROM retired_players
             ORDER BY score DESC, play_time_ms, name
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RetiredRecord {
                name: row.get("name"),
                score: row.get("score"),
                play_time_ms: row.get("play_time_ms"),
            })
            .collect())
    }
}
