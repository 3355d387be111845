use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::SaveDatabase;

/// Entity class of a player character.
const PLAYER_CLASS: &str = "FPrisonerEntity";
/// `entity.flags` value of the currently controlled character.
const ACTIVE_FLAGS: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePlayerTime {
    pub user_profile_id: i64,
    pub time_of_day: f64,
}

pub(super) fn ensure_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_entity_flags ON entity(flags);
         CREATE INDEX IF NOT EXISTS idx_entity_entity_system_id ON entity(entity_system_id);
         CREATE INDEX IF NOT EXISTS idx_entity_system_id ON entity_system(id);
         CREATE INDEX IF NOT EXISTS idx_entity_system_user_profile_id ON entity_system(user_profile_id);
         CREATE INDEX IF NOT EXISTS idx_weather_user_profile_id ON weather_parameters(user_profile_id);",
    )
    .context("failed to create lookup indexes")
}

fn active_user_profile_id(conn: &Connection) -> Result<Option<i64>> {
    let entity_system_id: Option<i64> = conn
        .query_row(
            "SELECT entity_system_id
             FROM entity
             WHERE class = ?1 AND flags = ?2
             LIMIT 1",
            params![PLAYER_CLASS, ACTIVE_FLAGS],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up active player entity")?;

    let Some(entity_system_id) = entity_system_id else {
        return Ok(None);
    };

    let profile: Option<Option<i64>> = conn
        .query_row(
            "SELECT user_profile_id FROM entity_system WHERE id = ?1",
            params![entity_system_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to resolve player profile")?;

    Ok(profile.flatten())
}

fn time_of_day(conn: &Connection, user_profile_id: i64) -> Result<Option<f64>> {
    let time: Option<Option<f64>> = conn
        .query_row(
            "SELECT time_of_day FROM weather_parameters WHERE user_profile_id = ?1 LIMIT 1",
            params![user_profile_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read time_of_day")?;

    Ok(time.flatten())
}

impl SaveDatabase {
    pub async fn get_active_user_profile_id(&self) -> Result<Option<i64>> {
        self.execute(|conn| active_user_profile_id(conn)).await
    }

    pub async fn get_time_of_day(&self, user_profile_id: i64) -> Result<Option<f64>> {
        self.execute(move |conn| time_of_day(conn, user_profile_id))
            .await
    }

    /// Both lookups in one round trip to the worker thread. `None` when there
    /// is no controlled player or that player has no stored time.
    pub async fn get_active_player_time(&self) -> Result<Option<ActivePlayerTime>> {
        self.execute(|conn| {
            let Some(user_profile_id) = active_user_profile_id(conn)? else {
                return Ok(None);
            };
            Ok(time_of_day(conn, user_profile_id)?.map(|time_of_day| ActivePlayerTime {
                user_profile_id,
                time_of_day,
            }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::{test_support::seed_save_database, DatabaseOptions};
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn resolves_controlled_player_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SCUM.db");
        seed_save_database(&path, Some(17.25));

        let db = SaveDatabase::open(path, DatabaseOptions::default()).unwrap();
        assert_eq!(db.get_active_user_profile_id().await.unwrap(), Some(2));
        assert_eq!(db.get_time_of_day(2).await.unwrap(), Some(17.25));
        assert_eq!(
            db.get_active_player_time().await.unwrap(),
            Some(ActivePlayerTime {
                user_profile_id: 2,
                time_of_day: 17.25
            })
        );
    }

    #[tokio::test]
    async fn missing_weather_row_reads_as_no_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SCUM.db");
        seed_save_database(&path, None);

        let db = SaveDatabase::open(path, DatabaseOptions::default()).unwrap();
        assert_eq!(db.get_active_player_time().await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_controlled_player_reads_as_no_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("SCUM.db");
        seed_save_database(&path, Some(9.0));
        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE entity SET flags = 1", []).unwrap();
        drop(conn);

        let db = SaveDatabase::open(path, DatabaseOptions::default()).unwrap();
        assert_eq!(db.get_active_user_profile_id().await.unwrap(), None);
        assert_eq!(db.get_active_player_time().await.unwrap(), None);
    }
}
