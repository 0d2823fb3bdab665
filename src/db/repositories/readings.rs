use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{parse_sqlite_timestamp, to_u64},
    models::{NewReading, Reading},
};

impl Database {
    /// Append one row and return its id. The row is committed in its own
    /// transaction.
    pub async fn insert_reading(&self, reading: &NewReading) -> Result<i64> {
        let record = reading.clone();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open insert transaction")?;
            tx.execute(
                "INSERT INTO vector_data (image, prox) VALUES (?1, ?2)",
                params![record.image, record.prox],
            )
            .context("failed to insert reading")?;
            let id = tx.last_insert_rowid();
            tx.commit().context("failed to commit reading")?;
            Ok(id)
        })
        .await
    }

    pub async fn count_readings(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM vector_data", [], |row| row.get(0))
                .context("failed to count readings")?;
            to_u64(count, "count")
        })
        .await
    }

    pub async fn latest_reading(&self) -> Result<Option<Reading>> {
        self.execute(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, timestamp, image, prox
                     FROM vector_data
                     ORDER BY id DESC
                     LIMIT 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                            row.get::<_, f64>(3)?,
                        ))
                    },
                )
                .optional()
                .context("failed to query latest reading")?;

            match row {
                Some((id, timestamp, image, prox)) => Ok(Some(Reading {
                    id,
                    timestamp: parse_sqlite_timestamp(&timestamp, "timestamp")?,
                    image,
                    prox,
                })),
                None => Ok(None),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn memory_db() -> Database {
        Database::new(PathBuf::from(":memory:")).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let db = memory_db();
        let id = db
            .insert_reading(&NewReading {
                image: vec![7u8; 691_200],
                prox: 42.5,
            })
            .await
            .unwrap();

        let latest = db.latest_reading().await.unwrap().unwrap();
        assert_eq!(latest.id, id);
        assert_eq!(latest.prox, 42.5);
        assert_eq!(latest.image.len(), 691_200);
        assert!(latest.timestamp.timestamp() > 0);
    }

    #[tokio::test]
    async fn ids_increase_monotonically() {
        let db = memory_db();
        let first = db
            .insert_reading(&NewReading { image: vec![1], prox: 10.0 })
            .await
            .unwrap();
        let second = db
            .insert_reading(&NewReading { image: vec![2], prox: 20.0 })
            .await
            .unwrap();

        assert!(second > first);
        assert_eq!(db.latest_reading().await.unwrap().unwrap().prox, 20.0);
    }

    #[tokio::test]
    async fn count_is_stable_without_writes() {
        let db = memory_db();
        db.insert_reading(&NewReading { image: vec![0; 16], prox: 3.0 })
            .await
            .unwrap();

        let first = db.count_readings().await.unwrap();
        let second = db.count_readings().await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_table_has_no_latest_reading() {
        let db = memory_db();
        assert_eq!(db.count_readings().await.unwrap(), 0);
        assert!(db.latest_reading().await.unwrap().is_none());
    }
}
