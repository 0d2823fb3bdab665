use anyhow::{Context, Result};
use rusqlite::Connection;

const VECTOR_DATA_SCHEMA: &str = include_str!("schemas/vector_data.sql");

/// Create the `vector_data` table if it does not exist yet. Safe to call on
/// every startup.
pub fn ensure_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn
        .transaction()
        .context("failed to open schema transaction")?;

    tx.execute_batch(VECTOR_DATA_SCHEMA)
        .context("failed to execute vector_data.sql")?;

    tx.commit().context("failed to commit schema")?;
    Ok(())
}
