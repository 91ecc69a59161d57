//! Database operations for the records table.

use reel_engine::RemoteRecord;
use sqlx::{PgConnection, Row};

/// A stored record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    #[allow(dead_code)]
    pub owner_id: String,
    pub record_id: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            owner_id: row.try_get("owner_id")?,
            record_id: row.try_get("record_id")?,
            name: row.try_get("name")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredRecord {
    /// Convert database row to the wire shape.
    pub fn to_remote(&self) -> RemoteRecord {
        RemoteRecord {
            id: self.record_id.clone(),
            name: self.name.clone(),
            payload: self.payload.clone(),
            created_at: self.created_at.max(0) as u64,
            updated_at: self.updated_at.max(0) as u64,
        }
    }
}

/// Fetch all records for an owner, ordered by record id.
pub async fn fetch_owner_records(
    conn: &mut PgConnection,
    owner_id: &str,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT owner_id, record_id, name, payload, created_at, updated_at
        FROM records
        WHERE owner_id = $1
        ORDER BY record_id
        "#,
    )
    .bind(owner_id)
    .fetch_all(conn)
    .await
}

/// Fetch a single record for an owner.
pub async fn fetch_owner_record(
    conn: &mut PgConnection,
    owner_id: &str,
    record_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoredRecord>(
        r#"
        SELECT owner_id, record_id, name, payload, created_at, updated_at
        FROM records
        WHERE owner_id = $1 AND record_id = $2
        "#,
    )
    .bind(owner_id)
    .bind(record_id)
    .fetch_optional(conn)
    .await
}

/// Upsert a batch of records for an owner (insert or overwrite by id).
pub async fn upsert_records(
    conn: &mut PgConnection,
    owner_id: &str,
    records: &[RemoteRecord],
) -> Result<(), sqlx::Error> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO records (owner_id, record_id, name, payload, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (owner_id, record_id) DO UPDATE SET
                name = EXCLUDED.name,
                payload = EXCLUDED.payload,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.payload)
        .bind(record.created_at as i64)
        .bind(record.updated_at as i64)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Delete a batch of records for an owner by id list.
pub async fn delete_records(
    conn: &mut PgConnection,
    owner_id: &str,
    record_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if record_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        DELETE FROM records
        WHERE owner_id = $1 AND record_id = ANY($2)
        "#,
    )
    .bind(owner_id)
    .bind(record_ids)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
