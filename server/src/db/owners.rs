//! Database operations for the owners table.

use sqlx::{PgPool, Row};

/// A stored owner (remote identity) row.
#[derive(Debug)]
pub struct StoredOwner {
    pub id: String,
    pub email: String,
    pub password_digest: String,
    #[allow(dead_code)]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredOwner {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOwner {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_digest: row.try_get("password_digest")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Insert a new owner.
pub async fn create_owner(
    pool: &PgPool,
    id: &str,
    email: &str,
    password_digest: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO owners (id, email, password_digest)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_digest)
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up an owner by email.
pub async fn find_owner_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<StoredOwner>, sqlx::Error> {
    sqlx::query_as::<_, StoredOwner>(
        r#"
        SELECT id, email, password_digest, created_at
        FROM owners
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Look up an owner by id.
#[allow(dead_code)]
pub async fn find_owner_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<StoredOwner>, sqlx::Error> {
    sqlx::query_as::<_, StoredOwner>(
        r#"
        SELECT id, email, password_digest, created_at
        FROM owners
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
