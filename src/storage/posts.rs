use super::schema::Database;
use super::types::{DatabaseError, PostRecord};

impl Database {
    // ========================================================================
    // Dedup Store Operations
    // ========================================================================

    /// Returns true if a record for `id` is present.
    pub async fn exists(&self, id: &str) -> Result<bool, DatabaseError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM post_records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(row.is_some())
    }

    /// Records `id` as posted at `posted_at` (unix seconds).
    ///
    /// Each call commits on its own, so a crash later in the run never
    /// forgets an item that was already published.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DuplicateKey` if `id` is already recorded.
    /// Inserts are deliberately not upserts; callers check [`Database::exists`] first.
    pub async fn record(&self, id: &str, posted_at: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("INSERT INTO post_records (id, posted_at) VALUES (?, ?)")
            .bind(id)
            .bind(posted_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DatabaseError::DuplicateKey(id.to_string()))
            }
            Err(e) => Err(DatabaseError::from_sqlx(e)),
        }
    }

    /// Deletes every record with `posted_at < older_than`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    pub async fn expire(&self, older_than: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM post_records WHERE posted_at < ?")
            .bind(older_than)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected())
    }

    /// Fetch a single record by id.
    pub async fn get_record(&self, id: &str) -> Result<Option<PostRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, PostRecord>(
            "SELECT id, posted_at FROM post_records WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(record)
    }

    /// Number of records currently held.
    pub async fn count_records(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_records")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(count)
    }
}
