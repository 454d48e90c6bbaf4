use sqlx::{postgres::PgRow, FromRow, PgPool};

use crate::types::ObjectId;

/// Tenant-scoped read/delete plumbing shared by the resource handlers.
///
/// Every query is constrained by `school_id`; a record belonging to
/// another school is indistinguishable from a missing one. Inserts and
/// updates stay in the handlers since their column lists are
/// entity-specific.
pub struct Repository<T> {
    table: &'static str,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    /// `table` must be a compile-time table name, never request input.
    pub fn new(table: &'static str, pool: PgPool) -> Self {
        Self {
            table,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn list(
        &self,
        school_id: &ObjectId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<T>, sqlx::Error> {
        let query = format!(
            "SELECT * FROM {} WHERE school_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            self.table
        );
        sqlx::query_as(&query)
            .bind(school_id)
            .bind(limit.clamp(1, 200))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_by_id(
        &self,
        school_id: &ObjectId,
        id: &ObjectId,
    ) -> Result<Option<T>, sqlx::Error> {
        let query = format!("SELECT * FROM {} WHERE school_id = $1 AND id = $2", self.table);
        sqlx::query_as(&query)
            .bind(school_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Like `find_by_id` but yields `RowNotFound` for missing records,
    /// which the error normalizer maps to 404.
    pub async fn fetch_by_id(&self, school_id: &ObjectId, id: &ObjectId) -> Result<T, sqlx::Error> {
        self.find_by_id(school_id, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Returns the number of rows removed (0 or 1).
    pub async fn delete_by_id(
        &self,
        school_id: &ObjectId,
        id: &ObjectId,
    ) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE school_id = $1 AND id = $2", self.table);
        let result = sqlx::query(&query)
            .bind(school_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
