use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{MediaViewsRepo, RepoError};
use crate::domain::types::ContentStatus;
use crate::domain::views::{ViewKey, ViewOutcome};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl MediaViewsRepo for PostgresRepositories {
    async fn record_view(&self, key: &ViewKey) -> Result<Option<ViewOutcome>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        // Row lock keeps the counter read consistent with the ledger insert.
        let current: Option<i64> = sqlx::query_scalar(
            "SELECT views FROM media_items WHERE id = $1 AND status = $2 FOR UPDATE",
        )
        .bind(key.media_id)
        .bind(ContentStatus::Published)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(current) = current else {
            return Ok(None);
        };

        let inserted = sqlx::query(
            "INSERT INTO media_views (id, media_id, ip_hash, date_day) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT media_views_once_per_day DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(key.media_id)
        .bind(&key.ip_hash)
        .bind(&key.date_day)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let outcome = if inserted == 0 {
            ViewOutcome {
                counted: false,
                views: current,
            }
        } else {
            let views: i64 = sqlx::query_scalar(
                "UPDATE media_items SET views = views + 1 WHERE id = $1 RETURNING views",
            )
            .bind(key.media_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            ViewOutcome {
                counted: true,
                views,
            }
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Some(outcome))
    }

    async fn purge_views_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM media_views WHERE created_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
