use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PagesRepo, RepoError};
use crate::domain::entities::PageRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PageRow {
    id: Uuid,
    slug: String,
    title: String,
    sections: sqlx::types::Json<Value>,
    updated_at: OffsetDateTime,
}

impl From<PageRow> for PageRecord {
    fn from(row: PageRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            sections: row.sections.0,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PagesRepo for PostgresRepositories {
    async fn find_page(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        let row = sqlx::query_as::<_, PageRow>(
            "SELECT id, slug, title, sections, updated_at FROM pages WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(row.map(PageRecord::from))
    }

    async fn upsert_page(
        &self,
        slug: &str,
        title: &str,
        sections: Value,
    ) -> Result<PageRecord, RepoError> {
        let row = sqlx::query_as::<_, PageRow>(
            "INSERT INTO pages (id, slug, title, sections, updated_at) \
             VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (slug) DO UPDATE \
                SET title = EXCLUDED.title, sections = EXCLUDED.sections, updated_at = now() \
             RETURNING id, slug, title, sections, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(title)
        .bind(sqlx::types::Json(sections))
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
