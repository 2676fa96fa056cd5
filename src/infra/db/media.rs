use async_trait::async_trait;
use sqlx::{PgExecutor, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateMediaParams, MediaFilter, MediaRepo, MediaWriteRepo, RepoError, UpdateMediaParams,
};
use crate::domain::entities::MediaRecord;
use crate::domain::search::escape_like;
use crate::domain::types::{ContentStatus, MediaType, Visibility};
use crate::domain::workflow::StatusChange;

use super::{PostgresRepositories, insert_approval, map_sqlx_error, review_state};

pub(super) const MEDIA_COLUMNS: &str = "m.id, m.title, m.description, m.image, m.media_type, \
    m.file_url, m.external_link, m.language, m.folder_id, m.contributor_id, m.status, \
    m.approved_by_id, m.approved_at, m.rejection_reason, m.views, m.created_at, \
    COALESCE(( \
        SELECT array_agg(t.name ORDER BY t.name) \
        FROM media_tags mt INNER JOIN tags t ON t.id = mt.tag_id \
        WHERE mt.media_id = m.id \
    ), ARRAY[]::text[]) AS tags";

#[derive(sqlx::FromRow)]
pub(super) struct MediaRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    image: Option<String>,
    media_type: MediaType,
    file_url: Option<String>,
    external_link: Option<String>,
    language: Option<String>,
    folder_id: Option<Uuid>,
    contributor_id: Option<Uuid>,
    status: ContentStatus,
    approved_by_id: Option<Uuid>,
    approved_at: Option<OffsetDateTime>,
    rejection_reason: Option<String>,
    views: i64,
    created_at: OffsetDateTime,
    tags: Vec<String>,
}

impl From<MediaRow> for MediaRecord {
    fn from(row: MediaRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            image: row.image,
            media_type: row.media_type,
            file_url: row.file_url,
            external_link: row.external_link,
            language: row.language,
            folder_id: row.folder_id,
            contributor_id: row.contributor_id,
            review: review_state(
                row.status,
                row.approved_by_id,
                row.approved_at,
                row.rejection_reason,
            ),
            views: row.views,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    async fn load_media<'e, E>(executor: E, id: Uuid) -> Result<Option<MediaRecord>, RepoError>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media_items m WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MediaRecord::from))
    }

    /// Replace the tag set of `media_id`, creating unknown tag names.
    async fn replace_tags(
        tx: &mut Transaction<'_, Postgres>,
        media_id: Uuid,
        tags: &[String],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM media_tags WHERE media_id = $1")
            .bind(media_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        for name in tags {
            let tag_id: Uuid = sqlx::query_scalar(
                "INSERT INTO tags (id, name) VALUES ($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
                 RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

            sqlx::query(
                "INSERT INTO media_tags (media_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(media_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    async fn insert_media_in(
        tx: &mut Transaction<'_, Postgres>,
        params: &CreateMediaParams,
    ) -> Result<MediaRecord, RepoError> {
        let id = Uuid::new_v4();
        let (approved_by_id, approved_at) = insert_approval(&params.change);
        sqlx::query(
            "INSERT INTO media_items \
                (id, title, description, image, media_type, file_url, external_link, language, \
                 folder_id, contributor_id, status, approved_by_id, approved_at, rejection_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(id)
        .bind(&params.title)
        .bind(&params.description)
        .bind(&params.image)
        .bind(params.media_type)
        .bind(&params.file_url)
        .bind(&params.external_link)
        .bind(&params.language)
        .bind(params.folder_id)
        .bind(params.contributor_id)
        .bind(params.change.status)
        .bind(approved_by_id)
        .bind(approved_at)
        .bind(&params.change.rejection_reason)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::replace_tags(tx, id, &params.tags).await?;
        Self::load_media(&mut **tx, id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    fn push_media_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &MediaFilter) {
        if let Some(status) = filter.status {
            qb.push(" AND m.status = ").push_bind(status);
        }
        if let Some(folder_id) = filter.folder_id {
            qb.push(" AND m.folder_id = ").push_bind(folder_id);
        }
        if let Some(media_type) = filter.media_type {
            qb.push(" AND m.media_type = ").push_bind(media_type);
        }
        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
        {
            qb.push(" AND m.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
    }
}

#[async_trait]
impl MediaRepo for PostgresRepositories {
    async fn find_media(&self, id: Uuid) -> Result<Option<MediaRecord>, RepoError> {
        Self::load_media(self.pool(), id).await
    }

    async fn list_media(
        &self,
        filter: &MediaFilter,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, RepoError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM media_items m WHERE TRUE");
        Self::push_media_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MEDIA_COLUMNS} FROM media_items m WHERE TRUE"
        ));
        Self::push_media_filter(&mut qb, filter);
        qb.push(" ORDER BY m.created_at DESC, m.id DESC");
        Self::push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<MediaRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Ok(Page::new(
            rows.into_iter().map(MediaRecord::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }

    async fn list_media_in_folder(
        &self,
        folder_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<MediaRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MEDIA_COLUMNS} FROM media_items m WHERE m.folder_id = "
        ));
        qb.push_bind(folder_id);
        if visibility == Visibility::PublishedOnly {
            qb.push(" AND m.status = ").push_bind(ContentStatus::Published);
        }
        qb.push(" ORDER BY m.created_at DESC, m.id DESC");

        let rows = qb
            .build_query_as::<MediaRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Ok(rows.into_iter().map(MediaRecord::from).collect())
    }
}

#[async_trait]
impl MediaWriteRepo for PostgresRepositories {
    async fn create_media(&self, params: CreateMediaParams) -> Result<MediaRecord, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let record = Self::insert_media_in(&mut tx, &params).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn create_media_batch(
        &self,
        params: Vec<CreateMediaParams>,
    ) -> Result<Vec<MediaRecord>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut created = Vec::with_capacity(params.len());
        for item in &params {
            created.push(Self::insert_media_in(&mut tx, item).await?);
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(created)
    }

    async fn update_media(&self, params: UpdateMediaParams) -> Result<MediaRecord, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE media_items SET title = ");
        qb.push_bind(params.title)
            .push(", description = ")
            .push_bind(params.description)
            .push(", image = ")
            .push_bind(params.image)
            .push(", media_type = ")
            .push_bind(params.media_type)
            .push(", file_url = ")
            .push_bind(params.file_url)
            .push(", external_link = ")
            .push_bind(params.external_link)
            .push(", language = ")
            .push_bind(params.language)
            .push(", folder_id = ")
            .push_bind(params.folder_id)
            .push(", ");
        Self::push_status_change(&mut qb, &params.change);
        qb.push(" WHERE id = ").push_bind(params.id);

        let updated = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();
        if updated == 0 {
            return Err(RepoError::NotFound);
        }

        Self::replace_tags(&mut tx, params.id, &params.tags).await?;
        let record = Self::load_media(&mut *tx, params.id)
            .await?
            .ok_or(RepoError::NotFound)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn move_media(
        &self,
        id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Option<MediaRecord>, RepoError> {
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            "UPDATE media_items AS m SET folder_id = $2 WHERE m.id = $1 RETURNING {MEDIA_COLUMNS}"
        ))
        .bind(id)
        .bind(folder_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MediaRecord::from))
    }

    async fn change_media_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<MediaRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE media_items AS m SET ");
        Self::push_status_change(&mut qb, &change);
        qb.push(" WHERE m.id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(MEDIA_COLUMNS);

        let row = qb
            .build_query_as::<MediaRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(MediaRecord::from))
    }

    async fn publish_media(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE media_items SET status = $2, approved_by_id = $3, approved_at = $4, \
                rejection_reason = NULL \
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(ContentStatus::Published)
        .bind(approver)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_media(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM media_items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_media_many(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM media_items WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
