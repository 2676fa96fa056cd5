use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    BlogsRepo, BlogsWriteRepo, ContentFilter, CreateBlogParams, RepoError, UpdateBlogParams,
};
use crate::domain::entities::BlogRecord;
use crate::domain::types::ContentStatus;
use crate::domain::workflow::{Approval, StatusChange};

use super::{PostgresRepositories, insert_approval, map_sqlx_error, review_state};

const BLOG_COLUMNS: &str = "b.id, b.title, b.slug, b.content, b.banner_url, b.author, b.status, \
    b.published_at, b.approved_by_id, b.approved_at, b.rejection_reason, b.created_by_id, \
    b.created_at";

#[derive(sqlx::FromRow)]
struct BlogRow {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    banner_url: Option<String>,
    author: String,
    status: ContentStatus,
    published_at: Option<OffsetDateTime>,
    approved_by_id: Option<Uuid>,
    approved_at: Option<OffsetDateTime>,
    rejection_reason: Option<String>,
    created_by_id: Option<Uuid>,
    created_at: OffsetDateTime,
}

impl From<BlogRow> for BlogRecord {
    fn from(row: BlogRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            banner_url: row.banner_url,
            author: row.author,
            review: review_state(
                row.status,
                row.approved_by_id,
                row.approved_at,
                row.rejection_reason,
            ),
            published_at: row.published_at,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    /// Status assignments plus the first-publish stamp. `published_at` is
    /// only ever filled, never cleared.
    fn push_blog_status_change<'q>(qb: &mut QueryBuilder<'q, Postgres>, change: &StatusChange) {
        Self::push_status_change(qb, change);
        if change.status == ContentStatus::Published {
            let at = match change.approval {
                Approval::Stamp { at, .. } => at,
                Approval::Keep | Approval::Clear => OffsetDateTime::now_utc(),
            };
            qb.push(", published_at = COALESCE(published_at, ")
                .push_bind(at)
                .push(")");
        }
    }
}

#[async_trait]
impl BlogsRepo for PostgresRepositories {
    async fn find_blog(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs b WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(row.map(BlogRecord::from))
    }

    async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs b WHERE b.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(row.map(BlogRecord::from))
    }

    async fn blog_slug_exists(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM blogs WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(excluding)
        .fetch_one(self.pool())
        .await
        .map_err(RepoError::from_persistence)
    }

    async fn list_blogs(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<BlogRecord>, RepoError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blogs b WHERE TRUE");
        Self::push_content_filter(&mut count, "b.title", filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {BLOG_COLUMNS} FROM blogs b WHERE TRUE"
        ));
        Self::push_content_filter(&mut qb, "b.title", filter);
        qb.push(" ORDER BY COALESCE(b.published_at, b.created_at) DESC, b.id DESC");
        Self::push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<BlogRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Ok(Page::new(
            rows.into_iter().map(BlogRecord::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }
}

#[async_trait]
impl BlogsWriteRepo for PostgresRepositories {
    async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError> {
        let (approved_by_id, approved_at) = insert_approval(&params.change);
        let published_at = (params.change.status == ContentStatus::Published)
            .then(|| approved_at.unwrap_or_else(OffsetDateTime::now_utc));

        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "INSERT INTO blogs AS b \
                (id, title, slug, content, banner_url, author, status, published_at, \
                 approved_by_id, approved_at, rejection_reason, created_by_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {BLOG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&params.title)
        .bind(&params.slug)
        .bind(&params.content)
        .bind(&params.banner_url)
        .bind(&params.author)
        .bind(params.change.status)
        .bind(published_at)
        .bind(approved_by_id)
        .bind(approved_at)
        .bind(&params.change.rejection_reason)
        .bind(params.created_by_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_blog(&self, params: UpdateBlogParams) -> Result<BlogRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE blogs AS b SET title = ");
        qb.push_bind(params.title)
            .push(", slug = ")
            .push_bind(params.slug)
            .push(", content = ")
            .push_bind(params.content)
            .push(", banner_url = ")
            .push_bind(params.banner_url)
            .push(", author = ")
            .push_bind(params.author)
            .push(", ");
        Self::push_blog_status_change(&mut qb, &params.change);
        qb.push(" WHERE b.id = ")
            .push_bind(params.id)
            .push(" RETURNING ")
            .push(BLOG_COLUMNS);

        let row = qb
            .build_query_as::<BlogRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn change_blog_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<BlogRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE blogs AS b SET ");
        Self::push_blog_status_change(&mut qb, &change);
        qb.push(" WHERE b.id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(BLOG_COLUMNS);

        let row = qb
            .build_query_as::<BlogRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(BlogRecord::from))
    }

    async fn publish_blogs(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE blogs SET status = $2, approved_by_id = $3, approved_at = $4, \
                rejection_reason = NULL, published_at = COALESCE(published_at, $4) \
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

    async fn delete_blog(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_blogs(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
