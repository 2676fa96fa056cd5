use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CascadeOutcome, ContentFilter, CreateFolderParams, FoldersRepo, FoldersWriteRepo, RepoError,
    UpdateFolderParams,
};
use crate::domain::entities::FolderRecord;
use crate::domain::tree::MAX_ANCESTOR_DEPTH;
use crate::domain::types::{ContentStatus, Visibility};
use crate::domain::workflow::StatusChange;

use super::{PostgresRepositories, insert_approval, map_sqlx_error, review_state};

pub(super) const FOLDER_COLUMNS: &str = "f.id, f.name, f.description, f.image, f.parent_id, \
    f.status, f.approved_by_id, f.approved_at, f.rejection_reason, f.created_at";

#[derive(sqlx::FromRow)]
pub(super) struct FolderRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    image: Option<String>,
    parent_id: Option<Uuid>,
    status: ContentStatus,
    approved_by_id: Option<Uuid>,
    approved_at: Option<OffsetDateTime>,
    rejection_reason: Option<String>,
    created_at: OffsetDateTime,
}

impl From<FolderRow> for FolderRecord {
    fn from(row: FolderRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            parent_id: row.parent_id,
            review: review_state(
                row.status,
                row.approved_by_id,
                row.approved_at,
                row.rejection_reason,
            ),
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    fn push_folder_visibility<'q>(qb: &mut QueryBuilder<'q, Postgres>, visibility: Visibility) {
        if visibility == Visibility::PublishedOnly {
            qb.push(" AND f.status = ").push_bind(ContentStatus::Published);
        }
    }

    async fn fetch_folders(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let rows = qb
            .build_query_as::<FolderRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;
        Ok(rows.into_iter().map(FolderRecord::from).collect())
    }

    /// Delete `id`, its descendants and the media filed under them inside `tx`.
    async fn cascade_delete_in(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<CascadeOutcome>, RepoError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "WITH RECURSIVE tree AS ( \
                SELECT id FROM folders WHERE id = $1 \
                UNION \
                SELECT f.id FROM folders f INNER JOIN tree t ON f.parent_id = t.id \
             ) \
             SELECT id FROM tree",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        if ids.is_empty() {
            return Ok(None);
        }

        let media = sqlx::query("DELETE FROM media_items WHERE folder_id = ANY($1)")
            .bind(&ids)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        let folders = sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        Ok(Some(CascadeOutcome { folders, media }))
    }
}

#[async_trait]
impl FoldersRepo for PostgresRepositories {
    async fn find_folder(&self, id: Uuid) -> Result<Option<FolderRecord>, RepoError> {
        let row = sqlx::query_as::<_, FolderRow>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders f WHERE f.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(row.map(FolderRecord::from))
    }

    async fn list_folders(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<FolderRecord>, RepoError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM folders f WHERE TRUE");
        Self::push_content_filter(&mut count, "f.name", filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders f WHERE TRUE"
        ));
        Self::push_content_filter(&mut qb, "f.name", filter);
        qb.push(" ORDER BY f.created_at DESC, f.id DESC");
        Self::push_page(&mut qb, page);

        let items = self.fetch_folders(qb).await?;
        Ok(Page::new(items, Self::convert_count(total)?, page))
    }

    async fn list_root_folders(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders f WHERE f.parent_id IS NULL"
        ));
        Self::push_folder_visibility(&mut qb, visibility);
        qb.push(" ORDER BY f.created_at DESC, f.id DESC");
        self.fetch_folders(qb).await
    }

    async fn list_all_folders(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders f WHERE TRUE"
        ));
        Self::push_folder_visibility(&mut qb, visibility);
        qb.push(" ORDER BY f.created_at ASC, f.id ASC");
        self.fetch_folders(qb).await
    }

    async fn list_child_folders(
        &self,
        parent_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders f WHERE f.parent_id = "
        ));
        qb.push_bind(parent_id);
        Self::push_folder_visibility(&mut qb, visibility);
        qb.push(" ORDER BY f.created_at DESC, f.id DESC");
        self.fetch_folders(qb).await
    }

    async fn list_ancestors(&self, id: Uuid) -> Result<Vec<FolderRecord>, RepoError> {
        let rows = sqlx::query_as::<_, FolderRow>(&format!(
            "WITH RECURSIVE chain AS ( \
                SELECT parent_id AS id, 1 AS depth FROM folders WHERE id = $1 \
                UNION ALL \
                SELECT p.parent_id, c.depth + 1 \
                FROM chain c INNER JOIN folders p ON p.id = c.id \
                WHERE c.depth < $2 \
             ) \
             SELECT {FOLDER_COLUMNS} FROM chain c INNER JOIN folders f ON f.id = c.id \
             ORDER BY c.depth ASC"
        ))
        .bind(id)
        .bind(MAX_ANCESTOR_DEPTH as i32)
        .fetch_all(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(rows.into_iter().map(FolderRecord::from).collect())
    }

    async fn descendant_ids(&self, id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        sqlx::query_scalar(
            "WITH RECURSIVE tree AS ( \
                SELECT id FROM folders WHERE id = $1 \
                UNION \
                SELECT f.id FROM folders f INNER JOIN tree t ON f.parent_id = t.id \
             ) \
             SELECT id FROM tree",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await
        .map_err(RepoError::from_persistence)
    }
}

#[async_trait]
impl FoldersWriteRepo for PostgresRepositories {
    async fn create_folder(&self, params: CreateFolderParams) -> Result<FolderRecord, RepoError> {
        let (approved_by_id, approved_at) = insert_approval(&params.change);
        let row = sqlx::query_as::<_, FolderRow>(&format!(
            "INSERT INTO folders AS f \
                (id, name, description, image, parent_id, status, approved_by_id, approved_at, \
                 rejection_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {FOLDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&params.name)
        .bind(&params.description)
        .bind(&params.image)
        .bind(params.parent_id)
        .bind(params.change.status)
        .bind(approved_by_id)
        .bind(approved_at)
        .bind(&params.change.rejection_reason)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_folder(&self, params: UpdateFolderParams) -> Result<FolderRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE folders AS f SET name = ");
        qb.push_bind(params.name)
            .push(", description = ")
            .push_bind(params.description)
            .push(", image = ")
            .push_bind(params.image)
            .push(", parent_id = ")
            .push_bind(params.parent_id)
            .push(", ");
        Self::push_status_change(&mut qb, &params.change);
        qb.push(" WHERE f.id = ")
            .push_bind(params.id)
            .push(" RETURNING ")
            .push(FOLDER_COLUMNS);

        let row = qb
            .build_query_as::<FolderRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn change_folder_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<FolderRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE folders AS f SET ");
        Self::push_status_change(&mut qb, &change);
        qb.push(" WHERE f.id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(FOLDER_COLUMNS);

        let row = qb
            .build_query_as::<FolderRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(FolderRecord::from))
    }

    async fn publish_folders(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE folders SET status = $2, approved_by_id = $3, approved_at = $4, \
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

    async fn delete_folder_tree(&self, id: Uuid) -> Result<Option<CascadeOutcome>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let outcome = Self::cascade_delete_in(&mut tx, id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(outcome)
    }

    async fn delete_folder_trees(&self, ids: &[Uuid]) -> Result<CascadeOutcome, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut total = CascadeOutcome::default();
        for id in ids {
            if let Some(outcome) = Self::cascade_delete_in(&mut tx, *id).await? {
                total.absorb(outcome);
            }
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(total)
    }
}
