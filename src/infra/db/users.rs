use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateUserParams, RepoError, UpdateUserParams, UserChangeOutcome, UsersRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::types::Role;
use crate::domain::users::{RoleChange, guard_last_superadmin};

use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: Role,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

impl PostgresRepositories {
    /// Lock every SUPERADMIN row plus the target, so concurrent demotions
    /// serialize on the same set.
    async fn lock_for_role_change(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<(UserRow, u64)>, RepoError> {
        let superadmins: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE role = $1 FOR UPDATE")
                .bind(Role::Superadmin)
                .fetch_all(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;

        let target = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(target.map(|row| (row, superadmins.len() as u64)))
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        Ok(row.map(UserRecord::from))
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ));
        Self::push_page(&mut qb, page);
        let rows = qb
            .build_query_as::<UserRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Ok(Page::new(
            rows.into_iter().map(UserRecord::from).collect(),
            Self::convert_count(total)?,
            page,
        ))
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&params.username)
        .bind(&params.email)
        .bind(&params.password_hash)
        .bind(params.role)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_user(
        &self,
        id: Uuid,
        params: UpdateUserParams,
    ) -> Result<UserChangeOutcome, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let Some((target, superadmins)) = Self::lock_for_role_change(&mut tx, id).await? else {
            return Ok(UserChangeOutcome::NotFound);
        };
        if let Some(role) = params.role {
            if guard_last_superadmin(target.role, RoleChange::Assign(role), superadmins).is_err() {
                return Ok(UserChangeOutcome::LastSuperadmin);
            }
        }

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                password_hash = COALESCE($4, password_hash), \
                role = COALESCE($5, role) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(params.username)
        .bind(params.email)
        .bind(params.password_hash)
        .bind(params.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(UserChangeOutcome::Updated(row.into()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<UserChangeOutcome, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let Some((target, superadmins)) = Self::lock_for_role_change(&mut tx, id).await? else {
            return Ok(UserChangeOutcome::NotFound);
        };
        if guard_last_superadmin(target.role, RoleChange::Delete, superadmins).is_err() {
            return Ok(UserChangeOutcome::LastSuperadmin);
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(UserChangeOutcome::Deleted)
    }

    async fn count_superadmins(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(Role::Superadmin)
            .fetch_one(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Self::convert_count(count)
    }
}
