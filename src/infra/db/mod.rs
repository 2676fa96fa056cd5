//! Postgres-backed repository implementations.

mod blogs;
mod categories;
mod folders;
mod health;
mod media;
mod pages;
mod search;
mod users;
mod util;
mod views;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{ContentFilter, RepoError};
use crate::domain::entities::ReviewState;
use crate::domain::search::escape_like;
use crate::domain::types::ContentStatus;
use crate::domain::workflow::{Approval, StatusChange};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    /// `status = …, approved_* = …, rejection_reason = …` for an UPDATE.
    fn push_status_change<'q>(qb: &mut QueryBuilder<'q, Postgres>, change: &StatusChange) {
        qb.push("status = ").push_bind(change.status);
        match change.approval {
            Approval::Keep => {}
            Approval::Stamp { by, at } => {
                qb.push(", approved_by_id = ")
                    .push_bind(by)
                    .push(", approved_at = ")
                    .push_bind(at);
            }
            Approval::Clear => {
                qb.push(", approved_by_id = NULL, approved_at = NULL");
            }
        }
        qb.push(", rejection_reason = ")
            .push_bind(change.rejection_reason.clone());
    }

    /// Append `AND …` conditions for an admin listing filter.
    fn push_content_filter<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        text_column: &'static str,
        filter: &ContentFilter,
    ) {
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
        {
            qb.push(" AND ")
                .push(text_column)
                .push(" ILIKE ")
                .push_bind(format!("%{}%", escape_like(search)));
        }
    }

    fn push_page<'q>(qb: &mut QueryBuilder<'q, Postgres>, page: PageRequest) {
        qb.push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
    }
}

/// Approval columns for an INSERT. `Keep` has nothing to keep on a new row.
fn insert_approval(change: &StatusChange) -> (Option<Uuid>, Option<OffsetDateTime>) {
    match change.approval {
        Approval::Stamp { by, at } => (Some(by), Some(at)),
        Approval::Keep | Approval::Clear => (None, None),
    }
}

fn review_state(
    status: ContentStatus,
    approved_by_id: Option<Uuid>,
    approved_at: Option<OffsetDateTime>,
    rejection_reason: Option<String>,
) -> ReviewState {
    ReviewState {
        status,
        approved_by_id,
        approved_at,
        rejection_reason,
    }
}
