use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{FacetQuery, RepoError, SearchRepo, TextMatch};
use crate::domain::entities::{FolderRecord, MediaRecord};
use crate::domain::search::{MatchTier, like_pattern};
use crate::domain::types::ContentStatus;

use super::PostgresRepositories;
use super::folders::{FOLDER_COLUMNS, FolderRow};
use super::media::{MEDIA_COLUMNS, MediaRow};

impl PostgresRepositories {
    fn push_text_match<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        column: &'static str,
        text: &TextMatch,
    ) {
        if let Some(term) = text.term.as_deref() {
            qb.push(" AND ")
                .push(column)
                .push(" ILIKE ")
                .push_bind(like_pattern(term, text.tier));
        }
    }

    fn push_facets<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &FacetQuery) {
        qb.push(" AND m.status = ").push_bind(ContentStatus::Published);
        if let Some(term) = query.term.as_deref() {
            qb.push(" AND m.title ILIKE ")
                .push_bind(like_pattern(term, MatchTier::Contains));
        }
        if !query.media_types.is_empty() {
            qb.push(" AND m.media_type = ANY(")
                .push_bind(query.media_types.clone())
                .push(")");
        }
        if !query.languages.is_empty() {
            let languages: Vec<String> = query
                .languages
                .iter()
                .map(|language| language.to_lowercase())
                .collect();
            qb.push(" AND LOWER(m.language) = ANY(")
                .push_bind(languages)
                .push(")");
        }
        if !query.tags.is_empty() {
            let tags: Vec<String> = query.tags.iter().map(|tag| tag.to_lowercase()).collect();
            qb.push(
                " AND EXISTS (SELECT 1 FROM media_tags mt INNER JOIN tags t ON t.id = mt.tag_id \
                 WHERE mt.media_id = m.id AND LOWER(t.name) = ANY(",
            )
            .push_bind(tags)
            .push("))");
        }
        if let Some(scope) = query.scope.as_ref() {
            qb.push(" AND m.folder_id = ANY(")
                .push_bind(scope.clone())
                .push(")");
        }
    }
}

#[async_trait]
impl SearchRepo for PostgresRepositories {
    async fn search_collections(
        &self,
        text: &TextMatch,
        scope: Option<&[Uuid]>,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {FOLDER_COLUMNS} FROM folders f WHERE f.status = "
        ));
        qb.push_bind(ContentStatus::Published);
        Self::push_text_match(&mut qb, "f.name", text);
        if let Some(scope) = scope {
            qb.push(" AND f.parent_id = ANY(")
                .push_bind(scope.to_vec())
                .push(")");
        }
        qb.push(" ORDER BY f.created_at DESC, f.id DESC");

        let rows = qb
            .build_query_as::<FolderRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Ok(rows.into_iter().map(FolderRecord::from).collect())
    }

    async fn search_media(
        &self,
        text: &TextMatch,
        scope: Option<&[Uuid]>,
    ) -> Result<Vec<MediaRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MEDIA_COLUMNS} FROM media_items m WHERE m.status = "
        ));
        qb.push_bind(ContentStatus::Published);
        Self::push_text_match(&mut qb, "m.title", text);
        if let Some(scope) = scope {
            qb.push(" AND m.folder_id = ANY(")
                .push_bind(scope.to_vec())
                .push(")");
        }
        qb.push(" ORDER BY m.created_at DESC, m.id DESC");

        let rows = qb
            .build_query_as::<MediaRow>()
            .fetch_all(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        Ok(rows.into_iter().map(MediaRecord::from).collect())
    }

    async fn search_media_faceted(
        &self,
        query: &FacetQuery,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, RepoError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM media_items m WHERE TRUE");
        Self::push_facets(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(RepoError::from_persistence)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MEDIA_COLUMNS} FROM media_items m WHERE TRUE"
        ));
        Self::push_facets(&mut qb, query);
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
}
