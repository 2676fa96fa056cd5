use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CategoriesRepo, RepoError};
use crate::domain::entities::{CategoryRecord, SubCategoryRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct SubCategoryRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
}

impl From<SubCategoryRow> for SubCategoryRecord {
    fn from(row: SubCategoryRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
        }
    }
}

#[async_trait]
impl CategoriesRepo for PostgresRepositories {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let categories = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name FROM categories ORDER BY LOWER(name), id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        let subs = sqlx::query_as::<_, SubCategoryRow>(
            "SELECT id, category_id, name FROM sub_categories ORDER BY LOWER(name), id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(RepoError::from_persistence)?;

        let mut by_category: HashMap<Uuid, Vec<SubCategoryRecord>> = HashMap::new();
        for sub in subs {
            by_category
                .entry(sub.category_id)
                .or_default()
                .push(sub.into());
        }

        Ok(categories
            .into_iter()
            .map(|row| CategoryRecord {
                sub_categories: by_category.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
            })
            .collect())
    }

    async fn create_category(
        &self,
        name: &str,
        sub_categories: &[String],
    ) -> Result<CategoryRecord, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let category = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let mut subs = Vec::with_capacity(sub_categories.len());
        for sub in sub_categories {
            let row = sqlx::query_as::<_, SubCategoryRow>(
                "INSERT INTO sub_categories (id, category_id, name) VALUES ($1, $2, $3) \
                 RETURNING id, category_id, name",
            )
            .bind(Uuid::new_v4())
            .bind(category.id)
            .bind(sub)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            subs.push(row.into());
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(CategoryRecord {
            id: category.id,
            name: category.name,
            sub_categories: subs,
        })
    }
}
