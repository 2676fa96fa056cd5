use std::sync::Arc;

use tracing::info;

use crate::application::repos::CategoriesRepo;
use crate::domain::entities::CategoryRecord;

use super::content::{ContentError, ensure_non_empty, normalize_tags};

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoriesRepo>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoriesRepo>) -> Self {
        Self { categories }
    }

    pub async fn list(&self) -> Result<Vec<CategoryRecord>, ContentError> {
        self.categories
            .list_categories()
            .await
            .map_err(ContentError::from)
    }

    pub async fn create(
        &self,
        name: &str,
        sub_categories: Vec<String>,
    ) -> Result<CategoryRecord, ContentError> {
        let name = ensure_non_empty(name, "name")?;
        // Subcategory names follow the same trim and dedupe rules as tags.
        let sub_categories = normalize_tags(sub_categories);
        let category = self
            .categories
            .create_category(&name, &sub_categories)
            .await?;
        info!(
            target = "sylheti_archive::admin::categories",
            category_id = %category.id,
            sub_categories = category.sub_categories.len(),
            "category created"
        );
        Ok(category)
    }
}
