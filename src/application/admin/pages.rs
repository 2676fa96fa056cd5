use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::info;

use crate::application::repos::PagesRepo;
use crate::domain::pages::{PageSections, PageSlug};

use super::content::ContentError;

/// A static page as served to readers and editors. Pages that were never
/// saved come back with their default title and empty sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub slug: String,
    pub title: String,
    pub sections: Value,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePageCommand {
    pub title: Option<String>,
    pub sections: Option<Value>,
}

#[derive(Clone)]
pub struct PageService {
    pages: Arc<dyn PagesRepo>,
}

impl PageService {
    pub fn new(pages: Arc<dyn PagesRepo>) -> Self {
        Self { pages }
    }

    pub async fn get(&self, slug: &str) -> Result<PageContent, ContentError> {
        let slug: PageSlug = slug.parse()?;
        let content = match self.pages.find_page(slug.as_str()).await? {
            Some(page) => PageContent {
                slug: page.slug,
                title: page.title,
                sections: page.sections,
                updated_at: Some(page.updated_at),
            },
            None => PageContent {
                slug: slug.as_str().to_string(),
                title: slug.default_title().to_string(),
                sections: PageSections::empty(slug).to_value(),
                updated_at: None,
            },
        };
        Ok(content)
    }

    /// Validate sections against the page's schema and store them.
    pub async fn update(
        &self,
        slug: &str,
        command: UpdatePageCommand,
    ) -> Result<PageContent, ContentError> {
        let slug: PageSlug = slug.parse()?;
        let current = self.get(slug.as_str()).await?;

        let title = match command.title.as_deref().map(str::trim) {
            Some("") => return Err(ContentError::ConstraintViolation("title")),
            Some(title) => title.to_string(),
            None => current.title,
        };
        let sections = match command.sections {
            Some(raw) => PageSections::parse(slug, raw)?.to_value(),
            None => current.sections,
        };

        let page = self
            .pages
            .upsert_page(slug.as_str(), &title, sections)
            .await?;
        info!(
            target = "sylheti_archive::admin::pages",
            slug = %page.slug,
            "page content saved"
        );
        Ok(PageContent {
            slug: page.slug,
            title: page.title,
            sections: page.sections,
            updated_at: Some(page.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::application::repos::RepoError;
    use crate::domain::entities::PageRecord;
    use crate::domain::error::DomainError;

    #[derive(Default)]
    struct StubPages {
        pages: Mutex<Vec<PageRecord>>,
    }

    #[async_trait]
    impl PagesRepo for StubPages {
        async fn find_page(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
            Ok(self
                .pages
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.slug == slug)
                .cloned())
        }

        async fn upsert_page(
            &self,
            slug: &str,
            title: &str,
            sections: Value,
        ) -> Result<PageRecord, RepoError> {
            let mut pages = self.pages.lock().unwrap();
            pages.retain(|p| p.slug != slug);
            let page = PageRecord {
                id: Uuid::new_v4(),
                slug: slug.to_string(),
                title: title.to_string(),
                sections,
                updated_at: OffsetDateTime::now_utc(),
            };
            pages.push(page.clone());
            Ok(page)
        }
    }

    fn service() -> PageService {
        PageService::new(Arc::new(StubPages::default()))
    }

    #[tokio::test]
    async fn unsaved_page_has_default_content() {
        let page = service().get("people").await.unwrap();
        assert_eq!(page.title, "People");
        assert_eq!(page.sections, json!({"groups": []}));
        assert_eq!(page.updated_at, None);
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let err = service().get("contact").await.unwrap_err();
        assert!(matches!(
            err,
            ContentError::Domain(DomainError::NotFound { entity: "page" })
        ));
    }

    #[tokio::test]
    async fn sections_are_validated_per_page() {
        let service = service();
        let err = service
            .update(
                "reports",
                UpdatePageCommand {
                    title: None,
                    sections: Some(json!({"groups": []})),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ContentError::Domain(DomainError::Validation { .. })
        ));

        let saved = service
            .update(
                "reports",
                UpdatePageCommand {
                    title: Some("Annual reports".to_string()),
                    sections: Some(json!({
                        "reports": [{"title": "2023", "url": "https://utfs.io/f/r.pdf"}]
                    })),
                },
            )
            .await
            .unwrap();
        assert_eq!(saved.title, "Annual reports");

        let fetched = service.get("reports").await.unwrap();
        assert_eq!(fetched.sections["reports"][0]["title"], "2023");
    }
}
