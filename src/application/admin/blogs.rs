use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    BlogsRepo, BlogsWriteRepo, ContentFilter, CreateBlogParams, RepoError, UpdateBlogParams,
};
use crate::domain::entities::BlogRecord;
use crate::domain::slug::{SlugAsyncError, derive_slug, generate_unique_slug_async};
use crate::domain::types::{ContentStatus, Visibility};
use crate::domain::workflow::{Actor, resolve_publish, resolve_reject, resolve_write};

use super::content::{
    ContentError, ensure_non_empty, normalize_ids, normalize_optional, patch_optional,
};

#[derive(Debug, Clone)]
pub struct CreateBlogCommand {
    pub title: String,
    /// Derived from the title when absent.
    pub slug: Option<String>,
    pub content: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateBlogCommand {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub banner_url: Option<Option<String>>,
    pub author: Option<String>,
    pub status: Option<ContentStatus>,
}

#[derive(Clone)]
pub struct BlogService {
    reader: Arc<dyn BlogsRepo>,
    writer: Arc<dyn BlogsWriteRepo>,
}

impl BlogService {
    pub fn new(reader: Arc<dyn BlogsRepo>, writer: Arc<dyn BlogsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    pub async fn list(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<BlogRecord>, ContentError> {
        self.reader
            .list_blogs(filter, page)
            .await
            .map_err(ContentError::from)
    }

    pub async fn get(&self, id: Uuid) -> Result<BlogRecord, ContentError> {
        self.reader
            .find_blog(id)
            .await?
            .ok_or(ContentError::NotFound("blog"))
    }

    pub async fn find_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<BlogRecord, ContentError> {
        self.reader
            .find_blog_by_slug(slug)
            .await?
            .filter(|blog| visibility.admits(blog.review.status))
            .ok_or(ContentError::NotFound("blog"))
    }

    pub async fn create(
        &self,
        actor: Actor,
        command: CreateBlogCommand,
    ) -> Result<BlogRecord, ContentError> {
        let title = ensure_non_empty(&command.title, "title")?;
        let content = ensure_non_empty(&command.content, "content")?;
        let author = ensure_non_empty(&command.author, "author")?;
        let change = resolve_write(actor, command.status, None, OffsetDateTime::now_utc())?;

        let slug = match command.slug.as_deref().map(str::trim) {
            Some(requested) if !requested.is_empty() => {
                self.claim_slug(requested, None).await?
            }
            _ => self.unique_slug(&title).await?,
        };

        let blog = self
            .writer
            .create_blog(CreateBlogParams {
                title,
                slug,
                content,
                banner_url: normalize_optional(command.banner_url),
                author,
                created_by_id: actor.id,
                change,
            })
            .await?;

        info!(
            target = "sylheti_archive::admin::blogs",
            blog_id = %blog.id,
            slug = %blog.slug,
            actor = %actor.id,
            "blog created"
        );
        Ok(blog)
    }

    pub async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        command: UpdateBlogCommand,
    ) -> Result<BlogRecord, ContentError> {
        let current = self.get(id).await?;
        let change = resolve_write(
            actor,
            command.status,
            Some(current.review.status),
            OffsetDateTime::now_utc(),
        )?;

        let title = match command.title {
            Some(title) => ensure_non_empty(&title, "title")?,
            None => current.title,
        };
        let content = match command.content {
            Some(content) => ensure_non_empty(&content, "content")?,
            None => current.content,
        };
        let author = match command.author {
            Some(author) => ensure_non_empty(&author, "author")?,
            None => current.author,
        };
        // Slugs stay stable across title edits unless explicitly replaced.
        let slug = match command.slug {
            Some(requested) if requested.trim() != current.slug => {
                self.claim_slug(requested.trim(), Some(id)).await?
            }
            _ => current.slug,
        };

        let blog = self
            .writer
            .update_blog(UpdateBlogParams {
                id,
                title,
                slug,
                content,
                banner_url: patch_optional(current.banner_url, command.banner_url),
                author,
                change,
            })
            .await?;
        Ok(blog)
    }

    pub async fn publish(&self, actor: Actor, id: Uuid) -> Result<BlogRecord, ContentError> {
        let change = resolve_publish(actor, OffsetDateTime::now_utc())?;
        self.writer
            .change_blog_status(id, change)
            .await?
            .ok_or(ContentError::NotFound("blog"))
    }

    pub async fn reject(
        &self,
        actor: Actor,
        id: Uuid,
        reason: &str,
    ) -> Result<BlogRecord, ContentError> {
        let change = resolve_reject(actor, reason)?;
        self.writer
            .change_blog_status(id, change)
            .await?
            .ok_or(ContentError::NotFound("blog"))
    }

    pub async fn publish_many(&self, actor: Actor, ids: &[Uuid]) -> Result<u64, ContentError> {
        let ids = normalize_ids(ids)?;
        let now = OffsetDateTime::now_utc();
        resolve_publish(actor, now)?;
        self.writer
            .publish_blogs(&ids, actor.id, now)
            .await
            .map_err(ContentError::from)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ContentError> {
        if self.writer.delete_blog(id).await? {
            Ok(())
        } else {
            Err(ContentError::NotFound("blog"))
        }
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, ContentError> {
        let ids = normalize_ids(ids)?;
        self.writer
            .delete_blogs(&ids)
            .await
            .map_err(ContentError::from)
    }

    async fn claim_slug(
        &self,
        requested: &str,
        excluding: Option<Uuid>,
    ) -> Result<String, ContentError> {
        let slug = derive_slug(requested)?;
        if self.reader.blog_slug_exists(&slug, excluding).await? {
            return Err(ContentError::SlugTaken(slug));
        }
        Ok(slug)
    }

    async fn unique_slug(&self, title: &str) -> Result<String, ContentError> {
        let reader = self.reader.clone();
        generate_unique_slug_async(title, |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .blog_slug_exists(&candidate, None)
                    .await
                    .map(|exists| !exists)
            }
        })
        .await
        .map_err(ContentError::from)
    }
}

impl From<SlugAsyncError<RepoError>> for ContentError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => ContentError::Slug(err),
            SlugAsyncError::Predicate(err) => ContentError::Repo(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::domain::entities::ReviewState;
    use crate::domain::types::Role;
    use crate::domain::workflow::{Approval, StatusChange};

    #[derive(Default)]
    struct StubBlogs {
        blogs: Mutex<Vec<BlogRecord>>,
    }

    fn apply(blog: &mut BlogRecord, change: StatusChange) {
        blog.review.status = change.status;
        blog.review.rejection_reason = change.rejection_reason;
        match change.approval {
            Approval::Keep => {}
            Approval::Stamp { by, at } => {
                blog.review.approved_by_id = Some(by);
                blog.review.approved_at = Some(at);
                if blog.published_at.is_none() {
                    blog.published_at = Some(at);
                }
            }
            Approval::Clear => {
                blog.review.approved_by_id = None;
                blog.review.approved_at = None;
            }
        }
    }

    #[async_trait]
    impl BlogsRepo for StubBlogs {
        async fn find_blog(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError> {
            Ok(self
                .blogs
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.id == id)
                .cloned())
        }

        async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError> {
            Ok(self
                .blogs
                .lock()
                .unwrap()
                .iter()
                .find(|b| b.slug == slug)
                .cloned())
        }

        async fn blog_slug_exists(
            &self,
            slug: &str,
            excluding: Option<Uuid>,
        ) -> Result<bool, RepoError> {
            Ok(self
                .blogs
                .lock()
                .unwrap()
                .iter()
                .any(|b| b.slug == slug && Some(b.id) != excluding))
        }

        async fn list_blogs(
            &self,
            _filter: &ContentFilter,
            page: PageRequest,
        ) -> Result<Page<BlogRecord>, RepoError> {
            Ok(page.slice(self.blogs.lock().unwrap().clone()))
        }
    }

    #[async_trait]
    impl BlogsWriteRepo for StubBlogs {
        async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError> {
            let mut blog = BlogRecord {
                id: Uuid::new_v4(),
                title: params.title,
                slug: params.slug,
                content: params.content,
                banner_url: params.banner_url,
                author: params.author,
                review: ReviewState::draft(),
                published_at: None,
                created_by_id: Some(params.created_by_id),
                created_at: OffsetDateTime::now_utc(),
            };
            apply(&mut blog, params.change);
            self.blogs.lock().unwrap().push(blog.clone());
            Ok(blog)
        }

        async fn update_blog(&self, params: UpdateBlogParams) -> Result<BlogRecord, RepoError> {
            let mut blogs = self.blogs.lock().unwrap();
            let blog = blogs
                .iter_mut()
                .find(|b| b.id == params.id)
                .ok_or(RepoError::NotFound)?;
            blog.title = params.title;
            blog.slug = params.slug;
            blog.content = params.content;
            blog.banner_url = params.banner_url;
            blog.author = params.author;
            apply(blog, params.change);
            Ok(blog.clone())
        }

        async fn change_blog_status(
            &self,
            id: Uuid,
            change: StatusChange,
        ) -> Result<Option<BlogRecord>, RepoError> {
            let mut blogs = self.blogs.lock().unwrap();
            Ok(blogs.iter_mut().find(|b| b.id == id).map(|blog| {
                apply(blog, change);
                blog.clone()
            }))
        }

        async fn publish_blogs(
            &self,
            ids: &[Uuid],
            approver: Uuid,
            at: OffsetDateTime,
        ) -> Result<u64, RepoError> {
            let mut blogs = self.blogs.lock().unwrap();
            let mut count = 0;
            for blog in blogs.iter_mut().filter(|b| ids.contains(&b.id)) {
                apply(blog, StatusChange::publish(approver, at));
                count += 1;
            }
            Ok(count)
        }

        async fn delete_blog(&self, id: Uuid) -> Result<bool, RepoError> {
            let mut blogs = self.blogs.lock().unwrap();
            let before = blogs.len();
            blogs.retain(|b| b.id != id);
            Ok(blogs.len() != before)
        }

        async fn delete_blogs(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
            let mut blogs = self.blogs.lock().unwrap();
            let before = blogs.len();
            blogs.retain(|b| !ids.contains(&b.id));
            Ok((before - blogs.len()) as u64)
        }
    }

    fn service() -> BlogService {
        let stub = Arc::new(StubBlogs::default());
        BlogService::new(stub.clone(), stub)
    }

    fn command(title: &str) -> CreateBlogCommand {
        CreateBlogCommand {
            title: title.to_string(),
            slug: None,
            content: "## Notes\n\nRecorded in Sunamganj.".to_string(),
            banner_url: None,
            author: "Archive team".to_string(),
            status: None,
        }
    }

    fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }

    #[tokio::test]
    async fn colliding_titles_get_numbered_slugs() {
        let service = service();
        let first = service.create(admin(), command("Field Notes")).await.unwrap();
        let second = service.create(admin(), command("Field Notes")).await.unwrap();

        assert_eq!(first.slug, "field-notes");
        assert_eq!(second.slug, "field-notes-2");
    }

    #[tokio::test]
    async fn explicit_duplicate_slug_is_a_conflict() {
        let service = service();
        service.create(admin(), command("Field Notes")).await.unwrap();
        let err = service
            .create(
                admin(),
                CreateBlogCommand {
                    slug: Some("field-notes".to_string()),
                    ..command("Another")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::SlugTaken(slug) if slug == "field-notes"));
    }

    #[tokio::test]
    async fn published_at_survives_republish_and_redraft() {
        let service = service();
        let admin = admin();
        let blog = service.create(admin, command("Boat songs")).await.unwrap();
        assert_eq!(blog.published_at, None);

        let published = service.publish(admin, blog.id).await.unwrap();
        let first_published_at = published.published_at;
        assert!(first_published_at.is_some());

        let drafted = service
            .update(
                admin,
                blog.id,
                UpdateBlogCommand {
                    status: Some(ContentStatus::Draft),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(drafted.review.status, ContentStatus::Draft);
        assert_eq!(drafted.published_at, first_published_at);

        let again = service.publish(admin, blog.id).await.unwrap();
        assert_eq!(again.published_at, first_published_at);
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_public_slug_lookup() {
        let service = service();
        let blog = service.create(admin(), command("Hidden")).await.unwrap();
        let err = service
            .find_by_slug(&blog.slug, Visibility::PublishedOnly)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound("blog")));
        assert!(service.find_by_slug(&blog.slug, Visibility::All).await.is_ok());
    }

    #[tokio::test]
    async fn reject_requires_reason_and_records_it() {
        let service = service();
        let admin = admin();
        let blog = service.create(admin, command("Draft")).await.unwrap();
        assert!(service.reject(admin, blog.id, "  ").await.is_err());

        let rejected = service
            .reject(admin, blog.id, "needs sources")
            .await
            .unwrap();
        assert_eq!(rejected.review.status, ContentStatus::Rejected);
        assert_eq!(
            rejected.review.rejection_reason.as_deref(),
            Some("needs sources")
        );
    }
}
