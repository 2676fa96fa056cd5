//! In-memory adapters used to drive the router without Postgres.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

use sylheti_archive::application::auth::hash_password;
use sylheti_archive::application::contact::{MailError, Mailer, OutgoingMail};
use sylheti_archive::application::pagination::{Page, PageRequest};
use sylheti_archive::application::repos::{
    BlogsRepo, BlogsWriteRepo, CascadeOutcome, CategoriesRepo, ContentFilter, CreateBlogParams,
    CreateFolderParams, CreateMediaParams, CreateUserParams, FacetQuery, FoldersRepo,
    FoldersWriteRepo, HealthRepo, MediaFilter, MediaRepo, MediaViewsRepo, MediaWriteRepo,
    PagesRepo, RepoError, SearchRepo, TextMatch, UpdateBlogParams, UpdateFolderParams,
    UpdateMediaParams, UpdateUserParams, UserChangeOutcome, UsersRepo,
};
use sylheti_archive::domain::entities::{
    BlogRecord, CategoryRecord, FolderRecord, MediaRecord, PageRecord, ReviewState,
    SubCategoryRecord, UserRecord,
};
use sylheti_archive::domain::search::{MatchTier, match_tier};
use sylheti_archive::domain::tree::{ancestor_chain, descendant_closure};
use sylheti_archive::domain::types::{ContentStatus, Role, Visibility};
use sylheti_archive::domain::views::{ViewKey, ViewOutcome};
use sylheti_archive::domain::workflow::{Approval, StatusChange};
use sylheti_archive::infra::http::{ApiConfig, ApiState, build_router};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const CRON_SECRET: &str = "cron-test-secret";
pub const PASSWORD: &str = "correct horse battery";

#[derive(Default)]
struct Store {
    clock: i64,
    users: Vec<UserRecord>,
    folders: Vec<FolderRecord>,
    media: Vec<MediaRecord>,
    blogs: Vec<BlogRecord>,
    pages: HashMap<String, PageRecord>,
    ledger: Vec<(ViewKey, OffsetDateTime)>,
    categories: Vec<CategoryRecord>,
}

impl Store {
    /// Strictly increasing timestamps keep "newest first" orderings deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += 1;
        OffsetDateTime::now_utc() - Duration::days(1) + Duration::seconds(self.clock)
    }

    fn edges(&self) -> Vec<(Uuid, Option<Uuid>)> {
        self.folders.iter().map(|f| (f.id, f.parent_id)).collect()
    }

    fn cascade(&mut self, id: Uuid) -> Option<CascadeOutcome> {
        if !self.folders.iter().any(|f| f.id == id) {
            return None;
        }
        let closure = descendant_closure(id, &self.edges());
        let folders_before = self.folders.len();
        self.folders.retain(|f| !closure.contains(&f.id));
        let media_before = self.media.len();
        self.media
            .retain(|m| m.folder_id.is_none_or(|folder| !closure.contains(&folder)));
        Some(CascadeOutcome {
            folders: (folders_before - self.folders.len()) as u64,
            media: (media_before - self.media.len()) as u64,
        })
    }

    fn superadmins(&self) -> u64 {
        self.users
            .iter()
            .filter(|u| u.role == Role::Superadmin)
            .count() as u64
    }
}

fn apply_change(review: &mut ReviewState, change: &StatusChange) {
    review.status = change.status;
    match change.approval {
        Approval::Keep => {}
        Approval::Stamp { by, at } => {
            review.approved_by_id = Some(by);
            review.approved_at = Some(at);
        }
        Approval::Clear => {
            review.approved_by_id = None;
            review.approved_at = None;
        }
    }
    review.rejection_reason = change.rejection_reason.clone();
}

fn review_from(change: &StatusChange) -> ReviewState {
    let mut review = ReviewState::draft();
    apply_change(&mut review, change);
    review
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

fn text_matches(name: &str, text: &TextMatch) -> bool {
    match text.term.as_deref() {
        None => true,
        Some(term) => match (text.tier, match_tier(name, term)) {
            (MatchTier::Prefix, Some(MatchTier::Prefix)) => true,
            (MatchTier::Contains, Some(_)) => true,
            _ => false,
        },
    }
}

fn newest_first<T>(items: &mut [T], created: impl Fn(&T) -> OffsetDateTime) {
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
}

/// Every repository trait over one mutex-guarded store.
#[derive(Default)]
pub struct MemoryRepos {
    store: Mutex<Store>,
    pub health_down: Mutex<bool>,
}

impl MemoryRepos {
    pub fn seed_user(&self, username: &str, role: Role) -> UserRecord {
        let mut store = self.store.lock().unwrap();
        let created_at = store.tick();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.org"),
            password_hash: hash_password(PASSWORD).unwrap(),
            role,
            created_at,
        };
        store.users.push(user.clone());
        user
    }

    pub fn folder(&self, id: Uuid) -> Option<FolderRecord> {
        let store = self.store.lock().unwrap();
        store.folders.iter().find(|f| f.id == id).cloned()
    }

    pub fn media_item(&self, id: Uuid) -> Option<MediaRecord> {
        let store = self.store.lock().unwrap();
        store.media.iter().find(|m| m.id == id).cloned()
    }

    pub fn media_count(&self) -> usize {
        self.store.lock().unwrap().media.len()
    }

    pub fn ledger_len(&self) -> usize {
        self.store.lock().unwrap().ledger.len()
    }

    /// Push every ledger row `days` into the past.
    pub fn age_ledger(&self, days: i64) {
        let mut store = self.store.lock().unwrap();
        for (_, created_at) in store.ledger.iter_mut() {
            *created_at -= Duration::days(days);
        }
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut users = store.users.clone();
        newest_first(&mut users, |u| u.created_at);
        Ok(page.slice(users))
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        if store
            .users
            .iter()
            .any(|u| u.email == params.email || u.username == params.username)
        {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        let created_at = store.tick();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            role: params.role,
            created_at,
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: Uuid,
        params: UpdateUserParams,
    ) -> Result<UserChangeOutcome, RepoError> {
        let mut store = self.store.lock().unwrap();
        let superadmins = store.superadmins();
        let Some(user) = store.users.iter_mut().find(|u| u.id == id) else {
            return Ok(UserChangeOutcome::NotFound);
        };
        if user.role == Role::Superadmin
            && params.role.is_some_and(|role| role != Role::Superadmin)
            && superadmins <= 1
        {
            return Ok(UserChangeOutcome::LastSuperadmin);
        }
        if let Some(username) = params.username {
            user.username = username;
        }
        if let Some(email) = params.email {
            user.email = email;
        }
        if let Some(hash) = params.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = params.role {
            user.role = role;
        }
        Ok(UserChangeOutcome::Updated(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<UserChangeOutcome, RepoError> {
        let mut store = self.store.lock().unwrap();
        let superadmins = store.superadmins();
        let Some(index) = store.users.iter().position(|u| u.id == id) else {
            return Ok(UserChangeOutcome::NotFound);
        };
        if store.users[index].role == Role::Superadmin && superadmins <= 1 {
            return Ok(UserChangeOutcome::LastSuperadmin);
        }
        store.users.remove(index);
        Ok(UserChangeOutcome::Deleted)
    }

    async fn count_superadmins(&self) -> Result<u64, RepoError> {
        Ok(self.store.lock().unwrap().superadmins())
    }
}

#[async_trait]
impl FoldersRepo for MemoryRepos {
    async fn find_folder(&self, id: Uuid) -> Result<Option<FolderRecord>, RepoError> {
        Ok(self.folder(id))
    }

    async fn list_folders(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<FolderRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut folders: Vec<_> = store
            .folders
            .iter()
            .filter(|f| filter.status.is_none_or(|s| f.review.status == s))
            .filter(|f| contains_ci(&f.name, filter.search.as_deref()))
            .cloned()
            .collect();
        newest_first(&mut folders, |f| f.created_at);
        Ok(page.slice(folders))
    }

    async fn list_root_folders(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut folders: Vec<_> = store
            .folders
            .iter()
            .filter(|f| f.parent_id.is_none() && visibility.admits(f.review.status))
            .cloned()
            .collect();
        newest_first(&mut folders, |f| f.created_at);
        Ok(folders)
    }

    async fn list_all_folders(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut folders: Vec<_> = store
            .folders
            .iter()
            .filter(|f| visibility.admits(f.review.status))
            .cloned()
            .collect();
        folders.sort_by_key(|f| f.created_at);
        Ok(folders)
    }

    async fn list_child_folders(
        &self,
        parent_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut folders: Vec<_> = store
            .folders
            .iter()
            .filter(|f| f.parent_id == Some(parent_id) && visibility.admits(f.review.status))
            .cloned()
            .collect();
        newest_first(&mut folders, |f| f.created_at);
        Ok(folders)
    }

    async fn list_ancestors(&self, id: Uuid) -> Result<Vec<FolderRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let parents: HashMap<_, _> = store.folders.iter().map(|f| (f.id, f.parent_id)).collect();
        Ok(ancestor_chain(id, &parents)
            .into_iter()
            .filter_map(|ancestor| store.folders.iter().find(|f| f.id == ancestor).cloned())
            .collect())
    }

    async fn descendant_ids(&self, id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let store = self.store.lock().unwrap();
        if !store.folders.iter().any(|f| f.id == id) {
            return Ok(Vec::new());
        }
        Ok(descendant_closure(id, &store.edges()))
    }
}

#[async_trait]
impl FoldersWriteRepo for MemoryRepos {
    async fn create_folder(&self, params: CreateFolderParams) -> Result<FolderRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        let created_at = store.tick();
        let folder = FolderRecord {
            id: Uuid::new_v4(),
            name: params.name,
            description: params.description,
            image: params.image,
            parent_id: params.parent_id,
            review: review_from(&params.change),
            created_at,
        };
        store.folders.push(folder.clone());
        Ok(folder)
    }

    async fn update_folder(&self, params: UpdateFolderParams) -> Result<FolderRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        let folder = store
            .folders
            .iter_mut()
            .find(|f| f.id == params.id)
            .ok_or(RepoError::NotFound)?;
        folder.name = params.name;
        folder.description = params.description;
        folder.image = params.image;
        folder.parent_id = params.parent_id;
        apply_change(&mut folder.review, &params.change);
        Ok(folder.clone())
    }

    async fn change_folder_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<FolderRecord>, RepoError> {
        let mut store = self.store.lock().unwrap();
        Ok(store.folders.iter_mut().find(|f| f.id == id).map(|folder| {
            apply_change(&mut folder.review, &change);
            folder.clone()
        }))
    }

    async fn publish_folders(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let change = StatusChange::publish(approver, at);
        let mut store = self.store.lock().unwrap();
        let mut count = 0;
        for folder in store.folders.iter_mut().filter(|f| ids.contains(&f.id)) {
            apply_change(&mut folder.review, &change);
            count += 1;
        }
        Ok(count)
    }

    async fn delete_folder_tree(&self, id: Uuid) -> Result<Option<CascadeOutcome>, RepoError> {
        Ok(self.store.lock().unwrap().cascade(id))
    }

    async fn delete_folder_trees(&self, ids: &[Uuid]) -> Result<CascadeOutcome, RepoError> {
        let mut store = self.store.lock().unwrap();
        let mut total = CascadeOutcome::default();
        for id in ids {
            if let Some(outcome) = store.cascade(*id) {
                total.absorb(outcome);
            }
        }
        Ok(total)
    }
}

#[async_trait]
impl MediaRepo for MemoryRepos {
    async fn find_media(&self, id: Uuid) -> Result<Option<MediaRecord>, RepoError> {
        Ok(self.media_item(id))
    }

    async fn list_media(
        &self,
        filter: &MediaFilter,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut media: Vec<_> = store
            .media
            .iter()
            .filter(|m| filter.status.is_none_or(|s| m.review.status == s))
            .filter(|m| filter.folder_id.is_none_or(|id| m.folder_id == Some(id)))
            .filter(|m| filter.media_type.is_none_or(|t| m.media_type == t))
            .filter(|m| contains_ci(&m.title, filter.search.as_deref()))
            .cloned()
            .collect();
        newest_first(&mut media, |m| m.created_at);
        Ok(page.slice(media))
    }

    async fn list_media_in_folder(
        &self,
        folder_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<MediaRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut media: Vec<_> = store
            .media
            .iter()
            .filter(|m| m.folder_id == Some(folder_id) && visibility.admits(m.review.status))
            .cloned()
            .collect();
        newest_first(&mut media, |m| m.created_at);
        Ok(media)
    }
}

fn new_media(params: CreateMediaParams, created_at: OffsetDateTime) -> MediaRecord {
    MediaRecord {
        id: Uuid::new_v4(),
        title: params.title,
        description: params.description,
        image: params.image,
        media_type: params.media_type,
        file_url: params.file_url,
        external_link: params.external_link,
        language: params.language,
        folder_id: params.folder_id,
        contributor_id: Some(params.contributor_id),
        review: review_from(&params.change),
        views: 0,
        tags: params.tags,
        created_at,
    }
}

#[async_trait]
impl MediaWriteRepo for MemoryRepos {
    async fn create_media(&self, params: CreateMediaParams) -> Result<MediaRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        let created_at = store.tick();
        let media = new_media(params, created_at);
        store.media.push(media.clone());
        Ok(media)
    }

    async fn create_media_batch(
        &self,
        params: Vec<CreateMediaParams>,
    ) -> Result<Vec<MediaRecord>, RepoError> {
        let mut store = self.store.lock().unwrap();
        let mut created = Vec::with_capacity(params.len());
        for item in params {
            let created_at = store.tick();
            created.push(new_media(item, created_at));
        }
        store.media.extend(created.iter().cloned());
        Ok(created)
    }

    async fn update_media(&self, params: UpdateMediaParams) -> Result<MediaRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        let media = store
            .media
            .iter_mut()
            .find(|m| m.id == params.id)
            .ok_or(RepoError::NotFound)?;
        media.title = params.title;
        media.description = params.description;
        media.image = params.image;
        media.media_type = params.media_type;
        media.file_url = params.file_url;
        media.external_link = params.external_link;
        media.language = params.language;
        media.folder_id = params.folder_id;
        media.tags = params.tags;
        apply_change(&mut media.review, &params.change);
        Ok(media.clone())
    }

    async fn move_media(
        &self,
        id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Option<MediaRecord>, RepoError> {
        let mut store = self.store.lock().unwrap();
        Ok(store.media.iter_mut().find(|m| m.id == id).map(|media| {
            media.folder_id = folder_id;
            media.clone()
        }))
    }

    async fn change_media_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<MediaRecord>, RepoError> {
        let mut store = self.store.lock().unwrap();
        Ok(store.media.iter_mut().find(|m| m.id == id).map(|media| {
            apply_change(&mut media.review, &change);
            media.clone()
        }))
    }

    async fn publish_media(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let change = StatusChange::publish(approver, at);
        let mut store = self.store.lock().unwrap();
        let mut count = 0;
        for media in store.media.iter_mut().filter(|m| ids.contains(&m.id)) {
            apply_change(&mut media.review, &change);
            count += 1;
        }
        Ok(count)
    }

    async fn delete_media(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut store = self.store.lock().unwrap();
        let before = store.media.len();
        store.media.retain(|m| m.id != id);
        Ok(store.media.len() < before)
    }

    async fn delete_media_many(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        let mut store = self.store.lock().unwrap();
        let before = store.media.len();
        store.media.retain(|m| !ids.contains(&m.id));
        Ok((before - store.media.len()) as u64)
    }
}

#[async_trait]
impl BlogsRepo for MemoryRepos {
    async fn find_blog(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store.blogs.iter().find(|b| b.id == id).cloned())
    }

    async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store.blogs.iter().find(|b| b.slug == slug).cloned())
    }

    async fn blog_slug_exists(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, RepoError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .blogs
            .iter()
            .any(|b| b.slug == slug && Some(b.id) != excluding))
    }

    async fn list_blogs(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<BlogRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut blogs: Vec<_> = store
            .blogs
            .iter()
            .filter(|b| filter.status.is_none_or(|s| b.review.status == s))
            .filter(|b| contains_ci(&b.title, filter.search.as_deref()))
            .cloned()
            .collect();
        newest_first(&mut blogs, |b| b.published_at.unwrap_or(b.created_at));
        Ok(page.slice(blogs))
    }
}

fn stamp_published(blog: &mut BlogRecord) {
    if blog.review.status == ContentStatus::Published && blog.published_at.is_none() {
        blog.published_at = Some(OffsetDateTime::now_utc());
    }
}

#[async_trait]
impl BlogsWriteRepo for MemoryRepos {
    async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        if store.blogs.iter().any(|b| b.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "blogs_slug_key".to_string(),
            });
        }
        let created_at = store.tick();
        let mut blog = BlogRecord {
            id: Uuid::new_v4(),
            title: params.title,
            slug: params.slug,
            content: params.content,
            banner_url: params.banner_url,
            author: params.author,
            review: review_from(&params.change),
            published_at: None,
            created_by_id: Some(params.created_by_id),
            created_at,
        };
        stamp_published(&mut blog);
        store.blogs.push(blog.clone());
        Ok(blog)
    }

    async fn update_blog(&self, params: UpdateBlogParams) -> Result<BlogRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        if store
            .blogs
            .iter()
            .any(|b| b.slug == params.slug && b.id != params.id)
        {
            return Err(RepoError::Duplicate {
                constraint: "blogs_slug_key".to_string(),
            });
        }
        let blog = store
            .blogs
            .iter_mut()
            .find(|b| b.id == params.id)
            .ok_or(RepoError::NotFound)?;
        blog.title = params.title;
        blog.slug = params.slug;
        blog.content = params.content;
        blog.banner_url = params.banner_url;
        blog.author = params.author;
        apply_change(&mut blog.review, &params.change);
        stamp_published(blog);
        Ok(blog.clone())
    }

    async fn change_blog_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<BlogRecord>, RepoError> {
        let mut store = self.store.lock().unwrap();
        Ok(store.blogs.iter_mut().find(|b| b.id == id).map(|blog| {
            apply_change(&mut blog.review, &change);
            stamp_published(blog);
            blog.clone()
        }))
    }

    async fn publish_blogs(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        let change = StatusChange::publish(approver, at);
        let mut store = self.store.lock().unwrap();
        let mut count = 0;
        for blog in store.blogs.iter_mut().filter(|b| ids.contains(&b.id)) {
            apply_change(&mut blog.review, &change);
            stamp_published(blog);
            count += 1;
        }
        Ok(count)
    }

    async fn delete_blog(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut store = self.store.lock().unwrap();
        let before = store.blogs.len();
        store.blogs.retain(|b| b.id != id);
        Ok(store.blogs.len() < before)
    }

    async fn delete_blogs(&self, ids: &[Uuid]) -> Result<u64, RepoError> {
        let mut store = self.store.lock().unwrap();
        let before = store.blogs.len();
        store.blogs.retain(|b| !ids.contains(&b.id));
        Ok((before - store.blogs.len()) as u64)
    }
}

#[async_trait]
impl PagesRepo for MemoryRepos {
    async fn find_page(&self, slug: &str) -> Result<Option<PageRecord>, RepoError> {
        Ok(self.store.lock().unwrap().pages.get(slug).cloned())
    }

    async fn upsert_page(
        &self,
        slug: &str,
        title: &str,
        sections: Value,
    ) -> Result<PageRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        let id = store.pages.get(slug).map_or_else(Uuid::new_v4, |p| p.id);
        let page = PageRecord {
            id,
            slug: slug.to_string(),
            title: title.to_string(),
            sections,
            updated_at: OffsetDateTime::now_utc(),
        };
        store.pages.insert(slug.to_string(), page.clone());
        Ok(page)
    }
}

#[async_trait]
impl MediaViewsRepo for MemoryRepos {
    async fn record_view(&self, key: &ViewKey) -> Result<Option<ViewOutcome>, RepoError> {
        let mut store = self.store.lock().unwrap();
        let Some(index) = store
            .media
            .iter()
            .position(|m| m.id == key.media_id && m.review.status == ContentStatus::Published)
        else {
            return Ok(None);
        };
        if store.ledger.iter().any(|(seen, _)| seen == key) {
            return Ok(Some(ViewOutcome {
                counted: false,
                views: store.media[index].views,
            }));
        }
        store.ledger.push((key.clone(), OffsetDateTime::now_utc()));
        store.media[index].views += 1;
        Ok(Some(ViewOutcome {
            counted: true,
            views: store.media[index].views,
        }))
    }

    async fn purge_views_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError> {
        let mut store = self.store.lock().unwrap();
        let before = store.ledger.len();
        store.ledger.retain(|(_, created_at)| *created_at >= cutoff);
        Ok((before - store.ledger.len()) as u64)
    }
}

#[async_trait]
impl SearchRepo for MemoryRepos {
    async fn search_collections(
        &self,
        text: &TextMatch,
        scope: Option<&[Uuid]>,
    ) -> Result<Vec<FolderRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut folders: Vec<_> = store
            .folders
            .iter()
            .filter(|f| f.review.status == ContentStatus::Published)
            .filter(|f| scope.is_none_or(|ids| f.parent_id.is_some_and(|p| ids.contains(&p))))
            .filter(|f| text_matches(&f.name, text))
            .cloned()
            .collect();
        newest_first(&mut folders, |f| f.created_at);
        Ok(folders)
    }

    async fn search_media(
        &self,
        text: &TextMatch,
        scope: Option<&[Uuid]>,
    ) -> Result<Vec<MediaRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let mut media: Vec<_> = store
            .media
            .iter()
            .filter(|m| m.review.status == ContentStatus::Published)
            .filter(|m| scope.is_none_or(|ids| m.folder_id.is_some_and(|f| ids.contains(&f))))
            .filter(|m| text_matches(&m.title, text))
            .cloned()
            .collect();
        newest_first(&mut media, |m| m.created_at);
        Ok(media)
    }

    async fn search_media_faceted(
        &self,
        query: &FacetQuery,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, RepoError> {
        let store = self.store.lock().unwrap();
        let languages: Vec<String> = query.languages.iter().map(|l| l.to_lowercase()).collect();
        let tags: Vec<String> = query.tags.iter().map(|t| t.to_lowercase()).collect();
        let mut media: Vec<_> = store
            .media
            .iter()
            .filter(|m| m.review.status == ContentStatus::Published)
            .filter(|m| contains_ci(&m.title, query.term.as_deref()))
            .filter(|m| query.media_types.is_empty() || query.media_types.contains(&m.media_type))
            .filter(|m| {
                languages.is_empty()
                    || m.language
                        .as_deref()
                        .is_some_and(|l| languages.contains(&l.to_lowercase()))
            })
            .filter(|m| tags.is_empty() || m.tags.iter().any(|t| tags.contains(&t.to_lowercase())))
            .filter(|m| {
                query
                    .scope
                    .as_ref()
                    .is_none_or(|ids| m.folder_id.is_some_and(|f| ids.contains(&f)))
            })
            .cloned()
            .collect();
        newest_first(&mut media, |m| m.created_at);
        Ok(page.slice(media))
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepos {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self.store.lock().unwrap().categories.clone())
    }

    async fn create_category(
        &self,
        name: &str,
        sub_categories: &[String],
    ) -> Result<CategoryRecord, RepoError> {
        let mut store = self.store.lock().unwrap();
        if store.categories.iter().any(|c| c.name == name) {
            return Err(RepoError::Duplicate {
                constraint: "categories_name_key".to_string(),
            });
        }
        let id = Uuid::new_v4();
        let category = CategoryRecord {
            id,
            name: name.to_string(),
            sub_categories: sub_categories
                .iter()
                .map(|sub| SubCategoryRecord {
                    id: Uuid::new_v4(),
                    category_id: id,
                    name: sub.clone(),
                })
                .collect(),
        };
        store.categories.push(category.clone());
        Ok(category)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        if *self.health_down.lock().unwrap() {
            Err(RepoError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Captures outgoing mail; optionally fails every send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        if *self.fail.lock().unwrap() {
            return Err(MailError::Rejected { status: 503 });
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        jwt_secret: JWT_SECRET.to_string(),
        session_ttl: time::Duration::days(7),
        cookie_secure: false,
        storage_hosts: vec!["utfs.io".to_string(), "ufs.sh".to_string()],
        ip_salt: "test-salt".to_string(),
        retention_days: 30,
        admin_address: "archive@example.org".to_string(),
        rate_limit_window: std::time::Duration::from_secs(60),
        rate_limit_max: 5,
        cron_secret: Some(CRON_SECRET.to_string()),
        trust_forwarded_for: false,
        trusted_proxies: Vec::new(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: ApiState,
    pub repos: Arc<MemoryRepos>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        let repos = Arc::new(MemoryRepos::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = ApiState::new(repos.clone(), mailer.clone(), config);
        Self {
            router: build_router(state.clone()),
            state,
            repos,
            mailer,
        }
    }

    /// Seed an account and return a `Cookie` header value carrying its session.
    pub fn login(&self, username: &str, role: Role) -> (UserRecord, String) {
        let user = self.repos.seed_user(username, role);
        let token = self.state.auth.sessions().issue(&user).unwrap();
        (user, format!("token={}", token.token))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(request(method, uri, cookie, body)).await;
        let status = response.status();
        (status, json_body(response).await)
    }
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Attach a socket peer the way `into_make_service_with_connect_info` does.
pub fn from_peer(mut request: Request<Body>, peer: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    request
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
