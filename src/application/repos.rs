//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{
    BlogRecord, CategoryRecord, FolderRecord, MediaRecord, PageRecord, UserRecord,
};
use crate::domain::search::MatchTier;
use crate::domain::types::{ContentStatus, MediaType, Role, Visibility};
use crate::domain::views::{ViewKey, ViewOutcome};
use crate::domain::workflow::StatusChange;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

// ----- users -----

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Field-level changes to an account. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserParams {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

/// Result of a guarded account mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UserChangeOutcome {
    Updated(UserRecord),
    Deleted,
    NotFound,
    LastSuperadmin,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserRecord>, RepoError>;

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Apply `params` atomically, refusing to remove the last SUPERADMIN.
    async fn update_user(
        &self,
        id: Uuid,
        params: UpdateUserParams,
    ) -> Result<UserChangeOutcome, RepoError>;

    /// Delete atomically, refusing to remove the last SUPERADMIN.
    async fn delete_user(&self, id: Uuid) -> Result<UserChangeOutcome, RepoError>;

    async fn count_superadmins(&self) -> Result<u64, RepoError>;
}

// ----- shared content params -----

/// Listing filter shared by folder, media and blog admin listings.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
}

/// Totals returned by a cascading folder delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub folders: u64,
    pub media: u64,
}

impl CascadeOutcome {
    pub fn absorb(&mut self, other: CascadeOutcome) {
        self.folders += other.folders;
        self.media += other.media;
    }
}

// ----- folders -----

#[derive(Debug, Clone)]
pub struct CreateFolderParams {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Uuid>,
    pub change: StatusChange,
}

#[derive(Debug, Clone)]
pub struct UpdateFolderParams {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Uuid>,
    pub change: StatusChange,
}

#[async_trait]
pub trait FoldersRepo: Send + Sync {
    async fn find_folder(&self, id: Uuid) -> Result<Option<FolderRecord>, RepoError>;

    async fn list_folders(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<FolderRecord>, RepoError>;

    /// Folders with no parent, newest first.
    async fn list_root_folders(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError>;

    /// Every folder ordered by creation time ascending.
    async fn list_all_folders(
        &self,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError>;

    async fn list_child_folders(
        &self,
        parent_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<FolderRecord>, RepoError>;

    /// Ancestors of `id`, nearest parent first, bounded in depth.
    async fn list_ancestors(&self, id: Uuid) -> Result<Vec<FolderRecord>, RepoError>;

    /// `id` plus every transitive descendant id.
    async fn descendant_ids(&self, id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}

#[async_trait]
pub trait FoldersWriteRepo: Send + Sync {
    async fn create_folder(&self, params: CreateFolderParams) -> Result<FolderRecord, RepoError>;

    async fn update_folder(&self, params: UpdateFolderParams) -> Result<FolderRecord, RepoError>;

    async fn change_folder_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<FolderRecord>, RepoError>;

    async fn publish_folders(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError>;

    /// Delete `id`, its descendants and every media item filed under them, in
    /// one transaction. Returns `None` when the folder does not exist.
    async fn delete_folder_tree(&self, id: Uuid) -> Result<Option<CascadeOutcome>, RepoError>;

    /// Cascade-delete each id in one transaction, skipping unknown ids.
    async fn delete_folder_trees(&self, ids: &[Uuid]) -> Result<CascadeOutcome, RepoError>;
}

// ----- media -----

#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
    pub folder_id: Option<Uuid>,
    pub media_type: Option<MediaType>,
}

#[derive(Debug, Clone)]
pub struct CreateMediaParams {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub media_type: MediaType,
    pub file_url: Option<String>,
    pub external_link: Option<String>,
    pub language: Option<String>,
    pub folder_id: Option<Uuid>,
    pub contributor_id: Uuid,
    pub tags: Vec<String>,
    pub change: StatusChange,
}

#[derive(Debug, Clone)]
pub struct UpdateMediaParams {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub media_type: MediaType,
    pub file_url: Option<String>,
    pub external_link: Option<String>,
    pub language: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub change: StatusChange,
}

#[async_trait]
pub trait MediaRepo: Send + Sync {
    async fn find_media(&self, id: Uuid) -> Result<Option<MediaRecord>, RepoError>;

    async fn list_media(
        &self,
        filter: &MediaFilter,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, RepoError>;

    /// Media filed directly in `folder_id`, newest first.
    async fn list_media_in_folder(
        &self,
        folder_id: Uuid,
        visibility: Visibility,
    ) -> Result<Vec<MediaRecord>, RepoError>;
}

#[async_trait]
pub trait MediaWriteRepo: Send + Sync {
    async fn create_media(&self, params: CreateMediaParams) -> Result<MediaRecord, RepoError>;

    /// Insert all items in one transaction.
    async fn create_media_batch(
        &self,
        params: Vec<CreateMediaParams>,
    ) -> Result<Vec<MediaRecord>, RepoError>;

    async fn update_media(&self, params: UpdateMediaParams) -> Result<MediaRecord, RepoError>;

    async fn move_media(
        &self,
        id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<Option<MediaRecord>, RepoError>;

    async fn change_media_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<MediaRecord>, RepoError>;

    async fn publish_media(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError>;

    async fn delete_media(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn delete_media_many(&self, ids: &[Uuid]) -> Result<u64, RepoError>;
}

// ----- blogs -----

#[derive(Debug, Clone)]
pub struct CreateBlogParams {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub created_by_id: Uuid,
    pub change: StatusChange,
}

#[derive(Debug, Clone)]
pub struct UpdateBlogParams {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub change: StatusChange,
}

#[async_trait]
pub trait BlogsRepo: Send + Sync {
    async fn find_blog(&self, id: Uuid) -> Result<Option<BlogRecord>, RepoError>;

    async fn find_blog_by_slug(&self, slug: &str) -> Result<Option<BlogRecord>, RepoError>;

    async fn blog_slug_exists(
        &self,
        slug: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, RepoError>;

    async fn list_blogs(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<BlogRecord>, RepoError>;
}

/// Blog adapters set `published_at` the first time a blog becomes PUBLISHED
/// and never clear it afterwards.
#[async_trait]
pub trait BlogsWriteRepo: Send + Sync {
    async fn create_blog(&self, params: CreateBlogParams) -> Result<BlogRecord, RepoError>;

    async fn update_blog(&self, params: UpdateBlogParams) -> Result<BlogRecord, RepoError>;

    async fn change_blog_status(
        &self,
        id: Uuid,
        change: StatusChange,
    ) -> Result<Option<BlogRecord>, RepoError>;

    async fn publish_blogs(
        &self,
        ids: &[Uuid],
        approver: Uuid,
        at: OffsetDateTime,
    ) -> Result<u64, RepoError>;

    async fn delete_blog(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn delete_blogs(&self, ids: &[Uuid]) -> Result<u64, RepoError>;
}

// ----- pages -----

#[async_trait]
pub trait PagesRepo: Send + Sync {
    async fn find_page(&self, slug: &str) -> Result<Option<PageRecord>, RepoError>;

    async fn upsert_page(
        &self,
        slug: &str,
        title: &str,
        sections: serde_json::Value,
    ) -> Result<PageRecord, RepoError>;
}

// ----- view ledger -----

#[async_trait]
pub trait MediaViewsRepo: Send + Sync {
    /// Insert the ledger row and bump the counter in one transaction. Returns
    /// `None` when the media item does not exist or is not published.
    async fn record_view(&self, key: &ViewKey) -> Result<Option<ViewOutcome>, RepoError>;

    async fn purge_views_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError>;
}

// ----- search -----

/// Text criteria for one tier of the non-faceted search.
#[derive(Debug, Clone)]
pub struct TextMatch {
    /// `None` browses everything in scope.
    pub term: Option<String>,
    pub tier: MatchTier,
}

/// Facet-mode criteria: media only, every present facet ANDed.
#[derive(Debug, Clone, Default)]
pub struct FacetQuery {
    pub term: Option<String>,
    pub media_types: Vec<MediaType>,
    pub languages: Vec<String>,
    pub tags: Vec<String>,
    pub scope: Option<Vec<Uuid>>,
}

/// Read side of the public search gateway. Only PUBLISHED rows are returned,
/// newest first.
#[async_trait]
pub trait SearchRepo: Send + Sync {
    /// Published collections matching `text`. With a scope, only folders whose
    /// parent lies in the scope are considered.
    async fn search_collections(
        &self,
        text: &TextMatch,
        scope: Option<&[Uuid]>,
    ) -> Result<Vec<FolderRecord>, RepoError>;

    /// Published media matching `text`, filed in the scope when one is given.
    async fn search_media(
        &self,
        text: &TextMatch,
        scope: Option<&[Uuid]>,
    ) -> Result<Vec<MediaRecord>, RepoError>;

    async fn search_media_faceted(
        &self,
        query: &FacetQuery,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, RepoError>;
}

// ----- categories -----

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn create_category(
        &self,
        name: &str,
        sub_categories: &[String],
    ) -> Result<CategoryRecord, RepoError>;
}

// ----- health -----

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

/// Every repository the application wires together. Implemented for any
/// adapter that provides all of them.
pub trait Repositories:
    UsersRepo
    + FoldersRepo
    + FoldersWriteRepo
    + MediaRepo
    + MediaWriteRepo
    + BlogsRepo
    + BlogsWriteRepo
    + PagesRepo
    + MediaViewsRepo
    + SearchRepo
    + CategoriesRepo
    + HealthRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: UsersRepo
        + FoldersRepo
        + FoldersWriteRepo
        + MediaRepo
        + MediaWriteRepo
        + BlogsRepo
        + BlogsWriteRepo
        + PagesRepo
        + MediaViewsRepo
        + SearchRepo
        + CategoriesRepo
        + HealthRepo
        + 'static
{
}
