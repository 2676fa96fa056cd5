use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::application::admin::blogs::{CreateBlogCommand, UpdateBlogCommand};
use crate::application::admin::folders::{CreateFolderCommand, UpdateFolderCommand};
use crate::application::admin::media::{CreateMediaCommand, UpdateMediaCommand};
use crate::application::admin::pages::UpdatePageCommand;
use crate::application::admin::users::{CreateUserCommand, UpdateUserCommand};
use crate::application::auth::{SigninCommand, SignupCommand};
use crate::application::contact::ContactCommand;
use crate::application::repos::CascadeOutcome;
use crate::domain::entities::{BlogRecord, UserRecord};
use crate::domain::types::{ContentStatus, MediaType, Role};
use crate::domain::views::ViewOutcome;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ----- auth -----

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl From<SignupRequest> for SignupCommand {
    fn from(request: SignupRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

impl From<SigninRequest> for SigninCommand {
    fn from(request: SigninRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserRecord,
}

// ----- folders -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: Option<ContentStatus>,
}

impl From<FolderCreateRequest> for CreateFolderCommand {
    fn from(request: FolderCreateRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            image: request.image,
            parent_id: request.parent_id,
            status: request.status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdateRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<Uuid>>,
    pub status: Option<ContentStatus>,
}

impl From<FolderUpdateRequest> for UpdateFolderCommand {
    fn from(request: FolderUpdateRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            image: request.image,
            parent_id: request.parent_id,
            status: request.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeResponse {
    pub deleted_folders: u64,
    pub deleted_media: u64,
}

impl From<CascadeOutcome> for CascadeResponse {
    fn from(outcome: CascadeOutcome) -> Self {
        Self {
            deleted_folders: outcome.folders,
            deleted_media: outcome.media,
        }
    }
}

// ----- media -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCreateRequest {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub language: Option<String>,
    pub folder_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<ContentStatus>,
}

impl From<MediaCreateRequest> for CreateMediaCommand {
    fn from(request: MediaCreateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            image: request.image,
            media_type: request.media_type,
            media_url: request.media_url,
            language: request.language,
            folder_id: request.folder_id,
            tags: request.tags,
            status: request.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaBulkRequest {
    pub items: Vec<MediaCreateRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUpdateRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    pub media_type: Option<MediaType>,
    #[serde(default, deserialize_with = "double_option")]
    pub media_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub language: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ContentStatus>,
}

impl From<MediaUpdateRequest> for UpdateMediaCommand {
    fn from(request: MediaUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            image: request.image,
            media_type: request.media_type,
            media_url: request.media_url,
            language: request.language,
            folder_id: request.folder_id,
            tags: request.tags,
            status: request.status,
        }
    }
}

/// `folderId: null` (or an absent key) unfiles the item.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    #[serde(default)]
    pub folder_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub counted: bool,
    pub views: i64,
}

impl From<ViewOutcome> for ViewResponse {
    fn from(outcome: ViewOutcome) -> Self {
        Self {
            counted: outcome.counted,
            views: outcome.views,
        }
    }
}

// ----- blogs -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCreateRequest {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub status: Option<ContentStatus>,
}

impl From<BlogCreateRequest> for CreateBlogCommand {
    fn from(request: BlogCreateRequest) -> Self {
        Self {
            title: request.title,
            slug: request.slug,
            content: request.content,
            banner_url: request.banner_url,
            author: request.author,
            status: request.status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogUpdateRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub banner_url: Option<Option<String>>,
    pub author: Option<String>,
    pub status: Option<ContentStatus>,
}

impl From<BlogUpdateRequest> for UpdateBlogCommand {
    fn from(request: BlogUpdateRequest) -> Self {
        Self {
            title: request.title,
            slug: request.slug,
            content: request.content,
            banner_url: request.banner_url,
            author: request.author,
            status: request.status,
        }
    }
}

/// Blog as rendered over HTTP, with the read-only `published` flag older
/// clients still filter on.
#[derive(Debug, Serialize)]
pub struct BlogView {
    #[serde(flatten)]
    pub blog: BlogRecord,
    pub published: bool,
}

impl From<BlogRecord> for BlogView {
    fn from(blog: BlogRecord) -> Self {
        let published = blog.is_published();
        Self { blog, published }
    }
}

// ----- workflow -----

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

// ----- users -----

#[derive(Debug, Deserialize)]
pub struct UserCreateRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl From<UserCreateRequest> for CreateUserCommand {
    fn from(request: UserCreateRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
            role: request.role,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl From<UserUpdateRequest> for UpdateUserCommand {
    fn from(request: UserUpdateRequest) -> Self {
        Self {
            username: request.username,
            email: request.email,
            password: request.password,
            role: request.role,
        }
    }
}

// ----- pages, categories, contact -----

#[derive(Debug, Default, Deserialize)]
pub struct PageUpdateRequest {
    pub title: Option<String>,
    pub sections: Option<Value>,
}

impl From<PageUpdateRequest> for UpdatePageCommand {
    fn from(request: PageUpdateRequest) -> Self {
        Self {
            title: request.title,
            sections: request.sections,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreateRequest {
    pub name: String,
    #[serde(default)]
    pub sub_categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl From<ContactRequest> for ContactCommand {
    fn from(request: ContactRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
            subject: request.subject,
            message: request.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let request: FolderUpdateRequest =
            serde_json::from_value(json!({"description": null, "name": "Letters"})).unwrap();
        assert_eq!(request.description, Some(None));
        assert_eq!(request.image, None);
        assert_eq!(request.parent_id, None);
        assert_eq!(request.name.as_deref(), Some("Letters"));
    }

    #[test]
    fn blog_view_exposes_derived_published_flag() {
        let blog = BlogRecord {
            id: Uuid::new_v4(),
            title: "Notes".to_string(),
            slug: "notes".to_string(),
            content: String::new(),
            banner_url: None,
            author: "Editor".to_string(),
            review: crate::domain::entities::ReviewState::draft(),
            published_at: None,
            created_by_id: None,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(BlogView::from(blog)).unwrap();
        assert_eq!(json["published"], false);
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["slug"], "notes");
    }
}
