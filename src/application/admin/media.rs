use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateMediaParams, FoldersRepo, MediaFilter, MediaRepo, MediaWriteRepo, UpdateMediaParams,
};
use crate::domain::entities::MediaRecord;
use crate::domain::media::StorageHosts;
use crate::domain::types::{ContentStatus, MediaType, Visibility};
use crate::domain::workflow::{Actor, resolve_publish, resolve_reject, resolve_write};

use super::content::{
    ContentError, MAX_BULK_IDS, ensure_non_empty, normalize_ids, normalize_optional,
    normalize_tag_names, patch_optional,
};

#[derive(Debug, Clone)]
pub struct CreateMediaCommand {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub media_type: MediaType,
    /// Required. Classified into `fileUrl` or `externalLink` by host.
    pub media_url: Option<String>,
    pub language: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMediaCommand {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub media_type: Option<MediaType>,
    pub media_url: Option<Option<String>>,
    pub language: Option<Option<String>>,
    pub folder_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ContentStatus>,
}

#[derive(Clone)]
pub struct MediaService {
    reader: Arc<dyn MediaRepo>,
    writer: Arc<dyn MediaWriteRepo>,
    folders: Arc<dyn FoldersRepo>,
    storage: StorageHosts,
}

impl MediaService {
    pub fn new(
        reader: Arc<dyn MediaRepo>,
        writer: Arc<dyn MediaWriteRepo>,
        folders: Arc<dyn FoldersRepo>,
        storage: StorageHosts,
    ) -> Self {
        Self {
            reader,
            writer,
            folders,
            storage,
        }
    }

    pub async fn list(
        &self,
        filter: &MediaFilter,
        page: PageRequest,
    ) -> Result<Page<MediaRecord>, ContentError> {
        self.reader
            .list_media(filter, page)
            .await
            .map_err(ContentError::from)
    }

    pub async fn get(&self, id: Uuid) -> Result<MediaRecord, ContentError> {
        self.reader
            .find_media(id)
            .await?
            .ok_or(ContentError::NotFound("media"))
    }

    /// Lookup honouring the caller's visibility; hidden items read as missing.
    pub async fn get_visible(
        &self,
        id: Uuid,
        visibility: Visibility,
    ) -> Result<MediaRecord, ContentError> {
        self.reader
            .find_media(id)
            .await?
            .filter(|media| visibility.admits(media.review.status))
            .ok_or(ContentError::NotFound("media"))
    }

    pub async fn create(
        &self,
        actor: Actor,
        command: CreateMediaCommand,
    ) -> Result<MediaRecord, ContentError> {
        let params = self.prepare(actor, command).await?;
        let media = self.writer.create_media(params).await?;
        info!(
            target = "sylheti_archive::admin::media",
            media_id = %media.id,
            actor = %actor.id,
            status = media.review.status.as_str(),
            "media created"
        );
        Ok(media)
    }

    /// Create every item or none of them.
    pub async fn create_many(
        &self,
        actor: Actor,
        commands: Vec<CreateMediaCommand>,
    ) -> Result<Vec<MediaRecord>, ContentError> {
        if commands.is_empty() || commands.len() > MAX_BULK_IDS {
            return Err(ContentError::ConstraintViolation("items"));
        }
        let mut batch = Vec::with_capacity(commands.len());
        for command in commands {
            batch.push(self.prepare(actor, command).await?);
        }
        let created = self.writer.create_media_batch(batch).await?;
        info!(
            target = "sylheti_archive::admin::media",
            count = created.len(),
            actor = %actor.id,
            "media batch created"
        );
        Ok(created)
    }

    async fn prepare(
        &self,
        actor: Actor,
        command: CreateMediaCommand,
    ) -> Result<CreateMediaParams, ContentError> {
        let title = ensure_non_empty(&command.title, "title")?;
        let change = resolve_write(actor, command.status, None, OffsetDateTime::now_utc())?;
        self.ensure_folder(command.folder_id).await?;
        let (file_url, external_link) = self.classify(command.media_url)?;

        Ok(CreateMediaParams {
            title,
            description: normalize_optional(command.description),
            image: normalize_optional(command.image),
            media_type: command.media_type,
            file_url,
            external_link,
            language: normalize_optional(command.language),
            folder_id: command.folder_id,
            contributor_id: actor.id,
            tags: normalize_tag_names(command.tags),
            change,
        })
    }

    pub async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        command: UpdateMediaCommand,
    ) -> Result<MediaRecord, ContentError> {
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

        let folder_id = match command.folder_id {
            Some(folder_id) => {
                self.ensure_folder(folder_id).await?;
                folder_id
            }
            None => current.folder_id,
        };

        let (file_url, external_link) = match command.media_url {
            Some(url) => self.classify(url)?,
            None => (current.file_url, current.external_link),
        };

        let media = self
            .writer
            .update_media(UpdateMediaParams {
                id,
                title,
                description: patch_optional(current.description, command.description),
                image: patch_optional(current.image, command.image),
                media_type: command.media_type.unwrap_or(current.media_type),
                file_url,
                external_link,
                language: patch_optional(current.language, command.language),
                folder_id,
                tags: command.tags.map(normalize_tag_names).unwrap_or(current.tags),
                change,
            })
            .await?;
        Ok(media)
    }

    pub async fn move_to(
        &self,
        id: Uuid,
        folder_id: Option<Uuid>,
    ) -> Result<MediaRecord, ContentError> {
        self.ensure_folder(folder_id).await?;
        self.writer
            .move_media(id, folder_id)
            .await?
            .ok_or(ContentError::NotFound("media"))
    }

    pub async fn publish(&self, actor: Actor, id: Uuid) -> Result<MediaRecord, ContentError> {
        let change = resolve_publish(actor, OffsetDateTime::now_utc())?;
        self.writer
            .change_media_status(id, change)
            .await?
            .ok_or(ContentError::NotFound("media"))
    }

    pub async fn reject(
        &self,
        actor: Actor,
        id: Uuid,
        reason: &str,
    ) -> Result<MediaRecord, ContentError> {
        let change = resolve_reject(actor, reason)?;
        self.writer
            .change_media_status(id, change)
            .await?
            .ok_or(ContentError::NotFound("media"))
    }

    pub async fn publish_many(&self, actor: Actor, ids: &[Uuid]) -> Result<u64, ContentError> {
        let ids = normalize_ids(ids)?;
        let now = OffsetDateTime::now_utc();
        resolve_publish(actor, now)?;
        self.writer
            .publish_media(&ids, actor.id, now)
            .await
            .map_err(ContentError::from)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ContentError> {
        if self.writer.delete_media(id).await? {
            Ok(())
        } else {
            Err(ContentError::NotFound("media"))
        }
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, ContentError> {
        let ids = normalize_ids(ids)?;
        self.writer
            .delete_media_many(&ids)
            .await
            .map_err(ContentError::from)
    }

    async fn ensure_folder(&self, folder_id: Option<Uuid>) -> Result<(), ContentError> {
        if let Some(folder_id) = folder_id {
            self.folders
                .find_folder(folder_id)
                .await?
                .ok_or(ContentError::NotFound("folder"))?;
        }
        Ok(())
    }

    /// Every item carries exactly one source, so a missing or blank URL is rejected.
    fn classify(
        &self,
        url: Option<String>,
    ) -> Result<(Option<String>, Option<String>), ContentError> {
        let url = normalize_optional(url).ok_or(ContentError::ConstraintViolation("mediaUrl"))?;
        Ok(self.storage.classify(&url)?.into_columns())
    }
}
