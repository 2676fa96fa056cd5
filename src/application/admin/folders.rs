use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CascadeOutcome, ContentFilter, CreateFolderParams, FoldersRepo, FoldersWriteRepo, MediaRepo,
    UpdateFolderParams,
};
use crate::domain::entities::{FolderRecord, MediaRecord};
use crate::domain::tree::{FolderNode, build_tree, creates_cycle};
use crate::domain::types::{ContentStatus, Visibility};
use crate::domain::workflow::{Actor, resolve_publish, resolve_reject, resolve_write};

use super::content::{
    ContentError, ensure_non_empty, normalize_ids, normalize_optional, patch_optional,
};

pub const METRIC_FOLDERS_CASCADE_DELETED: &str = "archive_folders_cascade_deleted_total";

#[derive(Debug, Clone)]
pub struct CreateFolderCommand {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: Option<ContentStatus>,
}

/// Partial update: absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct UpdateFolderCommand {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub parent_id: Option<Option<Uuid>>,
    pub status: Option<ContentStatus>,
}

/// A folder with its breadcrumb trail and direct contents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderContext {
    #[serde(flatten)]
    pub folder: FolderRecord,
    /// Nearest parent first.
    pub ancestors: Vec<FolderRecord>,
    pub children: Vec<FolderRecord>,
    pub media: Vec<MediaRecord>,
}

#[derive(Clone)]
pub struct FolderService {
    reader: Arc<dyn FoldersRepo>,
    writer: Arc<dyn FoldersWriteRepo>,
    media: Arc<dyn MediaRepo>,
}

impl FolderService {
    pub fn new(
        reader: Arc<dyn FoldersRepo>,
        writer: Arc<dyn FoldersWriteRepo>,
        media: Arc<dyn MediaRepo>,
    ) -> Self {
        Self {
            reader,
            writer,
            media,
        }
    }

    pub async fn list(
        &self,
        filter: &ContentFilter,
        page: PageRequest,
    ) -> Result<Page<FolderRecord>, ContentError> {
        self.reader
            .list_folders(filter, page)
            .await
            .map_err(ContentError::from)
    }

    pub async fn roots(&self, visibility: Visibility) -> Result<Vec<FolderRecord>, ContentError> {
        self.reader
            .list_root_folders(visibility)
            .await
            .map_err(ContentError::from)
    }

    pub async fn tree(&self, visibility: Visibility) -> Result<Vec<FolderNode>, ContentError> {
        let folders = self.reader.list_all_folders(visibility).await?;
        Ok(build_tree(folders))
    }

    /// Load a folder with ancestors, children and media, fetched concurrently.
    pub async fn context(
        &self,
        id: Uuid,
        visibility: Visibility,
    ) -> Result<FolderContext, ContentError> {
        let folder = self
            .reader
            .find_folder(id)
            .await?
            .filter(|folder| visibility.admits(folder.review.status))
            .ok_or(ContentError::NotFound("folder"))?;

        let (ancestors, children, media) = tokio::try_join!(
            self.reader.list_ancestors(id),
            self.reader.list_child_folders(id, visibility),
            self.media.list_media_in_folder(id, visibility),
        )?;

        Ok(FolderContext {
            folder,
            ancestors,
            children,
            media,
        })
    }

    pub async fn create(
        &self,
        actor: Actor,
        command: CreateFolderCommand,
    ) -> Result<FolderRecord, ContentError> {
        let name = ensure_non_empty(&command.name, "name")?;
        let change = resolve_write(actor, command.status, None, OffsetDateTime::now_utc())?;

        if let Some(parent_id) = command.parent_id {
            self.reader
                .find_folder(parent_id)
                .await?
                .ok_or(ContentError::InvalidParent)?;
        }

        let folder = self
            .writer
            .create_folder(CreateFolderParams {
                name,
                description: normalize_optional(command.description),
                image: normalize_optional(command.image),
                parent_id: command.parent_id,
                change,
            })
            .await?;

        info!(
            target = "sylheti_archive::admin::folders",
            folder_id = %folder.id,
            actor = %actor.id,
            status = folder.review.status.as_str(),
            "folder created"
        );
        Ok(folder)
    }

    pub async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        command: UpdateFolderCommand,
    ) -> Result<FolderRecord, ContentError> {
        let current = self
            .reader
            .find_folder(id)
            .await?
            .ok_or(ContentError::NotFound("folder"))?;

        let change = resolve_write(
            actor,
            command.status,
            Some(current.review.status),
            OffsetDateTime::now_utc(),
        )?;

        let name = match command.name {
            Some(name) => ensure_non_empty(&name, "name")?,
            None => current.name,
        };

        let parent_id = match command.parent_id {
            Some(Some(parent_id)) if Some(parent_id) != current.parent_id => {
                self.ensure_valid_parent(id, parent_id).await?;
                Some(parent_id)
            }
            Some(parent_id) => parent_id,
            None => current.parent_id,
        };

        let folder = self
            .writer
            .update_folder(UpdateFolderParams {
                id,
                name,
                description: patch_optional(current.description, command.description),
                image: patch_optional(current.image, command.image),
                parent_id,
                change,
            })
            .await?;
        Ok(folder)
    }

    async fn ensure_valid_parent(&self, id: Uuid, parent_id: Uuid) -> Result<(), ContentError> {
        if parent_id == id {
            return Err(ContentError::InvalidParent);
        }
        self.reader
            .find_folder(parent_id)
            .await?
            .ok_or(ContentError::InvalidParent)?;
        let closure = self.reader.descendant_ids(id).await?;
        if creates_cycle(id, parent_id, &closure) {
            return Err(ContentError::InvalidParent);
        }
        Ok(())
    }

    pub async fn publish(&self, actor: Actor, id: Uuid) -> Result<FolderRecord, ContentError> {
        let change = resolve_publish(actor, OffsetDateTime::now_utc())?;
        self.writer
            .change_folder_status(id, change)
            .await?
            .ok_or(ContentError::NotFound("folder"))
    }

    pub async fn reject(
        &self,
        actor: Actor,
        id: Uuid,
        reason: &str,
    ) -> Result<FolderRecord, ContentError> {
        let change = resolve_reject(actor, reason)?;
        self.writer
            .change_folder_status(id, change)
            .await?
            .ok_or(ContentError::NotFound("folder"))
    }

    pub async fn publish_many(&self, actor: Actor, ids: &[Uuid]) -> Result<u64, ContentError> {
        let ids = normalize_ids(ids)?;
        let now = OffsetDateTime::now_utc();
        resolve_publish(actor, now)?;
        self.writer
            .publish_folders(&ids, actor.id, now)
            .await
            .map_err(ContentError::from)
    }

    /// Remove a folder, its whole subtree and every media item filed in it.
    pub async fn delete(&self, id: Uuid) -> Result<CascadeOutcome, ContentError> {
        let outcome = self
            .writer
            .delete_folder_tree(id)
            .await?
            .ok_or(ContentError::NotFound("folder"))?;
        record_cascade(&outcome);
        Ok(outcome)
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<CascadeOutcome, ContentError> {
        let ids = normalize_ids(ids)?;
        let outcome = self.writer.delete_folder_trees(&ids).await?;
        record_cascade(&outcome);
        Ok(outcome)
    }
}

fn record_cascade(outcome: &CascadeOutcome) {
    counter!(METRIC_FOLDERS_CASCADE_DELETED).increment(outcome.folders);
    info!(
        target = "sylheti_archive::admin::folders",
        folders = outcome.folders,
        media = outcome.media,
        "folder subtree deleted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::application::repos::RepoError;
    use crate::domain::entities::ReviewState;
    use crate::domain::tree::descendant_closure;
    use crate::domain::types::Role;
    use crate::domain::workflow::{Approval, StatusChange};

    #[derive(Default)]
    struct StubFolders {
        folders: Mutex<Vec<FolderRecord>>,
    }

    impl StubFolders {
        fn with(folders: Vec<FolderRecord>) -> Arc<Self> {
            Arc::new(Self {
                folders: Mutex::new(folders),
            })
        }
    }

    fn apply(review: &mut ReviewState, change: StatusChange) {
        review.status = change.status;
        review.rejection_reason = change.rejection_reason;
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
    }

    #[async_trait]
    impl FoldersRepo for StubFolders {
        async fn find_folder(&self, id: Uuid) -> Result<Option<FolderRecord>, RepoError> {
            Ok(self
                .folders
                .lock()
                .unwrap()
                .iter()
                .find(|f| f.id == id)
                .cloned())
        }

        async fn list_folders(
            &self,
            _filter: &ContentFilter,
            page: PageRequest,
        ) -> Result<Page<FolderRecord>, RepoError> {
            Ok(page.slice(self.folders.lock().unwrap().clone()))
        }

        async fn list_root_folders(
            &self,
            _visibility: Visibility,
        ) -> Result<Vec<FolderRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_all_folders(
            &self,
            _visibility: Visibility,
        ) -> Result<Vec<FolderRecord>, RepoError> {
            Ok(self.folders.lock().unwrap().clone())
        }

        async fn list_child_folders(
            &self,
            _parent_id: Uuid,
            _visibility: Visibility,
        ) -> Result<Vec<FolderRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_ancestors(&self, _id: Uuid) -> Result<Vec<FolderRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn descendant_ids(&self, id: Uuid) -> Result<Vec<Uuid>, RepoError> {
            let edges: Vec<_> = self
                .folders
                .lock()
                .unwrap()
                .iter()
                .map(|f| (f.id, f.parent_id))
                .collect();
            Ok(descendant_closure(id, &edges))
        }
    }

    #[async_trait]
    impl FoldersWriteRepo for StubFolders {
        async fn create_folder(
            &self,
            params: CreateFolderParams,
        ) -> Result<FolderRecord, RepoError> {
            let mut review = ReviewState::draft();
            apply(&mut review, params.change);
            let folder = FolderRecord {
                id: Uuid::new_v4(),
                name: params.name,
                description: params.description,
                image: params.image,
                parent_id: params.parent_id,
                review,
                created_at: OffsetDateTime::now_utc(),
            };
            self.folders.lock().unwrap().push(folder.clone());
            Ok(folder)
        }

        async fn update_folder(
            &self,
            params: UpdateFolderParams,
        ) -> Result<FolderRecord, RepoError> {
            let mut folders = self.folders.lock().unwrap();
            let folder = folders
                .iter_mut()
                .find(|f| f.id == params.id)
                .ok_or(RepoError::NotFound)?;
            folder.name = params.name;
            folder.description = params.description;
            folder.image = params.image;
            folder.parent_id = params.parent_id;
            apply(&mut folder.review, params.change);
            Ok(folder.clone())
        }

        async fn change_folder_status(
            &self,
            id: Uuid,
            change: StatusChange,
        ) -> Result<Option<FolderRecord>, RepoError> {
            let mut folders = self.folders.lock().unwrap();
            Ok(folders.iter_mut().find(|f| f.id == id).map(|folder| {
                apply(&mut folder.review, change);
                folder.clone()
            }))
        }

        async fn publish_folders(
            &self,
            ids: &[Uuid],
            approver: Uuid,
            at: OffsetDateTime,
        ) -> Result<u64, RepoError> {
            let mut folders = self.folders.lock().unwrap();
            let mut count = 0;
            for folder in folders.iter_mut().filter(|f| ids.contains(&f.id)) {
                apply(&mut folder.review, StatusChange::publish(approver, at));
                count += 1;
            }
            Ok(count)
        }

        async fn delete_folder_tree(&self, _id: Uuid) -> Result<Option<CascadeOutcome>, RepoError> {
            Ok(None)
        }

        async fn delete_folder_trees(&self, _ids: &[Uuid]) -> Result<CascadeOutcome, RepoError> {
            Ok(CascadeOutcome::default())
        }
    }

    struct NoMedia;

    #[async_trait]
    impl MediaRepo for NoMedia {
        async fn find_media(&self, _id: Uuid) -> Result<Option<MediaRecord>, RepoError> {
            Ok(None)
        }

        async fn list_media(
            &self,
            _filter: &crate::application::repos::MediaFilter,
            page: PageRequest,
        ) -> Result<Page<MediaRecord>, RepoError> {
            Ok(Page::empty(page))
        }

        async fn list_media_in_folder(
            &self,
            _folder_id: Uuid,
            _visibility: Visibility,
        ) -> Result<Vec<MediaRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    fn service(stub: Arc<StubFolders>) -> FolderService {
        FolderService::new(stub.clone(), stub, Arc::new(NoMedia))
    }

    fn actor(role: Role) -> Actor {
        Actor::new(Uuid::new_v4(), role)
    }

    fn command(name: &str, status: Option<ContentStatus>) -> CreateFolderCommand {
        CreateFolderCommand {
            name: name.to_string(),
            description: Some("  ".to_string()),
            image: None,
            parent_id: None,
            status,
        }
    }

    #[tokio::test]
    async fn contributor_create_is_forced_to_draft() {
        let service = service(StubFolders::with(Vec::new()));
        let folder = service
            .create(
                actor(Role::Contributor),
                command("Dhamail songs", Some(ContentStatus::Published)),
            )
            .await
            .expect("created");

        assert_eq!(folder.review.status, ContentStatus::Draft);
        assert_eq!(folder.review.approved_by_id, None);
        assert_eq!(folder.description, None);
    }

    #[tokio::test]
    async fn contributor_update_of_published_folder_returns_it_to_draft() {
        let stub = StubFolders::with(Vec::new());
        let service = service(stub.clone());
        let admin = actor(Role::Admin);
        let folder = service
            .create(admin, command("Archive", Some(ContentStatus::Published)))
            .await
            .unwrap();
        assert_eq!(folder.review.approved_by_id, Some(admin.id));

        let updated = service
            .update(
                actor(Role::Contributor),
                folder.id,
                UpdateFolderCommand {
                    name: Some("Archive (edited)".to_string()),
                    status: Some(ContentStatus::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.review.status, ContentStatus::Draft);
        assert_eq!(updated.review.approved_at, None);
        assert_eq!(updated.name, "Archive (edited)");
    }

    #[tokio::test]
    async fn viewer_cannot_create() {
        let service = service(StubFolders::with(Vec::new()));
        let err = service
            .create(actor(Role::Viewer), command("Nope", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Workflow(_)));
    }

    #[tokio::test]
    async fn reparenting_under_own_descendant_is_rejected() {
        let stub = StubFolders::with(Vec::new());
        let service = service(stub.clone());
        let admin = actor(Role::Admin);
        let root = service.create(admin, command("Root", None)).await.unwrap();
        let child = service
            .create(
                admin,
                CreateFolderCommand {
                    parent_id: Some(root.id),
                    ..command("Child", None)
                },
            )
            .await
            .unwrap();

        let err = service
            .update(
                admin,
                root.id,
                UpdateFolderCommand {
                    parent_id: Some(Some(child.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::InvalidParent));
    }

    #[tokio::test]
    async fn publish_twice_restamps_without_error() {
        let stub = StubFolders::with(Vec::new());
        let service = service(stub.clone());
        let first_admin = actor(Role::Admin);
        let second_admin = actor(Role::Superadmin);
        let folder = service
            .create(first_admin, command("Letters", None))
            .await
            .unwrap();

        let first = service.publish(first_admin, folder.id).await.unwrap();
        let second = service.publish(second_admin, folder.id).await.unwrap();

        assert_eq!(first.review.status, ContentStatus::Published);
        assert_eq!(second.review.status, ContentStatus::Published);
        assert_eq!(second.review.approved_by_id, Some(second_admin.id));
    }

    #[tokio::test]
    async fn bulk_publish_counts_only_existing_ids() {
        let stub = StubFolders::with(Vec::new());
        let service = service(stub.clone());
        let admin = actor(Role::Admin);
        let x = service.create(admin, command("x", None)).await.unwrap();
        let z = service.create(admin, command("z", None)).await.unwrap();

        let count = service
            .publish_many(admin, &[x.id, Uuid::new_v4(), z.id])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let err = service.publish_many(admin, &[]).await.unwrap_err();
        assert!(matches!(err, ContentError::InvalidIdList));
    }

    #[tokio::test]
    async fn tree_nests_created_folders() {
        let stub = StubFolders::with(Vec::new());
        let service = service(stub.clone());
        let admin = actor(Role::Admin);
        let root = service.create(admin, command("Root", None)).await.unwrap();
        service
            .create(
                admin,
                CreateFolderCommand {
                    parent_id: Some(root.id),
                    ..command("Child", None)
                },
            )
            .await
            .unwrap();

        let tree = service.tree(Visibility::All).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].folder.name, "Child");
    }
}
