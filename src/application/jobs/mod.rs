mod cleanup_media_views;

pub use cleanup_media_views::{
    CleanupMediaViewsContext, CleanupMediaViewsJob, cleanup_media_views_schedule,
    process_cleanup_media_views_job,
};
