//! Application services for the administrative surface.

pub mod blogs;
pub mod categories;
pub mod content;
pub mod folders;
pub mod media;
pub mod pages;
pub mod users;

pub use blogs::BlogService;
pub use categories::CategoryService;
pub use folders::FolderService;
pub use media::MediaService;
pub use pages::PageService;
pub use users::UserAdminService;
