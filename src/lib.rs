//! The Sylheti Archive: collection tree, draft/publish workflow and public
//! search for an archive of Sylheti recordings, documents and writing.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
