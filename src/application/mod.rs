//! Application services layer.

pub mod admin;
pub mod auth;
pub mod contact;
pub mod error;
pub mod jobs;
pub mod pagination;
pub mod repos;
pub mod search;
pub mod views;
