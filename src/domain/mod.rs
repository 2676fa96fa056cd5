//! Domain layer: pure archive types and rules with no I/O.

pub mod entities;
pub mod error;
pub mod media;
pub mod pages;
pub mod search;
pub mod slug;
pub mod tree;
pub mod types;
pub mod users;
pub mod views;
pub mod workflow;
