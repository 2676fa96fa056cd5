//! Error type and input helpers shared by the folder, media and blog services.

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;
use crate::domain::workflow::WorkflowError;

/// Upper bound on ids accepted by a single bulk call.
pub const MAX_BULK_IDS: usize = 500;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("parent folder would create a cycle or does not exist")]
    InvalidParent,
    #[error("ids must be a non-empty list of at most {} entries", MAX_BULK_IDS)]
    InvalidIdList,
    #[error("slug `{0}` is already in use")]
    SlugTaken(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub fn ensure_non_empty(value: &str, field: &'static str) -> Result<String, ContentError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContentError::ConstraintViolation(field));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank strings become `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Apply a PATCH-style field: outer `None` keeps `current`, inner `None` clears.
pub fn patch_optional(current: Option<String>, patch: Option<Option<String>>) -> Option<String> {
    match patch {
        Some(value) => normalize_optional(value),
        None => current,
    }
}

/// De-duplicate bulk ids while keeping their order; reject empty payloads.
pub fn normalize_ids(ids: &[Uuid]) -> Result<Vec<Uuid>, ContentError> {
    if ids.is_empty() || ids.len() > MAX_BULK_IDS {
        return Err(ContentError::InvalidIdList);
    }
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    Ok(unique)
}

/// Trim, drop blanks and de-duplicate tag names case-insensitively.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    let mut result = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            result.push(trimmed.to_string());
        }
    }
    result
}

/// Like [`normalize_tags`], but lowercased for storage as media tags.
pub fn normalize_tag_names(tags: Vec<String>) -> Vec<String> {
    normalize_tags(tags)
        .into_iter()
        .map(|tag| tag.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_list_is_rejected() {
        assert!(matches!(normalize_ids(&[]), Err(ContentError::InvalidIdList)));
    }

    #[test]
    fn ids_are_deduplicated_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(normalize_ids(&[a, b, a]).unwrap(), vec![a, b]);
    }

    #[test]
    fn patch_semantics_distinguish_absent_from_null() {
        let current = Some("old".to_string());
        assert_eq!(patch_optional(current.clone(), None), current);
        assert_eq!(patch_optional(current.clone(), Some(None)), None);
        assert_eq!(
            patch_optional(current, Some(Some("  new ".to_string()))),
            Some("new".to_string())
        );
    }

    #[test]
    fn tags_are_trimmed_and_unique() {
        let tags = normalize_tags(vec![
            " Folk ".to_string(),
            "folk".to_string(),
            String::new(),
            "Dhamail".to_string(),
        ]);
        assert_eq!(tags, vec!["Folk".to_string(), "Dhamail".to_string()]);
    }

    #[test]
    fn media_tag_names_are_lowercased() {
        let tags = vec!["Folk".to_string(), " FOLK ".to_string(), "Baul".to_string()];
        assert_eq!(normalize_tag_names(tags.clone()), vec!["folk", "baul"]);
        assert_eq!(normalize_tags(tags), vec!["Folk", "Baul"]);
    }
}
