//! Two-tier name matching used by the public search gateway.
//!
//! Matches whose name starts with the query rank above matches that merely
//! contain it. There is no scoring beyond that split.

use serde::Serialize;

use crate::domain::entities::{FolderRecord, MediaRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Prefix,
    Contains,
}

/// Case-insensitive tier of `name` against `query`, or `None` when it does not match.
pub fn match_tier(name: &str, query: &str) -> Option<MatchTier> {
    let name = name.to_lowercase();
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Some(MatchTier::Prefix);
    }
    if name.starts_with(&query) {
        Some(MatchTier::Prefix)
    } else if name.contains(&query) {
        Some(MatchTier::Contains)
    } else {
        None
    }
}

/// Escape `%`, `_` and `\` so user text is matched literally by `LIKE`.
pub fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `LIKE` pattern for a tier.
pub fn like_pattern(query: &str, tier: MatchTier) -> String {
    let escaped = escape_like(query.trim());
    match tier {
        MatchTier::Prefix => format!("{escaped}%"),
        MatchTier::Contains => format!("%{escaped}%"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchHit {
    Collection(FolderRecord),
    Media(MediaRecord),
}

/// Tiered result lists, each already ordered newest first.
#[derive(Debug, Default)]
pub struct TieredResults {
    pub collections_prefix: Vec<FolderRecord>,
    pub collections_contains: Vec<FolderRecord>,
    pub media_prefix: Vec<MediaRecord>,
    pub media_contains: Vec<MediaRecord>,
}

impl TieredResults {
    /// Collections first, then media; within each, prefix matches before
    /// contains-only matches. Items already seen in the prefix tier are
    /// dropped from the contains tier.
    pub fn merge(self) -> Vec<SearchHit> {
        let TieredResults {
            collections_prefix,
            collections_contains,
            media_prefix,
            media_contains,
        } = self;

        let mut hits = Vec::with_capacity(
            collections_prefix.len()
                + collections_contains.len()
                + media_prefix.len()
                + media_contains.len(),
        );

        let seen: Vec<_> = collections_prefix.iter().map(|f| f.id).collect();
        hits.extend(collections_prefix.into_iter().map(SearchHit::Collection));
        hits.extend(
            collections_contains
                .into_iter()
                .filter(|f| !seen.contains(&f.id))
                .map(SearchHit::Collection),
        );

        let seen: Vec<_> = media_prefix.iter().map(|m| m.id).collect();
        hits.extend(media_prefix.into_iter().map(SearchHit::Media));
        hits.extend(
            media_contains
                .into_iter()
                .filter(|m| !seen.contains(&m.id))
                .map(SearchHit::Media),
        );

        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ReviewState;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn folder(name: &str, minutes: i64) -> FolderRecord {
        FolderRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            image: None,
            parent_id: None,
            review: ReviewState::draft(),
            created_at: OffsetDateTime::UNIX_EPOCH + Duration::minutes(minutes),
        }
    }

    fn names(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter()
            .map(|hit| match hit {
                SearchHit::Collection(f) => f.name.as_str(),
                SearchHit::Media(m) => m.title.as_str(),
            })
            .collect()
    }

    #[test]
    fn tiers_are_case_insensitive() {
        assert_eq!(match_tier("Apple Pie", "apple"), Some(MatchTier::Prefix));
        assert_eq!(match_tier("Pineapple", "APPLE"), Some(MatchTier::Contains));
        assert_eq!(match_tier("Banana", "apple"), None);
    }

    #[test]
    fn prefix_tier_precedes_contains_tier() {
        let all = vec![
            folder("Apple Pie", 1),
            folder("Pineapple", 2),
            folder("Green Apple", 3),
        ];

        let mut results = TieredResults::default();
        let mut ordered = all.clone();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for f in ordered {
            match match_tier(&f.name, "apple") {
                Some(MatchTier::Prefix) => results.collections_prefix.push(f),
                Some(MatchTier::Contains) => results.collections_contains.push(f),
                None => {}
            }
        }

        let hits = results.merge();
        assert_eq!(names(&hits), vec!["Apple Pie", "Green Apple", "Pineapple"]);
    }

    #[test]
    fn duplicates_across_tiers_are_dropped() {
        let f = folder("Apple", 1);
        let results = TieredResults {
            collections_prefix: vec![f.clone()],
            collections_contains: vec![f],
            ..Default::default()
        };
        assert_eq!(results.merge().len(), 1);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(like_pattern(" tea ", MatchTier::Prefix), "tea%");
        assert_eq!(like_pattern("tea", MatchTier::Contains), "%tea%");
    }
}
