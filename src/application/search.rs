//! Public search gateway over published collections and media.

use std::sync::Arc;

use uuid::Uuid;

use crate::application::admin::content::ContentError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{FacetQuery, FoldersRepo, SearchRepo, TextMatch};
use crate::domain::search::{MatchTier, SearchHit, TieredResults};
use crate::domain::types::MediaType;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub folder_id: Option<Uuid>,
    pub media_types: Vec<MediaType>,
    pub languages: Vec<String>,
    pub tags: Vec<String>,
}

impl SearchQuery {
    pub fn has_facets(&self) -> bool {
        !self.media_types.is_empty() || !self.languages.is_empty() || !self.tags.is_empty()
    }

    fn term(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string)
    }
}

#[derive(Clone)]
pub struct SearchService {
    search: Arc<dyn SearchRepo>,
    folders: Arc<dyn FoldersRepo>,
}

impl SearchService {
    pub fn new(search: Arc<dyn SearchRepo>, folders: Arc<dyn FoldersRepo>) -> Self {
        Self { search, folders }
    }

    pub async fn search(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<Page<SearchHit>, ContentError> {
        let scope = match query.folder_id {
            Some(folder_id) => Some(self.folders.descendant_ids(folder_id).await?),
            None => None,
        };

        if query.has_facets() {
            let facets = FacetQuery {
                term: query.term(),
                media_types: query.media_types.clone(),
                languages: query.languages.clone(),
                tags: query.tags.clone(),
                scope,
            };
            let media = self.search.search_media_faceted(&facets, page).await?;
            return Ok(media.map(SearchHit::Media));
        }

        let scope = scope.as_deref();
        let results = match query.term() {
            Some(term) => {
                let prefix = TextMatch {
                    term: Some(term.clone()),
                    tier: MatchTier::Prefix,
                };
                let contains = TextMatch {
                    term: Some(term),
                    tier: MatchTier::Contains,
                };
                let (collections_prefix, collections_contains, media_prefix, media_contains) = tokio::try_join!(
                    self.search.search_collections(&prefix, scope),
                    self.search.search_collections(&contains, scope),
                    self.search.search_media(&prefix, scope),
                    self.search.search_media(&contains, scope),
                )?;
                TieredResults {
                    collections_prefix,
                    collections_contains,
                    media_prefix,
                    media_contains,
                }
            }
            None => {
                let browse = TextMatch {
                    term: None,
                    tier: MatchTier::Prefix,
                };
                let (collections, media) = tokio::try_join!(
                    self.search.search_collections(&browse, scope),
                    self.search.search_media(&browse, scope),
                )?;
                TieredResults {
                    collections_prefix: collections,
                    media_prefix: media,
                    ..Default::default()
                }
            }
        };

        Ok(page.slice(results.merge()))
    }
}
