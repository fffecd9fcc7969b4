use std::sync::Arc;

use crate::errors::{MoodsError, MoodsResult};
use crate::graphql::api::MoodsApi;
use crate::graphql::types::{Tag, TagMetadata, TagQuery, UpdateTagMetadataInput};
use crate::timeline::feed::{FeedStatus, PageOutcome, PageRequest, PagedFeed};

/// Tag list screen: a searchable, paged view over the origin's tags with the
/// metadata editor's mutations.
pub struct TagBrowser {
    api: Arc<dyn MoodsApi>,
    feed: PagedFeed<Tag, TagQuery>,
}

fn normalise_search(search: &str) -> Option<String> {
    let trimmed = search.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl TagBrowser {
    pub fn new(api: Arc<dyn MoodsApi>, page_size: u32) -> Self {
        let mut feed = PagedFeed::new(page_size);
        feed.set_scope(Some(TagQuery::default()));
        Self { api, feed }
    }

    pub fn query(&self) -> TagQuery {
        self.feed.scope().cloned().unwrap_or_default()
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.feed.nodes()
    }

    pub fn status(&self) -> FeedStatus {
        self.feed.status()
    }

    pub fn has_next_page(&self) -> bool {
        self.feed.has_next_page()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.feed.last_error()
    }

    pub fn dismiss_error(&mut self) {
        self.feed.dismiss_error();
    }

    async fn fetch(&mut self, request: PageRequest<TagQuery>) -> MoodsResult<PageOutcome> {
        let result = self
            .api
            .tags(&request.scope, request.first, request.after.as_deref())
            .await;
        self.feed.complete(&request, result)
    }

    /// Changes the search text and reloads from the first page.
    pub async fn set_search(&mut self, search: &str) -> MoodsResult<PageOutcome> {
        let query = TagQuery {
            search: normalise_search(search),
            ..self.query()
        };
        self.feed.set_scope(Some(query));
        self.refresh().await
    }

    pub async fn set_include_archived(&mut self, include_archived: bool) -> MoodsResult<PageOutcome> {
        let query = TagQuery {
            include_archived,
            ..self.query()
        };
        self.feed.set_scope(Some(query));
        self.refresh().await
    }

    pub async fn refresh(&mut self) -> MoodsResult<PageOutcome> {
        let request = self
            .feed
            .begin_load()
            .ok_or_else(|| MoodsError::Validation("tag browser has no query".into()))?;
        tracing::debug!(query = ?request.scope, "loading tags");
        self.fetch(request).await
    }

    /// `None` when there is no further page.
    pub async fn load_more(&mut self) -> MoodsResult<Option<PageOutcome>> {
        match self.feed.begin_load_more() {
            Some(request) => self.fetch(request).await.map(Some),
            None => Ok(None),
        }
    }

    async fn refresh_after_mutation(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "tag list refresh after mutation failed");
        }
    }

    /// Replaces the tag's colour and face. Blank values clear the field. Archived
    /// tags are read-only.
    pub async fn update_metadata(
        &mut self,
        tag: &Tag,
        color: Option<&str>,
        face: Option<&str>,
    ) -> MoodsResult<Tag> {
        if tag.is_archived() {
            return Err(MoodsError::Validation(format!(
                "tag '{}' is archived; unarchive it to edit",
                tag.name
            )));
        }
        let input = UpdateTagMetadataInput {
            name: tag.name.clone(),
            metadata: TagMetadata {
                color: non_blank(color),
                face: non_blank(face),
            },
        };
        tracing::info!(tag = %tag.name, "updating tag metadata");
        let updated = self.api.update_tag_metadata(input).await?;
        self.refresh_after_mutation().await;
        Ok(updated)
    }

    pub async fn archive(&mut self, name: &str) -> MoodsResult<Tag> {
        tracing::info!(tag = %name, "archiving tag");
        let tag = self.api.archive_tag(name).await?;
        self.refresh_after_mutation().await;
        Ok(tag)
    }

    pub async fn unarchive(&mut self, name: &str) -> MoodsResult<Tag> {
        tracing::info!(tag = %name, "unarchiving tag");
        let tag = self.api.unarchive_tag(name).await?;
        self.refresh_after_mutation().await;
        Ok(tag)
    }
}

/// Suggestions for the mood composer's tag picker. Archived tags are excluded.
pub async fn search_picker(api: &dyn MoodsApi, search: &str, first: u32) -> MoodsResult<Vec<Tag>> {
    let query = TagQuery {
        search: normalise_search(search),
        include_archived: false,
    };
    let page = api.tags(&query, first, None).await?;
    Ok(page.edges.into_iter().map(|e| e.node).collect())
}
