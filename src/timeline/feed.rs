//! Cursor-paginated accumulator.
//!
//! A feed is driven in two halves: `begin_*` decides whether a fetch is needed and
//! hands out a [`PageRequest`] ticket; the caller performs the fetch and passes the
//! ticket back to [`PagedFeed::complete`] with the result. Between the two halves
//! any number of other events may be processed, so every ticket records what the
//! feed looked like when it was issued:
//!
//! - `scope_epoch` changes whenever the scope changes; answers for an old scope are
//!   discarded.
//! - loads carry a monotonic sequence number; a load answer older than the last
//!   applied one is discarded, so the most recently issued load wins.
//! - load-more tickets carry the feed generation, which bumps on every replace; a
//!   page fetched against a replaced feed is discarded.

use serde::Serialize;

use crate::errors::MoodsResult;
use crate::graphql::types::{Connection, Edge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Empty,
    Loading,
    Loaded,
    LoadingMore,
    Refreshing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Load { seq: u64 },
    More { generation: u64 },
}

/// Ticket for one in-flight fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest<S> {
    pub scope: S,
    pub first: u32,
    pub after: Option<String>,
    scope_epoch: u64,
    kind: RequestKind,
}

impl<S> PageRequest<S> {
    pub fn is_load_more(&self) -> bool {
        matches!(self.kind, RequestKind::More { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The feed now holds exactly this many edges from a fresh first page.
    Replaced(usize),
    /// This many edges were appended.
    Appended(usize),
    /// The answer no longer matches the feed and was dropped.
    Stale,
}

pub struct PagedFeed<T, S> {
    page_size: u32,
    scope: Option<S>,
    scope_epoch: u64,
    edges: Vec<Edge<T>>,
    has_next_page: bool,
    end_cursor: Option<String>,
    loaded: bool,
    generation: u64,
    next_load_seq: u64,
    last_applied_load: u64,
    loads_in_flight: u32,
    more_in_flight: Option<u64>,
    last_error: Option<String>,
}

impl<T, S: Clone + PartialEq + std::fmt::Debug> PagedFeed<T, S> {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size,
            scope: None,
            scope_epoch: 0,
            edges: Vec::new(),
            has_next_page: false,
            end_cursor: None,
            loaded: false,
            generation: 0,
            next_load_seq: 0,
            last_applied_load: 0,
            loads_in_flight: 0,
            more_in_flight: None,
            last_error: None,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn scope(&self) -> Option<&S> {
        self.scope.as_ref()
    }

    pub fn edges(&self) -> &[Edge<T>] {
        &self.edges
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    pub fn is_loading_more(&self) -> bool {
        self.more_in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn status(&self) -> FeedStatus {
        if self.more_in_flight.is_some() {
            FeedStatus::LoadingMore
        } else if self.loads_in_flight > 0 {
            if self.loaded {
                FeedStatus::Refreshing
            } else {
                FeedStatus::Loading
            }
        } else if self.loaded {
            FeedStatus::Loaded
        } else {
            FeedStatus::Empty
        }
    }

    /// Switches to a different scope (or none). Any previous pages, cursors and
    /// in-flight tickets are abandoned. Returns whether the scope changed.
    pub fn set_scope(&mut self, scope: Option<S>) -> bool {
        if self.scope == scope {
            return false;
        }
        tracing::debug!(from = ?self.scope, to = ?scope, "feed scope changed");
        self.scope = scope;
        self.scope_epoch += 1;
        self.edges.clear();
        self.has_next_page = false;
        self.end_cursor = None;
        self.loaded = false;
        self.generation += 1;
        self.last_applied_load = self.next_load_seq;
        self.loads_in_flight = 0;
        self.more_in_flight = None;
        self.last_error = None;
        true
    }

    /// Issues a first-page fetch. Used for the initial load and every refresh.
    pub fn begin_load(&mut self) -> Option<PageRequest<S>> {
        let scope = self.scope.clone()?;
        self.next_load_seq += 1;
        self.loads_in_flight += 1;
        Some(PageRequest {
            scope,
            first: self.page_size,
            after: None,
            scope_epoch: self.scope_epoch,
            kind: RequestKind::Load {
                seq: self.next_load_seq,
            },
        })
    }

    /// Issues a next-page fetch, or `None` when there is nothing more to fetch or a
    /// load-more is already in flight.
    pub fn begin_load_more(&mut self) -> Option<PageRequest<S>> {
        if !self.loaded || !self.has_next_page || self.more_in_flight.is_some() {
            return None;
        }
        let scope = self.scope.clone()?;
        let after = self.end_cursor.clone()?;
        self.more_in_flight = Some(self.generation);
        Some(PageRequest {
            scope,
            first: self.page_size,
            after: Some(after),
            scope_epoch: self.scope_epoch,
            kind: RequestKind::More {
                generation: self.generation,
            },
        })
    }

    /// Applies the answer to a ticket. Errors are recorded in `last_error` and
    /// returned; existing edges are never rolled back.
    pub fn complete(
        &mut self,
        request: &PageRequest<S>,
        result: MoodsResult<Connection<T>>,
    ) -> MoodsResult<PageOutcome> {
        if request.scope_epoch != self.scope_epoch {
            tracing::debug!(scope = ?request.scope, "dropping answer for superseded scope");
            return Ok(PageOutcome::Stale);
        }
        match request.kind {
            RequestKind::Load { seq } => self.complete_load(seq, result),
            RequestKind::More { generation } => self.complete_more(generation, result),
        }
    }

    fn complete_load(
        &mut self,
        seq: u64,
        result: MoodsResult<Connection<T>>,
    ) -> MoodsResult<PageOutcome> {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if seq <= self.last_applied_load {
            tracing::debug!(seq, applied = self.last_applied_load, "dropping out-of-order load");
            return Ok(PageOutcome::Stale);
        }
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(seq, error = %e, "feed load failed; keeping previous pages");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.edges = page.edges;
        self.has_next_page = page.page_info.has_next_page;
        self.end_cursor = page.page_info.end_cursor;
        self.loaded = true;
        self.last_applied_load = seq;
        self.generation += 1;
        self.more_in_flight = None;
        self.last_error = None;
        tracing::debug!(
            seq,
            edges = self.edges.len(),
            has_next_page = self.has_next_page,
            "feed replaced"
        );
        Ok(PageOutcome::Replaced(self.edges.len()))
    }

    fn complete_more(
        &mut self,
        generation: u64,
        result: MoodsResult<Connection<T>>,
    ) -> MoodsResult<PageOutcome> {
        if generation != self.generation || self.more_in_flight != Some(generation) {
            tracing::debug!(generation, current = self.generation, "dropping page for replaced feed");
            return Ok(PageOutcome::Stale);
        }
        self.more_in_flight = None;
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, "load more failed");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let added = page.edges.len();
        self.edges.extend(page.edges);
        self.has_next_page = page.page_info.has_next_page;
        self.end_cursor = page.page_info.end_cursor;
        tracing::debug!(
            added,
            total = self.edges.len(),
            has_next_page = self.has_next_page,
            "feed appended"
        );
        Ok(PageOutcome::Appended(added))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MoodsError;
    use crate::graphql::types::PageInfo;

    type Feed = PagedFeed<String, Vec<String>>;

    fn page(ids: &[&str], has_next_page: bool) -> MoodsResult<Connection<String>> {
        Ok(Connection {
            edges: ids
                .iter()
                .map(|id| Edge {
                    cursor: format!("c-{id}"),
                    node: id.to_string(),
                })
                .collect(),
            page_info: PageInfo {
                has_next_page,
                end_cursor: ids.last().map(|id| format!("c-{id}")),
            },
        })
    }

    fn nodes(feed: &Feed) -> Vec<String> {
        feed.nodes().cloned().collect()
    }

    fn scoped() -> Feed {
        let mut feed = Feed::new(20);
        feed.set_scope(Some(vec!["u1".into(), "u2".into()]));
        feed
    }

    fn transport_err() -> MoodsResult<Connection<String>> {
        Err(MoodsError::Transport("connection reset".into()))
    }

    #[test]
    fn test_initial_load_replaces_and_records_cursor() {
        let mut feed = scoped();
        assert_eq!(feed.status(), FeedStatus::Empty);

        let req = feed.begin_load().unwrap();
        assert_eq!(req.first, 20);
        assert!(req.after.is_none());
        assert_eq!(feed.status(), FeedStatus::Loading);

        let outcome = feed.complete(&req, page(&["a", "b"], true)).unwrap();
        assert_eq!(outcome, PageOutcome::Replaced(2));
        assert_eq!(feed.status(), FeedStatus::Loaded);
        assert!(feed.has_next_page());
        assert_eq!(feed.end_cursor(), Some("c-b"));
    }

    #[test]
    fn test_no_scope_issues_nothing() {
        let mut feed = Feed::new(20);
        assert!(feed.begin_load().is_none());
        assert!(feed.begin_load_more().is_none());
    }

    #[test]
    fn test_successive_pages_concatenate_in_order() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a", "b"], true)).unwrap();

        let more = feed.begin_load_more().unwrap();
        assert_eq!(more.after.as_deref(), Some("c-b"));
        assert_eq!(feed.complete(&more, page(&["c", "d"], true)).unwrap(), PageOutcome::Appended(2));

        let more = feed.begin_load_more().unwrap();
        assert_eq!(more.after.as_deref(), Some("c-d"));
        feed.complete(&more, page(&["e"], false)).unwrap();

        assert_eq!(nodes(&feed), vec!["a", "b", "c", "d", "e"]);
        assert!(!feed.has_next_page());
    }

    #[test]
    fn test_refresh_replaces_non_empty_feed() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a", "b"], true)).unwrap();
        let more = feed.begin_load_more().unwrap();
        feed.complete(&more, page(&["c"], false)).unwrap();

        let refresh = feed.begin_load().unwrap();
        assert_eq!(feed.status(), FeedStatus::Refreshing);
        let outcome = feed.complete(&refresh, page(&["z", "a"], true)).unwrap();

        assert_eq!(outcome, PageOutcome::Replaced(2));
        assert_eq!(nodes(&feed), vec!["z", "a"]);
        assert_eq!(feed.end_cursor(), Some("c-a"));
    }

    #[test]
    fn test_overlapping_ids_are_not_deduplicated() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a", "b"], true)).unwrap();
        let more = feed.begin_load_more().unwrap();
        feed.complete(&more, page(&["b", "c"], false)).unwrap();

        assert_eq!(nodes(&feed), vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn test_load_more_noop_without_next_page() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a"], false)).unwrap();

        assert!(feed.begin_load_more().is_none());
    }

    #[test]
    fn test_load_more_noop_before_first_page() {
        let mut feed = scoped();
        let _req = feed.begin_load().unwrap();
        assert!(feed.begin_load_more().is_none());
    }

    #[test]
    fn test_load_more_guard_allows_one_in_flight() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a"], true)).unwrap();

        let more = feed.begin_load_more().unwrap();
        assert_eq!(feed.status(), FeedStatus::LoadingMore);
        assert!(feed.begin_load_more().is_none());

        feed.complete(&more, page(&["b"], true)).unwrap();
        assert!(feed.begin_load_more().is_some());
    }

    #[test]
    fn test_failed_load_more_clears_guard_keeps_entries() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a", "b"], true)).unwrap();

        let more = feed.begin_load_more().unwrap();
        assert!(feed.complete(&more, transport_err()).is_err());

        assert!(!feed.is_loading_more());
        assert_eq!(nodes(&feed), vec!["a", "b"]);
        assert_eq!(feed.end_cursor(), Some("c-b"));
        assert!(feed.last_error().is_some());

        let retry = feed.begin_load_more().unwrap();
        assert_eq!(retry.after.as_deref(), Some("c-b"));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_pages() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a", "b"], true)).unwrap();

        let refresh = feed.begin_load().unwrap();
        let err = feed.complete(&refresh, transport_err()).unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(feed.status(), FeedStatus::Loaded);
        assert_eq!(nodes(&feed), vec!["a", "b"]);
        assert_eq!(feed.last_error(), Some("Transport error: connection reset"));

        feed.dismiss_error();
        assert!(feed.last_error().is_none());
    }

    #[test]
    fn test_failed_initial_load_is_empty_with_error() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        assert!(feed.complete(&req, transport_err()).is_err());

        assert_eq!(feed.status(), FeedStatus::Empty);
        assert!(feed.is_empty());
        assert!(feed.last_error().is_some());
    }

    #[test]
    fn test_latest_issued_load_wins() {
        let mut feed = scoped();
        let first = feed.begin_load().unwrap();
        let second = feed.begin_load().unwrap();

        // The later request resolves first; the earlier answer must not overwrite it.
        assert_eq!(feed.complete(&second, page(&["new"], false)).unwrap(), PageOutcome::Replaced(1));
        assert_eq!(feed.complete(&first, page(&["old"], false)).unwrap(), PageOutcome::Stale);

        assert_eq!(nodes(&feed), vec!["new"]);
        assert_eq!(feed.status(), FeedStatus::Loaded);
    }

    #[test]
    fn test_in_order_loads_both_apply() {
        let mut feed = scoped();
        let first = feed.begin_load().unwrap();
        let second = feed.begin_load().unwrap();

        feed.complete(&first, page(&["old"], false)).unwrap();
        assert_eq!(feed.status(), FeedStatus::Refreshing);
        feed.complete(&second, page(&["new"], false)).unwrap();

        assert_eq!(nodes(&feed), vec!["new"]);
    }

    #[test]
    fn test_answer_for_old_scope_is_discarded() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();

        assert!(feed.set_scope(Some(vec!["u3".into()])));
        let outcome = feed.complete(&req, page(&["foreign"], true)).unwrap();

        assert_eq!(outcome, PageOutcome::Stale);
        assert!(feed.is_empty());
        assert_eq!(feed.status(), FeedStatus::Empty);
    }

    #[test]
    fn test_same_scope_is_not_a_change() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a"], false)).unwrap();

        assert!(!feed.set_scope(Some(vec!["u1".into(), "u2".into()])));
        assert_eq!(nodes(&feed), vec!["a"]);
    }

    #[test]
    fn test_clearing_scope_resets_feed() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a"], true)).unwrap();

        assert!(feed.set_scope(None));
        assert!(feed.is_empty());
        assert!(!feed.has_next_page());
        assert!(feed.begin_load().is_none());
    }

    #[test]
    fn test_load_more_for_replaced_feed_is_discarded() {
        let mut feed = scoped();
        let req = feed.begin_load().unwrap();
        feed.complete(&req, page(&["a", "b"], true)).unwrap();

        let more = feed.begin_load_more().unwrap();
        let refresh = feed.begin_load().unwrap();
        feed.complete(&refresh, page(&["x", "y"], true)).unwrap();

        // The replace released the guard so the fresh cursor can be paged.
        assert!(!feed.is_loading_more());
        assert_eq!(feed.complete(&more, page(&["c"], false)).unwrap(), PageOutcome::Stale);
        assert_eq!(nodes(&feed), vec!["x", "y"]);
        assert!(feed.has_next_page());

        let next = feed.begin_load_more().unwrap();
        assert_eq!(next.after.as_deref(), Some("c-y"));
        assert!(next.is_load_more());
    }
}
