use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::config::TimelineConfig;
use crate::errors::{MoodsError, MoodsResult};
use crate::format;
use crate::graphql::api::MoodsApi;
use crate::graphql::types::{Connection, MoodEntry, User, UserId};
use crate::state::users::UserCache;
use crate::timeline::divider::{annotate, TimelineItem};
use crate::timeline::feed::{FeedStatus, PageOutcome, PageRequest, PagedFeed};
use crate::timeline::poller::PollTimer;

pub type Scope = Vec<UserId>;

/// Everything the timeline loop reacts to. Each event runs to completion before
/// the next is taken.
#[derive(Debug)]
pub enum TimelineEvent {
    /// Identity resolved or cleared, or the user list changed.
    IdentityChanged {
        current_user_id: Option<UserId>,
        users: Vec<User>,
    },
    /// Pull-to-refresh.
    Refresh,
    /// Timer tick.
    Poll,
    LoadMore,
    PageArrived {
        request: PageRequest<Scope>,
        result: MoodsResult<Connection<MoodEntry>>,
    },
    DismissError,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineRow {
    Divider {
        key: String,
        label: String,
    },
    Entry {
        entry: MoodEntry,
        mine: bool,
        author_name: String,
        author_email: Option<String>,
        relative_time: String,
    },
}

/// What the timeline screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSnapshot {
    pub status: FeedStatus,
    pub rows: Vec<TimelineRow>,
    pub has_next_page: bool,
    pub error: Option<String>,
    pub polling: bool,
}

impl Default for TimelineSnapshot {
    fn default() -> Self {
        Self {
            status: FeedStatus::Empty,
            rows: Vec::new(),
            has_next_page: false,
            error: None,
            polling: false,
        }
    }
}

impl TimelineSnapshot {
    pub fn entries(&self) -> impl Iterator<Item = &MoodEntry> {
        self.rows.iter().filter_map(|row| match row {
            TimelineRow::Entry { entry, .. } => Some(entry),
            TimelineRow::Divider { .. } => None,
        })
    }
}

/// Command surface for the timeline loop. Cheap to clone.
#[derive(Clone)]
pub struct TimelineHandle {
    tx: mpsc::Sender<TimelineEvent>,
    snapshot: watch::Receiver<TimelineSnapshot>,
}

impl TimelineHandle {
    async fn send(&self, event: TimelineEvent) -> MoodsResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| MoodsError::EngineStopped)
    }

    pub async fn set_identity(
        &self,
        current_user_id: Option<UserId>,
        users: Vec<User>,
    ) -> MoodsResult<()> {
        self.send(TimelineEvent::IdentityChanged {
            current_user_id,
            users,
        })
        .await
    }

    pub async fn refresh(&self) -> MoodsResult<()> {
        self.send(TimelineEvent::Refresh).await
    }

    pub async fn load_more(&self) -> MoodsResult<()> {
        self.send(TimelineEvent::LoadMore).await
    }

    pub async fn dismiss_error(&self) -> MoodsResult<()> {
        self.send(TimelineEvent::DismissError).await
    }

    pub async fn stop(&self) -> MoodsResult<()> {
        self.send(TimelineEvent::Stop).await
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimelineSnapshot> {
        self.snapshot.clone()
    }
}

pub struct TimelineEngine {
    api: Arc<dyn MoodsApi>,
    feed: PagedFeed<MoodEntry, Scope>,
    poller: PollTimer,
    users: UserCache,
    current_user_id: Option<UserId>,
    event_rx: mpsc::Receiver<TimelineEvent>,
    event_tx: mpsc::WeakSender<TimelineEvent>,
    snapshot_tx: watch::Sender<TimelineSnapshot>,
}

impl TimelineEngine {
    pub fn new(api: Arc<dyn MoodsApi>, config: &TimelineConfig) -> (Self, TimelineHandle) {
        let (tx, event_rx) = mpsc::channel::<TimelineEvent>(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(TimelineSnapshot::default());
        let weak = tx.downgrade();

        let engine = Self {
            api,
            feed: PagedFeed::new(config.page_size),
            poller: PollTimer::new(Duration::from_secs(config.poll_interval_secs), weak.clone()),
            users: UserCache::new(),
            current_user_id: None,
            event_rx,
            event_tx: weak,
            snapshot_tx,
        };
        let handle = TimelineHandle {
            tx,
            snapshot: snapshot_rx,
        };
        (engine, handle)
    }

    /// Spawns the loop on the current runtime.
    pub fn spawn(api: Arc<dyn MoodsApi>, config: &TimelineConfig) -> TimelineHandle {
        let (engine, handle) = Self::new(api, config);
        tokio::spawn(async move {
            engine.run_loop().await;
            tracing::info!("timeline engine exited");
        });
        handle
    }

    pub async fn run_loop(mut self) {
        while let Some(event) = self.event_rx.recv().await {
            match event {
                TimelineEvent::IdentityChanged {
                    current_user_id,
                    users,
                } => self.on_identity(current_user_id, users),

                TimelineEvent::Refresh => {
                    tracing::info!("manual refresh");
                    self.start_load();
                }

                TimelineEvent::Poll => {
                    tracing::debug!("poll refresh");
                    self.start_load();
                }

                TimelineEvent::LoadMore => match self.feed.begin_load_more() {
                    Some(request) => {
                        tracing::info!(after = ?request.after, "loading more entries");
                        self.spawn_fetch(request);
                    }
                    None => tracing::debug!(
                        has_next_page = self.feed.has_next_page(),
                        in_flight = self.feed.is_loading_more(),
                        "load more skipped"
                    ),
                },

                TimelineEvent::PageArrived { request, result } => {
                    match self.feed.complete(&request, result) {
                        Ok(PageOutcome::Replaced(n)) => tracing::info!(entries = n, "timeline replaced"),
                        Ok(PageOutcome::Appended(n)) => tracing::info!(entries = n, "timeline extended"),
                        Ok(PageOutcome::Stale) => tracing::debug!("stale timeline page dropped"),
                        Err(e) => tracing::warn!(
                            error = %e,
                            retryable = e.is_retryable(),
                            load_more = request.is_load_more(),
                            "timeline fetch failed"
                        ),
                    }
                }

                TimelineEvent::DismissError => self.feed.dismiss_error(),

                TimelineEvent::Stop => {
                    tracing::info!("timeline stop requested");
                    break;
                }
            }
            self.publish();
        }
        self.poller.deactivate();
    }

    fn on_identity(&mut self, current_user_id: Option<UserId>, users: Vec<User>) {
        self.users.set_users(users);
        self.current_user_id = current_user_id;

        let scope = match &self.current_user_id {
            Some(_) if !self.users.is_empty() => Some(self.users.ids()),
            _ => None,
        };

        let active = scope.is_some();
        if self.feed.set_scope(scope) {
            if active {
                tracing::info!(scope = ?self.feed.scope(), "timeline scope activated");
                self.start_load();
            } else {
                tracing::info!("timeline scope cleared");
            }
        }

        if active {
            self.poller.activate();
        } else {
            self.poller.deactivate();
        }
    }

    fn start_load(&mut self) {
        match self.feed.begin_load() {
            Some(request) => self.spawn_fetch(request),
            None => tracing::debug!("no active scope; load skipped"),
        }
    }

    fn spawn_fetch(&self, request: PageRequest<Scope>) {
        let api = self.api.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = api
                .mood_entries(&request.scope, request.first, request.after.as_deref())
                .await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(TimelineEvent::PageArrived { request, result }).await;
            }
        });
    }

    fn publish(&self) {
        let now = chrono::Local::now();
        let rows = annotate(self.feed.nodes(), &now)
            .into_iter()
            .map(|item| match item {
                TimelineItem::Divider { key, label } => TimelineRow::Divider { key, label },
                TimelineItem::Entry(entry) => self.entry_row(entry, &now),
            })
            .collect();

        let snapshot = TimelineSnapshot {
            status: self.feed.status(),
            rows,
            has_next_page: self.feed.has_next_page(),
            error: self.feed.last_error().map(str::to_string),
            polling: self.poller.is_active(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }

    fn entry_row(&self, entry: &MoodEntry, now: &chrono::DateTime<chrono::Local>) -> TimelineRow {
        let author_id = entry.author_id().unwrap_or_default();
        let embedded_name = entry.user.as_ref().and_then(|u| u.name.as_deref());
        TimelineRow::Entry {
            mine: self.current_user_id.as_deref() == entry.author_id(),
            author_name: self.users.display_name(author_id, embedded_name),
            author_email: self.users.get(author_id).map(|u| u.email.clone()),
            relative_time: format::format_relative_time(&entry.created_at, now),
            entry: entry.clone(),
        }
    }
}
