pub mod divider;
pub mod engine;
pub mod feed;
pub mod poller;

pub use engine::{TimelineEngine, TimelineEvent, TimelineHandle, TimelineRow, TimelineSnapshot};
pub use feed::{FeedStatus, PageOutcome, PageRequest, PagedFeed};
