pub mod event_bus;
pub mod session;
pub mod storage;
pub mod store;
pub mod token;
pub mod users;

pub use event_bus::StoreEvent;
pub use session::{Session, SessionStore};
pub use store::AppStore;
pub use users::UserCache;
