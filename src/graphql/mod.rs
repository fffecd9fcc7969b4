pub mod api;
pub mod documents;
pub mod http;
pub mod types;

pub use api::MoodsApi;
pub use http::HttpGraphQlClient;
