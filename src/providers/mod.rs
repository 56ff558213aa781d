pub mod http;
pub mod sfl_world;
pub mod util;

pub use http::HttpFetcher;
pub use sfl_world::MarketStore;
