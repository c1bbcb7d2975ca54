pub mod alpaca;
pub mod core;
pub mod feed_store;
pub mod mock;

pub use feed_store::{FileFeedStore, InMemoryFeedStore};
pub use mock::MockTransport;
