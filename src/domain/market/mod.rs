pub mod feed;
pub mod models;

pub use feed::{DataFeed, EquityFeed, FeedFamily, OptionFeed};
pub use models::{
    Bar, News, NewsImage, OptionQuote, OptionSnapshot, Quote, Snapshot, SortDirection, Timeframe,
    Trade,
};
