pub mod client;
pub mod envelope;
pub mod environment;
pub mod error_classifier;
pub mod feed_fallback;
pub mod market_data;
pub mod rest;

pub use client::{
    ActivitiesQuery, AlpacaClient, AlpacaClientBuilder, ContractsQuery, OrderRequest, OrdersQuery,
    PortfolioHistoryQuery,
};
pub use environment::{AccountMode, Credentials, Environment, EnvironmentRole};
pub use feed_fallback::{FallbackOutcome, FeedFallback};
pub use market_data::{AlpacaDataClient, HistoryQuery, NewsQuery, QuotesQuery};
pub use rest::RestClient;
