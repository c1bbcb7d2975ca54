//! Alpaca brokerage REST client.
//!
//! `domain` holds the wire models, the numeric-string codec and the FIFO
//! realized P&L engine; `infrastructure` holds the request pipeline, feed
//! fallback and the HTTP transports.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use domain::errors::{AlpacaError, Result};
pub use infrastructure::alpaca::{AlpacaClient, AlpacaDataClient, Credentials};
