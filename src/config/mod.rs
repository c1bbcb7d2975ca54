//! Configuration loaded from environment variables (and `.env` via dotenvy
//! in the binary).

mod broker_config;

pub use broker_config::AlpacaConfig;
