// Market data models and feed tiers
pub mod market;

// Numbers transported as strings
pub mod numeric;

// Port interfaces
pub mod ports;

// Core trading domain
pub mod trading;

// Domain-specific error types
pub mod errors;

pub use errors::{AlpacaError, Result};
